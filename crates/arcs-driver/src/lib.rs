//! Storage drivers for arcs stores.
//!
//! A [`Driver`] owns the persisted model for exactly one storage key. It
//! accepts a new model only if it is the direct successor of the current
//! one (`version == current + 1`), which gives every key a single ordered
//! write channel, and it tells every registered receiver about each
//! accepted model, whoever sent it.
//!
//! Drivers are handed out by a [`DriverProvider`] per protocol; a
//! [`DriverFactory`] maps protocols to providers. Two stores resolve to the
//! same driver only through the same factory, so separate factories are
//! separate backends even for identical key strings.
//!
//! # Backends
//!
//! - [`VolatileDriverProvider`] -- `HashMap` behind a `RwLock`, lost on drop

pub mod error;
pub mod factory;
pub mod traits;
pub mod volatile;

pub use error::{DriverError, DriverResult};
pub use factory::DriverFactory;
pub use traits::{Driver, DriverModel, DriverProvider, DriverReceiver, ReceiverId};
pub use volatile::{VolatileDriver, VolatileDriverProvider, VolatileMemory};
