//! Protocol -> provider table.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use arcs_keys::{StorageKey, RAMDISK_PROTOCOL, VOLATILE_PROTOCOL};
use tracing::debug;

use crate::error::{DriverError, DriverResult};
use crate::traits::{Driver, DriverProvider};
use crate::volatile::VolatileDriverProvider;

/// Resolves storage keys to drivers by protocol.
///
/// A factory is the isolation boundary between backends: drivers obtained
/// from different factories never share state.
#[derive(Default)]
pub struct DriverFactory {
    providers: RwLock<HashMap<String, Arc<dyn DriverProvider>>>,
}

impl DriverFactory {
    /// A factory with no providers.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory serving `volatile` and `ramdisk` keys, each from its own
    /// fresh memory.
    pub fn with_volatile_defaults() -> Self {
        let mut providers: HashMap<String, Arc<dyn DriverProvider>> = HashMap::new();
        for protocol in [VOLATILE_PROTOCOL, RAMDISK_PROTOCOL] {
            providers.insert(
                protocol.to_string(),
                Arc::new(VolatileDriverProvider::new(protocol)),
            );
        }
        Self {
            providers: RwLock::new(providers),
        }
    }

    /// Add a provider, replacing any provider for the same protocol.
    pub fn register(&self, provider: Arc<dyn DriverProvider>) -> DriverResult<()> {
        let protocol = provider.protocol().to_string();
        let replaced = self
            .providers
            .write()?
            .insert(protocol.clone(), provider)
            .is_some();
        debug!(%protocol, replaced, "driver provider registered");
        Ok(())
    }

    /// Remove the provider for `protocol`. Returns `true` if one existed.
    pub fn deregister(&self, protocol: &str) -> DriverResult<bool> {
        Ok(self.providers.write()?.remove(protocol).is_some())
    }

    pub fn clear_registrations(&self) -> DriverResult<()> {
        self.providers.write()?.clear();
        Ok(())
    }

    /// Registered protocols, sorted.
    pub fn protocols(&self) -> DriverResult<Vec<String>> {
        let mut protocols: Vec<String> = self.providers.read()?.keys().cloned().collect();
        protocols.sort();
        Ok(protocols)
    }

    /// The driver for `key`.
    pub fn driver_for(&self, key: &StorageKey) -> DriverResult<Arc<dyn Driver>> {
        let provider = self
            .providers
            .read()?
            .get(key.protocol())
            .cloned()
            .ok_or_else(|| DriverError::NoProvider {
                protocol: key.protocol().to_string(),
                key: key.to_string(),
            })?;
        provider.driver(key)
    }

    /// Clear every provider's stored data.
    pub fn clear_all(&self) -> DriverResult<()> {
        let providers: Vec<Arc<dyn DriverProvider>> =
            self.providers.read()?.values().cloned().collect();
        for provider in providers {
            provider.clear()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::DriverModel;
    use arcs_types::ArcId;

    fn volatile_key(unique: &str) -> StorageKey {
        StorageKey::volatile(ArcId::new_for_test("arc"), unique).unwrap()
    }

    #[test]
    fn defaults_serve_builtin_protocols() {
        let factory = DriverFactory::with_volatile_defaults();
        assert_eq!(
            factory.protocols().unwrap(),
            vec!["ramdisk".to_string(), "volatile".to_string()]
        );
        assert!(factory.driver_for(&volatile_key("a")).is_ok());
        assert!(factory.driver_for(&StorageKey::ramdisk("a").unwrap()).is_ok());
    }

    #[test]
    fn unknown_protocol_has_no_provider() {
        let factory = DriverFactory::new();
        let err = factory.driver_for(&volatile_key("a")).err();
        assert!(matches!(err, Some(DriverError::NoProvider { .. })));
    }

    #[tokio::test]
    async fn same_factory_shares_drivers_per_key() {
        let factory = DriverFactory::with_volatile_defaults();
        let a = factory.driver_for(&volatile_key("people")).unwrap();
        let b = factory.driver_for(&volatile_key("people")).unwrap();
        a.send(DriverModel::new(1, vec![7]), None).await.unwrap();
        assert_eq!(b.fetch().await.unwrap().map(|m| m.data), Some(vec![7]));

        let other = factory.driver_for(&volatile_key("places")).unwrap();
        assert_eq!(other.fetch().await.unwrap(), None);
    }

    #[tokio::test]
    async fn clear_all_empties_every_backend() {
        let factory = DriverFactory::with_volatile_defaults();
        let ram = factory.driver_for(&StorageKey::ramdisk("a").unwrap()).unwrap();
        ram.send(DriverModel::new(1, vec![1]), None).await.unwrap();
        factory.clear_all().unwrap();
        assert_eq!(ram.fetch().await.unwrap(), None);
    }

    #[test]
    fn register_and_deregister() {
        let factory = DriverFactory::new();
        factory
            .register(Arc::new(VolatileDriverProvider::new("db")))
            .unwrap();
        let key = StorageKey::new("db", ArcId::new_for_test("arc"), "x").unwrap();
        assert!(factory.driver_for(&key).is_ok());

        assert!(factory.deregister("db").unwrap());
        assert!(!factory.deregister("db").unwrap());
        assert!(factory.driver_for(&key).is_err());

        factory
            .register(Arc::new(VolatileDriverProvider::new("db")))
            .unwrap();
        factory.clear_registrations().unwrap();
        assert!(factory.protocols().unwrap().is_empty());
    }
}
