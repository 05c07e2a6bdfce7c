//! Protocol-keyed storage key parsing.
//!
//! [`StorageKeyParser`] maps a protocol prefix to a constructor that turns
//! the rest of the key string into a [`StorageKey`]. Backend registries own
//! their own parser instance; a process-wide instance is also available
//! through [`StorageKeyParser::global`] for code that has no registry at
//! hand.

use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

use tracing::debug;

use crate::error::{KeyError, KeyResult};
use crate::key::{StorageKey, RAMDISK_PROTOCOL, VOLATILE_PROTOCOL};
use crate::names::validate_protocol;

/// Builds a key from the text after `protocol://`.
pub type KeyConstructor = fn(&str) -> KeyResult<StorageKey>;

const SEPARATOR: &str = "://";

fn parse_volatile(path: &str) -> KeyResult<StorageKey> {
    StorageKey::parse_path(VOLATILE_PROTOCOL, path)
}

fn parse_ramdisk(path: &str) -> KeyResult<StorageKey> {
    StorageKey::parse_path(RAMDISK_PROTOCOL, path)
}

static GLOBAL: LazyLock<RwLock<StorageKeyParser>> =
    LazyLock::new(|| RwLock::new(StorageKeyParser::with_defaults()));

/// Table of protocol constructors.
#[derive(Clone, Debug, Default)]
pub struct StorageKeyParser {
    parsers: HashMap<String, KeyConstructor>,
}

impl StorageKeyParser {
    /// A parser that knows no protocols.
    pub fn new() -> Self {
        Self::default()
    }

    /// A parser preloaded with the built-in `volatile` and `ramdisk`
    /// protocols.
    pub fn with_defaults() -> Self {
        let mut parser = Self::new();
        parser.parsers.insert(VOLATILE_PROTOCOL.into(), parse_volatile);
        parser.parsers.insert(RAMDISK_PROTOCOL.into(), parse_ramdisk);
        parser
    }

    /// Register (or replace) the constructor for `protocol`.
    pub fn register(&mut self, protocol: &str, constructor: KeyConstructor) -> KeyResult<()> {
        validate_protocol(protocol)?;
        if self
            .parsers
            .insert(protocol.to_string(), constructor)
            .is_some()
        {
            debug!(protocol, "replaced storage key parser");
        }
        Ok(())
    }

    /// Replace the whole table with `parsers`.
    pub fn reset<'a, I>(&mut self, parsers: I) -> KeyResult<()>
    where
        I: IntoIterator<Item = (&'a str, KeyConstructor)>,
    {
        self.parsers.clear();
        for (protocol, constructor) in parsers {
            self.register(protocol, constructor)?;
        }
        Ok(())
    }

    /// Forget every registered protocol.
    pub fn clear_registrations(&mut self) {
        self.parsers.clear();
    }

    pub fn is_registered(&self, protocol: &str) -> bool {
        self.parsers.contains_key(protocol)
    }

    /// Registered protocols, sorted.
    pub fn protocols(&self) -> Vec<String> {
        let mut protocols: Vec<String> = self.parsers.keys().cloned().collect();
        protocols.sort();
        protocols
    }

    /// Parse a full key string.
    pub fn parse(&self, raw: &str) -> KeyResult<StorageKey> {
        let (protocol, path) = raw
            .split_once(SEPARATOR)
            .ok_or_else(|| KeyError::InvalidKeyFormat {
                key: raw.to_string(),
                reason: format!("missing '{SEPARATOR}' after protocol"),
            })?;
        let constructor = self
            .parsers
            .get(protocol)
            .ok_or_else(|| KeyError::UnknownProtocol {
                protocol: protocol.to_string(),
            })?;
        constructor(path)
    }

    /// The process-wide parser, preloaded with the built-in protocols.
    pub fn global() -> &'static RwLock<StorageKeyParser> {
        &GLOBAL
    }

    /// Parse through the process-wide parser.
    pub fn parse_global(raw: &str) -> KeyResult<StorageKey> {
        GLOBAL.read()?.parse(raw)
    }

    /// Register a protocol on the process-wide parser.
    pub fn register_global(protocol: &str, constructor: KeyConstructor) -> KeyResult<()> {
        GLOBAL.write()?.register(protocol, constructor)
    }

    /// Empty the process-wide parser. Test-only; nothing parses through
    /// the global table afterwards until protocols are registered again.
    pub fn reset_global() -> KeyResult<()> {
        GLOBAL.write()?.clear_registrations();
        debug!("global storage key parser reset");
        Ok(())
    }

    /// Put the built-in protocols back into the process-wide parser,
    /// dropping anything else.
    pub fn restore_global_defaults() -> KeyResult<()> {
        *GLOBAL.write()? = Self::with_defaults();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcs_types::ArcId;

    fn parse_db(path: &str) -> KeyResult<StorageKey> {
        StorageKey::parse_path("db", path)
    }

    #[test]
    fn parses_registered_protocols() {
        let parser = StorageKeyParser::with_defaults();
        let key = StorageKey::volatile(ArcId::new_for_test("arc"), "foo").unwrap();
        assert_eq!(parser.parse(&key.to_string()).unwrap(), key);

        let nested = parser.parse("volatile://first/second/third").unwrap();
        assert_eq!(nested.arc_id().as_str(), "first");
        assert_eq!(nested.unique(), "second/third");

        let ram = StorageKey::ramdisk("entities").unwrap();
        assert_eq!(parser.parse(&ram.to_string()).unwrap(), ram);
    }

    #[test]
    fn invalid_strings_fail_with_invalid_format() {
        let parser = StorageKeyParser::with_defaults();
        assert!(matches!(
            parser.parse("nonsense"),
            Err(KeyError::InvalidKeyFormat { .. })
        ));
        assert!(matches!(
            parser.parse("volatile://nonsense"),
            Err(KeyError::InvalidKeyFormat { .. })
        ));
    }

    #[test]
    fn unknown_protocol_is_reported() {
        let parser = StorageKeyParser::with_defaults();
        assert_eq!(
            parser.parse("db://arc/x").unwrap_err(),
            KeyError::UnknownProtocol {
                protocol: "db".into()
            }
        );
    }

    #[test]
    fn register_reset_and_clear() {
        let mut parser = StorageKeyParser::new();
        assert!(parser.protocols().is_empty());

        parser.register("db", parse_db).unwrap();
        assert!(parser.is_registered("db"));
        assert_eq!(parser.parse("db://arc/x").unwrap().protocol(), "db");

        parser.reset([(VOLATILE_PROTOCOL, parse_volatile as KeyConstructor)]).unwrap();
        assert_eq!(parser.protocols(), vec![VOLATILE_PROTOCOL.to_string()]);
        assert!(!parser.is_registered("db"));

        parser.clear_registrations();
        assert!(parser.protocols().is_empty());
        assert!(parser.parse("volatile://arc/x").is_err());
    }

    #[test]
    fn register_rejects_bad_protocol() {
        let mut parser = StorageKeyParser::new();
        assert!(parser.register("Bad Protocol", parse_db).is_err());
    }

    // The only test touching the process-wide table.
    #[test]
    fn global_parser_registers_and_resets() {
        assert!(StorageKeyParser::parse_global("ramdisk://shared/entities").is_ok());
        StorageKeyParser::register_global("db", parse_db).unwrap();
        assert!(StorageKeyParser::parse_global("db://arc/x").is_ok());

        StorageKeyParser::reset_global().unwrap();
        assert!(StorageKeyParser::global().read().unwrap().protocols().is_empty());
        assert!(matches!(
            StorageKeyParser::parse_global("ramdisk://shared/entities"),
            Err(KeyError::UnknownProtocol { .. })
        ));
        assert!(StorageKeyParser::parse_global("db://arc/x").is_err());

        StorageKeyParser::restore_global_defaults().unwrap();
        assert_eq!(
            StorageKeyParser::global().read().unwrap().protocols(),
            vec![RAMDISK_PROTOCOL.to_string(), VOLATILE_PROTOCOL.to_string()]
        );
        assert!(StorageKeyParser::parse_global("db://arc/x").is_err());
    }

    #[test]
    fn poisoned_lock_maps_to_error() {
        let lock = std::sync::Arc::new(RwLock::new(StorageKeyParser::with_defaults()));
        let held = std::sync::Arc::clone(&lock);
        let _ = std::thread::spawn(move || {
            let _guard = held.write().unwrap();
            panic!("poison");
        })
        .join();

        let err = lock.read().map_err(KeyError::from).unwrap_err();
        assert!(matches!(err, KeyError::Poisoned(_)));
    }
}
