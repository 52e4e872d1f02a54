//! Configuration Module
//!
//! Construction-time settings for a cache instance, loadable from environment
//! variables with sensible defaults.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::{json, Value};

use crate::cache::EvictionPolicy;
use crate::error::{CacheError, Result};

/// Sentinel path that selects an ephemeral in-memory store.
pub const MEMORY_PATH: &str = ":memory:";

/// Default time-to-live for written entries.
pub const DEFAULT_TTL: Duration = Duration::from_millis(60_000);

/// Default maximum number of live entries.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

// == Store Path ==
/// Where the backing store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorePath {
    /// Ephemeral store, dropped with the connection
    Memory,
    /// On-disk database file
    File(PathBuf),
}

impl StorePath {
    /// Parses a user supplied location, mapping `":memory:"` to [`StorePath::Memory`].
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CacheError::Configuration(
                "path cannot be empty".to_string(),
            ));
        }
        if trimmed == MEMORY_PATH {
            Ok(StorePath::Memory)
        } else {
            Ok(StorePath::File(PathBuf::from(trimmed)))
        }
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorePath::Memory => f.write_str(MEMORY_PATH),
            StorePath::File(path) => write!(f, "{}", path.display()),
        }
    }
}

// == Logging Config ==
/// Logging settings. The engine only reads `label`; the rest is consumed by
/// [`crate::logging::init`].
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Fallback filter directive when `RUST_LOG` is not set
    pub filter: String,
    /// Colourised output
    pub ansi: bool,
    /// Name attached to every event the engine emits
    pub label: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "sqlite_cache=info".to_string(),
            ansi: true,
            label: "cache".to_string(),
        }
    }
}

// == Cache Config ==
/// Cache construction parameters.
///
/// All values are consumed once, when the cache is opened.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Storage location
    pub path: StorePath,
    /// Shape descriptor every stored value must conform to
    pub shape: Value,
    /// Time-to-live applied to every write
    pub ttl: Duration,
    /// Maximum number of entries kept after any write
    pub max_entries: usize,
    /// Run each `set` inside one storage transaction
    pub atomic_writes: bool,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl CacheConfig {
    /// Creates a config for the given location with default limits and a
    /// shape that accepts any object.
    pub fn new(path: StorePath) -> Self {
        Self {
            path,
            ..Self::default()
        }
    }

    /// Creates a config for an in-memory store.
    pub fn in_memory() -> Self {
        Self::new(StorePath::Memory)
    }

    pub fn with_shape(mut self, shape: Value) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_atomic_writes(mut self, atomic_writes: bool) -> Self {
        self.atomic_writes = atomic_writes;
        self
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Creates a new CacheConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PATH` - Database file or `:memory:` (default: `:memory:`)
    /// - `CACHE_TTL_MS` - TTL in milliseconds (default: 60000)
    /// - `CACHE_MAX` - Maximum entries (default: 100)
    /// - `CACHE_ATOMIC_WRITES` - `true` to wrap each write in a transaction (default: false)
    /// - `CACHE_LOG` - Fallback log filter (default: `sqlite_cache=info`)
    ///
    /// Missing or unparsable values fall back to their defaults; an empty
    /// `CACHE_PATH` is left for [`CacheConfig::validate`] to reject.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let path = match env::var("CACHE_PATH") {
            Ok(raw) if raw.trim() == MEMORY_PATH => StorePath::Memory,
            Ok(raw) => StorePath::File(PathBuf::from(raw.trim())),
            Err(_) => defaults.path,
        };
        let mut logging = LoggingConfig::default();
        if let Ok(filter) = env::var("CACHE_LOG") {
            logging.filter = filter;
        }

        Self {
            path,
            shape: defaults.shape,
            ttl: env::var("CACHE_TTL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TTL),
            max_entries: env::var("CACHE_MAX")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_ENTRIES),
            atomic_writes: env::var("CACHE_ATOMIC_WRITES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            logging,
        }
    }

    /// Checks the limits and path. Shape descriptors are checked when compiled.
    pub fn validate(&self) -> Result<()> {
        if let StorePath::File(path) = &self.path {
            if path.as_os_str().is_empty() {
                return Err(CacheError::Configuration(
                    "path cannot be empty".to_string(),
                ));
            }
        }
        EvictionPolicy::new(self.ttl, self.max_entries)?;
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: StorePath::Memory,
            shape: json!({ "type": "object" }),
            ttl: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
            atomic_writes: false,
            logging: LoggingConfig::default(),
        }
    }
}
