//! Backend factory for interface tests.
//!
//! Provides a unified interface to create storage backends based on environment configuration.

use std::env;
use std::sync::Arc;

use sopha::storage::{AttendanceStore, InMemoryStore};

#[cfg(feature = "sqlite")]
use sopha::{config::SqliteConfig, storage::SqliteStore};

/// Storage backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

impl StorageBackend {
    pub fn from_env() -> Self {
        match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "sqlite".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackend::Memory,
            _ if cfg!(feature = "sqlite") => StorageBackend::Sqlite,
            _ => StorageBackend::Memory,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Sqlite => "sqlite",
        }
    }
}

/// Holds the store for one scenario.
pub struct StorageContext {
    pub store: Arc<dyn AttendanceStore>,
}

impl std::fmt::Debug for StorageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageContext")
            .field("store", &"<dyn AttendanceStore>")
            .finish()
    }
}

impl StorageContext {
    /// Create a fresh, empty store for the configured backend.
    pub async fn new(backend: StorageBackend) -> Self {
        match backend {
            StorageBackend::Memory => Self {
                store: Arc::new(InMemoryStore::new()),
            },
            StorageBackend::Sqlite => Self::create_sqlite().await,
        }
    }

    #[cfg(feature = "sqlite")]
    async fn create_sqlite() -> Self {
        let config = SqliteConfig {
            path: ":memory:".to_string(),
            ..SqliteConfig::default()
        };
        let store = SqliteStore::connect(&config)
            .await
            .expect("Failed to connect to SQLite");
        store.init().await.expect("Failed to create schema");
        Self {
            store: Arc::new(store),
        }
    }

    #[cfg(not(feature = "sqlite"))]
    async fn create_sqlite() -> Self {
        panic!("SQLite backend requires the 'sqlite' feature");
    }
}
