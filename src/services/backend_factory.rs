//! Backend factory.
//!
//! Turns a [`StoreConfig`] into a ready store. All configuration is checked
//! before any file or connection is opened:
//!
//! ```text
//! StoreFactory::create(config)
//!   ├── backend name    → BackendKind (NotFound if unknown)
//!   ├── options map     → StoreOptions (Configuration if invalid)
//!   └── per-backend     → path / connection string checks
//!         ├── sqlite    → SqliteVectorStore::new(path, options)
//!         ├── memory    → InMemoryVectorStore::new()
//!         └── pgvector, http → NotImplemented
//! ```

use crate::config::{BackendKind, StoreConfig, StoreOptions};
use crate::storage::{InMemoryVectorStore, SqliteVectorStore, VectorStore};
use crate::{Error, Result};
use secrecy::ExposeSecret;
use std::sync::Arc;

/// Factory for creating vector stores.
///
/// # Example
///
/// ```rust
/// use embedstore::{StoreConfig, StoreFactory};
///
/// let store = StoreFactory::create(&StoreConfig::in_memory())?;
/// assert_eq!(store.backend_name(), "memory");
/// # Ok::<(), embedstore::Error>(())
/// ```
pub struct StoreFactory;

impl StoreFactory {
    /// Creates the store described by `config`.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] for an unknown backend name
    /// - [`Error::Configuration`] for a missing path or connection string,
    ///   or an invalid option
    /// - [`Error::NotImplemented`] for a remote backend
    /// - [`Error::StorageIo`] if the database cannot be opened
    pub fn create(config: &StoreConfig) -> Result<Box<dyn VectorStore>> {
        let kind = config.backend_kind()?;
        let options = config.store_options()?;

        match kind {
            BackendKind::Sqlite => Ok(Box::new(Self::create_sqlite(config, &options)?)),
            BackendKind::Memory => {
                tracing::debug!("Creating in-memory vector store");
                Ok(Box::new(InMemoryVectorStore::new()))
            },
            BackendKind::Pgvector => {
                Self::require_connection_string(config, kind, &["postgres://", "postgresql://"])?;
                Err(Self::not_implemented(kind))
            },
            BackendKind::Http => {
                Self::require_connection_string(config, kind, &["http://", "https://"])?;
                Err(Self::not_implemented(kind))
            },
        }
    }

    /// Creates a store for sharing across threads.
    ///
    /// # Errors
    ///
    /// See [`StoreFactory::create`].
    pub fn create_shared(config: &StoreConfig) -> Result<Arc<dyn VectorStore>> {
        Self::create(config).map(Arc::from)
    }

    fn create_sqlite(config: &StoreConfig, options: &StoreOptions) -> Result<SqliteVectorStore> {
        let path = config
            .path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| {
                Error::Configuration("the sqlite backend requires a database path".to_string())
            })?;
        tracing::debug!(path = %path.display(), "Creating SQLite vector store");
        SqliteVectorStore::new(path, options)
    }

    fn require_connection_string(
        config: &StoreConfig,
        kind: BackendKind,
        schemes: &[&str],
    ) -> Result<()> {
        let Some(secret) = &config.connection_string else {
            return Err(Error::Configuration(format!(
                "the {kind} backend requires a connection string"
            )));
        };
        let value = secret.expose_secret().trim();
        if !schemes.iter().any(|scheme| value.starts_with(scheme)) {
            // The value itself may hold credentials; name only the schemes.
            return Err(Error::Configuration(format!(
                "the {kind} backend requires a connection string starting with {}",
                schemes.join(" or ")
            )));
        }
        Ok(())
    }

    fn not_implemented(kind: BackendKind) -> Error {
        tracing::warn!(backend = %kind, "Backend is recognised but not available in this build");
        Error::NotImplemented(format!("the {kind} backend is not available in this build"))
    }
}
