//! Storage abstractions for detector state persistence.
//!
//! The watcher keeps a single JSON document between runs:
//!
//! ```text
//! data/
//! ├── config.toml           # Watcher configuration
//! └── state.json            # Last detector state (StateDocument)
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::StateDocument;

// Re-export for convenience
pub use local::LocalStateStore;

/// Trait for state storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the last saved document. `None` on first run.
    async fn load(&self) -> Result<Option<StateDocument>>;

    /// Replace the saved document.
    async fn save(&self, document: &StateDocument) -> Result<()>;

    /// Remove the saved document, if any.
    async fn clear(&self) -> Result<()>;
}
