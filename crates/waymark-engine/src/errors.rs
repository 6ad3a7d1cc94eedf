//! Engine error types.

use thiserror::Error;
use waymark_store::StoreError;

/// Errors raised by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A pack or state store operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// No pack is loaded under this name.
    #[error("pack not loaded: {0}")]
    PackNotLoaded(String),

    /// A pack with this name is already loaded.
    #[error("pack already loaded: {0}")]
    DuplicatePack(String),

    /// A reload checkpoint cannot be resumed while another reload runs.
    #[error("invalid reload state: {0}")]
    InvalidState(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            EngineError::PackNotLoaded("tekkit".into()).to_string(),
            "pack not loaded: tekkit"
        );
        assert_eq!(
            EngineError::DuplicatePack("tekkit".into()).to_string(),
            "pack already loaded: tekkit"
        );
        let store: EngineError = StoreError::CategoryNotFound("a.b".into()).into();
        assert!(store.to_string().starts_with("store error:"));
    }
}
