//! Error types for the core matching engine.
//!
//! Invalid input should normally be filtered out at the protocol layer;
//! the engine still rejects it defensively rather than corrupt the book.

/// Error returned by the engine's submit-style operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The submitted order failed validation (zero size, zero price, or a
    /// kind the operation does not accept). The book is left unchanged.
    InvalidOrder(String),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InvalidOrder(reason) => write!(f, "invalid order: {}", reason),
        }
    }
}

impl std::error::Error for EngineError {}
