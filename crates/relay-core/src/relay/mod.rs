//! Relay orchestration: session lifecycle, node selection, consensus, and retries.

pub mod consensus;
pub mod coordinator;
pub mod errors;
pub mod request;
pub mod selection;
pub mod validation;

pub use coordinator::RelayCoordinator;
pub use errors::{ErrorCategory, ErrorCode, RelayError};
pub use request::{RelayOutcome, RelayRequest};
pub use selection::Participation;
