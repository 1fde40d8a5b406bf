pub mod config;
pub mod document;
pub mod error;
pub mod remote;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use config::Config;
pub use document::{DocumentCandidate, PDF_MIME};
pub use error::ServiceError;
pub use remote::{DocumentService, RemoteClient};
pub use session::{Phase, Session, Submission};
pub use state::{ChatMessage, ChatRole};
