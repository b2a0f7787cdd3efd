//! # BikeGo Core
//!
//! This crate provides the foundational types and traits for the BikeGo
//! client. It defines the cached session data, the error type every backend
//! call returns, and the trait interfaces that OTP backends and session
//! stores implement.

pub mod context;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at the crate root
pub use context::SessionContext;
pub use error::{ClientError, ClientResult};
pub use traits::{OtpBackend, SessionStore};
pub use types::{ConfirmPayload, Role, Session, SessionUser};
