//! # BikeGo OTP Utilities
//!
//! Building blocks shared by every BikeGo OTP flow.
//! This crate provides:
//! - The six-cell code entry row
//! - The resend cooldown and its ticker
//! - Local validation of codes and new passwords

mod code_entry;
mod throttle;
mod validation;

pub use code_entry::{CodeEntry, CODE_LENGTH};
pub use throttle::{
    Countdown, ResendThrottle, ThrottleConfig, ThrottleState, DEFAULT_RESEND_COOLDOWN_SECS,
};
pub use validation::{
    validate_code, validate_new_secret, validate_reset, ValidationError, DEFAULT_MIN_SECRET_LEN,
};
