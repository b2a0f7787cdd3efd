//! Configuration for the email OTP workflow.

use bikego_otp_utils::{
    ThrottleConfig, CODE_LENGTH, DEFAULT_MIN_SECRET_LEN, DEFAULT_RESEND_COOLDOWN_SECS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fallback shown when the first dispatch fails without a message.
pub const SEND_FAILED: &str = "Failed to send OTP. Please try again.";
/// Fallback shown when a manual resend fails without a message.
pub const RESEND_FAILED: &str = "Failed to resend OTP. Please try again.";
/// Fallback shown when a verify-only confirmation fails without a message.
pub const VERIFY_FAILED: &str = "Failed to verify code. Please try again.";
/// Fallback shown when a password reset fails without a message.
pub const RESET_FAILED: &str = "Failed to reset password. Please try again.";

/// Shape of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowKind {
    /// Confirm the code alone (registration).
    VerifyOnly,
    /// Confirm the code together with a new password.
    VerifyAndSetSecret,
}

impl WorkflowKind {
    /// True when the workflow collects a new password.
    pub fn sets_secret(&self) -> bool {
        matches!(self, WorkflowKind::VerifyAndSetSecret)
    }

    /// Fallback message for a failed confirmation.
    pub fn confirm_failed_message(&self) -> &'static str {
        match self {
            WorkflowKind::VerifyOnly => VERIFY_FAILED,
            WorkflowKind::VerifyAndSetSecret => RESET_FAILED,
        }
    }
}

/// The purpose of an OTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    /// Activating a freshly registered account.
    Registration,
    /// "Forgot password" from the login page.
    PasswordReset,
    /// "Change password" from the account page.
    ChangePassword,
}

impl OtpPurpose {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Registration => "registration",
            OtpPurpose::PasswordReset => "password-reset",
            OtpPurpose::ChangePassword => "change-password",
        }
    }

    /// Parses from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "registration" => Some(OtpPurpose::Registration),
            "password-reset" => Some(OtpPurpose::PasswordReset),
            "change-password" => Some(OtpPurpose::ChangePassword),
            _ => None,
        }
    }

    /// The workflow shape this purpose needs.
    pub fn kind(&self) -> WorkflowKind {
        match self {
            OtpPurpose::Registration => WorkflowKind::VerifyOnly,
            OtpPurpose::PasswordReset | OtpPurpose::ChangePassword => {
                WorkflowKind::VerifyAndSetSecret
            }
        }
    }
}

/// Configuration for an OTP workflow and its host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Number of code cells. Default: 6.
    pub code_length: usize,
    /// Resend cooldown in seconds. Default: 30.
    pub resend_cooldown_secs: u32,
    /// Length of one countdown step in milliseconds. Default: 1000.
    pub tick_interval_ms: u64,
    /// Minimum new-password length. Default: 6.
    pub min_secret_len: usize,
    /// How long a dialog host shows the success state before closing. Default: 2000.
    pub success_display_delay_ms: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            code_length: CODE_LENGTH,
            resend_cooldown_secs: DEFAULT_RESEND_COOLDOWN_SECS,
            tick_interval_ms: 1000,
            min_secret_len: DEFAULT_MIN_SECRET_LEN,
            success_display_delay_ms: 2000,
        }
    }
}

impl WorkflowConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the code length.
    pub fn code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    /// Sets the resend cooldown in seconds.
    pub fn resend_cooldown_secs(mut self, seconds: u32) -> Self {
        self.resend_cooldown_secs = seconds;
        self
    }

    /// Sets the countdown step in milliseconds.
    pub fn tick_interval_ms(mut self, millis: u64) -> Self {
        self.tick_interval_ms = millis;
        self
    }

    /// Sets the minimum new-password length.
    pub fn min_secret_len(mut self, length: usize) -> Self {
        self.min_secret_len = length;
        self
    }

    /// Sets the success display delay in milliseconds.
    pub fn success_display_delay_ms(mut self, millis: u64) -> Self {
        self.success_display_delay_ms = millis;
        self
    }

    /// Throttle settings derived from this config.
    pub fn throttle(&self) -> ThrottleConfig {
        ThrottleConfig::new(self.resend_cooldown_secs)
            .with_tick_interval(Duration::from_millis(self.tick_interval_ms.max(1)))
    }

    /// Success display delay as a duration.
    pub fn success_display_delay(&self) -> Duration {
        Duration::from_millis(self.success_display_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkflowConfig::default();
        assert_eq!(config.code_length, 6);
        assert_eq!(config.resend_cooldown_secs, 30);
        assert_eq!(config.min_secret_len, 6);
        assert_eq!(config.throttle().tick_interval, Duration::from_secs(1));
    }

    #[test]
    fn test_builder() {
        let config = WorkflowConfig::new()
            .resend_cooldown_secs(60)
            .tick_interval_ms(0)
            .success_display_delay_ms(500);
        assert_eq!(config.throttle().cooldown_secs, 60);
        assert_eq!(config.throttle().tick_interval, Duration::from_millis(1));
        assert_eq!(config.success_display_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_deserialize() {
        let config: WorkflowConfig =
            serde_json::from_str(r#"{"resend_cooldown_secs": 45}"#).unwrap();
        assert_eq!(config.resend_cooldown_secs, 45);
        assert_eq!(config.code_length, 6);
    }

    #[test]
    fn test_purpose_round_trip() {
        for purpose in [
            OtpPurpose::Registration,
            OtpPurpose::PasswordReset,
            OtpPurpose::ChangePassword,
        ] {
            assert_eq!(OtpPurpose::parse(purpose.as_str()), Some(purpose));
        }
        assert_eq!(OtpPurpose::Registration.kind(), WorkflowKind::VerifyOnly);
        assert!(OtpPurpose::ChangePassword.kind().sets_secret());
    }
}
