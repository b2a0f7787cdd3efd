//! Workflow state and the views handed out to hosts.

use bikego_otp_utils::{CodeEntry, ThrottleState};
use serde::{Deserialize, Serialize};

/// Step of an OTP workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    /// Waiting for the first code to be sent (or for a retry after a failed send).
    Dispatching,
    /// Code sent; the user is typing it.
    AwaitingCode,
    /// Code entered; the user is choosing a new password.
    AwaitingNewSecret,
    /// The backend accepted the confirmation.
    Succeeded,
}

impl WorkflowStep {
    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStep::Dispatching => "dispatching",
            WorkflowStep::AwaitingCode => "awaiting_code",
            WorkflowStep::AwaitingNewSecret => "awaiting_new_secret",
            WorkflowStep::Succeeded => "succeeded",
        }
    }

    /// True for `Succeeded`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStep::Succeeded)
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a workflow action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The action went through; the workflow is now at this step.
    Accepted(WorkflowStep),
    /// Validation or the backend refused; the message is now on display.
    Rejected(String),
    /// The action does not apply right now (wrong step, cooldown, request in flight).
    Ignored,
    /// The workflow was cancelled while the request was in flight; its result was dropped.
    Discarded,
}

impl StepOutcome {
    /// True for `Accepted`.
    pub fn is_accepted(&self) -> bool {
        matches!(self, StepOutcome::Accepted(_))
    }

    /// The rejection message, if any.
    pub fn rejection(&self) -> Option<&str> {
        match self {
            StepOutcome::Rejected(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct WorkflowState {
    pub(crate) step: WorkflowStep,
    pub(crate) code: CodeEntry,
    pub(crate) new_secret: String,
    pub(crate) confirm_secret: String,
    pub(crate) error_message: Option<String>,
    pub(crate) confirming: bool,
}

impl WorkflowState {
    pub(crate) fn new(code_length: usize) -> Self {
        Self {
            step: WorkflowStep::Dispatching,
            code: CodeEntry::new(code_length),
            new_secret: String::new(),
            confirm_secret: String::new(),
            error_message: None,
            confirming: false,
        }
    }

    /// Moves to `step`; errors never survive a transition.
    pub(crate) fn enter(&mut self, step: WorkflowStep) {
        self.step = step;
        self.error_message = None;
    }
}

/// Full copy of a workflow's observable state.
///
/// Passwords take part in equality but are never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowSnapshot {
    /// Email address the code is sent to.
    pub identity: String,
    /// Current step.
    pub step: WorkflowStep,
    /// One entry per cell; empty string for an empty cell.
    pub code: Vec<String>,
    /// Index of the focused cell.
    pub focus: usize,
    /// New password as typed.
    #[serde(skip_serializing)]
    pub new_secret: String,
    /// Password confirmation as typed.
    #[serde(skip_serializing)]
    pub confirm_secret: String,
    /// Message shown to the user, cleared on the next edit or step change.
    pub error_message: Option<String>,
    /// Resend countdown and dispatch flag.
    pub resend: ThrottleState,
    /// True while a confirmation request is in flight.
    pub confirming: bool,
}

impl WorkflowSnapshot {
    pub(crate) fn capture(identity: &str, state: &WorkflowState, resend: ThrottleState) -> Self {
        Self {
            identity: identity.to_string(),
            step: state.step,
            code: state.code.cells(),
            focus: state.code.focus(),
            new_secret: state.new_secret.clone(),
            confirm_secret: state.confirm_secret.clone(),
            error_message: state.error_message.clone(),
            resend,
            confirming: state.confirming,
        }
    }

    /// True when the resend action would be enabled.
    pub fn can_resend(&self) -> bool {
        matches!(
            self.step,
            WorkflowStep::Dispatching | WorkflowStep::AwaitingCode
        ) && self.resend.remaining_seconds == 0
            && !self.resend.is_dispatching
    }

    /// Countdown label as shown next to the resend link, e.g. `00:27`.
    pub fn resend_countdown(&self) -> String {
        let secs = self.resend.remaining_seconds;
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}
