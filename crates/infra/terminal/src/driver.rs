//! Drives an [`OtpWorkflow`] from terminal input until it succeeds or the
//! user gives up.

use bikego_email_otp::{OtpWorkflow, StepOutcome, WorkflowStep};
use std::io::Write;
use tokio::io::AsyncRead;
use tracing::debug;

use crate::console::Console;
use crate::CliError;

const QUIT: &str = "quit";

/// Runs the workflow to `Succeeded`.
///
/// Returns [`CliError::Aborted`] when input ends or the user types `quit`;
/// the workflow is cancelled in that case.
pub async fn drive<R, W>(workflow: &OtpWorkflow, console: &mut Console<R, W>) -> Result<(), CliError>
where
    R: AsyncRead + Unpin,
    W: Write,
{
    loop {
        let snapshot = workflow.snapshot();
        if let Some(message) = &snapshot.error_message {
            console.say(&format!("! {message}"))?;
        }

        let outcome = match snapshot.step {
            WorkflowStep::Succeeded => return Ok(()),
            WorkflowStep::Dispatching => {
                let label = "Press enter to send the code again, or type 'quit'";
                let Some(_) = answer(workflow, console, label).await? else {
                    return Err(CliError::Aborted);
                };
                workflow.dispatch().await
            }
            WorkflowStep::AwaitingCode => {
                let label = format!(
                    "Enter the {}-digit code sent to {} ('resend', 'quit')",
                    snapshot.code.len(),
                    workflow.identity()
                );
                let Some(line) = answer(workflow, console, &label).await? else {
                    return Err(CliError::Aborted);
                };
                if line == "resend" {
                    let outcome = workflow.resend().await;
                    match outcome {
                        StepOutcome::Accepted(_) => console.say("A new code is on its way.")?,
                        StepOutcome::Ignored => console.say(&format!(
                            "You can request a new code in {}.",
                            workflow.snapshot().resend_countdown()
                        ))?,
                        _ => {}
                    }
                    outcome
                } else if workflow.handle_paste(&line) {
                    workflow.submit_code().await
                } else {
                    console.say("Digits only, please.")?;
                    continue;
                }
            }
            WorkflowStep::AwaitingNewSecret => {
                let Some(secret) = answer(workflow, console, "New password ('back', 'quit')").await?
                else {
                    return Err(CliError::Aborted);
                };
                if secret == "back" {
                    workflow.back_to_code();
                    continue;
                }
                workflow.set_new_secret(secret);
                let Some(confirm) = answer(workflow, console, "Confirm new password").await? else {
                    return Err(CliError::Aborted);
                };
                workflow.set_confirm_secret(confirm);
                workflow.submit_new_secret().await
            }
        };

        debug!(workflow_id = %workflow.id(), step = %workflow.step(), "terminal action handled");
        if outcome == StepOutcome::Discarded {
            return Err(CliError::Aborted);
        }
    }
}

async fn answer<R, W>(
    workflow: &OtpWorkflow,
    console: &mut Console<R, W>,
    label: &str,
) -> Result<Option<String>, CliError>
where
    R: AsyncRead + Unpin,
    W: Write,
{
    match console.ask(label).await? {
        Some(line) if line != QUIT => Ok(Some(line)),
        _ => {
            workflow.cancel();
            Ok(None)
        }
    }
}
