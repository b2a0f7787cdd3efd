//! Closure-backed [`OtpBackend`].

use async_trait::async_trait;
use bikego_core::{ClientResult, ConfirmPayload, OtpBackend};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for the request-code callback.
pub type RequestCodeFn =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = ClientResult<()>> + Send>> + Send + Sync>;

/// Type alias for the confirm-action callback.
pub type ConfirmActionFn = Arc<
    dyn Fn(String, String, Option<ConfirmPayload>) -> Pin<Box<dyn Future<Output = ClientResult<()>> + Send>>
        + Send
        + Sync,
>;

/// An [`OtpBackend`] assembled from two async closures.
#[derive(Clone)]
pub struct OtpCallbacks {
    request_code: RequestCodeFn,
    confirm_action: ConfirmActionFn,
}

impl OtpCallbacks {
    /// Binds the two operations.
    pub fn new<R, RFut, C, CFut>(request_code: R, confirm_action: C) -> Self
    where
        R: Fn(String) -> RFut + Send + Sync + 'static,
        RFut: Future<Output = ClientResult<()>> + Send + 'static,
        C: Fn(String, String, Option<ConfirmPayload>) -> CFut + Send + Sync + 'static,
        CFut: Future<Output = ClientResult<()>> + Send + 'static,
    {
        Self {
            request_code: Arc::new(move |identity| Box::pin(request_code(identity))),
            confirm_action: Arc::new(move |identity, code, payload| {
                Box::pin(confirm_action(identity, code, payload))
            }),
        }
    }
}

#[async_trait]
impl OtpBackend for OtpCallbacks {
    async fn request_code(&self, identity: &str) -> ClientResult<()> {
        (self.request_code)(identity.to_string()).await
    }

    async fn confirm_action(
        &self,
        identity: &str,
        code: &str,
        payload: Option<ConfirmPayload>,
    ) -> ClientResult<()> {
        (self.confirm_action)(identity.to_string(), code.to_string(), payload).await
    }
}

impl std::fmt::Debug for OtpCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtpCallbacks").finish_non_exhaustive()
    }
}
