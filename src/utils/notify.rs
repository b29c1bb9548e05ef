// src/utils/notify.rs

use async_trait::async_trait;

use crate::error::AppError;

/// Dispatch seam for signup notifications. Actual delivery transport
/// (email, SMS) lives outside this service; implementations only need to
/// hand the code off.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_confirmation_code(
        &self,
        username: &str,
        email: &str,
        code: &str,
    ) -> Result<(), AppError>;
}

/// Default notifier: writes the dispatch to the log. Good enough for
/// development and for deployments where an external relay tails the log.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send_confirmation_code(
        &self,
        username: &str,
        email: &str,
        code: &str,
    ) -> Result<(), AppError> {
        tracing::info!(
            "confirmation code for user '{}' <{}>: {}",
            username,
            email,
            code
        );
        Ok(())
    }
}
