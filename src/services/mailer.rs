//! Outbound notification dispatch.

use async_trait::async_trait;

/// Sends account notifications out of band. The reset flow treats dispatch
/// failures as non-fatal: the stored token stays valid and the failure is
/// logged by the caller.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, reset_link: &str) -> anyhow::Result<()>;
}

/// Stand-in used when no outbound credential is configured. Every dispatch
/// fails, which surfaces in the logs without affecting responses.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send_password_reset(&self, _to: &str, _reset_link: &str) -> anyhow::Result<()> {
        anyhow::bail!("outbound mailer is not configured")
    }
}
