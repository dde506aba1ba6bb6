use async_trait::async_trait;

use crate::ports::Emailer;

/// Emailer for dev setups without a mail relay: deliveries only show up in
/// the log. The token itself is never logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmailer;

#[async_trait]
impl Emailer for LogEmailer {
    async fn send_password_reset(&self, to: &[String], host: &str, _token: &str) -> anyhow::Result<()> {
        if to.is_empty() {
            anyhow::bail!("no recipients");
        }
        tracing::info!(recipients = to.len(), host, "password reset email prepared (not sent)");
        Ok(())
    }
}
