use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::services::mailer::Mailer;

const SENDGRID_API: &str = "https://api.sendgrid.com/v3";

pub struct SendGridClient {
    client: Client,
    api_key: String,
    from_email: String,
    from_name: String,
}

impl SendGridClient {
    pub fn new(api_key: String, from_email: String, from_name: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("esprelay/1.0")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build SendGrid HTTP client: {e}"))?;

        Ok(Self {
            client,
            api_key,
            from_email,
            from_name,
        })
    }
}

#[async_trait]
impl Mailer for SendGridClient {
    async fn send_password_reset(&self, to: &str, reset_link: &str) -> Result<()> {
        let body = json!({
            "personalizations": [{ "to": [{ "email": to }] }],
            "from": { "email": self.from_email, "name": self.from_name },
            "subject": "Password Reset Request",
            "content": [
                {
                    "type": "text/plain",
                    "value": format!("Click the following link to reset your password: {reset_link}"),
                },
                {
                    "type": "text/html",
                    "value": format!(
                        "<p>Click the following link to reset your password:</p>\
                         <p><a href=\"{reset_link}\">Reset Password</a></p>"
                    ),
                },
            ],
        });

        let response = self
            .client
            .post(format!("{SENDGRID_API}/mail/send"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("SendGrid rejected the message ({status}): {detail}");
        }

        tracing::debug!("reset email dispatched");
        Ok(())
    }
}
