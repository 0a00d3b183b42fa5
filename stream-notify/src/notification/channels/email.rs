//! Email notification channel using SMTP.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ChannelKind, DeliveryResult, NotificationChannel, split_recipients};
use crate::notification::composer::RenderedMessage;
use crate::{Error, Result};

/// Email channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// SMTP server host.
    pub server: String,
    /// SMTP login account.
    pub account: String,
    /// SMTP password or authorization code.
    pub password: String,
    /// Sender address.
    pub from: String,
    /// Sender display name.
    pub nickname: String,
    /// Recipient addresses, comma separated.
    pub to: String,
    /// SMTP port.
    pub port: u16,
    /// Implicit TLS (SMTPS). Plain SMTP when false.
    pub ssl: bool,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            account: String::new(),
            password: String::new(),
            from: String::new(),
            nickname: String::new(),
            to: String::new(),
            port: 465,
            ssl: true,
        }
    }
}

impl EmailConfig {
    pub fn is_complete(&self) -> bool {
        [&self.server, &self.account, &self.password, &self.from]
            .iter()
            .all(|v| !v.trim().is_empty())
            && !split_recipients(&self.to).is_empty()
    }

    fn sender(&self) -> Result<Mailbox> {
        let address = self
            .from
            .trim()
            .parse()
            .map_err(|e| Error::channel("Email", format!("invalid sender address: {e}")))?;
        let name = Some(self.nickname.trim().to_string()).filter(|n| !n.is_empty());
        Ok(Mailbox::new(name, address))
    }
}

/// Email notification channel.
pub struct EmailChannel {
    config: EmailConfig,
}

impl EmailChannel {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Builds the message. Recipients that fail to parse are returned separately.
    fn build_message(
        &self,
        message: &RenderedMessage,
    ) -> Result<(Message, Vec<String>, Vec<String>)> {
        let mut builder = Message::builder()
            .from(self.config.sender()?)
            .subject(message.title.clone())
            .header(ContentType::TEXT_PLAIN);

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for to in split_recipients(&self.config.to) {
            match to.parse::<Mailbox>() {
                Ok(mailbox) => {
                    builder = builder.to(mailbox);
                    accepted.push(to);
                }
                Err(e) => {
                    warn!(recipient = %to, error = %e, "Invalid email recipient");
                    rejected.push(to);
                }
            }
        }

        if accepted.is_empty() {
            return Err(Error::channel("Email", "no valid recipients"));
        }

        let email = builder
            .body(message.content.clone())
            .map_err(|e| Error::channel("Email", e.to_string()))?;
        Ok((email, accepted, rejected))
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let host = self.config.server.trim();
        let builder = if self.config.ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| Error::channel("Email", e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };
        let credentials = Credentials::new(
            self.config.account.trim().to_string(),
            self.config.password.clone(),
        );
        Ok(builder.port(self.config.port).credentials(credentials).build())
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    fn is_enabled(&self) -> bool {
        self.config.is_complete()
    }

    async fn send(&self, message: &RenderedMessage) -> Result<DeliveryResult> {
        let (email, accepted, rejected) = self.build_message(message)?;
        let mut result = DeliveryResult {
            success: Vec::new(),
            error: rejected,
        };

        match self.transport()?.send(email).await {
            Ok(_) => {
                debug!(recipients = ?accepted, "Email notification sent");
                result.success.extend(accepted);
            }
            Err(e) => {
                warn!(server = %self.config.server, error = %e, "SMTP delivery failed");
                result.error.extend(accepted);
            }
        }

        Ok(result)
    }
}
