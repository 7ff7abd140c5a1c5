//! Summary e-mail sent when a lead is recorded. SMTP via lettre.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};

use super::leads::LeadRecord;
use super::rules::AGENT_WHATSAPP_LINK;
use crate::error::MailError;

pub const SUBJECT: &str = "Your Insurance Chat Summary – KKMJP Superagent";

/// SMTP settings, built from environment variables.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
}

impl MailConfig {
    /// Returns `None` if `QUOTE_DESK_SMTP_HOST` is not set (mail disabled).
    pub fn from_env() -> Option<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build from any variable source; `from_env` reads the process env.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let smtp_host = var("QUOTE_DESK_SMTP_HOST").filter(|h| !h.trim().is_empty())?;

        let smtp_port: u16 = var("QUOTE_DESK_SMTP_PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(587);

        let username = var("QUOTE_DESK_SMTP_USERNAME").unwrap_or_default();
        let password = SecretString::from(var("QUOTE_DESK_SMTP_PASSWORD").unwrap_or_default());
        let from_address = var("QUOTE_DESK_SMTP_FROM").unwrap_or_else(|| username.clone());

        Some(Self {
            smtp_host,
            smtp_port,
            username,
            password,
            from_address,
        })
    }
}

/// Plain-text summary of what the user told us.
pub fn summary_body(record: &LeadRecord) -> String {
    let mut lines = vec![
        format!("Hi {},", record.name),
        String::new(),
        "Thank you for chatting with KKMJP Superagent! Here is a quick summary of what you \
         shared, so you can review it anytime."
            .to_string(),
        String::new(),
    ];

    if let Some(plan) = &record.plan {
        lines.push(format!("Your estimated monthly premium is RM {}", plan.premium));
        lines.push(format!("  • Life: RM {}", plan.life));
        lines.push(format!("  • Critical Illness: RM {}", plan.critical));
        lines.push(format!("  • Medical Card: RM {}", plan.medical));
        lines.push(String::new());
    }

    let age = record
        .age
        .map(|a| format!(" (Age: {a})"))
        .unwrap_or_default();
    lines.push(format!("Date of Birth:      {}{}", record.dob, age));
    lines.push(format!("Coverage Interest:  {}", record.insurance));
    lines.push(format!("Preferred Timing:   {}", record.timing));
    lines.push(format!("Income Range:       {}", record.income));
    lines.push(format!("Phone:              {}", record.phone));
    lines.push(format!("Email:              {}", record.email));
    lines.push(format!(
        "Selected Plan:      {}",
        record.plan.as_ref().map(|p| p.name.as_str()).unwrap_or("-")
    ));
    lines.push(String::new());
    lines.push(format!("Chat with a real agent on WhatsApp: {AGENT_WHATSAPP_LINK}"));
    lines.push(
        "If you have any questions at all, just reply on WhatsApp and we will help you out."
            .to_string(),
    );
    lines.push(String::new());
    lines.push("Warm regards,".to_string());
    lines.push("KKMJP Superagent Team".to_string());

    lines.join("\n")
}

/// Delivers the summary for a finished lead.
#[async_trait]
pub trait SummarySender: Send + Sync {
    async fn send(&self, record: &LeadRecord) -> Result<(), MailError>;
}

pub struct SummaryMailer {
    config: MailConfig,
}

impl SummaryMailer {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn build(&self, record: &LeadRecord) -> Result<Message, MailError> {
        Message::builder()
            .from(self.config.from_address.parse().map_err(|e| {
                MailError::InvalidAddress {
                    address: self.config.from_address.clone(),
                    reason: format!("{e}"),
                }
            })?)
            .to(record.email.parse().map_err(|e| MailError::InvalidAddress {
                address: record.email.clone(),
                reason: format!("{e}"),
            })?)
            .subject(SUBJECT)
            .body(summary_body(record))
            .map_err(|e| MailError::Build(e.to_string()))
    }
}

#[async_trait]
impl SummarySender for SummaryMailer {
    /// Send the summary for `record` to the address it carries.
    async fn send(&self, record: &LeadRecord) -> Result<(), MailError> {
        let email = self.build(record)?;
        let config = self.config.clone();
        let to = record.email.clone();

        tokio::task::spawn_blocking(move || {
            let creds = Credentials::new(
                config.username.clone(),
                config.password.expose_secret().to_string(),
            );
            let transport = SmtpTransport::starttls_relay(&config.smtp_host)
                .map_err(|e| MailError::Send(format!("SMTP relay error: {e}")))?
                .port(config.smtp_port)
                .credentials(creds)
                .build();
            transport
                .send(&email)
                .map_err(|e| MailError::Send(e.to_string()))?;
            tracing::info!("Summary email sent to {to}");
            Ok::<(), MailError>(())
        })
        .await
        .map_err(|e| MailError::Send(format!("mail task failed: {e}")))?
    }
}
