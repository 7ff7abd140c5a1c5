//! Lead capture: what a finished questionnaire leaves behind.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::rules::PlanQuote;
use crate::error::DeskError;
use crate::flow::script::{INCOME_OPTIONS, INSURANCE_OPTIONS, TIMING_OPTIONS};

/// Answers collected so far for one session.
#[derive(Debug, Clone, Default)]
pub struct LeadDraft {
    pub name: String,
    pub dob: Option<String>,
    pub age: Option<i32>,
    pub insurance: Option<u8>,
    pub timing: Option<u8>,
    pub income: Option<u8>,
    pub phone: Option<String>,
    pub plan: Option<PlanQuote>,
    pub email: Option<String>,
}

impl LeadDraft {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Close the draft into a record, mapping choice levels to labels.
    pub fn finish(&self, session_id: Uuid, interested: bool, now: DateTime<Utc>) -> LeadRecord {
        LeadRecord {
            session_id,
            name: self.name.clone(),
            dob: self.dob.clone().unwrap_or_default(),
            age: self.age,
            insurance: label(&INSURANCE_OPTIONS, self.insurance),
            timing: label(&TIMING_OPTIONS, self.timing),
            income: label(&INCOME_OPTIONS, self.income),
            phone: self.phone.clone().unwrap_or_default(),
            whatsapp_link: self
                .phone
                .as_deref()
                .map(whatsapp_link)
                .unwrap_or_default(),
            plan: self.plan.clone(),
            email: self.email.clone().unwrap_or_default(),
            interested,
            recorded_at: now,
            email_sent_at: None,
        }
    }
}

/// A finished questionnaire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub session_id: Uuid,
    pub name: String,
    pub dob: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    pub insurance: String,
    pub timing: String,
    pub income: String,
    pub phone: String,
    pub whatsapp_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanQuote>,
    pub email: String,
    pub interested: bool,
    pub recorded_at: DateTime<Utc>,
    /// When the summary e-mail went out, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_sent_at: Option<DateTime<Utc>>,
}

fn label(options: &[&str], level: Option<u8>) -> String {
    level
        .and_then(|l| options.get(usize::from(l).checked_sub(1)?))
        .map(|s| s.to_string())
        .unwrap_or_default()
}

/// `wa.me` link for a phone number, digits only.
pub fn whatsapp_link(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("https://wa.me/{digits}")
}

/// Finished leads, in memory and optionally appended to a JSON-lines file.
///
/// The file is an append-only log: a later line for the same session
/// supersedes earlier ones.
pub struct LeadStore {
    records: RwLock<Vec<LeadRecord>>,
    path: Option<PathBuf>,
}

impl LeadStore {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            path,
        }
    }

    /// Keep `record`. The in-memory copy is kept even if the file write fails.
    pub async fn record(&self, record: LeadRecord) -> Result<(), DeskError> {
        self.records.write().await.push(record.clone());
        self.append(&record).await
    }

    /// Stamp the lead for `session_id` with the time its summary e-mail was
    /// sent. Returns `false` if no such lead exists.
    pub async fn mark_email_sent(
        &self,
        session_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<bool, DeskError> {
        let updated = {
            let mut records = self.records.write().await;
            match records.iter_mut().rev().find(|r| r.session_id == session_id) {
                Some(record) => {
                    record.email_sent_at = Some(at);
                    record.clone()
                }
                None => return Ok(false),
            }
        };
        self.append(&updated).await?;
        Ok(true)
    }

    async fn append(&self, record: &LeadRecord) -> Result<(), DeskError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    pub async fn all(&self) -> Vec<LeadRecord> {
        self.records.read().await.clone()
    }
}
