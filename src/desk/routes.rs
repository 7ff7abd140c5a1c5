//! HTTP surface of the reference step-processor.
//!
//! `POST /{endpoint}` with a JSON body; the session comes from the
//! `x-quote-session` header. Every reply is a JSON object: `{message}`,
//! `{error}`, `{blocked, message}`, or the plan fields for the preference
//! step.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::leads::{LeadDraft, LeadRecord, LeadStore};
use super::mail::SummarySender;
use super::rules::{self, DobVerdict};
use crate::client::Endpoint;
use crate::client::http::SESSION_HEADER;
use crate::config::DeskConfig;
use crate::error::DeskError;

pub const MISSING_SESSION: &str = "Your session has expired. Please restart the chat.";

/// Most unfinished questionnaires held at once; the least recently touched
/// is evicted first.
pub const MAX_OPEN_DRAFTS: usize = 10_000;

/// An unfinished questionnaire and when it was last answered.
struct OpenDraft {
    draft: LeadDraft,
    touched: Instant,
}

impl OpenDraft {
    fn new(draft: LeadDraft) -> Self {
        Self {
            draft,
            touched: Instant::now(),
        }
    }
}

/// Shared state behind the routes.
pub struct Desk {
    config: DeskConfig,
    drafts: RwLock<HashMap<Uuid, OpenDraft>>,
    leads: Arc<LeadStore>,
    mailer: Option<Arc<dyn SummarySender>>,
}

impl Desk {
    pub fn new(config: DeskConfig, mailer: Option<Arc<dyn SummarySender>>) -> Self {
        let leads = Arc::new(LeadStore::new(config.leads_path.clone()));
        Self {
            config,
            drafts: RwLock::new(HashMap::new()),
            leads,
            mailer,
        }
    }

    /// Finished leads so far.
    pub async fn leads(&self) -> Vec<LeadRecord> {
        self.leads.all().await
    }

    /// Number of unfinished questionnaires held.
    pub async fn open_drafts(&self) -> usize {
        self.drafts.read().await.len()
    }

    /// Answer one step for `session`.
    pub async fn handle(&self, session: Uuid, endpoint: Endpoint, body: &Value) -> Value {
        debug!(%session, %endpoint, "Desk request");
        match endpoint {
            Endpoint::SubmitName => self.submit_name(session, body).await,
            Endpoint::SubmitDob => self.submit_dob(session, body).await,
            Endpoint::SelectInsurance => {
                self.select_level(session, body, "insurance", 4, rules::TIMING_QUESTION, |d, l| {
                    d.insurance = Some(l)
                })
                .await
            }
            Endpoint::SelectTiming => {
                self.select_level(session, body, "timing", 4, rules::INCOME_QUESTION, |d, l| {
                    d.timing = Some(l)
                })
                .await
            }
            Endpoint::SelectIncome => {
                self.select_level(session, body, "income", 4, rules::PHONE_QUESTION, |d, l| {
                    d.income = Some(l)
                })
                .await
            }
            Endpoint::SubmitPhone => self.submit_phone(session, body).await,
            Endpoint::SelectPreference => self.select_preference(session, body).await,
            Endpoint::SubmitEmail => self.submit_email(session, body).await,
            Endpoint::SelectSignup => self.select_signup(session, body).await,
        }
    }

    async fn submit_name(&self, session: Uuid, body: &Value) -> Value {
        let name = text_field(body, "name");
        if name.is_empty() {
            return error(rules::NAME_REQUIRED);
        }
        // A name starts a new questionnaire for the session.
        let mut drafts = self.drafts.write().await;
        self.prune(&mut drafts);
        drafts.insert(session, OpenDraft::new(LeadDraft::new(&name)));
        drop(drafts);
        json!({ "message": rules::greeting(&name) })
    }

    async fn submit_dob(&self, session: Uuid, body: &Value) -> Value {
        let dob = text_field(body, "dob");
        match rules::check_dob(&dob, self.config.today()) {
            DobVerdict::Invalid => error(rules::DOB_FORMAT_ERROR),
            DobVerdict::TooYoung => self.block(session, rules::TOO_YOUNG).await,
            DobVerdict::TooOld => self.block(session, rules::TOO_OLD).await,
            DobVerdict::Eligible { age } => {
                self.update(session, |d| {
                    d.dob = Some(dob.clone());
                    d.age = Some(age);
                })
                .await;
                json!({ "blocked": false, "message": rules::age_greeting(age) })
            }
        }
    }

    /// The conversation ends here, so its draft goes too.
    async fn block(&self, session: Uuid, message: &str) -> Value {
        self.drafts.write().await.remove(&session);
        json!({ "blocked": true, "message": message })
    }

    async fn select_level(
        &self,
        session: Uuid,
        body: &Value,
        key: &str,
        max: u8,
        reply: &str,
        apply: impl FnOnce(&mut LeadDraft, u8),
    ) -> Value {
        match level_field(body, key).filter(|l| (1..=max).contains(l)) {
            Some(level) => {
                self.update(session, |d| apply(d, level)).await;
                json!({ "message": reply })
            }
            None => error(rules::INVALID_OPTION),
        }
    }

    async fn submit_phone(&self, session: Uuid, body: &Value) -> Value {
        let phone = text_field(body, "phone");
        if !rules::is_valid_phone(&phone) {
            return error(rules::INVALID_PHONE);
        }
        self.update(session, |d| d.phone = Some(phone.clone())).await;
        json!({ "message": rules::COMBO_EXPLAINER })
    }

    async fn select_preference(&self, session: Uuid, body: &Value) -> Value {
        let Some(plan) = level_field(body, "level").and_then(rules::plan_for_level) else {
            return error(rules::INVALID_PLAN);
        };
        let reply = json!({
            "plan": plan.name,
            "premium": plan.premium,
            "life": plan.life,
            "critical": plan.critical,
            "medical": plan.medical,
        });
        self.update(session, |d| d.plan = Some(plan)).await;
        reply
    }

    async fn submit_email(&self, session: Uuid, body: &Value) -> Value {
        let email = text_field(body, "email");
        if !rules::is_valid_email(&email) {
            return error(rules::INVALID_EMAIL);
        }
        self.update(session, |d| d.email = Some(email.clone())).await;
        json!({ "message": rules::SIGNUP_QUESTION })
    }

    async fn select_signup(&self, session: Uuid, body: &Value) -> Value {
        let interested = body
            .get("interested")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let draft = self
            .drafts
            .write()
            .await
            .remove(&session)
            .map(|open| open.draft)
            .unwrap_or_default();
        let record = draft.finish(session, interested, Utc::now());
        info!(%session, interested, plan = ?record.plan.as_ref().map(|p| &p.name), "Lead recorded");

        if let Err(e) = self.leads.record(record.clone()).await {
            warn!(%session, "Failed to store lead: {}", e);
        }

        if let Some(mailer) = &self.mailer
            && !record.email.is_empty()
        {
            let mailer = Arc::clone(mailer);
            let leads = Arc::clone(&self.leads);
            tokio::spawn(async move {
                let session = record.session_id;
                if let Err(e) = mailer.send(&record).await {
                    warn!(%session, "Failed to send summary email: {}", e);
                    return;
                }
                if let Err(e) = leads.mark_email_sent(session, Utc::now()).await {
                    warn!(%session, "Failed to record email sent: {}", e);
                }
            });
        }

        json!({ "message": rules::FAREWELL })
    }

    async fn update(&self, session: Uuid, apply: impl FnOnce(&mut LeadDraft)) {
        let mut drafts = self.drafts.write().await;
        self.prune(&mut drafts);
        let open = drafts
            .entry(session)
            .or_insert_with(|| OpenDraft::new(LeadDraft::default()));
        open.touched = Instant::now();
        apply(&mut open.draft);
    }

    /// Drop idle drafts, then evict the stalest until there is room for one
    /// more.
    fn prune(&self, drafts: &mut HashMap<Uuid, OpenDraft>) {
        let ttl = self.config.draft_ttl;
        let before = drafts.len();
        drafts.retain(|_, open| open.touched.elapsed() < ttl);
        while drafts.len() >= MAX_OPEN_DRAFTS {
            let Some(stalest) = drafts
                .iter()
                .min_by_key(|(_, open)| open.touched)
                .map(|(id, _)| *id)
            else {
                break;
            };
            drafts.remove(&stalest);
        }
        if drafts.len() < before {
            debug!(dropped = before - drafts.len(), "Pruned open drafts");
        }
    }
}

fn error(message: &str) -> Value {
    json!({ "error": message })
}

fn text_field(body: &Value, key: &str) -> String {
    body.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// A level sent as a number or a numeric string.
fn level_field(body: &Value, key: &str) -> Option<u8> {
    match body.get(key)? {
        Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(SESSION_HEADER)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

async fn handle_step(
    State(desk): State<Arc<Desk>>,
    Path(endpoint): Path<Endpoint>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let Some(session) = session_id(&headers) else {
        warn!(%endpoint, "Desk request without session header");
        return Json(error(MISSING_SESSION));
    };
    Json(desk.handle(session, endpoint, &body).await)
}

/// Build the step routes.
pub fn desk_routes(desk: Arc<Desk>) -> Router {
    Router::new()
        .route("/{endpoint}", post(handle_step))
        .with_state(desk)
}

/// Serve the desk until the process ends.
pub async fn serve(desk: Arc<Desk>, port: u16) -> Result<(), DeskError> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| DeskError::Bind {
            port,
            reason: e.to_string(),
        })?;
    info!(port, "Desk listening");
    axum::serve(listener, desk_routes(desk))
        .await
        .map_err(|e| DeskError::Serve(e.to_string()))
}
