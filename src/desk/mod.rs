//! Reference step-processor ("desk").
//!
//! Implements the nine step endpoints with the eligibility, contact and
//! pricing rules, and records finished questionnaires as leads. The chat
//! side treats it as an opaque backend; run it with `quote-wizard serve`.

pub mod leads;
pub mod mail;
pub mod routes;
pub mod rules;

pub use leads::{LeadDraft, LeadRecord, LeadStore};
pub use mail::{MailConfig, SummaryMailer, SummarySender};
pub use routes::{Desk, desk_routes, serve};
pub use rules::{DobVerdict, PlanQuote};
