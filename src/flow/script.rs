//! The fixed questionnaire script: prompts, answer payloads, transitions and
//! the bot messages each successful step renders.

use std::time::Duration;

use serde_json::{Value, json};

use super::{Phase, Session};
use crate::chat::{Answer, Message, RenderQueue, Staged};
use crate::client::{StepReply, StepResponse};

pub const WELCOME: &str = "Welcome to KKMJP Superagent. I’m Lulu, and I’ll guide you through \
     Perlindungan Combo Insurance.<br>May I know your name?";

pub const INSURANCE_OPTIONS: [&str; 4] = [
    "No coverage at all",
    "Basic employee coverage",
    "Some personal coverage",
    "Comprehensive coverage",
];

pub const TIMING_OPTIONS: [&str; 4] = ["3 months", "6 months", "9 months", "12 months"];

pub const INCOME_OPTIONS: [&str; 4] = [
    "Less than RM 20,000",
    "RM 20,001 - RM 40,000",
    "RM 40,001 - RM 60,000",
    "More than RM 60,000",
];

pub const PREFERENCE_OPTIONS: [&str; 3] = ["Standard", "Basic", "Comprehensive"];

pub const SIGNUP_OPTIONS: [&str; 2] = ["Yes", "No"];

pub const PLAN_QUESTION: &str = "May I know which level of protection do you want?";

pub const EMAIL_REQUEST: &str = "Please type your email address, we will send you an email \
     summary of our conversation for your reference.";

pub const SIGNUP_CONFIRMATION: &str = "Great! Thank you for signing up. We will contact you soon.<br>\
     <i>Subject to terms and conditions of approved policy after recommendation by authorised \
     representatives.</i>";

const PLAN_QUESTION_DELAY: Duration = Duration::from_millis(600);
const BREAKDOWN_DELAY: Duration = Duration::from_millis(500);
const EMAIL_REQUEST_DELAY: Duration = Duration::from_millis(500);

/// How a phase is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    FreeText { placeholder: &'static str },
    SingleChoice { options: &'static [&'static str] },
    /// Nothing left to answer; offer a restart.
    Restart,
}

pub fn prompt(phase: Phase) -> Prompt {
    use Phase::*;
    match phase {
        AwaitingName => Prompt::FreeText {
            placeholder: "Enter your name",
        },
        AwaitingDob => Prompt::FreeText {
            placeholder: "DD/MM/YYYY",
        },
        AwaitingInsuranceLevel => Prompt::SingleChoice {
            options: &INSURANCE_OPTIONS,
        },
        AwaitingTiming => Prompt::SingleChoice {
            options: &TIMING_OPTIONS,
        },
        AwaitingIncome => Prompt::SingleChoice {
            options: &INCOME_OPTIONS,
        },
        AwaitingPhone => Prompt::FreeText {
            placeholder: "Enter phone number",
        },
        AwaitingPreference => Prompt::SingleChoice {
            options: &PREFERENCE_OPTIONS,
        },
        AwaitingEmail => Prompt::FreeText {
            placeholder: "Enter your email",
        },
        AwaitingSignup => Prompt::SingleChoice {
            options: &SIGNUP_OPTIONS,
        },
        Blocked | Completed => Prompt::Restart,
    }
}

/// Request body for answering `phase`. `None` when the answer has the wrong
/// shape for the phase (text for a choice, or the reverse).
pub fn payload(phase: Phase, answer: &Answer) -> Option<Value> {
    use Phase::*;
    match (phase, answer) {
        (AwaitingName, Answer::Text(name)) => Some(json!({ "name": name })),
        (AwaitingDob, Answer::Text(dob)) => Some(json!({ "dob": dob })),
        (AwaitingPhone, Answer::Text(phone)) => Some(json!({ "phone": phone })),
        (AwaitingEmail, Answer::Text(email)) => Some(json!({ "email": email })),
        (AwaitingInsuranceLevel, Answer::Choice { position, .. }) => {
            Some(json!({ "insurance": position }))
        }
        (AwaitingTiming, Answer::Choice { position, .. }) => Some(json!({ "timing": position })),
        (AwaitingIncome, Answer::Choice { position, .. }) => Some(json!({ "income": position })),
        (AwaitingPreference, Answer::Choice { position, .. }) => Some(json!({ "level": position })),
        (AwaitingSignup, Answer::Choice { position, .. }) => {
            Some(json!({ "interested": *position == 1 }))
        }
        _ => None,
    }
}

/// Where a response moves the conversation. `None` keeps the current phase.
pub fn transition(phase: Phase, response: &StepResponse) -> Option<Phase> {
    match response {
        StepResponse::Ok(_) => phase.next(),
        StepResponse::Blocked(_) => (phase == Phase::AwaitingDob).then_some(Phase::Blocked),
        StepResponse::Error(_) => None,
    }
}

/// Bot messages rendered after a successful answer to `phase`, in order.
pub fn follow_ups(phase: Phase, reply: &StepReply, session: &Session) -> RenderQueue {
    let mut queue = RenderQueue::new();

    if phase == Phase::AwaitingSignup {
        queue.push(Staged::now(Message::bot(SIGNUP_CONFIRMATION)));
    }

    if let Some(message) = &reply.message {
        queue.push(Staged::now(Message::bot(message.clone())));
    }

    match phase {
        Phase::AwaitingPhone => {
            queue.push(Staged::after(PLAN_QUESTION_DELAY, Message::bot(PLAN_QUESTION)));
        }
        Phase::AwaitingPreference => {
            let plan = session
                .selected_plan()
                .map(String::from)
                .or_else(|| reply.field_text("plan"))
                .unwrap_or_default();
            queue.push(Staged::now(Message::bot(format!(
                "Nice choice! The <b>{plan}</b> plan helps support your health and peace of mind."
            ))));
            queue.push(Staged::after(BREAKDOWN_DELAY, Message::bot(premium_breakdown(reply))));
            queue.push(Staged::after(EMAIL_REQUEST_DELAY, Message::bot(EMAIL_REQUEST)));
        }
        _ => {}
    }

    queue
}

fn premium_breakdown(reply: &StepReply) -> String {
    let field = |key: &str| reply.field_text(key).unwrap_or_else(|| "-".to_string());
    format!(
        "<b>Your estimated monthly premium is RM {}</b><br><br>\
         • Life: RM {}<br>\
         • Critical Illness: RM {}<br>\
         • Medical Card: RM {}",
        field("premium"),
        field("life"),
        field("critical"),
        field("medical"),
    )
}
