//! Business rules of the reference step-processor.
//!
//! The chat engine never applies these; they only decide what the desk
//! answers.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::DATE_FORMAT;

pub const MIN_AGE: i32 = 18;
/// First age that is no longer served.
pub const MAX_AGE: i32 = 80;

pub const NAME_REQUIRED: &str = "Please enter your name.";
pub const DOB_FORMAT_ERROR: &str = "Please enter date in DD/MM/YYYY format.";
pub const TOO_YOUNG: &str =
    "We are sorry. This chatbot is only available for individuals aged 18 and above.";
pub const TOO_OLD: &str =
    "We are sorry. This chatbot is only available for individuals below 80 years old.";
pub const INVALID_OPTION: &str = "Please choose one of the options above.";
pub const INVALID_PHONE: &str = "Invalid Malaysia phone number.";
pub const INVALID_PLAN: &str = "Please choose one of the listed plans.";
pub const INVALID_EMAIL: &str = "Invalid email format.";

pub const TIMING_QUESTION: &str = "May I know by when do you intend to be insured?";
pub const INCOME_QUESTION: &str = "That’s awesome! What is your annual income range?";
pub const PHONE_QUESTION: &str = "Please enter your phone number so we can provide you with \
     updates from time to time on suitable offers and packages.";
pub const COMBO_EXPLAINER: &str = "<b>Let me guide you through the meaning of Perlindungan \
     Combo.</b><br><br>Perlindungan Combo is an all-in-one protection plan that includes:<br>\
     • Life Insurance<br>• Medical Card<br>• Critical Illness coverage";
pub const SIGNUP_QUESTION: &str =
    "Would you like to find out more on how you can be best protected?";
/// Where users reach a human agent.
pub const AGENT_WHATSAPP_LINK: &str = "https://wa.me/60168357258";

pub const FAREWELL: &str = "Thank you for contacting us.<br>Feel free to reach out if you would \
     like more information: <a href=\"https://wa.me/60168357258\" target=\"_blank\">Chat on \
     WhatsApp</a>";

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\+60|01)[0-9]{8,9}$").expect("valid phone regex"));

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

pub fn greeting(name: &str) -> String {
    format!("Hello {name}! I’d love to know you a little better. When is your date of birth?")
}

pub fn age_greeting(age: i32) -> String {
    format!(
        "Great, you’re {age} years old. This is a great time to plan for your protection \
         needs.<br><br>Do you currently have insurance coverage?"
    )
}

/// Outcome of the date-of-birth check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DobVerdict {
    Eligible { age: i32 },
    TooYoung,
    TooOld,
    Invalid,
}

/// Whole years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let had_birthday = (today.month(), today.day()) >= (birth.month(), birth.day());
    today.year() - birth.year() - if had_birthday { 0 } else { 1 }
}

pub fn check_dob(input: &str, today: NaiveDate) -> DobVerdict {
    let Ok(birth) = NaiveDate::parse_from_str(input.trim(), DATE_FORMAT) else {
        return DobVerdict::Invalid;
    };
    match age_on(birth, today) {
        age if age < MIN_AGE => DobVerdict::TooYoung,
        age if age >= MAX_AGE => DobVerdict::TooOld,
        age => DobVerdict::Eligible { age },
    }
}

pub fn is_valid_phone(phone: &str) -> bool {
    PHONE.is_match(phone)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// A priced plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanQuote {
    pub name: String,
    /// Monthly premium in RM.
    pub premium: u32,
    pub life: String,
    pub critical: String,
    pub medical: String,
}

pub fn plan_for_level(level: u8) -> Option<PlanQuote> {
    let (name, premium, life, critical, medical) = match level {
        1 => ("Standard", 160, "100,000", "50,000", "180,000"),
        2 => ("Basic", 160, "150,000", "75,000", "180,000"),
        3 => ("Comprehensive", 300, "200,000", "100,000", "1,000,000"),
        _ => return None,
    };
    Some(PlanQuote {
        name: name.to_string(),
        premium,
        life: life.to_string(),
        critical: critical.to_string(),
        medical: medical.to_string(),
    })
}
