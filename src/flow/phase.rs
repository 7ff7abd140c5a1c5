//! Questionnaire state machine: which answer the conversation waits for.

use serde::{Deserialize, Serialize};

use crate::client::Endpoint;

/// The phases of the questionnaire.
///
/// Progresses linearly: AwaitingName → AwaitingDob → AwaitingInsuranceLevel →
/// AwaitingTiming → AwaitingIncome → AwaitingPhone → AwaitingPreference →
/// AwaitingEmail → AwaitingSignup → Completed. AwaitingDob may instead jump
/// to Blocked when the processor finds the user ineligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingName,
    AwaitingDob,
    AwaitingInsuranceLevel,
    AwaitingTiming,
    AwaitingIncome,
    AwaitingPhone,
    AwaitingPreference,
    AwaitingEmail,
    AwaitingSignup,
    Blocked,
    Completed,
}

impl Phase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: Phase) -> bool {
        if target == Self::Blocked {
            return *self == Self::AwaitingDob;
        }
        self.next() == Some(target)
    }

    /// Whether only a restart can leave this phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Blocked | Self::Completed)
    }

    /// Get the next phase in the linear progression, if any.
    pub fn next(&self) -> Option<Phase> {
        use Phase::*;
        match self {
            AwaitingName => Some(AwaitingDob),
            AwaitingDob => Some(AwaitingInsuranceLevel),
            AwaitingInsuranceLevel => Some(AwaitingTiming),
            AwaitingTiming => Some(AwaitingIncome),
            AwaitingIncome => Some(AwaitingPhone),
            AwaitingPhone => Some(AwaitingPreference),
            AwaitingPreference => Some(AwaitingEmail),
            AwaitingEmail => Some(AwaitingSignup),
            AwaitingSignup => Some(Completed),
            Blocked | Completed => None,
        }
    }

    /// Endpoint that answers this phase.
    pub fn endpoint(&self) -> Option<Endpoint> {
        use Phase::*;
        match self {
            AwaitingName => Some(Endpoint::SubmitName),
            AwaitingDob => Some(Endpoint::SubmitDob),
            AwaitingInsuranceLevel => Some(Endpoint::SelectInsurance),
            AwaitingTiming => Some(Endpoint::SelectTiming),
            AwaitingIncome => Some(Endpoint::SelectIncome),
            AwaitingPhone => Some(Endpoint::SubmitPhone),
            AwaitingPreference => Some(Endpoint::SelectPreference),
            AwaitingEmail => Some(Endpoint::SubmitEmail),
            AwaitingSignup => Some(Endpoint::SelectSignup),
            Blocked | Completed => None,
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Self::AwaitingName
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AwaitingName => "awaiting_name",
            Self::AwaitingDob => "awaiting_dob",
            Self::AwaitingInsuranceLevel => "awaiting_insurance_level",
            Self::AwaitingTiming => "awaiting_timing",
            Self::AwaitingIncome => "awaiting_income",
            Self::AwaitingPhone => "awaiting_phone",
            Self::AwaitingPreference => "awaiting_preference",
            Self::AwaitingEmail => "awaiting_email",
            Self::AwaitingSignup => "awaiting_signup",
            Self::Blocked => "blocked",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}
