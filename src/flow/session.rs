//! Per-conversation state.

use uuid::Uuid;

use super::Phase;
use crate::error::FlowError;

/// State of one chat session. Reset wholesale on restart.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    phase: Phase,
    /// Plan name from the preference step, kept for later renders.
    selected_plan: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            phase: Phase::default(),
            selected_plan: None,
        }
    }

    /// Fresh id, first phase, nothing remembered.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selected_plan(&self) -> Option<&str> {
        self.selected_plan.as_deref()
    }

    pub fn remember_plan(&mut self, plan: impl Into<String>) {
        self.selected_plan = Some(plan.into());
    }

    /// Move to `target` if the state machine allows it.
    pub fn advance_to(&mut self, target: Phase) -> Result<Phase, FlowError> {
        if !self.phase.can_transition_to(target) {
            return Err(FlowError::InvalidTransition {
                from: self.phase,
                to: target,
            });
        }
        self.phase = target;
        Ok(target)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
