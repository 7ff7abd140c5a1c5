//! Input surface: the single place the user can answer from.
//!
//! At any time the surface holds exactly one configuration: a text prompt,
//! a set of option buttons, or the terminal restart button. Showing a new
//! configuration replaces the old one, and accepting an answer locks the
//! surface until the engine presents the next one.

use std::sync::Arc;

use serde::Serialize;

use super::{ChatView, NullView};

/// Locked prompt shown beneath option buttons.
pub const OPTIONS_HINT: &str = "Please select an option above";

/// Label of the terminal restart button.
pub const RESTART_LABEL: &str = "Restart Again";

/// What the surface currently offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SurfaceConfig {
    Text { placeholder: String },
    Options { labels: Vec<String> },
    Terminal,
}

/// An accepted answer, ready for the conversation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// Trimmed free text.
    Text(String),
    /// 1-based position of the chosen option, with its label.
    Choice { position: usize, label: String },
}

impl Answer {
    /// What gets echoed into the transcript as the user's message.
    pub fn echo(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Choice { label, .. } => label,
        }
    }
}

pub struct InputSurface {
    config: Option<SurfaceConfig>,
    live: bool,
    view: Arc<dyn ChatView>,
}

impl InputSurface {
    pub fn new(view: Arc<dyn ChatView>) -> Self {
        Self {
            config: None,
            live: false,
            view,
        }
    }

    pub fn show_text_prompt(&mut self, placeholder: &str) {
        self.replace(SurfaceConfig::Text {
            placeholder: placeholder.to_string(),
        });
    }

    pub fn show_options<S: AsRef<str>>(&mut self, labels: &[S]) {
        self.replace(SurfaceConfig::Options {
            labels: labels.iter().map(|l| l.as_ref().to_string()).collect(),
        });
    }

    pub fn show_terminal(&mut self) {
        self.replace(SurfaceConfig::Terminal);
    }

    /// Disable every affordance. Idempotent.
    pub fn lock(&mut self) {
        if self.live {
            self.live = false;
            self.view.surface_changed(self);
        }
    }

    pub fn config(&self) -> Option<&SurfaceConfig> {
        self.config.as_ref()
    }

    /// Whether the surface accepts input right now.
    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Submit the text field.
    ///
    /// Blank input is ignored without locking; anything else locks the
    /// surface and is handed back trimmed.
    pub fn submit_text(&mut self, raw: &str) -> Option<Answer> {
        if !self.live || !matches!(self.config, Some(SurfaceConfig::Text { .. })) {
            return None;
        }
        let value = raw.trim();
        if value.is_empty() {
            return None;
        }
        self.lock();
        Some(Answer::Text(value.to_string()))
    }

    /// Activate the option at 1-based `position`.
    ///
    /// Only the first activation counts; later ones hit a locked surface.
    pub fn select(&mut self, position: usize) -> Option<Answer> {
        if !self.live {
            return None;
        }
        let label = match &self.config {
            Some(SurfaceConfig::Options { labels }) if position >= 1 => {
                labels.get(position - 1)?.clone()
            }
            _ => return None,
        };
        self.lock();
        Some(Answer::Choice { position, label })
    }

    /// Press the restart button. Returns whether the press was accepted.
    pub fn activate_restart(&mut self) -> bool {
        if !self.live || self.config != Some(SurfaceConfig::Terminal) {
            return false;
        }
        self.lock();
        true
    }

    fn replace(&mut self, config: SurfaceConfig) {
        self.config = Some(config);
        self.live = true;
        self.view.surface_changed(self);
    }
}

impl Default for InputSurface {
    fn default() -> Self {
        Self::new(Arc::new(NullView))
    }
}
