//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;

use crate::error::ConfigError;

/// Default step-processor location (the desk's default bind).
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";

/// How long an unfinished questionnaire is kept at the desk.
pub const DEFAULT_DRAFT_TTL: Duration = Duration::from_secs(30 * 60);

/// Date format shared by the date-of-birth step and `QUOTE_DESK_TODAY`.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Chat-side configuration.
#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Base URL of the step-processor; endpoints are joined onto it.
    pub backend_url: String,
    /// Whether staged follow-up messages wait out their delays.
    pub pacing: bool,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            pacing: true,
        }
    }
}

impl WizardConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Self {
        let backend_url = std::env::var("QUOTE_WIZARD_BACKEND_URL")
            .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());

        let pacing = std::env::var("QUOTE_WIZARD_PACING")
            .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "off" | "0" | "false"))
            .unwrap_or(true);

        Self {
            backend_url,
            pacing,
        }
    }
}

/// Reference step-processor configuration.
#[derive(Debug, Clone)]
pub struct DeskConfig {
    pub port: u16,
    /// JSON-lines file that finished leads are appended to.
    pub leads_path: Option<PathBuf>,
    /// Fixed "today" for age computation. `None` uses the local date.
    pub today: Option<NaiveDate>,
    /// Unfinished questionnaires idle longer than this are dropped.
    pub draft_ttl: Duration,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            leads_path: None,
            today: None,
            draft_ttl: DEFAULT_DRAFT_TTL,
        }
    }
}

impl DeskConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("QUOTE_DESK_PORT") {
            Ok(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "QUOTE_DESK_PORT".to_string(),
                message: format!("{raw:?}: {e}"),
            })?,
            Err(_) => 5000,
        };

        let leads_path = std::env::var("QUOTE_DESK_LEADS_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let today = match std::env::var("QUOTE_DESK_TODAY") {
            Ok(raw) => Some(NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| {
                ConfigError::InvalidValue {
                    key: "QUOTE_DESK_TODAY".to_string(),
                    message: format!("{raw:?}: {e}"),
                }
            })?),
            Err(_) => None,
        };

        let draft_ttl = match std::env::var("QUOTE_DESK_DRAFT_TTL_SECS") {
            Ok(raw) => Duration::from_secs(raw.trim().parse().map_err(|e| {
                ConfigError::InvalidValue {
                    key: "QUOTE_DESK_DRAFT_TTL_SECS".to_string(),
                    message: format!("{raw:?}: {e}"),
                }
            })?),
            Err(_) => DEFAULT_DRAFT_TTL,
        };

        Ok(Self {
            port,
            leads_path,
            today,
            draft_ttl,
        })
    }

    /// The date ages are computed against.
    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}
