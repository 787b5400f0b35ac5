use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Installation wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub torq_uuid: Uuid,
    pub preferred_timezone: String,
    pub default_date_range: String,
    pub default_language: String,
    pub week_starts_on: String,
    /// Base URL of the block-explorer service.
    pub vector_url: String,
    /// Version string reported to external services.
    pub torq_version: String,
}

impl Settings {
    pub const DEFAULT_VECTOR_URL: &'static str = "https://vector.ln.capital/";
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            torq_uuid: Uuid::nil(),
            preferred_timezone: "UTC".into(),
            default_date_range: "last7days".into(),
            default_language: "en".into(),
            week_starts_on: "monday".into(),
            vector_url: Self::DEFAULT_VECTOR_URL.into(),
            torq_version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}
