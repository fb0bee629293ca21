use serde::{Deserialize, Serialize};

/// How many new feed entries a single poll cycle may absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsorbPolicy {
    /// Absorb every entry past the cursor in one cycle.
    #[default]
    WholeSuffix,
    /// Absorb at most one entry per cycle, however many arrived.
    OnePerCycle,
}

/// Runtime settings of a dashboard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub endpoint: String,
    pub poll_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub absorb_policy: AbsorbPolicy,
    pub table_rows: usize,
    pub page_size: usize,
    /// Offset used when rendering dates and times. `None` uses the host's local offset.
    pub utc_offset_minutes: Option<i32>,
    pub output_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            poll_interval_secs: 10,
            fetch_timeout_secs: 8,
            absorb_policy: AbsorbPolicy::WholeSuffix,
            table_rows: 10,
            page_size: 10,
            utc_offset_minutes: None,
            output_dir: "./data/exports".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SettingsFile {
    pub schema_version: String,
    pub settings: Settings,
}
