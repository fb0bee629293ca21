use anyhow::{Context, Result};
use clap::Args;
use soilwatch_core::settings::load_settings_file;
use soilwatch_schemas::file_formats::{AbsorbPolicy, Settings};
use std::path::Path;

/// Loads settings from a YAML file, or returns the defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    println!("Loading settings from '{}'...", path.display());
    load_settings_file(path).with_context(|| format!("Failed to load settings file: {:?}", path))
}

/// Command-line overrides layered over the settings file.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    /// Feed endpoint returning the JSON array of readings
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Seconds between poll cycles
    #[arg(long)]
    pub interval: Option<u64>,

    /// Directory for exports and chart images
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Absorb at most one new reading per poll cycle
    #[arg(long)]
    pub one_per_cycle: bool,

    /// Render dates and times at this UTC offset, in minutes
    #[arg(long, allow_hyphen_values = true)]
    pub utc_offset_minutes: Option<i32>,
}

impl Overrides {
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(endpoint) = &self.endpoint {
            settings.endpoint = endpoint.clone();
        }
        if let Some(interval) = self.interval {
            settings.poll_interval_secs = interval;
        }
        if let Some(dir) = &self.output_dir {
            settings.output_dir = dir.clone();
        }
        if self.one_per_cycle {
            settings.absorb_policy = AbsorbPolicy::OnePerCycle;
        }
        if self.utc_offset_minutes.is_some() {
            settings.utc_offset_minutes = self.utc_offset_minutes;
        }
        settings
    }
}
