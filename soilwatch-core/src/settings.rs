use crate::error::SoilwatchError;
use log::debug;
use soilwatch_schemas::file_formats::{Settings, SettingsFile};
use std::{fs, path::Path};

pub const SUPPORTED_SCHEMA_VERSION: &str = "1";

/// Reads a YAML settings file. Fields the file omits keep their defaults.
pub fn load_settings_file(path: &Path) -> Result<Settings, SoilwatchError> {
    let label = path.display().to_string();
    let content = fs::read_to_string(path).map_err(|e| SoilwatchError::FileIO(label.clone(), e))?;
    let settings = parse_settings(&content).map_err(|e| match e {
        SoilwatchError::YamlParsing(_, source) => SoilwatchError::YamlParsing(label.clone(), source),
        other => other,
    })?;
    debug!("Loaded settings from {}: {:?}", label, settings);
    Ok(settings)
}

pub fn parse_settings(content: &str) -> Result<Settings, SoilwatchError> {
    let file: SettingsFile = serde_yaml::from_str(content)
        .map_err(|e| SoilwatchError::YamlParsing("<inline>".to_string(), e))?;
    if file.schema_version != SUPPORTED_SCHEMA_VERSION {
        return Err(SoilwatchError::ConfigError(format!(
            "unsupported settings schema_version '{}' (expected '{}')",
            file.schema_version, SUPPORTED_SCHEMA_VERSION
        )));
    }
    Ok(file.settings)
}
