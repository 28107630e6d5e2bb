// src/settings/io.rs
use directories_next::ProjectDirs;
use std::fs;
use std::io::{self, BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::error::{HouseholdError, Result};

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "householdgen";
const APPLICATION: &str = "householdgen";
const CONFIG_FILE: &str = "app_settings.json";

/// Default settings location in the platform config directory.
pub fn default_config_path() -> io::Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION) {
        Ok(proj_dirs.config_dir().join(CONFIG_FILE))
    } else {
        Err(io::Error::new(
            ErrorKind::NotFound,
            "Could not determine project directories for settings.",
        ))
    }
}

fn resolve(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => default_config_path()
            .map_err(|e| HouseholdError::Settings(e.to_string())),
    }
}

/// Loads settings from `path`, or from the default location. A missing
/// file yields defaults; an unreadable or malformed one is an error.
pub fn load_settings_from_file<T: for<'de> serde::de::Deserialize<'de> + Default>(
    path: Option<&Path>,
) -> Result<T> {
    let config_file = resolve(path)?;
    info!("Settings: Attempting to load settings from {:?}", config_file);
    match fs::File::open(&config_file) {
        Ok(file) => {
            let reader = BufReader::new(file);
            match serde_json::from_reader(reader) {
                Ok(settings) => {
                    info!("Settings: Successfully deserialized settings.");
                    Ok(settings)
                }
                Err(e) => {
                    error!("Settings: Failed to parse settings file {:?}: {}", &config_file, e);
                    Err(HouseholdError::Settings(format!(
                        "Failed to parse settings file '{}': {}",
                        config_file.display(),
                        e
                    )))
                }
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("Settings: Settings file not found at {:?}. Returning default.", config_file);
            Ok(Default::default())
        }
        Err(e) => {
            error!("Settings: Failed to open settings file {:?}: {}", &config_file, e);
            Err(HouseholdError::Settings(format!(
                "Failed to open settings file '{}': {}",
                config_file.display(),
                e
            )))
        }
    }
}

/// Writes settings as pretty JSON, creating the parent directory. Returns
/// the path written.
pub fn save_settings_to_file<T: serde::Serialize>(settings: &T, path: Option<&Path>) -> Result<PathBuf> {
    let config_file = resolve(path)?;
    if let Some(parent) = config_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    info!("Settings: Saving settings to {:?}", config_file);
    let file = fs::File::create(&config_file).map_err(|source| HouseholdError::WriteOutput {
        path: config_file.clone(),
        source,
    })?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, settings).map_err(|source| {
        error!("Settings: Failed to serialize settings to {:?}: {}", &config_file, source);
        HouseholdError::Json {
            path: config_file.clone(),
            source,
        }
    })?;
    debug!("Settings: wrote {:?}", config_file);
    Ok(config_file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::PipelineSettings;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings: PipelineSettings =
            load_settings_from_file(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(settings, PipelineSettings::default());
    }

    #[test]
    fn test_saved_settings_load_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = PipelineSettings {
            strip_possessives: false,
            csv_delimiter: ';',
            ..Default::default()
        };
        save_settings_to_file(&settings, Some(&path)).unwrap();
        let loaded: PipelineSettings = load_settings_from_file(Some(&path)).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        let result: Result<PipelineSettings> = load_settings_from_file(Some(&path));
        assert!(matches!(result, Err(HouseholdError::Settings(_))));
    }
}
