//! Code for loading program settings.
use crate::get_times2lca_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use crate::times::GlobalWarmingPotentials;
use anyhow::{Context, Result, ensure};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# This file contains the program settings for times2lca.
# Uncomment a setting to change its value.
";

/// Default log level for program
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_ch4_gwp() -> f64 {
    GlobalWarmingPotentials::default().ch4
}

fn default_n2o_gwp() -> f64 {
    GlobalWarmingPotentials::default().n2o
}

fn default_screening_cutoff() -> f64 {
    0.95
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    let mut path = get_times2lca_config_dir();
    path.push(SETTINGS_FILE_NAME);

    path
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Global warming potential of methane (CO2 = 1)
    #[serde(default = "default_ch4_gwp")]
    pub ch4_gwp: f64,
    /// Global warming potential of nitrous oxide (CO2 = 1)
    #[serde(default = "default_n2o_gwp")]
    pub n2o_gwp: f64,
    /// Proportion of the change in emissions covered when screening processes
    #[serde(default = "default_screening_cutoff")]
    pub screening_cutoff: f64,
    /// Whether to overwrite output folders by default
    #[serde(default)]
    pub overwrite: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            ch4_gwp: default_ch4_gwp(),
            n2o_gwp: default_n2o_gwp(),
            screening_cutoff: default_screening_cutoff(),
            overwrite: false,
        }
    }
}

impl Settings {
    /// Read the contents of the settings file from the user's config folder.
    ///
    /// If the file is not present, default values for settings will be used
    ///
    /// # Returns
    ///
    /// The program settings as a `Settings` struct or an error if the file is invalid
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read from the specified path, using defaults if the file doesn't exist
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        settings.validate()?;

        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        for (name, gwp) in [("ch4_gwp", self.ch4_gwp), ("n2o_gwp", self.n2o_gwp)] {
            ensure!(
                gwp.is_finite() && gwp > 0.0,
                "{name} must be a finite, positive number"
            );
        }
        ensure!(
            self.screening_cutoff.is_finite() && self.screening_cutoff > 0.0,
            "screening_cutoff must be a finite, positive number"
        );

        Ok(())
    }

    /// The global warming potentials to use for CO2-equivalent calculations
    pub fn gwp(&self) -> GlobalWarmingPotentials {
        GlobalWarmingPotentials {
            ch4: self.ch4_gwp,
            n2o: self.n2o_gwp,
        }
    }

    /// The contents of the default settings file
    pub fn default_file_contents() -> Result<String> {
        // Convert to TOML
        let settings_raw =
            toml::to_string(&Settings::default()).context("Could not convert settings to TOML")?;

        // Iterate through the generated TOML, commenting out lines and adding docs
        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in settings_raw.lines() {
            let Some((field, _)) = line.split_once('=') else {
                continue;
            };

            // Use doc comment to document parameter
            let docs = Settings::get_field_docs(field.trim())
                .with_context(|| format!("Missing doc comment for field {}", field.trim()))?;
            for doc_line in docs.lines() {
                write!(&mut out, "\n# # {}\n", doc_line.trim())?;
            }
            writeln!(&mut out, "# {}", line.trim())?;
        }

        Ok(out)
    }
}
