use std::path::{Path, PathBuf};

use rollcall_roster::ColumnMap;
use serde::Deserialize;
use thiserror::Error;

const DETECTOR_MODEL: &str = "det_10g.onnx";
const EMBEDDER_MODEL: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("configuration issues found:\n- {}", .0.join("\n- "))]
    Invalid(Vec<String>),
}

/// Application configuration, loaded from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub auth: AuthConfig,
    pub roster: RosterConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub camera: CameraConfig,
}

#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// Path to the service-account JSON key.
    pub credentials_file: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct RosterConfig {
    /// Spreadsheet id from the sheet URL. Preferred over `sheet_name`.
    pub sheet_id: Option<String>,
    /// Document name, resolved through Drive when `sheet_id` is unset.
    pub sheet_name: Option<String>,
    #[serde(default = "default_worksheet")]
    pub worksheet: String,
    pub columns: ColumnsConfig,
}

/// Header names in row 1 of the worksheet. `name` and `image_url` are
/// required; the rest are optional metadata columns.
#[derive(Debug, Deserialize)]
pub struct ColumnsConfig {
    pub name: String,
    pub image_url: String,
    pub gender: Option<String>,
    pub college: Option<String>,
    pub studying: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Maximum embedding distance for a match. Lower is stricter.
    pub tolerance: f32,
    /// Frame downscale factor before detection. 0.25 processes 1/16 of
    /// the pixels.
    pub resize_factor: f64,
    /// Directory holding the ONNX model files.
    pub model_dir: PathBuf,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.55,
            resize_factor: 0.25,
            model_dir: PathBuf::from("models"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index: i32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self { index: 0 }
    }
}

fn default_worksheet() -> String {
    "Sheet1".to_string()
}

impl Config {
    /// Read, parse, and validate the config file. All validation problems
    /// are collected and reported together before any work begins.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&raw)?;
        config.validate()?;
        Ok(config)
    }

    fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();

        if !self.auth.credentials_file.exists() {
            issues.push(format!(
                "credentials file {} not found",
                self.auth.credentials_file.display()
            ));
        }

        let blank = |s: &Option<String>| s.as_deref().map_or(true, |v| v.trim().is_empty());
        if blank(&self.roster.sheet_id) && blank(&self.roster.sheet_name) {
            issues.push("set roster.sheet_id or roster.sheet_name".to_string());
        }

        if self.roster.columns.name.trim().is_empty() {
            issues.push("roster.columns.name must not be blank".to_string());
        }
        if self.roster.columns.image_url.trim().is_empty() {
            issues.push("roster.columns.image_url must not be blank".to_string());
        }

        if self.recognition.tolerance <= 0.0 {
            issues.push("recognition.tolerance must be positive".to_string());
        }
        if self.recognition.resize_factor <= 0.0 || self.recognition.resize_factor > 1.0 {
            issues.push("recognition.resize_factor must be in (0, 1]".to_string());
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }

    pub fn detector_model_path(&self) -> String {
        self.recognition
            .model_dir
            .join(DETECTOR_MODEL)
            .to_string_lossy()
            .into_owned()
    }

    pub fn embedder_model_path(&self) -> String {
        self.recognition
            .model_dir
            .join(EMBEDDER_MODEL)
            .to_string_lossy()
            .into_owned()
    }

    pub fn column_map(&self) -> ColumnMap {
        ColumnMap {
            name: self.roster.columns.name.clone(),
            image_url: self.roster.columns.image_url.clone(),
            gender: self.roster.columns.gender.clone(),
            college: self.roster.columns.college.clone(),
            studying: self.roster.columns.studying.clone(),
            branch: self.roster.columns.branch.clone(),
        }
    }
}
