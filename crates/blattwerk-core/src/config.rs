// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Tool configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BlattwerkError, Result};

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV_VAR: &str = "BLATTWERK_CONFIG";

/// Settings shared by all tools. Every field has a default, so a config file
/// only needs the keys it wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// JPEG encoder quality (1-100) for extracted images.
    pub jpeg_quality: u8,
    /// Directory holding `text-detection.rten` and `text-recognition.rten`.
    /// `None` uses the ocrs cache directory.
    pub ocr_model_dir: Option<PathBuf>,
    /// Table detection thresholds.
    pub table: TableSettings,
    /// Console report limits.
    pub report: ReportSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableSettings {
    /// Minimum number of aligned lines for a block to count as a table.
    pub min_rows: usize,
    /// Minimum number of cells per line.
    pub min_columns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportSettings {
    /// Page numbers listed per entry before truncating with a total.
    pub page_list_limit: usize,
    /// Errors shown per report section.
    pub error_preview: usize,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            ocr_model_dir: None,
            table: TableSettings::default(),
            report: ReportSettings::default(),
        }
    }
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            page_list_limit: 10,
            error_preview: 3,
        }
    }
}

impl ToolConfig {
    /// Read and validate a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            BlattwerkError::Config(format!("cannot read {}: {}", path.display(), err))
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config: explicit path first, then `$BLATTWERK_CONFIG`,
    /// then defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::from_file(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(BlattwerkError::Config(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        if self.table.min_rows == 0 || self.table.min_columns == 0 {
            return Err(BlattwerkError::Config(
                "table.min_rows and table.min_columns must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ToolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.report.page_list_limit, 10);
        assert_eq!(config.report.error_preview, 3);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blattwerk.json");
        std::fs::write(&path, r#"{ "jpeg_quality": 75, "table": { "min_rows": 3 } }"#).unwrap();

        let config = ToolConfig::from_file(&path).unwrap();
        assert_eq!(config.jpeg_quality, 75);
        assert_eq!(config.table.min_rows, 3);
        assert_eq!(config.table.min_columns, 2);
        assert_eq!(config.ocr_model_dir, None);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "jpeg_qualty": 75 }"#).unwrap();
        assert!(matches!(
            ToolConfig::from_file(&path),
            Err(BlattwerkError::Serialization(_))
        ));
    }

    #[test]
    fn out_of_range_quality_is_rejected() {
        let config = ToolConfig {
            jpeg_quality: 0,
            ..ToolConfig::default()
        };
        assert!(matches!(config.validate(), Err(BlattwerkError::Config(_))));
    }

    #[test]
    fn explicit_missing_file_is_config_error() {
        let result = ToolConfig::load(Some(Path::new("/nonexistent/blattwerk.json")));
        assert!(matches!(result, Err(BlattwerkError::Config(_))));
    }
}
