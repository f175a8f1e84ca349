//! Configuration loading.
//!
//! Layers, later wins:
//! 1. Defaults in code
//! 2. Optional config file (`stockaudit.toml` unless a path is given)
//! 3. Environment variables prefixed `STOCKAUDIT__`, e.g.
//!    `STOCKAUDIT__EXPORT__DELIMITER=,`

use std::path::{Path, PathBuf};

use config::{ConfigError, Environment, File};
use serde::Deserialize;

use stockaudit_observability::LogFormat;

/// Main configuration.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AuditConfig {
    /// Directory holding the CSV data files.
    pub data_dir: PathBuf,
    pub import: ImportConfig,
    pub export: ExportConfig,
    pub report: ReportConfig,
    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ImportConfig {
    /// Field delimiter of input files (single ASCII character).
    pub delimiter: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ExportConfig {
    /// Field delimiter of the exported report (single ASCII character).
    pub delimiter: String,
    /// Prefix the export with a UTF-8 byte order mark (spreadsheet friendly).
    pub utf8_bom: bool,
    /// Append a grand-total line.
    pub include_totals: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReportConfig {
    /// Keep layers whose remaining quantity is zero.
    pub show_all: bool,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LogConfig {
    pub format: LogFormat,
}

const DEFAULT_FILE: &str = "stockaudit.toml";

impl AuditConfig {
    /// Load configuration from defaults, an optional file and the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_source = match file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_FILE).required(false),
        };

        let config = config::Config::builder()
            .set_default("data_dir", "./data")?
            .set_default("import.delimiter", ",")?
            .set_default("export.delimiter", ";")?
            .set_default("export.utf8_bom", true)?
            .set_default("export.include_totals", true)?
            .set_default("report.show_all", false)?
            .set_default("log.format", "json")?
            .add_source(file_source)
            .add_source(
                Environment::with_prefix("STOCKAUDIT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        delimiter_byte(&self.import.delimiter, "import.delimiter")?;
        delimiter_byte(&self.export.delimiter, "export.delimiter")?;
        Ok(())
    }

    pub fn import_delimiter(&self) -> u8 {
        delimiter_byte(&self.import.delimiter, "import.delimiter").unwrap_or(b',')
    }

    pub fn export_delimiter(&self) -> u8 {
        delimiter_byte(&self.export.delimiter, "export.delimiter").unwrap_or(b';')
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            import: ImportConfig {
                delimiter: ",".to_string(),
            },
            export: ExportConfig {
                delimiter: ";".to_string(),
                utf8_bom: true,
                include_totals: true,
            },
            report: ReportConfig { show_all: false },
            log: LogConfig {
                format: LogFormat::Json,
            },
        }
    }
}

fn delimiter_byte(value: &str, key: &str) -> Result<u8, ConfigError> {
    match value.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(ConfigError::Message(format!(
            "{key} must be a single ASCII character (got '{value}')"
        ))),
    }
}
