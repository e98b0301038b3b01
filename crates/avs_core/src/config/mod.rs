//! Settings file handling.
//!
//! Settings live in one TOML file split into tables ([`ConfigSection`]).
//! Missing keys fall back to defaults, and a single table can be written back
//! without touching the others.
//!
//! # Example
//!
//! ```no_run
//! use avs_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/settings.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Max offset: {}s", config.settings().analysis.max_offset_secs);
//!
//! config.settings_mut().export.mix_original = true;
//! config.update_section(ConfigSection::Export).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AnalysisSettings, ConfigSection, CorrectionSettings, ExportSettings, LoggingSettings,
    PathSettings, Settings, ToolSettings,
};
