//! Loading and persisting the settings file.
//!
//! Whole-file saves render every section with a heading comment. Section
//! updates go through `toml_edit`, so the rest of the file on disk (including
//! hand-written comments) is left alone. Every write lands in a sibling temp
//! file first and is renamed over the target.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Settings file not found: {0}")]
    NotFound(PathBuf),

    #[error("Cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Cannot edit settings document: {0}")]
    Edit(#[from] toml_edit::TomlError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Owns the settings file path and the in-memory [`Settings`].
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Nothing is read until `load` or `load_or_create`.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    /// `.config/settings.toml` under the working directory.
    pub fn default_path() -> PathBuf {
        Path::new(".config").join("settings.toml")
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// In-memory only until `save` or `update_section`.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.is_file() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }
        let content = self.read()?;
        self.settings = self.parse(&content)?;
        Ok(())
    }

    /// Load the file, or write defaults when there is none.
    ///
    /// A file with unknown tables or missing keys is rewritten in normalized
    /// form, with defaults filled in.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if !self.config_path.is_file() {
            tracing::debug!("Creating default settings at {}", self.config_path.display());
            self.settings = Settings::default();
            return self.save();
        }

        let content = self.read()?;
        self.settings = self.parse(&content)?;

        let doc: DocumentMut = content.parse()?;
        if self.is_stale(&doc)? {
            tracing::debug!("Normalizing settings file {}", self.config_path.display());
            self.save()?;
        }
        Ok(())
    }

    pub fn reset(&mut self) -> ConfigResult<()> {
        self.settings = Settings::default();
        self.save()
    }

    /// Create the output, scratch and log folders.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let paths = &self.settings.paths;
        for dir in [&paths.output_folder, &paths.temp_root, &paths.logs_folder] {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: PathBuf::from(dir),
                source,
            })?;
        }
        Ok(())
    }

    pub fn logs_folder(&self) -> PathBuf {
        PathBuf::from(&self.settings.paths.logs_folder)
    }

    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.write(&content)
    }

    /// Persist one section, keeping everything else as it is on disk.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let mut doc = if self.config_path.is_file() {
            self.read()?.parse::<DocumentMut>()?
        } else {
            DocumentMut::new()
        };

        doc[section.table_name()] = Item::Table(self.section_table(section)?);
        self.write(&doc.to_string())
    }

    /// The full settings file as written by `save`.
    pub fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut output = String::from(
            "# AV Sync Configuration\n\
             # Written by avs. Section updates keep edits made elsewhere in this file.\n",
        );
        for &section in ConfigSection::all() {
            output.push_str(&format!(
                "\n# {}\n[{}]\n{}",
                section.heading(),
                section.table_name(),
                self.settings.section_toml(section)?
            ));
        }
        Ok(output)
    }

    fn is_stale(&self, doc: &DocumentMut) -> ConfigResult<bool> {
        let known = |name: &str| ConfigSection::all().iter().any(|s| s.table_name() == name);
        if doc.iter().any(|(name, _)| !known(name)) {
            return Ok(true);
        }

        for &section in ConfigSection::all() {
            let Some(Item::Table(on_disk)) = doc.get(section.table_name()) else {
                return Ok(true);
            };
            let expected = self.section_table(section)?;
            if expected.iter().any(|(key, _)| !on_disk.contains_key(key)) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn section_table(&self, section: ConfigSection) -> ConfigResult<toml_edit::Table> {
        let rendered: DocumentMut = self.settings.section_toml(section)?.parse()?;
        Ok(rendered.as_table().clone())
    }

    fn read(&self) -> ConfigResult<String> {
        fs::read_to_string(&self.config_path).map_err(|source| ConfigError::Io {
            path: self.config_path.clone(),
            source,
        })
    }

    fn parse(&self, content: &str) -> ConfigResult<Settings> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: self.config_path.clone(),
            source,
        })
    }

    fn write(&self, content: &str) -> ConfigResult<()> {
        write_atomically(&self.config_path, content).map_err(|source| ConfigError::Io {
            path: self.config_path.clone(),
            source,
        })
    }
}

/// Write through `<name>.toml.tmp` in the same directory, then rename.
fn write_atomically(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let staging = path.with_extension("toml.tmp");
    let staged = fs::File::create(&staging).and_then(|mut file| {
        file.write_all(content.as_bytes())?;
        file.sync_all()
    });
    if let Err(e) = staged {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }
    fs::rename(&staging, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OverTrimPolicy;
    use tempfile::tempdir;

    fn manager_in(dir: &Path) -> ConfigManager {
        ConfigManager::new(dir.join("settings.toml"))
    }

    #[test]
    fn first_run_writes_every_section() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".config").join("settings.toml");

        ConfigManager::new(&path).load_or_create().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        for section in ConfigSection::all() {
            assert!(content.contains(&format!("[{}]", section.table_name())));
            assert!(content.contains(section.heading()));
        }

        let mut reloaded = ConfigManager::new(&path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().export.profile.preset, "medium");
    }

    #[test]
    fn partial_file_keeps_values_and_gains_defaults() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        fs::write(manager.path(), "[paths]\noutput_folder = \"renders\"\n").unwrap();

        manager.load_or_create().unwrap();

        assert_eq!(manager.settings().paths.output_folder, "renders");
        let content = fs::read_to_string(manager.path()).unwrap();
        assert!(content.contains("renders"));
        assert!(content.contains("[analysis]"));
        assert!(content.contains("max_offset_secs"));
    }

    #[test]
    fn unknown_tables_are_dropped() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        fs::write(manager.path(), "[chapters]\nsnap = true\n").unwrap();

        manager.load_or_create().unwrap();

        let content = fs::read_to_string(manager.path()).unwrap();
        assert!(!content.contains("[chapters]"));
    }

    #[test]
    fn complete_file_is_not_rewritten() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        manager.load_or_create().unwrap();

        let mut content = fs::read_to_string(manager.path()).unwrap();
        content.push_str("# kept\n");
        fs::write(manager.path(), &content).unwrap();

        manager.load_or_create().unwrap();
        assert!(fs::read_to_string(manager.path()).unwrap().ends_with("# kept\n"));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn load_reports_bad_toml_with_path() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        fs::write(manager.path(), "[analysis]\nmax_offset_secs = \"far\"\n").unwrap();

        let err = manager.load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("settings.toml"));
    }

    #[test]
    fn section_update_leaves_other_sections_on_disk() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        manager.load_or_create().unwrap();

        manager.settings_mut().correction.overtrim_policy = OverTrimPolicy::Error;
        manager.settings_mut().paths.output_folder = "unsaved".to_string();
        manager.update_section(ConfigSection::Correction).unwrap();

        let content = fs::read_to_string(manager.path()).unwrap();
        assert!(content.contains("overtrim_policy = \"error\""));
        assert!(!content.contains("unsaved"));
        assert!(content.starts_with("# AV Sync Configuration"));
        assert!(!manager.path().with_extension("toml.tmp").exists());
    }

    #[test]
    fn reset_writes_defaults() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        manager.load_or_create().unwrap();
        manager.settings_mut().analysis.max_offset_secs = 12.0;
        manager.save().unwrap();

        manager.reset().unwrap();

        let mut reloaded = manager_in(dir.path());
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().analysis.max_offset_secs, 60.0);
    }

    #[test]
    fn working_folders_are_created() {
        let dir = tempdir().unwrap();
        let mut manager = manager_in(dir.path());
        let paths = &mut manager.settings_mut().paths;
        paths.output_folder = dir.path().join("out").display().to_string();
        paths.temp_root = dir.path().join("scratch").display().to_string();
        paths.logs_folder = dir.path().join("logs").display().to_string();

        manager.ensure_dirs_exist().unwrap();

        assert!(dir.path().join("out").is_dir());
        assert!(dir.path().join("scratch").is_dir());
        assert!(manager.logs_folder().is_dir());
    }
}
