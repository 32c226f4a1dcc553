//! Settings persistence into a TOML file with the config schema.

use std::path::PathBuf;

use honey_core::{Settings, SettingsStore};

/// Writes runtime settings and the calibration factor back into a copy of
/// the config document, replacing the file atomically.
pub struct TomlSettingsStore {
    path: PathBuf,
    doc: honey_config::Config,
}

impl TomlSettingsStore {
    pub fn new(path: PathBuf, doc: honey_config::Config) -> Self {
        Self { path, doc }
    }
}

impl SettingsStore for TomlSettingsStore {
    fn persist(
        &mut self,
        settings: &Settings,
        cal_factor: Option<f32>,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        settings.write_to(&mut self.doc, cal_factor);
        self.doc.save(&self.path)?;
        tracing::info!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}
