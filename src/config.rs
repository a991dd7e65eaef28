use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::warn;
use xrinteract_input::PointerSettings;
use xrinteract_session::SessionConfig;
use xrinteract_testkit::HostProfile;

const DEFAULT_CONFIG_PATH: &str = "config/xr.toml";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct XrConfig {
    /// Desktop surface size in pixels.
    pub resolution: (u32, u32),
    /// Field of view in degrees for the desktop camera.
    pub fov_degrees: f32,
    /// Offset applied to every eye view, e.g. to stand the viewer on a stage.
    pub view_offset: [f32; 3],
    pub session: SessionConfig,
    /// Capabilities of the simulated device.
    pub host: HostProfile,
    pub pointer: PointerSettings,
}

impl Default for XrConfig {
    fn default() -> Self {
        Self {
            resolution: (1280, 720),
            fov_degrees: 70.0,
            view_offset: [0.0, 0.0, 0.0],
            session: SessionConfig::default(),
            host: HostProfile::default(),
            pointer: PointerSettings::default(),
        }
    }
}

impl XrConfig {
    /// Load configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<XrConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    XrConfig::default()
                }
            },
            Err(err) => {
                if path != Path::new(DEFAULT_CONFIG_PATH) || err.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!("XR config not found at {}. Using defaults", path.display());
                }
                XrConfig::default()
            }
        }
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xrinteract_core::ReferenceSpaceKind;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("xrinteract-{}-{name}", std::process::id()))
    }

    #[test]
    fn partial_files_keep_defaults() {
        let path = temp_path("partial.toml");
        fs::write(
            &path,
            "fov_degrees = 90.0\n[session]\nreference_space = \"local-floor\"\n[host]\nimmersive = false\n",
        )
        .unwrap();

        let cfg = XrConfig::load_from_path(&path);
        assert_eq!(cfg.fov_degrees, 90.0);
        assert_eq!(cfg.session.reference_space, ReferenceSpaceKind::LocalFloor);
        assert!(!cfg.host.immersive);
        assert!(cfg.host.inline);
        assert_eq!(cfg.resolution, (1280, 720));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn unreadable_or_invalid_files_fall_back() {
        let path = temp_path("broken.toml");
        fs::write(&path, "fov_degrees = \"wide\"").unwrap();
        assert_eq!(XrConfig::load_from_path(&path), XrConfig::default());
        let _ = fs::remove_file(&path);
        assert_eq!(XrConfig::load_from_path(&path), XrConfig::default());
    }

    #[test]
    fn saved_config_loads_back() {
        let path = temp_path("saved/xr.toml");
        let mut cfg = XrConfig::default();
        cfg.view_offset = [0.0, 0.0, 5.0];
        cfg.pointer.invert_y = true;
        cfg.save_to_path(&path).unwrap();
        assert_eq!(XrConfig::load_from_path(&path), cfg);
        if let Some(parent) = path.parent() {
            let _ = fs::remove_dir_all(parent);
        }
    }
}
