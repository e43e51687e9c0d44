//! Deployment settings persistence.
//!
//! A single JSON settings file is the source of truth for scheduler
//! defaults, debug/boot defaults and the runtime-socket override. The
//! store loads once per process and caches; updates are read-modify-write
//! with merge semantics (unspecified fields stay untouched) and refresh
//! the cache on every write. A missing file means defaults; a malformed
//! file means a warning plus defaults, cached thereafter.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Settings file name inside the state directory.
const SETTINGS_FILE: &str = "settings.json";

/// Directory under the home directory holding persistent state.
pub const STATE_DIR: &str = ".stackpilot";

/// Debug verbosity forwarded to started services.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DebugLevel {
    /// No debug output.
    #[default]
    #[serde(rename = "false")]
    Off,
    /// Standard debug output.
    #[serde(rename = "true")]
    On,
    /// Maximum verbosity.
    #[serde(rename = "super")]
    Super,
}

impl DebugLevel {
    /// The value as it appears in settings JSON and environment entries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "false",
            Self::On => "true",
            Self::Super => "super",
        }
    }
}

/// Orchestrator boot profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootMode {
    /// Boot only the essentials.
    #[default]
    Minimal,
    /// Boot everything with maximum diagnostics.
    Super,
}

impl BootMode {
    /// The value as it appears in settings JSON and environment entries.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Super => "super",
        }
    }
}

/// Build pool shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerSettings {
    /// Base-tier concurrency.
    pub worker_threads: usize,
    /// Max-tier multiplier.
    pub subprocesses_per_worker: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            subprocesses_per_worker: 2,
        }
    }
}

/// Default debug/boot levels applied when a verb gives none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultsSettings {
    /// Default debug verbosity.
    pub debug_level: DebugLevel,
    /// Default boot profile.
    pub boot_mode: BootMode,
}

/// The persisted settings object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentSettings {
    /// Build pool shape.
    pub build_scheduler: SchedulerSettings,
    /// Default debug/boot levels.
    pub defaults: DefaultsSettings,
    /// Explicit runtime socket path, overriding resolution.
    pub host_docker_socket_override: Option<String>,
}

/// Partial settings update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsUpdate {
    /// Build pool changes.
    pub build_scheduler: Option<SchedulerUpdate>,
    /// Default-level changes.
    pub defaults: Option<DefaultsUpdate>,
    /// New socket override; `Some("")` clears it.
    pub host_docker_socket_override: Option<String>,
}

/// Partial build pool update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerUpdate {
    /// New base-tier concurrency.
    pub worker_threads: Option<usize>,
    /// New max-tier multiplier.
    pub subprocesses_per_worker: Option<usize>,
}

/// Partial defaults update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DefaultsUpdate {
    /// New default debug verbosity.
    pub debug_level: Option<DebugLevel>,
    /// New default boot profile.
    pub boot_mode: Option<BootMode>,
}

impl DeploymentSettings {
    /// Applies a partial update in place, merging rather than replacing.
    pub fn apply(&mut self, update: &SettingsUpdate) {
        if let Some(scheduler) = &update.build_scheduler {
            if let Some(workers) = scheduler.worker_threads {
                self.build_scheduler.worker_threads = workers;
            }
            if let Some(subprocesses) = scheduler.subprocesses_per_worker {
                self.build_scheduler.subprocesses_per_worker = subprocesses;
            }
        }
        if let Some(defaults) = &update.defaults {
            if let Some(debug) = defaults.debug_level {
                self.defaults.debug_level = debug;
            }
            if let Some(boot) = defaults.boot_mode {
                self.defaults.boot_mode = boot;
            }
        }
        if let Some(socket) = &update.host_docker_socket_override {
            self.host_docker_socket_override = if socket.trim().is_empty() {
                None
            } else {
                Some(socket.clone())
            };
        }
    }
}

/// Resolves the effective debug level for a start.
///
/// Boot mode `super` forces debug level `super` regardless of what the
/// caller requested; this override is long-standing behavior that callers
/// depend on, so it is kept as-is rather than treated as a conflict.
#[must_use]
pub fn effective_debug_level(
    requested: Option<DebugLevel>,
    boot_mode: BootMode,
    defaults: &DefaultsSettings,
) -> DebugLevel {
    if boot_mode == BootMode::Super {
        return DebugLevel::Super;
    }
    requested.unwrap_or(defaults.debug_level)
}

/// Cached, file-backed settings store.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    cache: Mutex<Option<DeploymentSettings>>,
}

impl SettingsStore {
    /// A store over the given settings file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// A store over the default per-user settings file.
    #[must_use]
    pub fn default_location() -> Self {
        let dir = dirs::home_dir()
            .map_or_else(|| PathBuf::from(STATE_DIR), |home| home.join(STATE_DIR));
        Self::new(dir.join(SETTINGS_FILE))
    }

    /// The settings file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the settings, loading from disk on first access.
    #[must_use]
    pub fn fetch(&self) -> DeploymentSettings {
        if let Ok(cache) = self.cache.lock() {
            if let Some(settings) = cache.as_ref() {
                return settings.clone();
            }
        }
        let settings = self.load_from_disk();
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(settings.clone());
        }
        settings
    }

    /// Merges an update into the settings and persists the result.
    ///
    /// # Errors
    /// Returns error when the settings file cannot be written.
    pub fn update(&self, update: &SettingsUpdate) -> io::Result<DeploymentSettings> {
        let mut settings = self.fetch();
        settings.apply(update);
        self.write_to_disk(&settings)?;
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(settings.clone());
        }
        Ok(settings)
    }

    /// Drops the cache so the next fetch re-reads the file.
    pub fn invalidate(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
    }

    fn load_from_disk(&self) -> DeploymentSettings {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(
                        "malformed settings file {}: {e}; using defaults",
                        self.path.display()
                    );
                    DeploymentSettings::default()
                }
            },
            Err(_) => DeploymentSettings::default(),
        }
    }

    fn write_to_disk(&self, settings: &DeploymentSettings) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        // Write-then-rename so a crash never leaves a torn file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let settings = DeploymentSettings::default();
        assert_eq!(settings.build_scheduler.worker_threads, 2);
        assert_eq!(settings.build_scheduler.subprocesses_per_worker, 2);
        assert_eq!(settings.defaults.debug_level, DebugLevel::Off);
        assert_eq!(settings.defaults.boot_mode, BootMode::Minimal);
        assert!(settings.host_docker_socket_override.is_none());
    }

    #[test]
    fn test_debug_level_serializes_as_strings() {
        assert_eq!(
            serde_json::to_string(&DebugLevel::Off).unwrap(),
            "\"false\""
        );
        assert_eq!(serde_json::to_string(&DebugLevel::On).unwrap(), "\"true\"");
        assert_eq!(
            serde_json::to_string(&DebugLevel::Super).unwrap(),
            "\"super\""
        );
    }

    #[test]
    fn test_boot_super_forces_debug_super() {
        let defaults = DefaultsSettings::default();
        let effective =
            effective_debug_level(Some(DebugLevel::Off), BootMode::Super, &defaults);
        assert_eq!(effective, DebugLevel::Super);
    }

    #[test]
    fn test_minimal_boot_respects_requested_debug() {
        let defaults = DefaultsSettings {
            debug_level: DebugLevel::Super,
            boot_mode: BootMode::Minimal,
        };
        let effective =
            effective_debug_level(Some(DebugLevel::On), BootMode::Minimal, &defaults);
        assert_eq!(effective, DebugLevel::On);
        let fallback = effective_debug_level(None, BootMode::Minimal, &defaults);
        assert_eq!(fallback, DebugLevel::Super);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        assert_eq!(store.fetch(), DeploymentSettings::default());
    }

    #[test]
    fn test_malformed_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").unwrap();
        let store = SettingsStore::new(path);
        assert_eq!(store.fetch(), DeploymentSettings::default());
    }

    #[test]
    fn test_update_merges_not_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));

        store
            .update(&SettingsUpdate {
                build_scheduler: Some(SchedulerUpdate {
                    worker_threads: Some(4),
                    subprocesses_per_worker: None,
                }),
                defaults: Some(DefaultsUpdate {
                    boot_mode: Some(BootMode::Super),
                    debug_level: None,
                }),
                ..Default::default()
            })
            .unwrap();

        let updated = store
            .update(&SettingsUpdate {
                defaults: Some(DefaultsUpdate {
                    debug_level: Some(DebugLevel::On),
                    boot_mode: None,
                }),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(updated.build_scheduler.worker_threads, 4);
        assert_eq!(updated.build_scheduler.subprocesses_per_worker, 2);
        assert_eq!(updated.defaults.boot_mode, BootMode::Super);
        assert_eq!(updated.defaults.debug_level, DebugLevel::On);
    }

    #[test]
    fn test_update_persists_across_cache_invalidation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(&path);
        store
            .update(&SettingsUpdate {
                host_docker_socket_override: Some("/custom/docker.sock".to_string()),
                ..Default::default()
            })
            .unwrap();
        store.invalidate();
        assert_eq!(
            store.fetch().host_docker_socket_override.as_deref(),
            Some("/custom/docker.sock")
        );
    }

    #[test]
    fn test_blank_socket_override_clears() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        store
            .update(&SettingsUpdate {
                host_docker_socket_override: Some("/a.sock".to_string()),
                ..Default::default()
            })
            .unwrap();
        let cleared = store
            .update(&SettingsUpdate {
                host_docker_socket_override: Some(String::new()),
                ..Default::default()
            })
            .unwrap();
        assert!(cleared.host_docker_socket_override.is_none());
    }

    #[test]
    fn test_settings_json_shape() {
        let json = serde_json::to_value(DeploymentSettings::default()).unwrap();
        assert!(json.get("buildScheduler").is_some());
        assert!(
            json.pointer("/buildScheduler/workerThreads").is_some(),
            "camelCase field names in the file format"
        );
        assert!(json.pointer("/defaults/bootMode").is_some());
    }
}
