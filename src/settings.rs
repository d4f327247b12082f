//! Per-tenant project settings persisted as JSON.
//!
//! The file maps tenant ids to their settings:
//!
//! ```json
//! { "my-project": { "tone_mode": "professional" } }
//! ```
//!
//! It is read lazily on first access. Writes are best effort: a failed save
//! is logged and the in-memory value still applies. Saves are serialized and
//! land through a temp file and rename, so readers never see a partial file.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use docbot_core::models::ToneMode;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TenantSettings {
    #[serde(default)]
    tone_mode: ToneMode,
}

pub struct ProjectSettings {
    path: Option<PathBuf>,
    loaded: Mutex<Option<BTreeMap<String, TenantSettings>>>,
    /// Held from the update through the write, so saves land in update order.
    writer: Mutex<()>,
}

impl ProjectSettings {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            loaded: Mutex::new(None),
            writer: Mutex::new(()),
        }
    }

    /// Settings that live only for the process lifetime.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            loaded: Mutex::new(Some(BTreeMap::new())),
            writer: Mutex::new(()),
        }
    }

    fn with_settings<R>(&self, f: impl FnOnce(&mut BTreeMap<String, TenantSettings>) -> R) -> R {
        let mut guard = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        let settings = guard.get_or_insert_with(|| self.read_file());
        f(settings)
    }

    fn read_file(&self) -> BTreeMap<String, TenantSettings> {
        let Some(path) = &self.path else {
            return BTreeMap::new();
        };
        if !path.exists() {
            return BTreeMap::new();
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|s| serde_json::from_str(&s).map_err(anyhow::Error::from));
        match parsed {
            Ok(map) => map,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load project settings");
                BTreeMap::new()
            }
        }
    }

    /// The tenant's tone, `casual` when never set.
    pub fn get_tone(&self, tenant_id: &str) -> ToneMode {
        self.with_settings(|s| s.get(tenant_id).map(|t| t.tone_mode).unwrap_or_default())
    }

    pub fn set_tone(&self, tenant_id: &str, tone: ToneMode) {
        let _writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let snapshot = self.with_settings(|s| {
            s.entry(tenant_id.to_string()).or_default().tone_mode = tone;
            s.clone()
        });
        if let Err(e) = self.save(&snapshot) {
            error!(tenant = %tenant_id, error = %e, "failed to save project settings");
        }
    }

    fn save(&self, settings: &BTreeMap<String, TenantSettings>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(settings)?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tone_is_casual() {
        let settings = ProjectSettings::in_memory();
        assert_eq!(settings.get_tone("p1"), ToneMode::Casual);
    }

    #[test]
    fn test_tone_persists_across_instances() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("project_settings.json");

        ProjectSettings::open(&path).set_tone("p1", ToneMode::Professional);
        let reopened = ProjectSettings::open(&path);
        assert_eq!(reopened.get_tone("p1"), ToneMode::Professional);
        assert_eq!(reopened.get_tone("p2"), ToneMode::Casual);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"tone_mode\": \"professional\""));
    }

    #[test]
    fn test_unreadable_file_falls_back_to_default() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("project_settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(ProjectSettings::open(&path).get_tone("p1"), ToneMode::Casual);
    }

    #[test]
    fn test_concurrent_writers_keep_every_tenant() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("project_settings.json");
        let settings = std::sync::Arc::new(ProjectSettings::open(&path));

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let settings = settings.clone();
                std::thread::spawn(move || {
                    settings.set_tone(&format!("t{}", i), ToneMode::Professional)
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let reopened = ProjectSettings::open(&path);
        for i in 0..32 {
            assert_eq!(reopened.get_tone(&format!("t{}", i)), ToneMode::Professional);
        }
        assert!(!path.with_extension("json.tmp").exists());
    }
}
