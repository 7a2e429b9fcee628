//! Saved preferences: the connection form fields plus a few UI settings,
//! persisted as a JSON file under the platform data directory. A missing or
//! corrupt file loads defaults; saving is best-effort and never fatal.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefs {
    pub ledger_url: Option<String>,
    pub auth_token: Option<String>,
    pub scan_url: Option<String>,
    pub domain_id: Option<String>,
    pub member_id: Option<String>,

    pub dark_mode: bool,
    pub sidebar_collapsed: bool,
    pub saved_filters: Vec<String>,
}

pub fn prefs_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| Path::new(".").to_path_buf())
        .join("cantx")
        .join("prefs.json")
}

pub fn load() -> Prefs {
    load_from(&prefs_path())
}

pub fn load_from(path: &Path) -> Prefs {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(prefs) => prefs,
            Err(e) => {
                log::warn!("[prefs] ignoring corrupt prefs file {}: {}", path.display(), e);
                Prefs::default()
            }
        },
        Err(_) => Prefs::default(),
    }
}

pub fn save(prefs: &Prefs) -> Result<()> {
    save_to(prefs, &prefs_path())
}

pub fn save_to(prefs: &Prefs, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(prefs)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
