//! Configuration management
//!
//! Settings live in `settings.json` inside the ledger directory:
//! ```json
//! {
//!   "app": { "pageSize": 100, "auditPageSize": 50 }
//! }
//! ```
//! Unknown fields are preserved on save so other tools can keep their own
//! sections in the same file.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::result::Result;

const DEFAULT_PAGE_SIZE: u32 = 100;
const DEFAULT_AUDIT_PAGE_SIZE: u32 = 50;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    page_size: Option<u32>,
    #[serde(default)]
    audit_page_size: Option<u32>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Ledger configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    /// Default page size for transaction listings
    pub page_size: u32,
    /// Default page size for audit log listings
    pub audit_page_size: u32,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            audit_page_size: DEFAULT_AUDIT_PAGE_SIZE,
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the ledger directory.
    ///
    /// `ARROWLEDGER_PAGE_SIZE` overrides the settings file (for CI/testing).
    pub fn load(ledger_dir: &Path) -> Result<Self> {
        let settings_path = ledger_dir.join("settings.json");

        let raw: SettingsFile = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        let page_size = std::env::var("ARROWLEDGER_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(raw.app.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let audit_page_size = raw.app.audit_page_size.unwrap_or(DEFAULT_AUDIT_PAGE_SIZE);

        Ok(Self {
            page_size,
            audit_page_size,
            _raw_settings: raw,
        })
    }

    /// Save config to the ledger directory.
    /// Preserves settings sections this crate doesn't manage.
    pub fn save(&self, ledger_dir: &Path) -> Result<()> {
        let settings_path = ledger_dir.join("settings.json");

        let mut settings = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<SettingsFile>(&content).unwrap_or_default()
        } else {
            SettingsFile::default()
        };

        settings.app.page_size = Some(self.page_size);
        settings.app.audit_page_size = Some(self.audit_page_size);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}
