//! Configuration for the dashboard and the CLI
//!
//! Loaded from a TOML file. Every field has a default, so an empty or absent
//! file yields a working setup that reads `Research_Database.xlsx` from the
//! current directory.

use crate::error::{KpiError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub auth: AuthSettings,
    pub kpi: KpiSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address the web server binds to
    pub bind: String,
    /// Directory served under /static
    pub static_dir: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
            static_dir: PathBuf::from("static"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreSettings {
    pub workbook: PathBuf,
    pub staff_sheet: String,
    pub research_sheet: String,
    /// Seconds a table read stays valid; writes clear it early
    pub cache_ttl_secs: u64,
    pub columns: ColumnMap,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            workbook: PathBuf::from("Research_Database.xlsx"),
            staff_sheet: "masters".to_string(),
            research_sheet: "research".to_string(),
            cache_ttl_secs: 600,
            columns: ColumnMap::default(),
        }
    }
}

impl StoreSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Header names of both tables
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ColumnMap {
    pub staff_name: String,
    pub staff_program: String,
    pub staff_faculty: String,
    pub title: String,
    pub year: String,
    pub journal_tier: String,
    pub score: String,
    pub author: String,
    pub external_author: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            staff_name: "Name-surname".to_string(),
            staff_program: "program".to_string(),
            staff_faculty: "faculty".to_string(),
            title: "title".to_string(),
            year: "year".to_string(),
            journal_tier: "journal_tier".to_string(),
            score: "score".to_string(),
            author: "author_name".to_string(),
            external_author: "external_author".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Argon2 PHC string of the shared admin password
    pub admin_password_hash: Option<String>,
    pub session_hours: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            admin_password_hash: None,
            session_hours: 12,
        }
    }
}

impl AuthSettings {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_hours * 60 * 60)
    }
}

/// Where the per-group headcount comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadcountMode {
    /// Distinct staff names per group in the live roster
    #[default]
    Roster,
    /// Frozen per-group table, roster count for unlisted groups
    Fixed,
}

/// What submit does when the title already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    Allow,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KpiSettings {
    /// Cap scores at 5.0
    pub clamp: bool,
    pub headcount: HeadcountMode,
    pub fixed_programs: BTreeMap<String, u32>,
    pub fixed_faculties: BTreeMap<String, u32>,
    pub duplicate_titles: DuplicatePolicy,
}

impl Default for KpiSettings {
    fn default() -> Self {
        Self {
            clamp: true,
            headcount: HeadcountMode::Roster,
            fixed_programs: BTreeMap::new(),
            fixed_faculties: BTreeMap::new(),
            duplicate_titles: DuplicatePolicy::Reject,
        }
    }
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)
            .map_err(|e| KpiError::Config(format!("Parse TOML failed: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read a TOML file; a missing file falls back to defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Settings::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| KpiError::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.staff_sheet.trim().is_empty() || self.store.research_sheet.trim().is_empty() {
            return Err(KpiError::Config("sheet names cannot be empty".to_string()));
        }
        if self.store.staff_sheet == self.store.research_sheet {
            return Err(KpiError::Config(
                "staff and research sheets must differ".to_string(),
            ));
        }
        if let Some((group, _)) = self
            .kpi
            .fixed_programs
            .iter()
            .chain(self.kpi.fixed_faculties.iter())
            .find(|(_, n)| **n == 0)
        {
            return Err(KpiError::Config(format!(
                "fixed headcount for `{}` must be at least 1",
                group
            )));
        }
        if self.kpi.headcount == HeadcountMode::Fixed
            && self.kpi.fixed_programs.is_empty()
            && self.kpi.fixed_faculties.is_empty()
        {
            log::warn!("headcount mode is `fixed` but no fixed tables are configured");
        }
        Ok(())
    }
}
