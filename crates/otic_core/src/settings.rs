//! Hearing profile storage
//!
//! One pretty-printed JSON file per profile.
//!
//! # Storage Locations
//! - Linux: `~/.config/otic/profiles/`
//! - Windows: `%APPDATA%\otic\otic\config\profiles\`
//! - macOS: `~/Library/Application Support/org.otic.otic/profiles/`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audiogram::{compute_eq, AudiogramEq};
use crate::error::{EngineError, EngineResult};
use crate::params::EqParams;

pub const METHOD_MANUAL: &str = "manual";
pub const METHOD_AUDIOGRAM: &str = "2AFC 2-down-1-up (relative)";

/// A saved set of EQ parameters, optionally with the audiogram behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub method: String,
    /// Relative thresholds by frequency; empty for manual profiles
    #[serde(default)]
    pub thresholds_db: BTreeMap<u32, f32>,
    pub eq: EqParams,
    #[serde(default)]
    pub audiogram: Option<AudiogramEq>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Profile from hand-set parameters
    pub fn manual(name: impl Into<String>, eq: EqParams) -> Self {
        Self {
            name: name.into(),
            method: METHOD_MANUAL.to_string(),
            thresholds_db: BTreeMap::new(),
            eq: eq.clamped(),
            audiogram: None,
            created_at: Utc::now(),
        }
    }

    /// Profile derived from measured thresholds
    pub fn from_audiogram(
        name: impl Into<String>,
        thresholds_db: BTreeMap<u32, f32>,
        global_gain: f32,
    ) -> Self {
        let audiogram = compute_eq(&thresholds_db);
        Self {
            name: name.into(),
            method: METHOD_AUDIOGRAM.to_string(),
            eq: audiogram.to_params(global_gain).clamped(),
            thresholds_db,
            audiogram: Some(audiogram),
            created_at: Utc::now(),
        }
    }
}

/// Reduce a display name to a file stem
///
/// Keeps alphanumerics, `-`, `_` and inner spaces, which become `_`.
pub fn safe_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | ' '))
        .collect::<String>()
        .trim()
        .replace(' ', "_")
}

/// Directory of profile files
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `profiles/` under the platform configuration directory
    pub fn default_location() -> EngineResult<Self> {
        ProjectDirs::from("org", "otic", "otic")
            .map(|dirs| Self::new(dirs.config_dir().join("profiles")))
            .ok_or(EngineError::NoConfigDir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path for a profile name
    pub fn path_for(&self, name: &str) -> EngineResult<PathBuf> {
        let stem = safe_name(name);
        if stem.is_empty() {
            return Err(EngineError::InvalidProfileName(name.to_string()));
        }
        Ok(self.root.join(format!("{stem}.json")))
    }

    /// Write `profile`, replacing any profile with the same file name
    pub fn save(&self, profile: &UserProfile) -> EngineResult<PathBuf> {
        let path = self.path_for(&profile.name)?;
        fs::create_dir_all(&self.root)?;

        let file = fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, profile)?;

        info!("Profile '{}' saved to {:?}", profile.name, path);
        Ok(path)
    }

    pub fn load(&self, name: &str) -> EngineResult<UserProfile> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(EngineError::ProfileNotFound(name.trim().to_string()));
        }

        let file = fs::File::open(&path)?;
        let profile = serde_json::from_reader(file)?;
        debug!("Profile loaded from {:?}", path);
        Ok(profile)
    }

    /// Remove a profile; returns whether one existed
    pub fn delete(&self, name: &str) -> EngineResult<bool> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        info!("Profile deleted: {:?}", path);
        Ok(true)
    }

    /// Display names of all stored profiles, sorted case-insensitively
    pub fn list(&self) -> EngineResult<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let is_json = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            if !is_json {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.replace('_', " "));
            }
        }
        names.sort_by_key(|name| name.to_lowercase());
        Ok(names)
    }
}
