// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [dispatch]
/// working_dir = "/home/root/FluxNodeInstall"
/// default_playbook = "flux"
/// allowed_tags = ["ipcheck"]
/// allowed_targets = ["node1"]
///
/// [playbook.flux]
/// path = "/home/root/FluxNodeInstall/flux.yml"
///
/// [reaper]
/// interval_secs = 10
/// retention_secs = 3600
/// ```
///
/// This is the unchecked form; convert it with `ConfigFile::try_from`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub dispatch: DispatchSection,

    #[serde(default)]
    pub reaper: ReaperSection,

    /// All playbooks from `[playbook.<name>]`, keyed by name.
    #[serde(default)]
    pub playbook: BTreeMap<String, PlaybookConfig>,
}

/// `[dispatch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchSection {
    /// Directory the playbook executable runs in.
    pub working_dir: PathBuf,

    /// Executable invoked for every job.
    #[serde(default = "default_executable")]
    pub executable: String,

    /// Playbook used when a submission names none.
    ///
    /// May be omitted when exactly one playbook is configured.
    #[serde(default)]
    pub default_playbook: Option<String>,

    /// Tags a caller may pass with `-t`.
    #[serde(default)]
    pub allowed_tags: Vec<String>,

    /// Inventory patterns a caller may pass with `-l`.
    #[serde(default)]
    pub allowed_targets: Vec<String>,
}

fn default_executable() -> String {
    "ansible-playbook".to_string()
}

/// `[playbook.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybookConfig {
    pub path: PathBuf,
}

/// `[reaper]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ReaperSection {
    /// Delay between the end of one sweep and the start of the next.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// How long a completed job stays queryable.
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

fn default_interval_secs() -> u64 {
    10
}

fn default_retention_secs() -> u64 {
    3600
}

impl Default for ReaperSection {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            retention_secs: default_retention_secs(),
        }
    }
}

impl ReaperSection {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

/// Validated configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>`, so holders can rely on:
/// a resolvable default playbook, non-empty allow-lists and a non-zero reaper
/// interval.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    dispatch: DispatchSection,
    reaper: ReaperSection,
    playbook: BTreeMap<String, PlaybookConfig>,
    default_playbook: String,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        dispatch: DispatchSection,
        reaper: ReaperSection,
        playbook: BTreeMap<String, PlaybookConfig>,
        default_playbook: String,
    ) -> Self {
        Self {
            dispatch,
            reaper,
            playbook,
            default_playbook,
        }
    }

    pub fn dispatch(&self) -> &DispatchSection {
        &self.dispatch
    }

    pub fn reaper(&self) -> &ReaperSection {
        &self.reaper
    }

    pub fn playbooks(&self) -> &BTreeMap<String, PlaybookConfig> {
        &self.playbook
    }

    pub fn working_dir(&self) -> &Path {
        &self.dispatch.working_dir
    }

    pub fn executable(&self) -> &str {
        &self.dispatch.executable
    }

    /// Name of the playbook used when a submission does not pick one.
    pub fn default_playbook(&self) -> &str {
        &self.default_playbook
    }

    pub fn is_tag_allowed(&self, tag: &str) -> bool {
        self.dispatch.allowed_tags.iter().any(|t| t == tag)
    }

    pub fn is_target_allowed(&self, target: &str) -> bool {
        self.dispatch.allowed_targets.iter().any(|t| t == target)
    }

    /// Resolve a playbook name (or the default when `None`) to its path.
    pub fn resolve_playbook(&self, name: Option<&str>) -> Option<(&str, &Path)> {
        let name = name.unwrap_or(self.default_playbook.as_str());
        self.playbook
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v.path.as_path()))
    }
}
