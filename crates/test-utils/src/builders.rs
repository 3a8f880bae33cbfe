#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::PathBuf;

use playbook_dispatch::config::{
    ConfigFile, DispatchSection, PlaybookConfig, RawConfigFile, ReaperSection,
};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts with one playbook (`main`), tag `ipcheck` and target `node1`.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut playbook = BTreeMap::new();
        playbook.insert(
            "main".to_string(),
            PlaybookConfig {
                path: PathBuf::from("main.yml"),
            },
        );

        Self {
            config: RawConfigFile {
                dispatch: DispatchSection {
                    working_dir: PathBuf::from("."),
                    executable: "ansible-playbook".to_string(),
                    default_playbook: None,
                    allowed_tags: vec!["ipcheck".to_string()],
                    allowed_targets: vec!["node1".to_string()],
                },
                reaper: ReaperSection::default(),
                playbook,
            },
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.config.dispatch.allowed_tags.push(tag.to_string());
        self
    }

    pub fn with_target(mut self, target: &str) -> Self {
        self.config.dispatch.allowed_targets.push(target.to_string());
        self
    }

    pub fn with_playbook(mut self, name: &str, path: &str) -> Self {
        self.config.playbook.insert(
            name.to_string(),
            PlaybookConfig {
                path: PathBuf::from(path),
            },
        );
        self
    }

    pub fn default_playbook(mut self, name: &str) -> Self {
        self.config.dispatch.default_playbook = Some(name.to_string());
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.dispatch.working_dir = dir.into();
        self
    }

    pub fn executable(mut self, exe: &str) -> Self {
        self.config.dispatch.executable = exe.to_string();
        self
    }

    pub fn reaper(mut self, interval_secs: u64, retention_secs: u64) -> Self {
        self.config.reaper = ReaperSection {
            interval_secs,
            retention_secs,
        };
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
