// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DispatchError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DispatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let default_playbook = resolve_default_playbook(&raw)?;
        Ok(ConfigFile::new_unchecked(
            raw.dispatch,
            raw.reaper,
            raw.playbook,
            default_playbook,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_dispatch_section(cfg)?;
    validate_playbooks(cfg)?;
    validate_reaper_section(cfg)?;
    Ok(())
}

fn validate_dispatch_section(cfg: &RawConfigFile) -> Result<()> {
    let dispatch = &cfg.dispatch;

    if dispatch.working_dir.as_os_str().is_empty() {
        return Err(config_error("[dispatch].working_dir must be set"));
    }
    if dispatch.executable.trim().is_empty() {
        return Err(config_error("[dispatch].executable can't be empty"));
    }
    if dispatch.allowed_tags.is_empty() {
        return Err(config_error(
            "[dispatch].allowed_tags must list at least one tag",
        ));
    }
    if dispatch.allowed_targets.is_empty() {
        return Err(config_error(
            "[dispatch].allowed_targets must list at least one target",
        ));
    }
    if let Some(tag) = dispatch.allowed_tags.iter().find(|t| t.trim().is_empty()) {
        return Err(config_error(format!(
            "[dispatch].allowed_tags contains an empty entry ({tag:?})"
        )));
    }
    if let Some(target) = dispatch.allowed_targets.iter().find(|t| t.trim().is_empty()) {
        return Err(config_error(format!(
            "[dispatch].allowed_targets contains an empty entry ({target:?})"
        )));
    }
    Ok(())
}

fn validate_playbooks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.playbook.is_empty() {
        return Err(config_error(
            "config must contain at least one [playbook.<name>] section",
        ));
    }
    for (name, playbook) in cfg.playbook.iter() {
        if playbook.path.as_os_str().is_empty() {
            return Err(config_error(format!(
                "[playbook.{name}].path can't be empty"
            )));
        }
    }
    Ok(())
}

fn validate_reaper_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.reaper.interval_secs == 0 {
        return Err(config_error("[reaper].interval_secs must be >= 1 (got 0)"));
    }
    if cfg.reaper.retention_secs == 0 {
        return Err(config_error("[reaper].retention_secs must be >= 1 (got 0)"));
    }
    Ok(())
}

fn resolve_default_playbook(cfg: &RawConfigFile) -> Result<String> {
    match cfg.dispatch.default_playbook.as_deref() {
        Some(name) if cfg.playbook.contains_key(name) => Ok(name.to_string()),
        Some(name) => Err(config_error(format!(
            "[dispatch].default_playbook '{name}' has no [playbook.{name}] section"
        ))),
        None => {
            let mut names = cfg.playbook.keys();
            match (names.next(), names.next()) {
                (Some(only), None) => Ok(only.clone()),
                _ => Err(config_error(
                    "[dispatch].default_playbook must be set when more than one playbook is configured",
                )),
            }
        }
    }
}

/// Check that the paths a validated config points at exist on disk.
///
/// Kept apart from `TryFrom` so configs can be built in tests without
/// touching the filesystem.
pub fn verify_paths(cfg: &ConfigFile) -> Result<()> {
    let working_dir = cfg.working_dir();
    if !working_dir.is_dir() {
        return Err(config_error(format!(
            "[dispatch].working_dir {working_dir:?} is not an existing directory"
        )));
    }

    for (name, playbook) in cfg.playbooks() {
        let path = if playbook.path.is_relative() {
            working_dir.join(&playbook.path)
        } else {
            playbook.path.clone()
        };
        if !path.exists() {
            return Err(config_error(format!(
                "[playbook.{name}].path {path:?} doesn't exist"
            )));
        }
    }

    Ok(())
}

fn config_error(msg: impl Into<String>) -> DispatchError {
    DispatchError::ConfigError(msg.into())
}
