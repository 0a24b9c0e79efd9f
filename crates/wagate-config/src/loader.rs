// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered loading with figment.
//!
//! Later layers win: compiled defaults, each file from [`search_paths`],
//! `WAGATE_<SECTION>_<KEY>` variables, then the bare `PORT` variable.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::{WagateConfig, SECTIONS};

/// Config files consulted by [`load_config`], lowest precedence first.
///
/// Missing files are skipped.
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/wagate/wagate.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("wagate").join("wagate.toml"));
    }
    paths.push(PathBuf::from("wagate.toml"));
    paths
}

/// Load from [`search_paths`] plus environment overrides.
pub fn load_config() -> Result<WagateConfig, figment::Error> {
    with_env(layered(&search_paths())).extract()
}

/// Load from a single file plus environment overrides.
pub fn load_config_from_path(path: &Path) -> Result<WagateConfig, figment::Error> {
    with_env(layered(&[path.to_path_buf()])).extract()
}

/// Load from a TOML string only; the environment is ignored.
pub fn load_config_from_str(toml_content: &str) -> Result<WagateConfig, figment::Error> {
    defaults().merge(Toml::string(toml_content)).extract()
}

fn defaults() -> Figment {
    Figment::from(Serialized::defaults(WagateConfig::default()))
}

fn layered(paths: &[PathBuf]) -> Figment {
    paths
        .iter()
        .fold(defaults(), |figment, path| figment.merge(Toml::file(path)))
}

fn with_env(figment: Figment) -> Figment {
    figment
        .merge(Env::prefixed("WAGATE_").map(|key| env_key(key.as_str()).into()))
        .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
}

/// `bridge_base_url` -> `bridge.base_url`.
///
/// Only the section prefix is split off; key names keep their underscores.
/// Variables naming no known section pass through unchanged and are then
/// rejected as unknown sections.
fn env_key(var: &str) -> String {
    SECTIONS
        .iter()
        .find_map(|section| {
            var.strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|key| format!("{section}.{key}"))
        })
        .unwrap_or_else(|| var.to_string())
}
