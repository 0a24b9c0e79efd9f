// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the wagate gateway.
//!
//! Compiled defaults are layered under `wagate.toml` files and environment
//! overrides, then checked semantically. Every failure comes back as a
//! [`ConfigError`] diagnostic pointing into the file that caused it.
//!
//! ```no_run
//! match wagate_config::load_and_validate() {
//!     Ok(config) => println!("listening on port {}", config.server.port),
//!     Err(errors) => wagate_config::render_errors(&errors),
//! }
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{render_errors, ConfigError, ConfigSource};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::WagateConfig;

/// Load from the standard search paths and validate.
pub fn load_and_validate() -> Result<WagateConfig, Vec<ConfigError>> {
    finish(loader::load_config(), || {
        loader::search_paths()
            .iter()
            .filter_map(|path| ConfigSource::read(path))
            .collect()
    })
}

/// Load from one file (plus environment overrides) and validate.
pub fn load_and_validate_path(path: &Path) -> Result<WagateConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_path(path), || {
        ConfigSource::read(path).into_iter().collect()
    })
}

/// Load from a TOML string only and validate.
pub fn load_and_validate_str(toml_content: &str) -> Result<WagateConfig, Vec<ConfigError>> {
    finish(loader::load_config_from_str(toml_content), || {
        vec![ConfigSource::inline(toml_content)]
    })
}

/// Sources are only read back when there is something to point at.
fn finish(
    loaded: Result<WagateConfig, figment::Error>,
    sources: impl FnOnce() -> Vec<ConfigSource>,
) -> Result<WagateConfig, Vec<ConfigError>> {
    match loaded {
        Ok(config) => match validation::validate_config(&config) {
            Ok(()) => Ok(config),
            Err(errors) => {
                let sources = sources();
                Err(errors.into_iter().map(|e| e.located(&sources)).collect())
            }
        },
        Err(err) => Err(diagnostic::from_figment(err, &sources())),
    }
}
