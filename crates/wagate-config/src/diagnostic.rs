// SPDX-FileCopyrightText: 2026 Wagate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! wagate's schema is flat: six `[section]` tables of scalar keys. Every
//! error therefore names at most a section and a key, which is all the span
//! lookup below has to find. Sources are searched from highest precedence
//! down, so a key overridden by `./wagate.toml` points at that file.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::path::Path;

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity for a "did you mean" hint.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A TOML document that took part in loading.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub name: String,
    pub content: String,
}

impl ConfigSource {
    /// Read a config file; absent or unreadable files contribute nothing.
    pub fn read(path: &Path) -> Option<Self> {
        std::fs::read_to_string(path).ok().map(|content| Self {
            name: path.display().to_string(),
            content,
        })
    }

    pub fn inline(content: &str) -> Self {
        Self {
            name: "<inline>".to_string(),
            content: content.to_string(),
        }
    }

    /// Span of `key` inside `[section]`, or of the `[section]` header itself.
    fn locate(&self, section: &str, key: Option<&str>) -> Option<SourceSpan> {
        let mut current: Option<&str> = None;
        let mut offset = 0;

        for line in self.content.split_inclusive('\n') {
            let trimmed = line.trim_start();
            let indent = line.len() - trimmed.len();

            if let Some(header) = trimmed.strip_prefix('[') {
                let name = header.split(']').next().unwrap_or("").trim();
                current = Some(name);
                if key.is_none() && name == section {
                    return Some((offset + indent, trimmed.trim_end().len()).into());
                }
            } else if let Some(key) = key
                && current == Some(section)
                && let Some(rest) = trimmed.strip_prefix(key)
                && rest.trim_start().starts_with('=')
            {
                return Some((offset + indent, key.len()).into());
            }

            offset += line.len();
        }

        None
    }

    fn named(&self) -> NamedSource<String> {
        NamedSource::new(&self.name, self.content.clone())
    }
}

/// Find `section`/`key` in the highest-precedence source that mentions it.
fn locate(
    sources: &[ConfigSource],
    section: &str,
    key: Option<&str>,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    sources
        .iter()
        .rev()
        .find_map(|source| {
            source
                .locate(section, key)
                .map(|span| (Some(span), Some(source.named())))
        })
        .unwrap_or((None, None))
}

/// A configuration error rendered by miette.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A config file is not valid TOML.
    #[error("{message}")]
    #[diagnostic(code(wagate::config::syntax))]
    Syntax {
        message: String,
        #[label("here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A top-level table that wagate does not know.
    #[error("unknown configuration section `[{section}]`")]
    #[diagnostic(
        code(wagate::config::unknown_section),
        help("{}", hint(suggestion.as_deref(), "sections", valid))
    )]
    UnknownSection {
        section: String,
        suggestion: Option<String>,
        valid: String,
        #[label("not a wagate section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key that its section does not define.
    #[error("unknown key `{key}` in `[{section}]`")]
    #[diagnostic(
        code(wagate::config::unknown_key),
        help("{}", hint(suggestion.as_deref(), "keys", valid))
    )]
    UnknownKey {
        section: String,
        key: String,
        suggestion: Option<String>,
        valid: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong type, e.g. a string for `server.port`.
    #[error("invalid value for `{key}`: {detail}")]
    #[diagnostic(code(wagate::config::invalid_value))]
    InvalidValue {
        key: String,
        detail: String,
        #[label("wrong value here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A well-typed value that fails a semantic check.
    #[error("invalid `{key}`: {message}")]
    #[diagnostic(code(wagate::config::validation))]
    Validation {
        key: String,
        message: String,
        #[label("invalid value")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("configuration error: {0}")]
    #[diagnostic(code(wagate::config::other))]
    Other(String),
}

impl ConfigError {
    /// A validation failure for `key` (dotted, e.g. `server.port`).
    pub fn validation(key: &str, message: impl Into<String>) -> Self {
        ConfigError::Validation {
            key: key.to_string(),
            message: message.into(),
            span: None,
            src: None,
        }
    }

    /// Attach the source location of a validation failure, if it is in a file.
    pub fn located(self, sources: &[ConfigSource]) -> Self {
        match self {
            ConfigError::Validation { key, message, .. } => {
                let (span, src) = match key.split_once('.') {
                    Some((section, field)) => locate(sources, section, Some(field)),
                    None => (None, None),
                };
                ConfigError::Validation {
                    key,
                    message,
                    span,
                    src,
                }
            }
            other => other,
        }
    }
}

fn hint(suggestion: Option<&str>, what: &str, valid: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid {what}: {valid}"),
        None => format!("valid {what}: {valid}"),
    }
}

/// Convert a figment extraction error into diagnostics.
pub fn from_figment(err: figment::Error, sources: &[ConfigSource]) -> Vec<ConfigError> {
    let mut errors = Vec::new();

    for error in err {
        let path: Vec<&str> = error.path.iter().map(String::as_str).collect();
        let converted = match (&error.kind, path.as_slice()) {
            (Kind::UnknownField(field, expected), []) => {
                let (span, src) = locate(sources, field, None);
                ConfigError::UnknownSection {
                    section: field.clone(),
                    suggestion: suggest_key(field, expected),
                    valid: expected.join(", "),
                    span,
                    src,
                }
            }
            (Kind::UnknownField(field, expected), [section, ..]) => {
                let (span, src) = locate(sources, section, Some(field.as_str()));
                ConfigError::UnknownKey {
                    section: section.to_string(),
                    key: field.clone(),
                    suggestion: suggest_key(field, expected),
                    valid: expected.join(", "),
                    span,
                    src,
                }
            }
            (Kind::InvalidType(actual, expected) | Kind::InvalidValue(actual, expected), _) => {
                let (span, src) = match path.as_slice() {
                    [section, field] => locate(sources, section, Some(*field)),
                    _ => (None, None),
                };
                ConfigError::InvalidValue {
                    key: path.join("."),
                    detail: format!("found {actual}, expected {expected}"),
                    span,
                    src,
                }
            }
            (Kind::Message(message), _) => {
                let syntax = syntax_errors(sources);
                if syntax.is_empty() {
                    ConfigError::Other(message.clone())
                } else {
                    errors.extend(syntax);
                    continue;
                }
            }
            _ => ConfigError::Other(error.to_string()),
        };
        errors.push(converted);
    }

    errors
}

/// Re-parse each source to pin TOML syntax errors to a location.
fn syntax_errors(sources: &[ConfigSource]) -> Vec<ConfigError> {
    sources
        .iter()
        .filter_map(|source| {
            let err = toml::from_str::<toml::Table>(&source.content).err()?;
            Some(ConfigError::Syntax {
                message: format!("{}: {}", source.name, err.message()),
                span: err.span().map(SourceSpan::from),
                src: Some(source.named()),
            })
        })
        .collect()
}

/// Closest valid key by Jaro-Winkler similarity, if any is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print diagnostics to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        if handler.render_report(&mut buf, error as &dyn Diagnostic).is_ok() {
            eprint!("{buf}");
        } else {
            eprintln!("Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(content: &str) -> ConfigSource {
        ConfigSource::inline(content)
    }

    fn spanned(source: &ConfigSource, span: SourceSpan) -> &str {
        &source.content[span.offset()..span.offset() + span.len()]
    }

    #[test]
    fn suggestions_for_wagate_keys() {
        assert_eq!(
            suggest_key("prot", &["host", "port", "static_dir"]),
            Some("port".to_string())
        );
        assert_eq!(
            suggest_key("max_restrats", &["max_restarts", "delay_ms"]),
            Some("max_restarts".to_string())
        );
        assert_eq!(suggest_key("zzzzzz", &["host", "port"]), None);
    }

    #[test]
    fn key_is_found_only_in_its_own_section() {
        let src = source("[server]\nport = 1\n\n[bridge]\nbase_url = \"x\"\n  port = 2\n");
        let span = src.locate("bridge", Some("port")).unwrap();
        assert_eq!(spanned(&src, span), "port");
        assert_eq!(span.offset(), src.content.rfind("port").unwrap());
        assert!(src.locate("session", Some("port")).is_none());
    }

    #[test]
    fn key_prefix_does_not_match_longer_key() {
        let src = source("[reconnect]\ndelay_ms_extra = 1\ndelay_ms = 5\n");
        let span = src.locate("reconnect", Some("delay_ms")).unwrap();
        assert_eq!(span.offset(), src.content.find("delay_ms =").unwrap());
    }

    #[test]
    fn section_header_is_located() {
        let src = source("[sever]\nport = 1\n");
        let span = src.locate("sever", None).unwrap();
        assert_eq!(spanned(&src, span), "[sever]");
    }

    #[test]
    fn later_sources_win_span_lookup() {
        let system = ConfigSource {
            name: "/etc/wagate/wagate.toml".into(),
            content: "[server]\nprot = 1\n".into(),
        };
        let local = ConfigSource {
            name: "wagate.toml".into(),
            content: "[server]\nprot = 2\n".into(),
        };
        let (span, src) = locate(&[system, local], "server", Some("prot"));
        assert!(span.is_some());
        assert_eq!(src.unwrap().name(), "wagate.toml");
    }

    #[test]
    fn syntax_errors_point_into_the_bad_file() {
        let errors = syntax_errors(&[source("[server]\nport = 80\n"), source("[server\n")]);
        assert_eq!(errors.len(), 1);
        match &errors[0] {
            ConfigError::Syntax { span, src, .. } => {
                assert!(span.is_some());
                assert!(src.is_some());
            }
            other => panic!("expected Syntax, got {other:?}"),
        }
    }

    #[test]
    fn validation_errors_pick_up_spans() {
        let src = source("[phone]\nsuffix = \"c.us\"\n");
        let err = ConfigError::validation("phone.suffix", "must start with `@`").located(&[src]);
        match err {
            ConfigError::Validation { span, src, .. } => {
                assert!(span.is_some());
                assert!(src.is_some());
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn hint_lists_suggestion_then_valid_keys() {
        assert_eq!(
            hint(Some("port"), "keys", "host, port"),
            "did you mean `port`? Valid keys: host, port"
        );
        assert_eq!(hint(None, "sections", "server"), "valid sections: server");
    }
}
