//! Per-scenario state carrier.
//!
//! Values captured by read steps live here until the scenario ends; they
//! survive navigations but never leak into another scenario. Loop bindings
//! (`index`, `ordinal`) set by `ForEach` live alongside them and are
//! substituted into step parameters with `{name}` placeholders; `{{` and
//! `}}` stand for literal braces.

use crate::result::{VitrineError, VitrineResult};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{\{|\}\}|\{(\w+)\}").expect("placeholder pattern"))
}

/// Double every brace in `text` so [`Context::expand`] yields it unchanged
#[must_use]
pub fn escape_placeholders(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}

/// Captured values and loop bindings for one scenario run
#[derive(Debug, Clone, Default)]
pub struct Context {
    captures: HashMap<String, String>,
    bindings: HashMap<String, usize>,
}

impl Context {
    /// Create an empty context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any earlier capture
    pub fn capture(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        tracing::debug!(key = %key, value = %value, "captured");
        self.captures.insert(key, value);
    }

    /// Value captured under `key`.
    ///
    /// # Errors
    ///
    /// `MissingCapture` if nothing was captured under `key` in this scenario.
    pub fn recall(&self, key: &str) -> VitrineResult<&str> {
        self.captures
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| VitrineError::MissingCapture {
                key: key.to_string(),
            })
    }

    /// Number of captured values
    #[must_use]
    pub fn len(&self) -> usize {
        self.captures.len()
    }

    /// Whether nothing has been captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    /// Set a loop binding
    pub fn bind(&mut self, name: impl Into<String>, value: usize) {
        self.bindings.insert(name.into(), value);
    }

    /// Remove a loop binding
    pub fn unbind(&mut self, name: &str) {
        self.bindings.remove(name);
    }

    /// Current value of a loop binding
    #[must_use]
    pub fn binding(&self, name: &str) -> Option<usize> {
        self.bindings.get(name).copied()
    }

    /// Replace every `{name}` in `template` with its loop binding and
    /// collapse `{{`/`}}` to single braces.
    ///
    /// # Errors
    ///
    /// `InvalidStep` if a placeholder names no active binding.
    pub fn expand(&self, template: &str) -> VitrineResult<String> {
        if !template.contains(|c: char| c == '{' || c == '}') {
            return Ok(template.to_string());
        }
        let mut unknown = None;
        let expanded = placeholder().replace_all(template, |caps: &Captures<'_>| {
            let Some(name) = caps.get(1).map(|m| m.as_str()) else {
                return caps[0][..1].to_string();
            };
            self.bindings.get(name).map_or_else(
                || {
                    unknown.get_or_insert_with(|| name.to_string());
                    String::new()
                },
                ToString::to_string,
            )
        });
        match unknown {
            Some(name) => Err(VitrineError::invalid_step(format!(
                "unknown placeholder {{{name}}} in {template:?}"
            ))),
            None => Ok(expanded.into_owned()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod capture_tests {
        use super::*;

        #[test]
        fn test_capture_then_recall() {
            let mut ctx = Context::new();
            ctx.capture("itemName@0", "Sauce Labs Backpack");
            assert_eq!(ctx.recall("itemName@0").unwrap(), "Sauce Labs Backpack");
            assert_eq!(ctx.len(), 1);
        }

        #[test]
        fn test_recall_missing_is_hard_error() {
            let ctx = Context::new();
            let err = ctx.recall("itemName@0").unwrap_err();
            assert!(matches!(err, VitrineError::MissingCapture { key } if key == "itemName@0"));
        }

        #[test]
        fn test_empty_capture_is_still_a_capture() {
            let mut ctx = Context::new();
            ctx.capture("alt", "");
            assert_eq!(ctx.recall("alt").unwrap(), "");
        }

        #[test]
        fn test_fresh_context_has_nothing() {
            let mut first = Context::new();
            first.capture("k", "v");
            let second = Context::new();
            assert!(second.is_empty());
            assert!(second.recall("k").is_err());
        }
    }

    mod expand_tests {
        use super::*;

        #[test]
        fn test_expand_bindings() {
            let mut ctx = Context::new();
            ctx.bind("index", 2);
            ctx.bind("ordinal", 3);
            assert_eq!(ctx.expand("itemName@{index}").unwrap(), "itemName@2");
            assert_eq!(ctx.expand("{ordinal}").unwrap(), "3");
        }

        #[test]
        fn test_expand_without_placeholders_is_identity() {
            let ctx = Context::new();
            assert_eq!(
                ctx.expand("[data-test=\"username\"]").unwrap(),
                "[data-test=\"username\"]"
            );
        }

        #[test]
        fn test_unknown_placeholder_is_invalid_step() {
            let mut ctx = Context::new();
            ctx.bind("index", 0);
            ctx.unbind("index");
            let err = ctx.expand("item-{index}").unwrap_err();
            assert!(err.to_string().contains("{index}"));
        }

        #[test]
        fn test_doubled_braces_are_literal() {
            let mut ctx = Context::new();
            ctx.bind("index", 1);
            assert_eq!(ctx.expand("p{{word}}1").unwrap(), "p{word}1");
            assert_eq!(ctx.expand("{{{index}}}").unwrap(), "{1}");
        }

        #[test]
        fn test_escaped_text_expands_to_itself() {
            let ctx = Context::new();
            let password = "p{word}1}";
            assert_eq!(ctx.expand(&escape_placeholders(password)).unwrap(), password);
        }
    }

    proptest! {
        #[test]
        fn prop_capture_recall_round_trip(key in "[a-zA-Z@0-9]{1,16}", value in ".*") {
            let mut ctx = Context::new();
            ctx.capture(key.clone(), value.clone());
            prop_assert_eq!(ctx.recall(&key).unwrap(), value.as_str());
        }

        #[test]
        fn prop_last_capture_wins(key in "[a-z]{1,8}", a in ".*", b in ".*") {
            let mut ctx = Context::new();
            ctx.capture(key.clone(), a);
            ctx.capture(key.clone(), b.clone());
            prop_assert_eq!(ctx.recall(&key).unwrap(), b.as_str());
        }

        #[test]
        fn prop_escape_then_expand_is_identity(text in ".*") {
            let ctx = Context::new();
            prop_assert_eq!(ctx.expand(&escape_placeholders(&text)).unwrap(), text);
        }
    }
}
