//! Route templates with named path placeholders.
//!
//! A template such as `/sites/:siteId/hours/{kind}` is rendered against an
//! explicit [`PathVariables`] map. Both `:name` and `{name}` placeholders are
//! recognized, where a name is a run of ASCII letters, digits and `_`.
//!
//! Rendering is a single left-to-right pass: substituted values are never
//! rescanned, and a placeholder only ever matches its complete name, so
//! `:id` never touches `:identity`. The result therefore does not depend on
//! the order in which variables were inserted. Placeholders without a value
//! are left verbatim.

use std::collections::BTreeMap;

use crate::canonical::{CanonicalString, canonical_path, normalize_segment};
use crate::error::AuthError;
use crate::timestamp::Timestamp;

/// Resolved values for the placeholders of a [`RouteTemplate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathVariables(BTreeMap<String, String>);

impl PathVariables {
    /// An empty set of variables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a variable, returning `self` for chaining.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a variable.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// Look up a variable by placeholder name (without `:` or braces).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Whether no variables are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathVariables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A request path with named placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTemplate(String);

impl RouteTemplate {
    /// Wrap a template string.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// The raw template.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Names of all placeholders in the template, in order of appearance.
    #[must_use]
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut rest = self.0.as_str();
        while let Some(pos) = rest.find([':', '{']) {
            let tail = &rest[pos + 1..];
            let (name, next) = if rest[pos..].starts_with(':') {
                let len = ident_len(tail);
                (&tail[..len], &tail[len..])
            } else {
                match braced_name(tail) {
                    Some(name) => (name, &tail[name.len() + 1..]),
                    None => ("", tail),
                }
            };
            if !name.is_empty() {
                names.push(name);
            }
            rest = next;
        }
        names
    }

    /// Substitute placeholders with their values.
    ///
    /// Each value becomes a single path segment: raw characters the transport
    /// would escape are percent-encoded, escapes already present are kept.
    /// The output is the path put on the wire. Case is preserved;
    /// lower-casing happens in [`canonical_path`].
    ///
    /// # Examples
    ///
    /// ```
    /// use tcn_auth::template::{PathVariables, RouteTemplate};
    ///
    /// let template = RouteTemplate::new("/sites/:siteId/hours/{kind}");
    /// let vars = PathVariables::new().with("siteId", "7").with("kind", "urgent si");
    /// assert_eq!(template.render(&vars), "/sites/7/hours/urgent%20si");
    /// ```
    #[must_use]
    pub fn render(&self, variables: &PathVariables) -> String {
        let mut out = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();

        while let Some(pos) = rest.find([':', '{']) {
            out.push_str(&rest[..pos]);
            let marker = &rest[pos..=pos];
            let tail = &rest[pos + 1..];

            if marker == ":" {
                let len = ident_len(tail);
                match variables.get(&tail[..len]).filter(|_| len > 0) {
                    Some(value) => out.push_str(&normalize_segment(value)),
                    None => {
                        out.push(':');
                        out.push_str(&tail[..len]);
                    }
                }
                rest = &tail[len..];
            } else {
                match braced_name(tail).and_then(|name| Some((name, variables.get(name)?))) {
                    Some((name, value)) => {
                        out.push_str(&normalize_segment(value));
                        rest = &tail[name.len() + 1..];
                    }
                    None => {
                        out.push('{');
                        rest = tail;
                    }
                }
            }
        }

        out.push_str(rest);
        out
    }

    /// Render the template and canonicalize the result.
    #[must_use]
    pub fn canonical_path(&self, variables: &PathVariables) -> String {
        canonical_path(&self.render(variables))
    }

    /// Build the full canonical string for a request to this route.
    ///
    /// # Errors
    ///
    /// See [`CanonicalString::new`].
    pub fn canonical_string(
        &self,
        method: &str,
        variables: &PathVariables,
        timestamp: &Timestamp,
    ) -> Result<CanonicalString, AuthError> {
        CanonicalString::new(method, &self.render(variables), timestamp)
    }
}

impl From<&str> for RouteTemplate {
    fn from(template: &str) -> Self {
        Self::new(template)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Length in bytes of the identifier at the start of `s`.
fn ident_len(s: &str) -> usize {
    s.find(|c: char| !is_ident_char(c)).unwrap_or(s.len())
}

/// The name inside `{name}`, given the text after the opening brace.
fn braced_name(after_brace: &str) -> Option<&str> {
    let end = after_brace.find('}')?;
    let name = &after_brace[..end];
    (!name.is_empty() && name.chars().all(is_ident_char)).then_some(name)
}
