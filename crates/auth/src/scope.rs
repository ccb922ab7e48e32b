use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A flat permission token of the form `resource:action`.
///
/// Scopes are compared by exact string match; there is no wildcard expansion
/// and no hierarchy at this layer. The accepted shape is
/// `[a-z][a-z0-9-]*:[a-z0-9*.-]+`, enforced on construction so a `Scope`
/// value is valid wherever it flows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Scope(String);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid scope: {0:?}")]
pub struct InvalidScope(pub String);

impl Scope {
    pub fn parse(value: &str) -> Result<Self, InvalidScope> {
        if Self::is_valid(value) {
            Ok(Self(value.to_string()))
        } else {
            Err(InvalidScope(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Character-wise check of the scope shape.
    ///
    /// Left segment: lowercase alphanumeric/hyphen, first character
    /// alphabetic. Right segment: lowercase alphanumeric plus `*`, `.`, `-`.
    pub fn is_valid(value: &str) -> bool {
        let Some((resource, action)) = value.split_once(':') else {
            return false;
        };

        let mut resource_chars = resource.chars();
        let Some(first) = resource_chars.next() else {
            return false;
        };
        if !first.is_ascii_lowercase() {
            return false;
        }
        if !resource_chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
            return false;
        }

        !action.is_empty()
            && action
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '*' | '.' | '-'))
    }
}

impl core::fmt::Display for Scope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for Scope {
    type Err = InvalidScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Scope {
    type Error = InvalidScope;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Scope::parse(&value)
    }
}

impl From<Scope> for String {
    fn from(value: Scope) -> Self {
        value.0
    }
}

/// Coerce an untrusted scope list into a well-formed scope set.
///
/// Entries that do not match the scope shape are dropped, duplicates are
/// collapsed keeping the first occurrence. Total; never fails, so
/// re-application is stable (`normalize(normalize(x)) == normalize(x)`).
pub fn normalize_scopes<'a, I>(values: I) -> Vec<Scope>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut scopes: Vec<Scope> = Vec::new();
    for value in values {
        let Ok(scope) = Scope::parse(value) else {
            continue;
        };
        if !scopes.contains(&scope) {
            scopes.push(scope);
        }
    }
    scopes
}
