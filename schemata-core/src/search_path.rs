//! Search path values.
//!
//! A [`SearchPath`] is the ordered list of namespaces a session consults to
//! resolve unqualified table names.

use crate::error::{SchemaError, SchemaResult};
use crate::identifier::{USER_PLACEHOLDER, assert_safe};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Ordered list of namespace names, optionally containing `$user`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchPath(Vec<String>);

impl SearchPath {
    /// Build a validated, non-empty path.
    ///
    /// # Examples
    ///
    /// ```
    /// use schemata_core::SearchPath;
    ///
    /// let path = SearchPath::new(["acme", "public"]).unwrap();
    /// assert_eq!(path.to_sql(), "acme,public");
    /// assert!(SearchPath::new(["acme;--"]).is_err());
    /// ```
    pub fn new<I, S>(entries: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = Self(entries.into_iter().map(Into::into).collect());
        path.validate()?;
        Ok(path)
    }

    /// A path holding exactly one namespace.
    pub fn single(name: impl Into<String>) -> SchemaResult<Self> {
        Self::new([name.into()])
    }

    /// PostgreSQL's own default, `"$user", public`.
    pub fn postgres_default() -> Self {
        Self(vec![USER_PLACEHOLDER.to_string(), "public".to_string()])
    }

    /// Parse the text form reported by the server (`current_setting('search_path')`).
    ///
    /// Entries are split on commas and trimmed. Quotes are dropped where the
    /// server would resolve the bare name to the same namespace; a quoted
    /// entry containing upper case keeps its quotes, since folding it would
    /// name a different namespace. No validation is done here: the value is
    /// read verbatim and only validated when it is applied to a session again.
    pub fn parse(raw: &str) -> Self {
        let entries = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| match unquote(entry) {
                Some(inner) if inner.bytes().any(|b| b.is_ascii_uppercase()) => entry.to_string(),
                Some(inner) => inner.to_string(),
                None => entry.to_string(),
            })
            .collect();
        Self(entries)
    }

    /// Entries in resolution order.
    pub fn entries(&self) -> &[String] {
        &self.0
    }

    /// First entry, if any.
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Whether the path has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check every entry with the identifier validator and reject empty paths.
    ///
    /// A quoted entry is checked on the name between its quotes.
    pub fn validate(&self) -> SchemaResult<()> {
        if self.0.is_empty() {
            return Err(SchemaError::EmptyPath);
        }
        self.0
            .iter()
            .try_for_each(|entry| assert_safe(unquote(entry).unwrap_or(entry)))
    }

    /// Render for `SET search_path = ...`. Only call on a validated path.
    pub fn to_sql(&self) -> String {
        self.0.iter().map(|entry| render(entry)).collect::<Vec<_>>().join(",")
    }

    /// Namespace names the server resolves this path to, in order.
    pub fn resolved(&self) -> impl Iterator<Item = Cow<'_, str>> {
        self.0.iter().map(|entry| resolve_entry(entry))
    }

    /// Compare as PostgreSQL resolves the entries: unquoted names are ASCII
    /// case folded, quoted names are taken as written.
    pub fn resolves_to(&self, other: &SearchPath) -> bool {
        self.resolved().eq(other.resolved())
    }
}

/// The namespace name the server resolves one path entry to.
///
/// ```
/// use schemata_core::search_path::resolve_entry;
///
/// assert_eq!(resolve_entry("Acme"), "acme");
/// assert_eq!(resolve_entry("\"Acme\""), "Acme");
/// assert_eq!(resolve_entry("$user"), "$user");
/// ```
pub fn resolve_entry(entry: &str) -> Cow<'_, str> {
    match unquote(entry) {
        Some(inner) => Cow::Borrowed(inner),
        None if entry.bytes().any(|b| b.is_ascii_uppercase()) => Cow::Owned(entry.to_ascii_lowercase()),
        None => Cow::Borrowed(entry),
    }
}

fn unquote(entry: &str) -> Option<&str> {
    entry
        .strip_prefix('"')
        .and_then(|e| e.strip_suffix('"'))
        .filter(|inner| !inner.is_empty())
}

fn render(entry: &str) -> Cow<'_, str> {
    if entry == USER_PLACEHOLDER {
        Cow::Owned(format!("\"{}\"", USER_PLACEHOLDER))
    } else {
        Cow::Borrowed(entry)
    }
}

impl fmt::Display for SearchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&render(entry))?;
        }
        Ok(())
    }
}

impl FromStr for SearchPath {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = Self::parse(s);
        path.validate()?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_text() {
        let path = SearchPath::parse("\"$user\", public");
        assert_eq!(path.entries(), ["$user", "public"]);
        assert_eq!(path, SearchPath::postgres_default());

        assert_eq!(SearchPath::parse("acme").entries(), ["acme"]);
        assert!(SearchPath::parse("").is_empty());
    }

    #[test]
    fn test_render() {
        let path = SearchPath::postgres_default();
        assert_eq!(path.to_sql(), "\"$user\",public");
        assert_eq!(path.to_string(), "\"$user\", public");
        assert_eq!(SearchPath::parse(&path.to_string()), path);
    }

    #[test]
    fn test_new_validates_entries() {
        assert!(SearchPath::new(["acme", "$user"]).is_ok());
        assert!(matches!(
            SearchPath::new(["acme", "public;DROP"]),
            Err(SchemaError::InjectionRisk(name)) if name == "public;DROP"
        ));
        let empty = SearchPath::new(Vec::<String>::new());
        assert!(matches!(empty, Err(SchemaError::EmptyPath)));
        assert!(empty.unwrap_err().is_invalid_path());
    }

    #[test]
    fn test_from_str() {
        let path: SearchPath = "tenant1, public".parse().unwrap();
        assert_eq!(path.entries(), ["tenant1", "public"]);
        assert!("tenant-1".parse::<SearchPath>().is_err());
    }

    #[test]
    fn test_resolves_to_folds_case() {
        let requested = SearchPath::single("Acme").unwrap();
        let reported = SearchPath::parse("acme");
        assert!(reported.resolves_to(&requested));
        assert!(!SearchPath::parse("acme, public").resolves_to(&requested));
    }

    #[test]
    fn test_quoted_mixed_case_entries_keep_their_quotes() {
        let path = SearchPath::parse("\"Acme\", \"globex\", public");
        assert_eq!(path.entries(), ["\"Acme\"", "globex", "public"]);
        assert!(path.validate().is_ok());
        assert_eq!(path.to_sql(), "\"Acme\",globex,public");
        assert_eq!(path.resolved().collect::<Vec<_>>(), ["Acme", "globex", "public"]);

        // the bare spelling folds to another namespace
        assert!(!path.resolves_to(&SearchPath::new(["Acme", "globex", "public"]).unwrap()));
        assert!(SearchPath::parse("Acme").resolves_to(&SearchPath::parse("acme")));
    }

    #[test]
    fn test_quoted_entries_are_still_validated() {
        let hostile = SearchPath::parse("\"Acme;DROP\"");
        assert!(matches!(hostile.validate(), Err(SchemaError::InjectionRisk(name)) if name == "Acme;DROP"));
        assert!(SearchPath::parse("\"\"").validate().is_err());
    }
}
