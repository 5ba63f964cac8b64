//! Tenancy configuration.

use crate::error::{SchemaError, SchemaResult};
use crate::search_path::SearchPath;
use serde::{Deserialize, Serialize};

/// How many prior search paths a [`RoutingContext`](crate::RoutingContext) remembers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteHistory {
    /// One slot, overwritten by every switch. A second switch before a
    /// restore loses the path from before the first switch, and `restore`
    /// is itself a switch (two restores toggle back and forth).
    #[default]
    Single,
    /// A stack: every switch pushes, every restore pops. Nested switches
    /// unwind in order.
    Stack,
}

impl RouteHistory {
    /// Parse `single` or `stack`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Some(RouteHistory::Single),
            "stack" | "stacked" => Some(RouteHistory::Stack),
            _ => None,
        }
    }
}

/// Configuration shared by the registry, router and provisioner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenancyConfig {
    /// Path applied by `default_path` (PostgreSQL's `"$user", public`).
    #[serde(default = "default_search_path")]
    pub default_search_path: SearchPath,

    /// Namespaces that exist alongside tenants and are not listed as tenants.
    #[serde(default = "default_shared_namespaces")]
    pub shared_namespaces: Vec<String>,

    /// Check that every namespace on a path exists before applying it.
    /// PostgreSQL itself accepts paths naming absent namespaces.
    #[serde(default = "default_verify_namespaces")]
    pub verify_namespaces: bool,

    /// Prior-path memory of routing contexts created from this config.
    #[serde(default)]
    pub history: RouteHistory,
}

fn default_search_path() -> SearchPath {
    SearchPath::postgres_default()
}

fn default_shared_namespaces() -> Vec<String> {
    vec!["information_schema".to_string(), "public".to_string()]
}

fn default_verify_namespaces() -> bool {
    true
}

impl TenancyConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self {
            default_search_path: default_search_path(),
            shared_namespaces: default_shared_namespaces(),
            verify_namespaces: default_verify_namespaces(),
            history: RouteHistory::default(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// - `SCHEMATA_DEFAULT_SEARCH_PATH`: comma-separated path (default `"$user", public`)
    /// - `SCHEMATA_SHARED_NAMESPACES`: comma-separated names excluded from tenant listings
    /// - `SCHEMATA_VERIFY_NAMESPACES`: `true`/`false`
    /// - `SCHEMATA_ROUTE_HISTORY`: `single` or `stack`
    pub fn from_env() -> SchemaResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from the same variables as [`from_env`](Self::from_env),
    /// read through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> SchemaResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(path) = lookup("SCHEMATA_DEFAULT_SEARCH_PATH") {
            config.default_search_path = path.parse().map_err(|e| {
                SchemaError::Config(format!("Invalid SCHEMATA_DEFAULT_SEARCH_PATH: {e}"))
            })?;
        }

        if let Some(names) = lookup("SCHEMATA_SHARED_NAMESPACES") {
            config.shared_namespaces = names
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some(verify) = lookup("SCHEMATA_VERIFY_NAMESPACES") {
            config.verify_namespaces = verify.parse().map_err(|_| {
                SchemaError::Config("Invalid SCHEMATA_VERIFY_NAMESPACES".to_string())
            })?;
        }

        if let Some(history) = lookup("SCHEMATA_ROUTE_HISTORY") {
            config.history = RouteHistory::parse(&history)
                .ok_or_else(|| SchemaError::Config("Invalid SCHEMATA_ROUTE_HISTORY".to_string()))?;
        }

        Ok(config)
    }

    /// Set the default search path.
    pub fn with_default_search_path(mut self, path: SearchPath) -> Self {
        self.default_search_path = path;
        self
    }

    /// Set the shared (non-tenant) namespaces.
    pub fn with_shared_namespaces<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared_namespaces = names.into_iter().map(Into::into).collect();
        self
    }

    /// Enable or disable namespace checks before applying a path.
    pub fn with_verify_namespaces(mut self, verify: bool) -> Self {
        self.verify_namespaces = verify;
        self
    }

    /// Set the prior-path memory.
    pub fn with_history(mut self, history: RouteHistory) -> Self {
        self.history = history;
        self
    }

    /// Whether `name` is one of the shared namespaces.
    pub fn is_shared(&self, name: &str) -> bool {
        self.shared_namespaces
            .iter()
            .any(|shared| shared.eq_ignore_ascii_case(name))
    }
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self::new()
    }
}
