//! Caller-owned routing state.

use crate::config::RouteHistory;
use crate::search_path::SearchPath;

/// Prior search paths for one unit of work.
///
/// Create one per connection checkout and pass it by `&mut` into every
/// routing call made on that connection. It is never shared between
/// concurrent units of work, so two requests cannot observe each other's
/// namespace through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingContext {
    history: RouteHistory,
    prior: Vec<SearchPath>,
}

impl RoutingContext {
    /// Create an empty context with the given prior-path memory.
    pub fn new(history: RouteHistory) -> Self {
        Self {
            history,
            prior: Vec::new(),
        }
    }

    /// Context remembering one prior path.
    pub fn single() -> Self {
        Self::new(RouteHistory::Single)
    }

    /// Context remembering every prior path until restored.
    pub fn stacked() -> Self {
        Self::new(RouteHistory::Stack)
    }

    /// Prior-path memory of this context.
    pub fn history(&self) -> RouteHistory {
        self.history
    }

    /// Path the next `restore` returns to.
    pub fn prior(&self) -> Option<&SearchPath> {
        self.prior.last()
    }

    /// Number of remembered paths (at most 1 for [`RouteHistory::Single`]).
    pub fn depth(&self) -> usize {
        self.prior.len()
    }

    /// Forget every remembered path.
    pub fn clear(&mut self) {
        self.prior.clear();
    }

    pub(crate) fn record(&mut self, path: SearchPath) {
        if self.history == RouteHistory::Single {
            self.prior.clear();
        }
        self.prior.push(path);
    }

    pub(crate) fn pop(&mut self) -> Option<SearchPath> {
        self.prior.pop()
    }

    pub(crate) fn snapshot(&self) -> Vec<SearchPath> {
        self.prior.clone()
    }

    pub(crate) fn rollback(&mut self, snapshot: Vec<SearchPath>) {
        self.prior = snapshot;
    }
}
