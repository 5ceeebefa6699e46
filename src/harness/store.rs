//! Latest test result per endpoint

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::TestResult;

/// Shared map of endpoint id to its most recent [`TestResult`].
///
/// Cloning shares the underlying map. Results are advisory: a later write
/// for the same endpoint replaces the earlier one, whichever test started
/// first.
#[derive(Debug, Clone, Default)]
pub struct TestResultStore {
    results: Arc<RwLock<HashMap<String, TestResult>>>,
}

impl TestResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a result, returning the one it replaced
    pub fn record(&self, result: TestResult) -> Option<TestResult> {
        match self.results.write() {
            Ok(mut guard) => guard.insert(result.endpoint_id.clone(), result),
            Err(poisoned) => poisoned
                .into_inner()
                .insert(result.endpoint_id.clone(), result),
        }
    }

    pub fn get(&self, endpoint_id: &str) -> Option<TestResult> {
        self.results.read().ok()?.get(endpoint_id).cloned()
    }

    /// Every stored result, ordered by endpoint id
    pub fn all(&self) -> Vec<TestResult> {
        let mut results: Vec<TestResult> = self
            .results
            .read()
            .ok()
            .map(|guard| guard.values().cloned().collect())
            .unwrap_or_default();
        results.sort_by(|a, b| a.endpoint_id.cmp(&b.endpoint_id));
        results
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.results.write() {
            guard.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.results.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
