//! Test doubles for the external services.

use keyql::services::{CategoryGraph, PageLookup, ServiceError, Services};
use keyql::utils::SiteConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Category graph answering from a fixed table and counting calls
pub struct CountingGraph {
    trees: HashMap<String, Result<Vec<String>, ServiceError>>,
    calls: AtomicUsize,
}

impl CountingGraph {
    pub fn new() -> Self {
        Self {
            trees: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_tree(mut self, root: &str, closure: &[&str]) -> Self {
        self.trees.insert(
            root.to_string(),
            Ok(closure.iter().map(|c| c.to_string()).collect()),
        );
        self
    }

    pub fn with_failure(mut self, root: &str, err: ServiceError) -> Self {
        self.trees.insert(root.to_string(), Err(err));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CategoryGraph for CountingGraph {
    fn subcategories(
        &self,
        _site: &SiteConfig,
        root: &str,
        _max_depth: u32,
        limit: usize,
    ) -> Result<Vec<String>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.trees.get(root) {
            Some(Ok(closure)) => Ok(closure.iter().take(limit + 1).cloned().collect()),
            Some(Err(err)) => Err(err.clone()),
            None => Ok(vec![root.to_string()]),
        }
    }
}

/// Page lookup answering from a fixed id table and counting calls
pub struct CountingPages {
    titles: HashMap<u64, String>,
    calls: AtomicUsize,
}

impl CountingPages {
    pub fn new(titles: &[(u64, &str)]) -> Self {
        Self {
            titles: titles.iter().map(|(id, t)| (*id, t.to_string())).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageLookup for CountingPages {
    fn titles_by_id(&self, _site: &SiteConfig, ids: &[u64]) -> Result<Vec<(u64, String)>, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ids
            .iter()
            .filter_map(|id| self.titles.get(id).map(|t| (*id, t.clone())))
            .collect())
    }
}

pub fn services(graph: &Arc<CountingGraph>, pages: &Arc<CountingPages>) -> Services {
    Services::new(graph.clone(), pages.clone())
}
