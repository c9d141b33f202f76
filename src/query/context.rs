//! Request-scoped accumulator threaded through the keyword pipeline.

use crate::query::diagnostics::Diagnostic;
use crate::query::feature::{ExpandedValue, NodeKey};
use crate::query::filter::{FilterNode, HighlightField, RescoreComponent};
use serde::Serialize;
use std::collections::HashMap;

/// Search type reported when no keyword syntax was used
pub const FULL_TEXT_SEARCH_TYPE: &str = "full_text";

/// Weight of a syntax name when picking the search type
fn syntax_weight(syntax: &str) -> u64 {
    match syntax {
        "regex" => u64::MAX,
        "deepcategory" => 20,
        "prefix" => 2,
        _ => 1,
    }
}

/// Namespaces a query is restricted to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceScope {
    /// Every namespace, overriding any earlier restriction
    All,
    Only(Vec<i64>),
}

/// Mutable state for compiling one query.
///
/// Created fresh for each query and dropped after the request. The
/// results-possible flag can only go from true to false.
#[derive(Debug, Clone, Serialize)]
pub struct QueryBuildContext {
    filters: Vec<FilterNode>,
    not_filters: Vec<FilterNode>,
    diagnostics: Vec<Diagnostic>,
    /// Insertion-ordered (syntax, weight) pairs
    syntax_used: Vec<(String, u64)>,
    results_possible: bool,
    rescore: Vec<RescoreComponent>,
    highlights: Vec<HighlightField>,
    required_namespaces: Option<NamespaceScope>,
    #[serde(skip)]
    expansions: HashMap<NodeKey, Option<ExpandedValue>>,
}

impl Default for QueryBuildContext {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuildContext {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
            not_filters: Vec::new(),
            diagnostics: Vec::new(),
            syntax_used: Vec::new(),
            results_possible: true,
            rescore: Vec::new(),
            highlights: Vec::new(),
            required_namespaces: None,
            expansions: HashMap::new(),
        }
    }

    pub fn add_filter(&mut self, filter: FilterNode) {
        self.filters.push(filter);
    }

    pub fn add_not_filter(&mut self, filter: FilterNode) {
        self.not_filters.push(filter);
    }

    /// Mark the query as unable to return anything. There is no way back.
    pub fn clear_results_possible(&mut self) {
        self.results_possible = false;
    }

    pub fn results_possible(&self) -> bool {
        self.results_possible
    }

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn add_syntax_used(&mut self, syntax: &str) {
        if !self.is_syntax_used(syntax) {
            self.syntax_used
                .push((syntax.to_string(), syntax_weight(syntax)));
        }
    }

    pub fn is_syntax_used(&self, syntax: &str) -> bool {
        self.syntax_used.iter().any(|(s, _)| s == syntax)
    }

    /// Syntax names in first-use order
    pub fn syntax_used(&self) -> impl Iterator<Item = &str> {
        self.syntax_used.iter().map(|(s, _)| s.as_str())
    }

    /// Heaviest syntax used, first one wins ties
    pub fn search_type(&self) -> &str {
        let mut best: Option<&(String, u64)> = None;
        for entry in &self.syntax_used {
            if best.is_none_or(|b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map_or(FULL_TEXT_SEARCH_TYPE, |(s, _)| s.as_str())
    }

    pub fn add_rescore_component(&mut self, component: RescoreComponent) {
        self.rescore.push(component);
    }

    pub fn add_highlight_field(&mut self, field: HighlightField) {
        self.highlights.push(field);
    }

    /// Restrict the query's namespaces. Explicit lists intersect earlier
    /// lists, [`NamespaceScope::All`] replaces whatever came before.
    pub fn require_namespaces(&mut self, scope: NamespaceScope) {
        self.required_namespaces = Some(match (self.required_namespaces.take(), scope) {
            (_, NamespaceScope::All) => NamespaceScope::All,
            (Some(NamespaceScope::Only(existing)), NamespaceScope::Only(namespaces)) => NamespaceScope::Only(
                existing
                    .into_iter()
                    .filter(|ns| namespaces.contains(ns))
                    .collect(),
            ),
            (_, only) => only,
        });
    }

    pub fn required_namespaces(&self) -> Option<&NamespaceScope> {
        self.required_namespaces.as_ref()
    }

    pub fn filters(&self) -> &[FilterNode] {
        &self.filters
    }

    pub fn not_filters(&self) -> &[FilterNode] {
        &self.not_filters
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn rescore_components(&self) -> &[RescoreComponent] {
        &self.rescore
    }

    pub fn highlight_fields(&self) -> &[HighlightField] {
        &self.highlights
    }

    /// Cached expansion for a node. The outer `None` means "not expanded yet",
    /// the inner one means "expanded to nothing".
    pub fn expansion(&self, key: &NodeKey) -> Option<Option<&ExpandedValue>> {
        self.expansions.get(key).map(Option::as_ref)
    }

    pub fn cache_expansion(&mut self, key: NodeKey, expanded: Option<ExpandedValue>) {
        self.expansions.insert(key, expanded);
    }

    /// Copy of the post-parse state for another site.
    ///
    /// Parse-phase results (diagnostics, syntax usage, results-possible) are
    /// shared. Filters, registrations and expansions are per site.
    pub fn fork_for_site(&self) -> Self {
        Self {
            filters: Vec::new(),
            not_filters: Vec::new(),
            diagnostics: self.diagnostics.clone(),
            syntax_used: self.syntax_used.clone(),
            results_possible: self.results_possible,
            rescore: Vec::new(),
            highlights: Vec::new(),
            required_namespaces: None,
            expansions: HashMap::new(),
        }
    }

    /// Single filter combining the included and excluded clauses
    pub fn combined_filter(&self) -> FilterNode {
        if !self.results_possible {
            return FilterNode::MatchNone;
        }
        if self.filters.is_empty() && self.not_filters.is_empty() {
            return FilterNode::MatchAll;
        }
        FilterNode::Bool {
            must: self.filters.clone(),
            should: Vec::new(),
            must_not: self.not_filters.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::diagnostics::MessageKey;

    #[test]
    fn test_results_possible_only_clears() {
        let mut ctx = QueryBuildContext::new();
        assert!(ctx.results_possible());
        ctx.clear_results_possible();
        ctx.add_filter(FilterNode::MatchAll);
        assert!(!ctx.results_possible());
        assert_eq!(ctx.combined_filter(), FilterNode::MatchNone);
    }

    #[test]
    fn test_search_type_picks_heaviest_syntax() {
        let mut ctx = QueryBuildContext::new();
        assert_eq!(ctx.search_type(), FULL_TEXT_SEARCH_TYPE);

        ctx.add_syntax_used("intitle");
        ctx.add_syntax_used("prefix");
        ctx.add_syntax_used("deepcategory");
        assert_eq!(ctx.search_type(), "deepcategory");

        ctx.add_syntax_used("regex");
        assert_eq!(ctx.search_type(), "regex");
    }

    #[test]
    fn test_syntax_recorded_once() {
        let mut ctx = QueryBuildContext::new();
        ctx.add_syntax_used("intitle");
        ctx.add_syntax_used("intitle");
        assert_eq!(ctx.syntax_used().count(), 1);
        assert!(ctx.is_syntax_used("intitle"));
    }

    #[test]
    fn test_fork_keeps_parse_state_only() {
        let mut ctx = QueryBuildContext::new();
        ctx.add_diagnostic(Diagnostic::new(MessageKey::FeatureNotAvailable));
        ctx.add_syntax_used("deepcategory");
        ctx.add_filter(FilterNode::term("category", "Music"));

        let fork = ctx.fork_for_site();
        assert_eq!(fork.diagnostics().len(), 1);
        assert!(fork.is_syntax_used("deepcategory"));
        assert!(fork.filters().is_empty());
    }

    #[test]
    fn test_required_namespaces_intersect() {
        let mut ctx = QueryBuildContext::new();
        ctx.require_namespaces(NamespaceScope::Only(vec![0, 1, 14]));
        ctx.require_namespaces(NamespaceScope::Only(vec![14, 6]));
        assert_eq!(ctx.required_namespaces(), Some(&NamespaceScope::Only(vec![14])));
    }

    #[test]
    fn test_all_namespaces_overrides_restriction() {
        let mut ctx = QueryBuildContext::new();
        assert_eq!(ctx.required_namespaces(), None);
        ctx.require_namespaces(NamespaceScope::Only(vec![0]));
        ctx.require_namespaces(NamespaceScope::All);
        assert_eq!(ctx.required_namespaces(), Some(&NamespaceScope::All));

        ctx.require_namespaces(NamespaceScope::Only(vec![4]));
        assert_eq!(ctx.required_namespaces(), Some(&NamespaceScope::Only(vec![4])));
    }

    #[test]
    fn test_combined_filter_without_clauses_matches_all() {
        let ctx = QueryBuildContext::new();
        assert_eq!(ctx.combined_filter(), FilterNode::MatchAll);
    }
}
