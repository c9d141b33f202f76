//! The keyword feature contract.
//!
//! A feature implements [`KeywordFeature`] with its own typed parsed and
//! expanded data. The pipeline stores features behind the object-safe
//! [`DynFeature`] adapter, which erases those types and restores them when
//! calling back into the feature.

use crate::query::context::NamespaceScope;
use crate::query::diagnostics::Diagnostic;
use crate::query::filter::{FilterNode, HighlightField, RescoreComponent};
use crate::query::grammar::KeywordGrammar;
use crate::query::strategy::CrossSearchStrategy;
use crate::query::tokenizer::RawMatch;
use crate::utils::SiteConfig;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Type-erased parsed value, shared read-only between contexts
pub type ParsedValue = Arc<dyn Any + Send + Sync>;

/// Type-erased expansion result
pub type ExpandedValue = Arc<dyn Any + Send + Sync>;

/// Result of parsing a keyword value
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome<T> {
    /// Keep the match with this parsed value
    Parsed(T),
    /// Malformed or unusable: drop the match and report the diagnostic
    Dropped(Diagnostic),
    /// Drop the match and make the whole query return nothing.
    /// Only honored for grammars that allow an empty value.
    Refused(Diagnostic),
}

/// One recognized keyword occurrence (an AST node)
#[derive(Debug, Clone, Serialize)]
pub struct KeywordNode {
    /// Position in the node list (registration order, then text order)
    pub id: usize,
    /// Index of the owning feature in the pipeline
    pub feature: usize,
    pub key: String,
    pub value: String,
    pub quoted_value: String,
    pub delimiter: Option<char>,
    pub suffix: String,
    pub negated: bool,
    /// Syntax name recorded for this match
    pub syntax: String,
    /// Debug rendering of the parsed value
    #[serde(rename = "parsed")]
    pub parsed_summary: String,
    #[serde(skip)]
    pub(crate) parsed: ParsedValue,
}

impl KeywordNode {
    /// Typed view of the parsed value
    pub fn parsed<T: Any>(&self) -> Option<&T> {
        self.parsed.downcast_ref::<T>()
    }

    /// Memoization key: identical occurrences share one expansion
    pub fn cache_key(&self) -> NodeKey {
        NodeKey {
            feature: self.feature,
            key: self.key.clone(),
            value: self.value.clone(),
            delimiter: self.delimiter,
            suffix: self.suffix.clone(),
        }
    }
}

/// Identity of a node for expansion caching
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    feature: usize,
    key: String,
    value: String,
    delimiter: Option<char>,
    suffix: String,
}

/// A pluggable keyword family.
///
/// `parse_value` must never panic on user input. `build_filter` must only use
/// the parsed and expanded data; returning `None` means "matches nothing".
pub trait KeywordFeature: Send + Sync + 'static {
    type Parsed: fmt::Debug + Send + Sync + 'static;
    type Expanded: fmt::Debug + Send + Sync + 'static;

    /// Stable name used in listings and logs
    fn name(&self) -> &'static str;

    fn grammar(&self) -> KeywordGrammar;

    /// Name recorded in the syntax usage counters
    fn syntax_name(&self, key: &str, _delimiter: Option<char>) -> String {
        key.to_string()
    }

    fn parse_value(
        &self,
        raw: &RawMatch,
        warnings: &mut Vec<Diagnostic>,
    ) -> ParseOutcome<Self::Parsed>;

    /// Whether the quoted value stays in the residual text as a scoring signal
    fn keep_text(&self, _raw: &RawMatch, _parsed: &Self::Parsed) -> bool {
        false
    }

    fn cross_search_strategy(
        &self,
        _node: &KeywordNode,
        _parsed: &Self::Parsed,
    ) -> CrossSearchStrategy {
        CrossSearchStrategy::HostOnly
    }

    /// Whether `expand` has anything to do for this value
    fn needs_expansion(&self, _parsed: &Self::Parsed) -> bool {
        false
    }

    /// Resolve the parsed value against an external resource for `site`
    fn expand(
        &self,
        _parsed: &Self::Parsed,
        _site: &SiteConfig,
        _warnings: &mut Vec<Diagnostic>,
    ) -> Option<Self::Expanded> {
        None
    }

    fn build_filter(
        &self,
        parsed: &Self::Parsed,
        expanded: Option<&Self::Expanded>,
    ) -> Option<FilterNode>;

    fn highlight_fields(
        &self,
        _parsed: &Self::Parsed,
        _expanded: Option<&Self::Expanded>,
    ) -> Vec<HighlightField> {
        Vec::new()
    }

    fn rescore_components(&self, _parsed: &Self::Parsed) -> Vec<RescoreComponent> {
        Vec::new()
    }

    /// Namespaces the whole query must be restricted to, if any
    fn required_namespaces(&self, _parsed: &Self::Parsed) -> Option<NamespaceScope> {
        None
    }
}

/// Parsed value together with what the tokenizer needs to know about it
pub(crate) struct ParsedEntry {
    pub value: ParsedValue,
    pub summary: String,
    pub keep_text: bool,
}

/// Object-safe adapter over [`KeywordFeature`]
pub(crate) trait DynFeature: Send + Sync {
    fn name(&self) -> &'static str;
    fn syntax_name(&self, key: &str, delimiter: Option<char>) -> String;
    fn parse(&self, raw: &RawMatch, warnings: &mut Vec<Diagnostic>) -> ParseOutcome<ParsedEntry>;
    fn strategy(&self, node: &KeywordNode) -> CrossSearchStrategy;
    fn needs_expansion(&self, node: &KeywordNode) -> bool;
    fn expand(
        &self,
        node: &KeywordNode,
        site: &SiteConfig,
        warnings: &mut Vec<Diagnostic>,
    ) -> Option<ExpandedValue>;
    fn build_filter(&self, node: &KeywordNode, expanded: Option<&ExpandedValue>) -> Option<FilterNode>;
    fn highlight_fields(&self, node: &KeywordNode, expanded: Option<&ExpandedValue>) -> Vec<HighlightField>;
    fn rescore_components(&self, node: &KeywordNode) -> Vec<RescoreComponent>;
    fn required_namespaces(&self, node: &KeywordNode) -> Option<NamespaceScope>;
}

impl<F: KeywordFeature> DynFeature for F {
    fn name(&self) -> &'static str {
        KeywordFeature::name(self)
    }

    fn syntax_name(&self, key: &str, delimiter: Option<char>) -> String {
        KeywordFeature::syntax_name(self, key, delimiter)
    }

    fn parse(&self, raw: &RawMatch, warnings: &mut Vec<Diagnostic>) -> ParseOutcome<ParsedEntry> {
        match self.parse_value(raw, warnings) {
            ParseOutcome::Parsed(parsed) => {
                let keep_text = self.keep_text(raw, &parsed);
                ParseOutcome::Parsed(ParsedEntry {
                    summary: format!("{parsed:?}"),
                    keep_text,
                    value: Arc::new(parsed),
                })
            }
            ParseOutcome::Dropped(d) => ParseOutcome::Dropped(d),
            ParseOutcome::Refused(d) => ParseOutcome::Refused(d),
        }
    }

    fn strategy(&self, node: &KeywordNode) -> CrossSearchStrategy {
        match node.parsed::<F::Parsed>() {
            Some(parsed) => KeywordFeature::cross_search_strategy(self, node, parsed),
            None => CrossSearchStrategy::HostOnly,
        }
    }

    fn needs_expansion(&self, node: &KeywordNode) -> bool {
        node.parsed::<F::Parsed>()
            .is_some_and(|parsed| KeywordFeature::needs_expansion(self, parsed))
    }

    fn expand(
        &self,
        node: &KeywordNode,
        site: &SiteConfig,
        warnings: &mut Vec<Diagnostic>,
    ) -> Option<ExpandedValue> {
        let parsed = node.parsed::<F::Parsed>()?;
        KeywordFeature::expand(self, parsed, site, warnings)
            .map(|expanded| Arc::new(expanded) as ExpandedValue)
    }

    fn build_filter(&self, node: &KeywordNode, expanded: Option<&ExpandedValue>) -> Option<FilterNode> {
        let parsed = node.parsed::<F::Parsed>()?;
        let expanded = expanded.and_then(|e| e.downcast_ref::<F::Expanded>());
        KeywordFeature::build_filter(self, parsed, expanded)
    }

    fn highlight_fields(&self, node: &KeywordNode, expanded: Option<&ExpandedValue>) -> Vec<HighlightField> {
        let Some(parsed) = node.parsed::<F::Parsed>() else {
            return Vec::new();
        };
        let expanded = expanded.and_then(|e| e.downcast_ref::<F::Expanded>());
        KeywordFeature::highlight_fields(self, parsed, expanded)
    }

    fn rescore_components(&self, node: &KeywordNode) -> Vec<RescoreComponent> {
        match node.parsed::<F::Parsed>() {
            Some(parsed) => KeywordFeature::rescore_components(self, parsed),
            None => Vec::new(),
        }
    }

    fn required_namespaces(&self, node: &KeywordNode) -> Option<NamespaceScope> {
        node.parsed::<F::Parsed>()
            .and_then(|parsed| KeywordFeature::required_namespaces(self, parsed))
    }
}
