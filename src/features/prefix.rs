//! `prefix:` matches titles starting with the rest of the query.
//!
//! The keyword is greedy. A leading namespace name (`prefix:Talk:Foo`)
//! restricts the namespace, `prefix:all:Foo` searches every namespace and no
//! namespace means the main one.

use crate::query::{
    CrossSearchStrategy, Diagnostic, FilterNode, KeywordFeature, KeywordGrammar, KeywordNode,
    NamespaceScope, ParseOutcome, RawMatch,
};
use std::collections::BTreeMap;

const FIELD: &str = "title.prefix";
const ALL_NAMESPACES: &str = "all";
const MAIN_NAMESPACE: i64 = 0;
/// Highest id among the namespaces every site shares
const LAST_STANDARD_NAMESPACE: i64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitlePrefix {
    /// `None` means every title
    pub value: Option<String>,
    /// `None` means every namespace
    pub namespace: Option<i64>,
}

pub struct PrefixFeature {
    namespaces: BTreeMap<String, i64>,
}

impl PrefixFeature {
    pub fn new(namespaces: BTreeMap<String, i64>) -> Self {
        Self { namespaces }
    }

    fn namespace_id(&self, name: &str) -> Option<i64> {
        let name = name.trim().to_lowercase().replace('_', " ");
        if name.is_empty() || name == "main" {
            return Some(MAIN_NAMESPACE);
        }
        self.namespaces.get(&name).copied()
    }
}

/// `"foo"` to `foo`, trailing spaces allowed after the closing quote
fn strip_quotes(value: &str) -> &str {
    let trimmed = value.trim_end();
    trimmed
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .filter(|inner| !inner.contains('"'))
        .unwrap_or(value)
}

impl KeywordFeature for PrefixFeature {
    type Parsed = TitlePrefix;
    type Expanded = ();

    fn name(&self) -> &'static str {
        "prefix"
    }

    fn grammar(&self) -> KeywordGrammar {
        KeywordGrammar::new(&["prefix"]).greedy()
    }

    fn parse_value(&self, raw: &RawMatch, _: &mut Vec<Diagnostic>) -> ParseOutcome<TitlePrefix> {
        let value = strip_quotes(&raw.value);

        let (namespace, rest) = match value.split_once(':') {
            Some((ns, rest)) if ns.trim().eq_ignore_ascii_case(ALL_NAMESPACES) => (None, rest),
            Some((ns, rest)) => match self.namespace_id(ns) {
                Some(id) => (Some(id), rest),
                None => (Some(MAIN_NAMESPACE), value),
            },
            None => (Some(MAIN_NAMESPACE), value),
        };

        let rest = strip_quotes(rest).trim();
        ParseOutcome::Parsed(TitlePrefix {
            value: (!rest.is_empty()).then(|| rest.to_string()),
            namespace,
        })
    }

    fn cross_search_strategy(&self, _: &KeywordNode, parsed: &TitlePrefix) -> CrossSearchStrategy {
        match parsed.namespace {
            Some(ns) if ns > LAST_STANDARD_NAMESPACE => CrossSearchStrategy::HostOnly,
            _ => CrossSearchStrategy::AllSites,
        }
    }

    fn build_filter(&self, parsed: &TitlePrefix, _: Option<&()>) -> Option<FilterNode> {
        let mut clauses = Vec::with_capacity(2);
        if let Some(value) = &parsed.value {
            clauses.push(FilterNode::match_all_words(FIELD, value));
        }
        if let Some(ns) = parsed.namespace {
            clauses.push(FilterNode::term("namespace", ns));
        }
        if clauses.is_empty() {
            return Some(FilterNode::MatchAll);
        }
        Some(FilterNode::all_of(clauses))
    }

    /// `all:` lifts every namespace restriction
    fn required_namespaces(&self, parsed: &TitlePrefix) -> Option<NamespaceScope> {
        Some(match parsed.namespace {
            Some(ns) => NamespaceScope::Only(vec![ns]),
            None => NamespaceScope::All,
        })
    }
}
