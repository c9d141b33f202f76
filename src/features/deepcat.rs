//! `deepcat:` keeps pages anywhere under a category tree.
//!
//! The tree is resolved per site through the category graph. A closure larger
//! than the configured limit yields zero results, and a failing graph falls
//! back to matching the category literally. Both cases emit a diagnostic.

use crate::query::diagnostics::MessageKey;
use crate::query::{
    CrossSearchStrategy, Diagnostic, FilterNode, KeywordFeature, KeywordGrammar, KeywordNode,
    ParseOutcome, RawMatch,
};
use crate::services::{CategoryGraph, ServiceError};
use crate::utils::SiteConfig;
use std::sync::Arc;

const FIELD: &str = "category.lowercase_keyword";
const SYNTAX: &str = "deepcategory";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepcatExpansion {
    /// The root and its subcategories
    Closure(Vec<String>),
    /// The tree exceeded the limit
    TooMany,
    /// The graph could not be queried, match the root only
    Literal,
}

pub struct DeepcatFeature {
    max_depth: u32,
    limit: usize,
    graph: Arc<dyn CategoryGraph>,
}

impl DeepcatFeature {
    pub fn new(max_depth: u32, limit: usize, graph: Arc<dyn CategoryGraph>) -> Self {
        Self {
            max_depth,
            limit,
            graph,
        }
    }
}

fn any_category<'a>(names: impl IntoIterator<Item = &'a String>) -> Option<FilterNode> {
    let clauses: Vec<_> = names
        .into_iter()
        .map(|name| FilterNode::match_all_words(FIELD, name))
        .collect();
    if clauses.is_empty() {
        None
    } else {
        Some(FilterNode::any_of(clauses))
    }
}

impl KeywordFeature for DeepcatFeature {
    type Parsed = String;
    type Expanded = DeepcatExpansion;

    fn name(&self) -> &'static str {
        "deepcat"
    }

    fn grammar(&self) -> KeywordGrammar {
        KeywordGrammar::new(&["deepcategory", "deepcat"])
    }

    fn syntax_name(&self, _: &str, _: Option<char>) -> String {
        SYNTAX.to_string()
    }

    fn parse_value(&self, raw: &RawMatch, _: &mut Vec<Diagnostic>) -> ParseOutcome<String> {
        ParseOutcome::Parsed(raw.value.trim().to_string())
    }

    /// Every site resolves the tree against its own graph
    fn cross_search_strategy(&self, _: &KeywordNode, _: &String) -> CrossSearchStrategy {
        CrossSearchStrategy::AllSites
    }

    fn needs_expansion(&self, _: &String) -> bool {
        true
    }

    fn expand(
        &self,
        category: &String,
        site: &SiteConfig,
        warnings: &mut Vec<Diagnostic>,
    ) -> Option<DeepcatExpansion> {
        match self
            .graph
            .subcategories(site, category, self.max_depth, self.limit)
        {
            Ok(closure) if closure.len() > self.limit => {
                warnings.push(
                    Diagnostic::new(MessageKey::DeepcatTooMany)
                        .with_param(category)
                        .with_param(self.limit),
                );
                Some(DeepcatExpansion::TooMany)
            }
            Ok(closure) => Some(DeepcatExpansion::Closure(closure)),
            Err(ServiceError::NotConfigured(_)) => {
                warnings.push(Diagnostic::new(MessageKey::FeatureNotAvailable).with_param(SYNTAX));
                Some(DeepcatExpansion::Literal)
            }
            Err(err) => {
                warnings.push(
                    Diagnostic::new(MessageKey::DeepcatException)
                        .with_param(category)
                        .with_param(err),
                );
                Some(DeepcatExpansion::Literal)
            }
        }
    }

    fn build_filter(&self, category: &String, expanded: Option<&DeepcatExpansion>) -> Option<FilterNode> {
        match expanded {
            Some(DeepcatExpansion::Closure(names)) => any_category(names),
            Some(DeepcatExpansion::TooMany) => None,
            Some(DeepcatExpansion::Literal) | None => any_category([category]),
        }
    }
}
