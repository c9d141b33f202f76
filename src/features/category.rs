//! `incategory:` keeps pages in any of the listed categories.
//!
//! Values are `|`-separated. An `id:NNN` entry names a category page by id and
//! is resolved to its title during expansion.

use super::split_conditions;
use crate::query::diagnostics::MessageKey;
use crate::query::{
    CrossSearchStrategy, Diagnostic, FilterNode, KeywordFeature, KeywordGrammar, KeywordNode,
    ParseOutcome, RawMatch,
};
use crate::services::PageLookup;
use crate::utils::SiteConfig;
use std::sync::Arc;

const FIELD: &str = "category.lowercase_keyword";
const ID_PREFIX: &str = "id:";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryList {
    pub names: Vec<String>,
    pub page_ids: Vec<u64>,
}

pub struct InCategoryFeature {
    max_options: usize,
    pages: Arc<dyn PageLookup>,
}

impl InCategoryFeature {
    pub fn new(max_options: usize, pages: Arc<dyn PageLookup>) -> Self {
        Self { max_options, pages }
    }
}

impl KeywordFeature for InCategoryFeature {
    type Parsed = CategoryList;
    /// Titles of the id entries that exist
    type Expanded = Vec<String>;

    fn name(&self) -> &'static str {
        "incategory"
    }

    fn grammar(&self) -> KeywordGrammar {
        KeywordGrammar::new(&["incategory"])
    }

    fn parse_value(&self, raw: &RawMatch, warnings: &mut Vec<Diagnostic>) -> ParseOutcome<CategoryList> {
        let mut list = CategoryList::default();
        for condition in split_conditions(raw, self.max_options, warnings) {
            match condition
                .strip_prefix(ID_PREFIX)
                .and_then(|id| id.parse::<u64>().ok())
            {
                Some(id) => list.page_ids.push(id),
                None => list.names.push(condition),
            }
        }
        ParseOutcome::Parsed(list)
    }

    /// Page ids are only meaningful on the host site
    fn cross_search_strategy(&self, _: &KeywordNode, parsed: &CategoryList) -> CrossSearchStrategy {
        if parsed.page_ids.is_empty() {
            CrossSearchStrategy::AllSites
        } else {
            CrossSearchStrategy::HostOnly
        }
    }

    fn needs_expansion(&self, parsed: &CategoryList) -> bool {
        !parsed.page_ids.is_empty()
    }

    fn expand(
        &self,
        parsed: &CategoryList,
        site: &SiteConfig,
        warnings: &mut Vec<Diagnostic>,
    ) -> Option<Vec<String>> {
        match self.pages.titles_by_id(site, &parsed.page_ids) {
            Ok(titles) => Some(titles.into_iter().map(|(_, title)| title).collect()),
            Err(err) => {
                let ids = parsed
                    .page_ids
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                warnings.push(
                    Diagnostic::new(MessageKey::IncategoryLookupFailed)
                        .with_param(ids)
                        .with_param(err),
                );
                None
            }
        }
    }

    fn build_filter(&self, parsed: &CategoryList, expanded: Option<&Vec<String>>) -> Option<FilterNode> {
        let clauses: Vec<_> = parsed
            .names
            .iter()
            .chain(expanded.into_iter().flatten())
            .map(|name| FilterNode::match_all_words(FIELD, name))
            .collect();
        if clauses.is_empty() {
            return None;
        }
        Some(FilterNode::any_of(clauses))
    }
}
