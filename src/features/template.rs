//! `hastemplate:` keeps pages transcluding any of the listed templates.

use super::split_conditions;
use crate::query::{
    CrossSearchStrategy, Diagnostic, FilterNode, KeywordFeature, KeywordGrammar, KeywordNode,
    ParseOutcome, RawMatch,
};
use crate::utils::normalize_title;

const FIELD: &str = "template";
const TEMPLATE_NAMESPACE: &str = "Template:";

pub struct HasTemplateFeature {
    max_conditions: usize,
}

impl HasTemplateFeature {
    pub fn new(max_conditions: usize) -> Self {
        Self { max_conditions }
    }
}

/// Full title of a template reference. A leading `:` means the main namespace.
fn template_title(name: &str) -> String {
    if let Some(main) = name.strip_prefix(':') {
        return normalize_title(main);
    }
    let bare = match name.get(..TEMPLATE_NAMESPACE.len()) {
        Some(head) if head.eq_ignore_ascii_case(TEMPLATE_NAMESPACE) => &name[TEMPLATE_NAMESPACE.len()..],
        _ => name,
    };
    format!("{TEMPLATE_NAMESPACE}{}", normalize_title(bare))
}

impl KeywordFeature for HasTemplateFeature {
    type Parsed = Vec<String>;
    type Expanded = ();

    fn name(&self) -> &'static str {
        "hastemplate"
    }

    fn grammar(&self) -> KeywordGrammar {
        KeywordGrammar::new(&["hastemplate"])
    }

    fn parse_value(&self, raw: &RawMatch, warnings: &mut Vec<Diagnostic>) -> ParseOutcome<Vec<String>> {
        ParseOutcome::Parsed(
            split_conditions(raw, self.max_conditions, warnings)
                .iter()
                .map(|name| template_title(name))
                .collect(),
        )
    }

    fn cross_search_strategy(&self, _: &KeywordNode, _: &Vec<String>) -> CrossSearchStrategy {
        CrossSearchStrategy::AllSites
    }

    fn build_filter(&self, parsed: &Vec<String>, _: Option<&()>) -> Option<FilterNode> {
        if parsed.is_empty() {
            return None;
        }
        Some(FilterNode::any_of(
            parsed
                .iter()
                .map(|title| FilterNode::match_all_words(FIELD, title))
                .collect(),
        ))
    }
}
