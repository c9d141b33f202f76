//! `intitle:` restricts matches to page titles and redirects.

use super::regex::{self, FieldQuery, REGEX_SYNTAX, RegexSupport};
use crate::query::{
    CrossSearchStrategy, Diagnostic, FilterNode, HighlightField, KeywordFeature, KeywordGrammar,
    KeywordNode, ParseOutcome, RawMatch,
};
use crate::utils::RegexConfig;

const FIELDS: [&str; 2] = ["title", "redirect.title"];

pub struct InTitleFeature {
    regex: RegexSupport,
}

impl InTitleFeature {
    pub fn new(config: RegexConfig) -> Self {
        Self {
            regex: RegexSupport::new(config, &[("title", "title"), ("redirect.title", "redirect.title")]),
        }
    }
}

impl KeywordFeature for InTitleFeature {
    type Parsed = FieldQuery;
    type Expanded = ();

    fn name(&self) -> &'static str {
        "intitle"
    }

    fn grammar(&self) -> KeywordGrammar {
        KeywordGrammar::new(&["intitle"]).with_delimiters(regex::delimiters())
    }

    fn syntax_name(&self, key: &str, delimiter: Option<char>) -> String {
        if regex::is_regex(delimiter) {
            REGEX_SYNTAX.to_string()
        } else {
            key.to_string()
        }
    }

    fn parse_value(&self, raw: &RawMatch, _: &mut Vec<Diagnostic>) -> ParseOutcome<FieldQuery> {
        if regex::is_regex(raw.delimiter) {
            return match self.regex.parse(raw) {
                Ok(query) => ParseOutcome::Parsed(FieldQuery::Regex(query)),
                Err(diagnostic) => ParseOutcome::Dropped(diagnostic),
            };
        }
        ParseOutcome::Parsed(FieldQuery::Text {
            text: raw.value.clone(),
            phrase: raw.delimiter.is_some(),
        })
    }

    /// Plain titles also score the full-text part of the query
    fn keep_text(&self, raw: &RawMatch, parsed: &FieldQuery) -> bool {
        !raw.negated && matches!(parsed, FieldQuery::Text { .. })
    }

    fn cross_search_strategy(&self, _: &KeywordNode, parsed: &FieldQuery) -> CrossSearchStrategy {
        match parsed {
            FieldQuery::Regex(_) => CrossSearchStrategy::HostOnly,
            FieldQuery::Text { .. } => CrossSearchStrategy::AllSites,
        }
    }

    fn build_filter(&self, parsed: &FieldQuery, _: Option<&()>) -> Option<FilterNode> {
        match parsed {
            FieldQuery::Regex(query) => Some(self.regex.build_filter(query)),
            FieldQuery::Text { text, phrase } => Some(FilterNode::any_of(
                FIELDS
                    .iter()
                    .map(|field| {
                        if *phrase {
                            FilterNode::match_phrase(field, text)
                        } else {
                            FilterNode::match_all_words(field, text)
                        }
                    })
                    .collect(),
            )),
        }
    }

    fn highlight_fields(&self, parsed: &FieldQuery, _: Option<&()>) -> Vec<HighlightField> {
        match parsed {
            FieldQuery::Regex(query) => self.regex.highlight_fields(query),
            FieldQuery::Text { .. } => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{KeywordPipeline, MessageKey};
    use crate::utils::SiteConfig;

    fn pipeline(config: RegexConfig) -> KeywordPipeline {
        let mut pipeline = KeywordPipeline::new(SiteConfig::new("host"));
        pipeline.register(InTitleFeature::new(config)).unwrap();
        pipeline
    }

    #[test]
    fn test_quoted_title_is_phrase_and_kept() {
        let compiled = pipeline(RegexConfig::default()).compile(r#"intitle:"gold rush" widgets"#);
        assert_eq!(compiled.residual, r#""gold rush" widgets"#);
        assert_eq!(
            compiled.context().filters(),
            &[FilterNode::any_of(vec![
                FilterNode::match_phrase("title", "gold rush"),
                FilterNode::match_phrase("redirect.title", "gold rush"),
            ])]
        );
        assert_eq!(compiled.strategy, CrossSearchStrategy::AllSites);
    }

    #[test]
    fn test_negated_title_is_not_kept() {
        let compiled = pipeline(RegexConfig::default()).compile("-intitle:bar foo");
        assert_eq!(compiled.residual, "foo");
        assert_eq!(compiled.context().not_filters().len(), 1);
    }

    #[test]
    fn test_regex_title_is_host_only_and_highlighted() {
        let compiled = pipeline(RegexConfig::default()).compile("intitle:/gold.*rush/i");
        assert_eq!(compiled.residual, "");
        assert_eq!(compiled.strategy, CrossSearchStrategy::HostOnly);
        assert_eq!(compiled.context().search_type(), "regex");
        let fields: Vec<_> = compiled
            .context()
            .highlight_fields()
            .iter()
            .map(|h| h.field.as_str())
            .collect();
        assert_eq!(fields, vec!["title.plain", "redirect.title.plain"]);
    }

    #[test]
    fn test_regex_unavailable_is_dropped() {
        let config = RegexConfig {
            enabled: false,
            ..RegexConfig::default()
        };
        let compiled = pipeline(config).compile("intitle:/x/ foo");
        assert!(compiled.nodes.is_empty());
        assert!(compiled.results_possible());
        assert_eq!(compiled.context().diagnostics()[0].key, MessageKey::FeatureNotAvailable);
    }
}
