//! `articletopic:` filters on predicted article topics and boosts pages by
//! the topic score.

use crate::query::diagnostics::MessageKey;
use crate::query::{
    Diagnostic, FilterNode, KeywordFeature, KeywordGrammar, ParseOutcome, RawMatch,
    RescoreComponent,
};
use std::collections::HashSet;

const FIELD: &str = "weighted_tags";
const TAG_PREFIX: &str = "classification.ores.articletopic";
const BOOST_WEIGHT: f32 = 1.0;

pub struct ArticleTopicFeature {
    topics: HashSet<String>,
}

impl ArticleTopicFeature {
    pub fn new(topics: &[String]) -> Self {
        Self {
            topics: topics.iter().map(|t| t.to_lowercase()).collect(),
        }
    }
}

fn tag(topic: &str) -> String {
    format!("{TAG_PREFIX}/{topic}")
}

impl KeywordFeature for ArticleTopicFeature {
    /// Valid topics, lowercase, in the order given
    type Parsed = Vec<String>;
    type Expanded = ();

    fn name(&self) -> &'static str {
        "articletopic"
    }

    fn grammar(&self) -> KeywordGrammar {
        KeywordGrammar::new(&["articletopic"]).allow_empty()
    }

    fn parse_value(&self, raw: &RawMatch, warnings: &mut Vec<Diagnostic>) -> ParseOutcome<Vec<String>> {
        let mut topics: Vec<String> = Vec::new();
        for topic in raw.value.split('|').map(str::trim).filter(|t| !t.is_empty()) {
            let topic = topic.to_lowercase();
            if !self.topics.contains(&topic) {
                warnings.push(Diagnostic::new(MessageKey::ArticletopicInvalidTopic).with_param(&topic));
            } else if !topics.contains(&topic) {
                topics.push(topic);
            }
        }
        if topics.is_empty() {
            return ParseOutcome::Refused(
                Diagnostic::new(MessageKey::ArticletopicNoValidTopic).with_param(&raw.key),
            );
        }
        ParseOutcome::Parsed(topics)
    }

    fn build_filter(&self, parsed: &Vec<String>, _: Option<&()>) -> Option<FilterNode> {
        Some(FilterNode::any_of(
            parsed.iter().map(|t| FilterNode::term(FIELD, tag(t))).collect(),
        ))
    }

    fn rescore_components(&self, parsed: &Vec<String>) -> Vec<RescoreComponent> {
        vec![RescoreComponent::TermBoost {
            field: FIELD.to_string(),
            terms: parsed.iter().map(|t| tag(t)).collect(),
            weight: BOOST_WEIGHT,
        }]
    }
}
