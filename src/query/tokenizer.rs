//! Per-feature keyword scanner.
//!
//! Each feature gets one compiled pattern of the form
//! `<anchor>(-?<keyword alternation>):<value>\s?`. Matches are located left to
//! right and the matched span is replaced in the residual text by either
//! nothing or the original quoted value, depending on the feature.

use crate::query::error::RegistryError;
use crate::query::grammar::{KeywordGrammar, UNQUOTED_GROUP, ValueMode};
use regex::{Captures, Regex};
use std::ops::Range;

/// One occurrence of a keyword, split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMatch {
    /// Keyword as written, without the negation prefix
    pub key: String,
    /// Value with delimiters stripped and escaped delimiters unescaped
    pub value: String,
    /// Value as written, including delimiters but without the suffix
    pub quoted_value: String,
    /// Delimiter used, `None` for unquoted values
    pub delimiter: Option<char>,
    /// Suffix found after the closing delimiter (empty if none)
    pub suffix: String,
    pub negated: bool,
    /// Byte span of the whole match in the scanned text
    pub span: Range<usize>,
    /// Number of characters consumed by the match
    pub matched_chars: usize,
}

/// Compiled scanner for one feature's grammar
#[derive(Debug, Clone)]
pub struct KeywordTokenizer {
    pattern: Regex,
    grammar: KeywordGrammar,
}

impl KeywordTokenizer {
    pub fn new(feature: &str, grammar: &KeywordGrammar) -> Result<Self, RegistryError> {
        grammar.validate(feature)?;

        let keywords = grammar
            .keywords
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");
        let anchor = if grammar.head_only { r"^\s*" } else { "" };
        // An empty value is signalled by a space right after the colon,
        // so such grammars must not skip spaces there.
        let spaces_after_colon = if grammar.value == ValueMode::AllowEmpty { "" } else { r"\s*" };
        let source = format!(
            r"{anchor}(?P<key>-?(?:{keywords})):{spaces_after_colon}(?P<value>{value})\s?",
            value = grammar.value_pattern()
        );

        let pattern = Regex::new(&source).map_err(|source| RegistryError::Pattern {
            feature: feature.to_string(),
            source,
        })?;

        Ok(Self {
            pattern,
            grammar: grammar.clone(),
        })
    }

    pub fn grammar(&self) -> &KeywordGrammar {
        &self.grammar
    }

    /// Find every match in `text` without rewriting it
    pub fn find_matches(&self, text: &str) -> Vec<RawMatch> {
        let mut found = Vec::new();
        self.rewrite(text, |m| {
            found.push(m.clone());
            false
        });
        found
    }

    /// Scan `text`, handing every match to `on_match`.
    ///
    /// When `on_match` returns true the match is replaced by its quoted value
    /// followed by one space, otherwise it is removed. Returns the rewritten text.
    pub fn rewrite<F>(&self, text: &str, mut on_match: F) -> String
    where
        F: FnMut(&RawMatch) -> bool,
    {
        let mut out = String::with_capacity(text.len());
        let mut copied_to = 0;
        let mut pos = 0;

        while pos <= text.len() {
            let Some(caps) = self.pattern.captures_at(text, pos) else {
                break;
            };
            let Some(whole) = caps.get(0) else {
                break;
            };

            // Keywords must start the string or follow whitespace. The check
            // looks at the original text so a separator consumed by the
            // previous match still counts.
            if !self.grammar.head_only && !preceded_by_boundary(text, whole.start()) {
                pos = whole.start() + next_char_len(text, whole.start());
                continue;
            }

            let Some(raw) = self.split(&caps, whole.range(), whole.as_str()) else {
                pos = whole.start() + next_char_len(text, whole.start());
                continue;
            };

            out.push_str(&text[copied_to..whole.start()]);
            if on_match(&raw) {
                out.push_str(&raw.quoted_value);
                out.push(' ');
            }
            copied_to = whole.end();
            pos = whole.end();

            if whole.is_empty() {
                pos += next_char_len(text, pos).max(1);
            }
        }

        out.push_str(&text[copied_to..]);
        out
    }

    fn split(&self, caps: &Captures<'_>, span: Range<usize>, matched: &str) -> Option<RawMatch> {
        let key_match = caps.name("key")?;
        let value_match = caps.name("value")?;

        let (key, negated) = match key_match.as_str().strip_prefix('-') {
            Some(stripped) => (stripped.to_string(), true),
            None => (key_match.as_str().to_string(), false),
        };

        let mut quoted_value = value_match.as_str().to_string();
        let mut value = String::new();
        let mut delimiter = None;
        let mut suffix = String::new();

        if let Some(unquoted) = caps.name(UNQUOTED_GROUP) {
            value = unquoted.as_str().to_string();
        } else {
            for (index, delim) in self.grammar.delimiters.iter().enumerate() {
                let Some(quoted) = caps.name(&KeywordGrammar::quoted_group(index)) else {
                    continue;
                };
                let d = delim.delimiter;
                value = quoted.as_str().replace(&format!("\\{d}"), &d.to_string());
                delimiter = Some(d);
                if let Some(s) = caps.name(&KeywordGrammar::suffix_group(index)) {
                    suffix = s.as_str().to_string();
                    quoted_value.truncate(quoted_value.len() - suffix.len());
                }
                break;
            }
        }

        Some(RawMatch {
            key,
            value,
            quoted_value,
            delimiter,
            suffix,
            negated,
            span,
            matched_chars: matched.chars().count(),
        })
    }
}

/// True if `at` is the start of `text` or follows whitespace
fn preceded_by_boundary(text: &str, at: usize) -> bool {
    at == 0
        || text[..at]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace)
}

/// Byte length of the character starting at `at` (0 at the end of text)
fn next_char_len(text: &str, at: usize) -> usize {
    text[at..].chars().next().map_or(1, char::len_utf8)
}
