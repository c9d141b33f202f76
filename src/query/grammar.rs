//! Keyword grammars and the value expression synthesized from them.
//!
//! A grammar declares which keywords a feature answers to and what shape its
//! value may take. [`KeywordGrammar::value_pattern`] turns that declaration
//! into one regex fragment with a `quoted` alternative per delimiter and a
//! single `unquoted` alternative.

use crate::query::error::RegistryError;

/// The delimiter every feature accepts unless it declares otherwise.
pub const DEFAULT_DELIMITER: char = '"';

/// Group name holding the unquoted value.
pub(crate) const UNQUOTED_GROUP: &str = "unquoted";

/// A value delimiter, optionally followed by single-character suffixes.
///
/// Suffixes are only recognized right after the closing delimiter they are
/// paired with: `insource:/foo/i` carries the `i` suffix, `insource:"foo"i` does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiter {
    pub delimiter: char,
    pub suffixes: Vec<char>,
}

impl Delimiter {
    pub fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            suffixes: Vec::new(),
        }
    }

    pub fn with_suffixes(delimiter: char, suffixes: &[char]) -> Self {
        Self {
            delimiter,
            suffixes: suffixes.to_vec(),
        }
    }

    /// Regex-escaped delimiter
    fn escaped(&self) -> String {
        regex::escape(&self.delimiter.to_string())
    }
}

/// How a keyword's value is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMode {
    /// At least one character (`+` quantifier)
    Required,
    /// The value may be empty (`*` quantifier, no space allowed after the colon)
    AllowEmpty,
    /// Consumes everything up to the end of the line
    Greedy,
}

/// Immutable grammar declaration of one keyword feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordGrammar {
    pub keywords: Vec<String>,
    pub value: ValueMode,
    pub head_only: bool,
    pub delimiters: Vec<Delimiter>,
}

impl KeywordGrammar {
    /// Grammar with a required value and the default `"` delimiter
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            value: ValueMode::Required,
            head_only: false,
            delimiters: vec![Delimiter::new(DEFAULT_DELIMITER)],
        }
    }

    pub fn allow_empty(mut self) -> Self {
        self.value = ValueMode::AllowEmpty;
        self
    }

    pub fn greedy(mut self) -> Self {
        self.value = ValueMode::Greedy;
        self
    }

    pub fn head_only(mut self) -> Self {
        self.head_only = true;
        self
    }

    pub fn with_delimiters(mut self, delimiters: Vec<Delimiter>) -> Self {
        self.delimiters = delimiters;
        self
    }

    pub fn is_greedy(&self) -> bool {
        self.value == ValueMode::Greedy
    }

    pub fn allows_empty(&self) -> bool {
        self.value == ValueMode::AllowEmpty
    }

    /// Check the declaration for contract violations.
    ///
    /// These are programming errors in a feature, so they are reported once at
    /// registration and never per query.
    pub fn validate(&self, feature: &str) -> Result<(), RegistryError> {
        if self.keywords.is_empty() {
            return Err(RegistryError::NoKeywords(feature.to_string()));
        }
        for keyword in &self.keywords {
            if keyword.is_empty()
                || keyword.starts_with('-')
                || keyword.contains(':')
                || keyword.chars().any(char::is_whitespace)
            {
                return Err(RegistryError::InvalidKeyword {
                    feature: feature.to_string(),
                    keyword: keyword.clone(),
                });
            }
        }
        if self.delimiters.is_empty() {
            return Err(RegistryError::NoDelimiters(feature.to_string()));
        }
        for delim in &self.delimiters {
            if delim.delimiter.is_whitespace() || delim.suffixes.iter().any(|c| c.is_whitespace()) {
                return Err(RegistryError::InvalidDelimiter {
                    feature: feature.to_string(),
                    delimiter: delim.delimiter,
                });
            }
        }
        if self.is_greedy() && self.delimiters != [Delimiter::new(DEFAULT_DELIMITER)] {
            return Err(RegistryError::GreedyDelimiters(feature.to_string()));
        }
        Ok(())
    }

    /// Name of the capture group holding the content quoted by delimiter `index`
    pub(crate) fn quoted_group(index: usize) -> String {
        format!("quoted{index}")
    }

    /// Name of the capture group holding the suffix of delimiter `index`
    pub(crate) fn suffix_group(index: usize) -> String {
        format!("suffix{index}")
    }

    /// Build the value expression.
    ///
    /// Quoted alternatives accept the escaped form of their own delimiter
    /// (`\"` inside `"..."`) and never span a newline. The unquoted alternative
    /// is a run of non-space, non-`"` characters.
    pub fn value_pattern(&self) -> String {
        if self.is_greedy() {
            // newlines included, a greedy value always ends the query
            return format!("(?P<{UNQUOTED_GROUP}>(?s:.+))");
        }

        let quantifier = if self.allows_empty() { '*' } else { '+' };
        let mut alternatives = Vec::with_capacity(self.delimiters.len() + 1);

        for (index, delim) in self.delimiters.iter().enumerate() {
            let d = delim.escaped();
            let mut alt = format!(
                r"{d}(?P<{group}>(?:\\{d}|[^{d}\n])*){d}",
                group = Self::quoted_group(index)
            );
            if !delim.suffixes.is_empty() {
                let class: String = delim
                    .suffixes
                    .iter()
                    .map(|c| regex::escape(&c.to_string()))
                    .collect();
                alt.push_str(&format!(
                    "(?P<{group}>[{class}])?",
                    group = Self::suffix_group(index)
                ));
            }
            alternatives.push(alt);
        }

        alternatives.push(format!(r#"(?P<{UNQUOTED_GROUP}>[^"\s]{quantifier})"#));
        alternatives.join("|")
    }
}
