//! Numeric file attribute keywords: `filesize:`, `filew:`, `fileh:`,
//! `fileres:` and `filebits:`.
//!
//! Accepted values are `N`, `>N`, `<N` and `N,M`. `filesize` is given in
//! kilobytes and a bare `filesize:N` means "at least N".

use crate::query::diagnostics::MessageKey;
use crate::query::{Diagnostic, FilterNode, KeywordFeature, KeywordGrammar, ParseOutcome, RawMatch};

/// (keyword, indexed field, unit multiplier)
const KEYWORDS: [(&str, &str, i64); 7] = [
    ("filesize", "file_size", 1024),
    ("filewidth", "file_width", 1),
    ("filew", "file_width", 1),
    ("fileheight", "file_height", 1),
    ("fileh", "file_height", 1),
    ("fileres", "file_resolution", 1),
    ("filebits", "file_bits", 1),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumericCondition {
    pub field: &'static str,
    pub multiplier: i64,
    /// +1 for "at least", -1 for "at most", 0 for exact or range
    pub sign: i8,
    pub value: i64,
    /// Upper bound of an `N,M` range
    pub value2: Option<i64>,
}

impl NumericCondition {
    fn scaled(&self, n: i64) -> i64 {
        n.saturating_mul(self.multiplier)
    }
}

#[derive(Debug, Default)]
pub struct FileNumericFeature;

/// Truncating number parse, `1.9` is `1`
fn parse_number(s: &str) -> Option<i64> {
    let n: f64 = s.trim().parse().ok()?;
    n.is_finite().then_some(n.trunc() as i64)
}

impl KeywordFeature for FileNumericFeature {
    type Parsed = NumericCondition;
    type Expanded = ();

    fn name(&self) -> &'static str {
        "filesize"
    }

    fn grammar(&self) -> KeywordGrammar {
        let keywords: Vec<&str> = KEYWORDS.iter().map(|(k, _, _)| *k).collect();
        KeywordGrammar::new(&keywords)
    }

    fn parse_value(&self, raw: &RawMatch, _: &mut Vec<Diagnostic>) -> ParseOutcome<NumericCondition> {
        let Some(&(key, field, multiplier)) = KEYWORDS.iter().find(|(k, _, _)| *k == raw.key) else {
            return ParseOutcome::Dropped(
                Diagnostic::new(MessageKey::FileNumericNotANumber)
                    .with_param(&raw.key)
                    .with_param(&raw.value),
            );
        };
        let not_a_number = || {
            ParseOutcome::Dropped(
                Diagnostic::new(MessageKey::FileNumericNotANumber)
                    .with_param(key)
                    .with_param(&raw.value),
            )
        };

        let value = raw.value.trim();
        let (sign, rest) = match value.chars().next() {
            Some('>') => (1, &value[1..]),
            Some('<') => (-1, &value[1..]),
            _ => (0, value),
        };

        if let Some((low, high)) = rest.split_once(',') {
            if sign != 0 {
                return ParseOutcome::Dropped(
                    Diagnostic::new(MessageKey::FileNumericMultiArgumentWithSign).with_param(key),
                );
            }
            let (Some(low), Some(high)) = (parse_number(low), parse_number(high)) else {
                return not_a_number();
            };
            return ParseOutcome::Parsed(NumericCondition {
                field,
                multiplier,
                sign: 0,
                value: low,
                value2: Some(high),
            });
        }

        let Some(number) = parse_number(rest) else {
            return not_a_number();
        };
        // a bare size is a minimum
        let sign = if sign == 0 && key == "filesize" { 1 } else { sign };
        ParseOutcome::Parsed(NumericCondition {
            field,
            multiplier,
            sign,
            value: number,
            value2: None,
        })
    }

    fn build_filter(&self, parsed: &NumericCondition, _: Option<&()>) -> Option<FilterNode> {
        let value = parsed.scaled(parsed.value);
        Some(match (parsed.sign, parsed.value2) {
            (_, Some(high)) => FilterNode::range(parsed.field, Some(value), Some(parsed.scaled(high))),
            (1, None) => FilterNode::range(parsed.field, Some(value), None),
            (-1, None) => FilterNode::range(parsed.field, None, Some(value)),
            _ => FilterNode::term(parsed.field, value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(key: &str, value: &str) -> ParseOutcome<NumericCondition> {
        let raw = RawMatch {
            key: key.into(),
            value: value.into(),
            quoted_value: value.into(),
            delimiter: None,
            suffix: String::new(),
            negated: false,
            span: 0..0,
            matched_chars: 0,
        };
        FileNumericFeature.parse_value(&raw, &mut Vec::new())
    }

    fn filter(key: &str, value: &str) -> FilterNode {
        let ParseOutcome::Parsed(parsed) = parse(key, value) else {
            panic!("{key}:{value} did not parse");
        };
        FileNumericFeature.build_filter(&parsed, None).unwrap()
    }

    #[test]
    fn test_filesize_greater_than() {
        let ParseOutcome::Parsed(parsed) = parse("filesize", ">300") else {
            panic!("expected parsed");
        };
        assert_eq!((parsed.sign, parsed.value), (1, 300));
        assert_eq!(
            FileNumericFeature.build_filter(&parsed, None),
            Some(FilterNode::range("file_size", Some(300 * 1024), None))
        );
    }

    #[test]
    fn test_bare_filesize_is_minimum() {
        assert_eq!(filter("filesize", "10"), FilterNode::range("file_size", Some(10240), None));
    }

    #[test]
    fn test_bare_width_is_exact() {
        assert_eq!(filter("filew", "800"), FilterNode::term("file_width", 800));
    }

    #[test]
    fn test_range_and_at_most() {
        assert_eq!(
            filter("fileheight", "100,200"),
            FilterNode::range("file_height", Some(100), Some(200))
        );
        assert_eq!(filter("filebits", "<16.7"), FilterNode::range("file_bits", None, Some(16)));
    }

    #[test]
    fn test_not_a_number() {
        let ParseOutcome::Dropped(d) = parse("fileres", ">big") else {
            panic!("expected drop");
        };
        assert_eq!(d.key, MessageKey::FileNumericNotANumber);
        assert_eq!(d.params, vec!["fileres", ">big"]);
    }

    #[test]
    fn test_sign_with_range() {
        let ParseOutcome::Dropped(d) = parse("filesize", ">1,2") else {
            panic!("expected drop");
        };
        assert_eq!(d.key, MessageKey::FileNumericMultiArgumentWithSign);
    }
}
