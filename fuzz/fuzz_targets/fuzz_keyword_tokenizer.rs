#![no_main]

use keyql::query::{Delimiter, KeywordGrammar, KeywordTokenizer};
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

static TOKENIZER: OnceLock<KeywordTokenizer> = OnceLock::new();

fuzz_target!(|data: &str| {
    let tokenizer = TOKENIZER.get_or_init(|| {
        let grammar = KeywordGrammar::new(&["insource"]).with_delimiters(vec![
            Delimiter::new('"'),
            Delimiter::with_suffixes('/', &['i']),
        ]);
        KeywordTokenizer::new("insource", &grammar).expect("valid grammar")
    });

    // Spans found in rewritten text always fall on valid byte offsets
    let stripped = tokenizer.rewrite(data, |_| false);
    for raw in tokenizer.find_matches(&stripped) {
        assert!(stripped.is_char_boundary(raw.span.start));
        assert!(stripped.is_char_boundary(raw.span.end));
    }
});
