use thiserror::Error;

/// Structural contract violations detected when a feature is registered.
///
/// None of these can be caused by user input.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("feature {0} declares no keywords")]
    NoKeywords(String),

    #[error("feature {feature} declares invalid keyword {keyword:?}")]
    InvalidKeyword { feature: String, keyword: String },

    #[error("feature {0} declares no value delimiters")]
    NoDelimiters(String),

    #[error("feature {feature} declares invalid delimiter {delimiter:?}")]
    InvalidDelimiter { feature: String, delimiter: char },

    #[error("greedy feature {0} must only use the default delimiter")]
    GreedyDelimiters(String),

    #[error("greedy feature {second} registered while {first} is already greedy")]
    SecondGreedyFeature { first: String, second: String },

    #[error("feature {feature} produced an invalid pattern: {source}")]
    Pattern {
        feature: String,
        #[source]
        source: regex::Error,
    },
}
