pub mod context;
pub mod diagnostics;
pub mod error;
pub mod feature;
pub mod filter;
pub mod grammar;
pub mod pipeline;
pub mod strategy;
pub mod tokenizer;

pub use context::{NamespaceScope, QueryBuildContext};
pub use diagnostics::{Diagnostic, MessageKey};
pub use error::RegistryError;
pub use feature::{KeywordFeature, KeywordNode, ParseOutcome};
pub use filter::{FilterNode, HighlightField, HighlightKind, RescoreComponent};
pub use grammar::{Delimiter, KeywordGrammar, ValueMode};
pub use pipeline::{CompiledQuery, KeywordPipeline, SiteQuery};
pub use strategy::CrossSearchStrategy;
pub use tokenizer::{KeywordTokenizer, RawMatch};
