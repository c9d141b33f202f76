//! Built-in keyword features and the default registry.
//!
//! ## Registration order
//!
//! Tokenizers run in this order, which decides how overlapping syntax is
//! resolved:
//!
//! 1. `prefix` (greedy, swallows the rest of the query first)
//! 2. `incategory`
//! 3. `deepcat` / `deepcategory`
//! 4. `hastemplate`
//! 5. `intitle`
//! 6. `insource`
//! 7. `filesize`, `filew`, `filewidth`, `fileh`, `fileheight`, `fileres`, `filebits`
//! 8. `articletopic`

pub mod category;
pub mod deepcat;
pub mod filesize;
pub mod prefix;
pub mod regex;
pub mod source;
pub mod template;
pub mod title;
pub mod topic;

pub use category::InCategoryFeature;
pub use deepcat::DeepcatFeature;
pub use filesize::FileNumericFeature;
pub use prefix::PrefixFeature;
pub use source::InSourceFeature;
pub use template::HasTemplateFeature;
pub use title::InTitleFeature;
pub use topic::ArticleTopicFeature;

use crate::query::diagnostics::{Diagnostic, MessageKey};
use crate::query::{KeywordPipeline, RawMatch, RegistryError};
use crate::services::Services;
use crate::utils::AppConfig;

/// Split a `|`-separated value, keeping at most `max` non-empty conditions.
/// Truncation always records a diagnostic.
pub(crate) fn split_conditions(raw: &RawMatch, max: usize, warnings: &mut Vec<Diagnostic>) -> Vec<String> {
    let mut conditions: Vec<String> = raw
        .value
        .split('|')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .collect();
    if conditions.len() > max {
        warnings.push(
            Diagnostic::new(MessageKey::FeatureTooManyConditions)
                .with_param(&raw.key)
                .with_param(max),
        );
        conditions.truncate(max);
    }
    conditions
}

/// Pipeline with every built-in feature, in the documented order
pub fn default_pipeline(config: &AppConfig, services: &Services) -> Result<KeywordPipeline, RegistryError> {
    let mut pipeline = KeywordPipeline::new(config.host.clone())
        .with_sister_sites(config.sister_sites.clone())
        .with_max_query_length(config.max_query_length);

    pipeline
        .register(PrefixFeature::new(config.namespaces.clone()))?
        .register(InCategoryFeature::new(
            config.max_incategory_options,
            services.pages.clone(),
        ))?
        .register(DeepcatFeature::new(
            config.deepcat_max_depth,
            config.deepcat_limit,
            services.graph.clone(),
        ))?
        .register(HasTemplateFeature::new(config.max_template_conditions))?
        .register(InTitleFeature::new(config.regex.clone()))?
        .register(InSourceFeature::new(config.regex.clone()))?
        .register(FileNumericFeature)?
        .register(ArticleTopicFeature::new(&config.article_topics))?;

    pipeline
        .exempt_from_length_limit("incategory")
        .exempt_from_length_limit("articletopic");

    Ok(pipeline)
}
