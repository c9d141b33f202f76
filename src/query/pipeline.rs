//! The pipeline driver.
//!
//! Compiling a query runs four phases:
//!
//! 1. **Parse**: every registered feature's tokenizer scans the residual
//!    text in registration order, producing [`KeywordNode`]s and rewriting
//!    the text as it goes.
//! 2. **Strategy**: the nodes' cross-search votes are folded into one verdict.
//! 3. **Expand**: nodes that need external data are expanded once per target
//!    site, memoized in that site's [`QueryBuildContext`].
//! 4. **Build**: every node's filter is folded into the context, as an
//!    included or excluded clause depending on its negation.
//!
//! When the verdict allows federation, phases 3 and 4 run for the host and
//! each sister site in parallel, each on its own fork of the parsed context.

use crate::query::context::QueryBuildContext;
use crate::query::diagnostics::{Diagnostic, MessageKey};
use crate::query::error::RegistryError;
use crate::query::feature::{DynFeature, ExpandedValue, KeywordFeature, KeywordNode, ParseOutcome};
use crate::query::grammar::KeywordGrammar;
use crate::query::strategy::{self, CrossSearchStrategy};
use crate::query::tokenizer::KeywordTokenizer;
use crate::utils::SiteConfig;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Default maximum query length, in characters
pub const DEFAULT_MAX_QUERY_LENGTH: usize = 2048;

struct Registered {
    feature: Box<dyn DynFeature>,
    tokenizer: KeywordTokenizer,
}

/// Ordered set of keyword features plus the sites they compile for
pub struct KeywordPipeline {
    features: Vec<Registered>,
    host: SiteConfig,
    sister_sites: Vec<SiteConfig>,
    max_query_length: usize,
    length_exempt: HashSet<&'static str>,
}

/// Query state for one target site
#[derive(Debug, Clone, Serialize)]
pub struct SiteQuery {
    pub site: String,
    pub context: QueryBuildContext,
}

impl SiteQuery {
    /// Backend filter for this site
    pub fn backend_filter(&self) -> serde_json::Value {
        self.context.combined_filter().to_query()
    }
}

/// Output of [`KeywordPipeline::compile`]
#[derive(Debug, Clone, Serialize)]
pub struct CompiledQuery {
    pub original: String,
    /// Text left for the full-text compiler
    pub residual: String,
    pub nodes: Vec<KeywordNode>,
    pub strategy: CrossSearchStrategy,
    pub host: SiteQuery,
    /// Per-site results, only populated when federating
    pub sister_sites: Vec<SiteQuery>,
}

impl CompiledQuery {
    pub fn results_possible(&self) -> bool {
        self.host.context.results_possible()
    }

    pub fn context(&self) -> &QueryBuildContext {
        &self.host.context
    }
}

impl KeywordPipeline {
    pub fn new(host: SiteConfig) -> Self {
        Self {
            features: Vec::new(),
            host,
            sister_sites: Vec::new(),
            max_query_length: DEFAULT_MAX_QUERY_LENGTH,
            length_exempt: HashSet::new(),
        }
    }

    pub fn with_sister_sites(mut self, sites: Vec<SiteConfig>) -> Self {
        self.sister_sites = sites;
        self
    }

    pub fn with_max_query_length(mut self, max: usize) -> Self {
        self.max_query_length = max;
        self
    }

    /// Text matched by this feature does not count toward the length limit
    pub fn exempt_from_length_limit(&mut self, feature: &'static str) -> &mut Self {
        self.length_exempt.insert(feature);
        self
    }

    /// Append a feature. Tokenizers run in registration order.
    pub fn register<F: KeywordFeature>(&mut self, feature: F) -> Result<&mut Self, RegistryError> {
        let name = KeywordFeature::name(&feature);
        let grammar = feature.grammar();

        if grammar.is_greedy()
            && let Some(first) = self
                .features
                .iter()
                .find(|r| r.tokenizer.grammar().is_greedy())
        {
            return Err(RegistryError::SecondGreedyFeature {
                first: first.feature.name().to_string(),
                second: name.to_string(),
            });
        }

        let tokenizer = KeywordTokenizer::new(name, &grammar)?;
        debug!(feature = name, keywords = ?grammar.keywords, "registered keyword feature");
        self.features.push(Registered {
            feature: Box::new(feature),
            tokenizer,
        });
        Ok(self)
    }

    /// Registered features in order: (name, grammar)
    pub fn features(&self) -> impl Iterator<Item = (&'static str, &KeywordGrammar)> {
        self.features
            .iter()
            .map(|r| (r.feature.name(), r.tokenizer.grammar()))
    }

    pub fn host(&self) -> &SiteConfig {
        &self.host
    }

    /// Parse phase: scan `query` with every feature and return the residual
    /// text and the nodes in registration order, then text order.
    pub fn tokenize(&self, query: &str, ctx: &mut QueryBuildContext) -> (String, Vec<KeywordNode>) {
        let mut nodes = Vec::new();
        let mut exempt_chars = 0;
        let mut residual = query.to_string();

        // Every keyword needs a colon
        if memchr::memchr(b':', query.as_bytes()).is_some() {
            for (index, registered) in self.features.iter().enumerate() {
                let feature = registered.feature.as_ref();
                let allows_empty = registered.tokenizer.grammar().allows_empty();
                let exempt = self.length_exempt.contains(feature.name());

                residual = registered.tokenizer.rewrite(&residual, |raw| {
                    if exempt {
                        exempt_chars += raw.matched_chars;
                    }
                    let mut warnings = Vec::new();
                    let outcome = feature.parse(raw, &mut warnings);
                    for warning in warnings {
                        ctx.add_diagnostic(warning);
                    }

                    match outcome {
                        ParseOutcome::Parsed(entry) => {
                            let syntax = feature.syntax_name(&raw.key, raw.delimiter);
                            ctx.add_syntax_used(&syntax);
                            debug!(
                                feature = feature.name(),
                                key = %raw.key,
                                value = %raw.value,
                                negated = raw.negated,
                                "matched keyword"
                            );
                            nodes.push(KeywordNode {
                                id: nodes.len(),
                                feature: index,
                                key: raw.key.clone(),
                                value: raw.value.clone(),
                                quoted_value: raw.quoted_value.clone(),
                                delimiter: raw.delimiter,
                                suffix: raw.suffix.clone(),
                                negated: raw.negated,
                                syntax,
                                parsed_summary: entry.summary,
                                parsed: entry.value,
                            });
                            entry.keep_text
                        }
                        ParseOutcome::Dropped(diagnostic) => {
                            debug!(key = %raw.key, value = %raw.value, %diagnostic, "dropped keyword");
                            ctx.add_diagnostic(diagnostic);
                            false
                        }
                        ParseOutcome::Refused(diagnostic) => {
                            if allows_empty {
                                debug!(key = %raw.key, %diagnostic, "keyword refused the query");
                                ctx.clear_results_possible();
                            } else {
                                warn!(
                                    feature = feature.name(),
                                    "refusal from a feature whose values cannot be empty, dropping instead"
                                );
                            }
                            ctx.add_diagnostic(diagnostic);
                            false
                        }
                    }
                });

                if !ctx.results_possible() {
                    debug!(feature = feature.name(), "no results possible, skipping remaining features");
                    break;
                }
            }
        }

        let length = query.chars().count().saturating_sub(exempt_chars);
        if length > self.max_query_length {
            ctx.add_diagnostic(
                Diagnostic::new(MessageKey::QueryTooLong)
                    .with_param(length)
                    .with_param(self.max_query_length),
            );
            ctx.clear_results_possible();
        }

        (residual.trim().to_string(), nodes)
    }

    /// Fold every node's federation vote
    pub fn cross_search_strategy(&self, nodes: &[KeywordNode]) -> CrossSearchStrategy {
        strategy::evaluate(nodes.iter().map(|node| {
            self.features
                .get(node.feature)
                .map_or(CrossSearchStrategy::HostOnly, |r| r.feature.strategy(node))
        }))
    }

    /// Expand one node for `site`, at most once per context
    pub fn expand(
        &self,
        node: &KeywordNode,
        site: &SiteConfig,
        ctx: &mut QueryBuildContext,
    ) -> Option<ExpandedValue> {
        let key = node.cache_key();
        if let Some(cached) = ctx.expansion(&key) {
            return cached.cloned();
        }
        let registered = self.features.get(node.feature)?;

        let mut warnings = Vec::new();
        let expanded = registered.feature.expand(node, site, &mut warnings);
        for warning in warnings {
            warn!(site = %site.name, key = %node.key, value = %node.value, %warning, "expansion degraded");
            ctx.add_diagnostic(warning);
        }
        ctx.cache_expansion(key, expanded.clone());
        expanded
    }

    /// Expand and build phases for one site
    fn build(&self, nodes: &[KeywordNode], site: &SiteConfig, ctx: &mut QueryBuildContext) {
        for node in nodes {
            if let Some(registered) = self.features.get(node.feature)
                && registered.feature.needs_expansion(node)
            {
                self.expand(node, site, ctx);
            }
        }

        for node in nodes {
            if !ctx.results_possible() {
                break;
            }
            let Some(registered) = self.features.get(node.feature) else {
                continue;
            };
            let feature = registered.feature.as_ref();
            let expanded = ctx.expansion(&node.cache_key()).flatten().cloned();

            match feature.build_filter(node, expanded.as_ref()) {
                Some(filter) if node.negated => ctx.add_not_filter(filter),
                Some(filter) => ctx.add_filter(filter),
                // NOT(nothing) excludes nothing
                None if node.negated => {
                    debug!(key = %node.key, value = %node.value, "negated keyword matches nothing")
                }
                None => {
                    debug!(key = %node.key, value = %node.value, site = %site.name, "keyword matches nothing");
                    ctx.clear_results_possible();
                }
            }

            if node.negated {
                continue;
            }
            for field in feature.highlight_fields(node, expanded.as_ref()) {
                ctx.add_highlight_field(field);
            }
            for component in feature.rescore_components(node) {
                ctx.add_rescore_component(component);
            }
            if let Some(scope) = feature.required_namespaces(node) {
                ctx.require_namespaces(scope);
            }
        }
    }

    /// Run all four phases over `query`
    pub fn compile(&self, query: &str) -> CompiledQuery {
        let mut ctx = QueryBuildContext::new();
        let (residual, nodes) = self.tokenize(query, &mut ctx);
        let strategy = self.cross_search_strategy(&nodes);

        let federate =
            ctx.results_possible() && strategy.is_all_sites() && !self.sister_sites.is_empty();

        let (host_ctx, sister_sites) = if federate {
            let forks: Vec<_> = self
                .sister_sites
                .iter()
                .map(|site| (site, ctx.fork_for_site()))
                .collect();
            rayon::join(
                || {
                    let mut host_ctx = ctx;
                    self.build(&nodes, &self.host, &mut host_ctx);
                    host_ctx
                },
                || {
                    forks
                        .into_par_iter()
                        .map(|(site, mut site_ctx)| {
                            self.build(&nodes, site, &mut site_ctx);
                            SiteQuery {
                                site: site.name.clone(),
                                context: site_ctx,
                            }
                        })
                        .collect::<Vec<_>>()
                },
            )
        } else {
            if ctx.results_possible() {
                self.build(&nodes, &self.host, &mut ctx);
            }
            (ctx, Vec::new())
        };

        info!(
            keywords = nodes.len(),
            strategy = ?strategy,
            sister_sites = sister_sites.len(),
            results_possible = host_ctx.results_possible(),
            search_type = host_ctx.search_type(),
            "compiled query"
        );

        CompiledQuery {
            original: query.to_string(),
            residual,
            nodes,
            strategy,
            host: SiteQuery {
                site: self.host.name.clone(),
                context: host_ctx,
            },
            sister_sites,
        }
    }
}
