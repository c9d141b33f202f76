//! End-to-end behavior of the default keyword pipeline.

mod fixtures;

use fixtures::{CountingGraph, CountingPages, services};
use keyql::features::default_pipeline;
use keyql::query::{
    CrossSearchStrategy, FilterNode, KeywordPipeline, KeywordTokenizer, MessageKey, NamespaceScope,
    QueryBuildContext,
};
use keyql::services::{ServiceError, Services};
use keyql::utils::{AppConfig, SiteConfig};
use std::sync::Arc;
use std::time::Duration;

const CATEGORY_FIELD: &str = "category.lowercase_keyword";

fn offline_pipeline() -> KeywordPipeline {
    default_pipeline(&AppConfig::default(), &Services::offline()).unwrap()
}

fn pipeline_with(
    graph: &Arc<CountingGraph>,
    pages: &Arc<CountingPages>,
    config: &AppConfig,
) -> KeywordPipeline {
    default_pipeline(config, &services(graph, pages)).unwrap()
}

#[test]
fn test_incategory_single_category() {
    let compiled = offline_pipeline().compile("incategory:Music");
    assert_eq!(compiled.residual, "");
    assert_eq!(
        compiled.context().filters(),
        &[FilterNode::any_of(vec![FilterNode::match_all_words(CATEGORY_FIELD, "Music")])]
    );
    assert!(compiled.context().diagnostics().is_empty());
}

#[test]
fn test_intitle_keeps_quoted_value_in_residual() {
    let compiled = offline_pipeline().compile(r#"intitle:"gold rush" widgets"#);
    assert_eq!(compiled.residual, r#""gold rush" widgets"#);

    let filters = compiled.context().filters();
    assert_eq!(filters.len(), 1);
    let FilterNode::Bool { should, .. } = &filters[0] else {
        panic!("expected a bool filter, got {:?}", filters[0]);
    };
    assert!(should.contains(&FilterNode::match_phrase("title", "gold rush")));
}

#[test]
fn test_filesize_greater_than_applies_unit() {
    let compiled = offline_pipeline().compile("filesize:>300");
    assert_eq!(
        compiled.context().filters(),
        &[FilterNode::range("file_size", Some(300 * 1024), None)]
    );
    assert!(compiled.nodes[0].parsed_summary.contains("sign: 1"));
}

#[test]
fn test_hastemplate_over_limit_is_truncated_with_one_diagnostic() {
    let templates: Vec<String> = (0..300).map(|i| format!("T{i}")).collect();
    let query = format!("hastemplate:{}", templates.join("|"));

    let compiled = offline_pipeline().compile(&query);
    let ctx = compiled.context();
    assert_eq!(ctx.filters().len(), 1);
    assert_eq!(ctx.filters()[0].leaf_count(), 256);
    let too_many: Vec<_> = ctx
        .diagnostics()
        .iter()
        .filter(|d| d.key == MessageKey::FeatureTooManyConditions)
        .collect();
    assert_eq!(too_many.len(), 1);
    assert_eq!(too_many[0].params, vec!["hastemplate", "256"]);
}

#[test]
fn test_deepcat_timeout_falls_back_to_literal() {
    let graph = Arc::new(
        CountingGraph::new().with_failure("Foo", ServiceError::Timeout(Duration::from_secs(3))),
    );
    let pages = Arc::new(CountingPages::new(&[]));
    let compiled = pipeline_with(&graph, &pages, &AppConfig::default()).compile("deepcat:Foo");

    let ctx = compiled.context();
    assert!(ctx.results_possible());
    assert_eq!(ctx.diagnostics().len(), 1);
    assert_eq!(ctx.diagnostics()[0].key, MessageKey::DeepcatException);
    assert_eq!(
        ctx.filters(),
        &[FilterNode::any_of(vec![FilterNode::match_all_words(CATEGORY_FIELD, "Foo")])]
    );
}

#[test]
fn test_negated_intitle_is_excluded() {
    let compiled = offline_pipeline().compile("-intitle:bar");
    let ctx = compiled.context();
    assert!(ctx.filters().is_empty());
    assert_eq!(ctx.not_filters().len(), 1);
    assert_eq!(compiled.residual, "");
}

#[test]
fn test_parse_failure_records_one_diagnostic_and_no_filter() {
    let compiled = offline_pipeline().compile("filesize:huge cats");
    let ctx = compiled.context();
    assert!(compiled.nodes.is_empty());
    assert!(ctx.filters().is_empty());
    assert_eq!(ctx.diagnostics().len(), 1);
    assert_eq!(ctx.diagnostics()[0].key, MessageKey::FileNumericNotANumber);
    assert_eq!(compiled.residual, "cats");
}

#[test]
fn test_identical_deepcat_expands_once() {
    let graph = Arc::new(CountingGraph::new().with_tree("Jazz", &["Jazz", "Bebop"]));
    let pages = Arc::new(CountingPages::new(&[]));
    let pipeline = pipeline_with(&graph, &pages, &AppConfig::default());

    let compiled = pipeline.compile("deepcat:Jazz deepcategory:Jazz");
    assert_eq!(compiled.nodes.len(), 2);
    // the keys differ, so each spelling is expanded once
    assert_eq!(graph.calls(), 2);

    let graph = Arc::new(CountingGraph::new().with_tree("Jazz", &["Jazz", "Bebop"]));
    let pipeline = pipeline_with(&graph, &pages, &AppConfig::default());
    let compiled = pipeline.compile("deepcat:Jazz deepcat:Jazz");
    assert_eq!(compiled.context().filters().len(), 2);
    assert_eq!(graph.calls(), 1);
}

#[test]
fn test_explicit_expand_is_memoized_per_context() {
    let graph = Arc::new(CountingGraph::new().with_tree("Jazz", &["Jazz"]));
    let pages = Arc::new(CountingPages::new(&[]));
    let pipeline = pipeline_with(&graph, &pages, &AppConfig::default());

    let mut ctx = QueryBuildContext::new();
    let (_, nodes) = pipeline.tokenize("deepcat:Jazz", &mut ctx);
    let site = SiteConfig::new("host");
    let first = pipeline.expand(&nodes[0], &site, &mut ctx);
    let second = pipeline.expand(&nodes[0], &site, &mut ctx);
    assert!(first.is_some());
    assert!(second.is_some());
    assert_eq!(graph.calls(), 1);
}

#[test]
fn test_deepcat_overflow_means_zero_results() {
    let closure: Vec<String> = (0..300).map(|i| format!("C{i}")).collect();
    let closure: Vec<&str> = closure.iter().map(String::as_str).collect();
    let graph = Arc::new(CountingGraph::new().with_tree("Big", &closure));
    let pages = Arc::new(CountingPages::new(&[]));

    let compiled = pipeline_with(&graph, &pages, &AppConfig::default()).compile("deepcat:Big");
    let ctx = compiled.context();
    assert!(!ctx.results_possible());
    assert_eq!(ctx.diagnostics().len(), 1);
    assert_eq!(ctx.diagnostics()[0].key, MessageKey::DeepcatTooMany);
    assert_eq!(ctx.combined_filter(), FilterNode::MatchNone);
}

#[test]
fn test_incategory_ids_resolved_through_page_lookup() {
    let graph = Arc::new(CountingGraph::new());
    let pages = Arc::new(CountingPages::new(&[(690451, "Rock music")]));
    let compiled = pipeline_with(&graph, &pages, &AppConfig::default())
        .compile("incategory:id:690451|Jazz");

    assert_eq!(pages.calls(), 1);
    assert_eq!(compiled.strategy, CrossSearchStrategy::HostOnly);
    assert_eq!(compiled.context().filters()[0].leaf_count(), 2);
}

#[test]
fn test_federation_builds_one_context_per_site() {
    let graph = Arc::new(CountingGraph::new().with_tree("Jazz", &["Jazz", "Bebop"]));
    let pages = Arc::new(CountingPages::new(&[]));
    let config = AppConfig {
        sister_sites: vec![SiteConfig::new("fr"), SiteConfig::new("de")],
        ..AppConfig::default()
    };

    let compiled = pipeline_with(&graph, &pages, &config).compile("deepcat:Jazz hastemplate:Cite");
    assert_eq!(compiled.strategy, CrossSearchStrategy::AllSites);
    let sites: Vec<_> = compiled.sister_sites.iter().map(|s| s.site.as_str()).collect();
    assert_eq!(sites, vec!["fr", "de"]);
    assert_eq!(graph.calls(), 3);
    for site in &compiled.sister_sites {
        assert_eq!(site.context.filters().len(), 2);
        assert!(site.context.is_syntax_used("deepcategory"));
    }
}

#[test]
fn test_host_only_keyword_disables_federation() {
    let config = AppConfig {
        sister_sites: vec![SiteConfig::new("fr")],
        ..AppConfig::default()
    };
    let pipeline = default_pipeline(&config, &Services::offline()).unwrap();
    let compiled = pipeline.compile("intitle:/gold/ hastemplate:Cite");
    assert_eq!(compiled.strategy, CrossSearchStrategy::HostOnly);
    assert!(compiled.sister_sites.is_empty());
}

#[test]
fn test_prefix_registered_first_swallows_other_keywords() {
    let compiled = offline_pipeline().compile("foo prefix:incategory:Music");
    assert_eq!(compiled.nodes.len(), 1);
    assert_eq!(compiled.nodes[0].key, "prefix");
    assert_eq!(compiled.nodes[0].value, "incategory:Music");
    assert_eq!(compiled.residual, "foo");
    assert_eq!(compiled.context().required_namespaces(), Some(&NamespaceScope::Only(vec![0])));
}

#[test]
fn test_prefix_remainder_spans_lines() {
    let compiled = offline_pipeline().compile("prefix:Talk:a\nprefix:Help:b");
    assert_eq!(compiled.nodes.len(), 1);
    assert_eq!(compiled.nodes[0].value, "Talk:a\nprefix:Help:b");
    assert_eq!(compiled.context().required_namespaces(), Some(&NamespaceScope::Only(vec![1])));
    assert!(compiled.results_possible());
}

#[test]
fn test_prefix_all_opens_every_namespace() {
    let compiled = offline_pipeline().compile("prefix:all:Foo");
    let ctx = compiled.context();
    assert_eq!(ctx.required_namespaces(), Some(&NamespaceScope::All));
    assert_eq!(
        ctx.filters(),
        &[FilterNode::match_all_words("title.prefix", "Foo")]
    );
}

#[test]
fn test_keywords_before_prefix_still_match() {
    let compiled = offline_pipeline().compile("incategory:Music prefix:Talk:Foo");
    let keys: Vec<_> = compiled.nodes.iter().map(|n| n.key.as_str()).collect();
    // registration order, not text order
    assert_eq!(keys, vec!["prefix", "incategory"]);
    assert_eq!(compiled.context().required_namespaces(), Some(&NamespaceScope::Only(vec![1])));
}

#[test]
fn test_stripping_is_idempotent_for_literal_features() {
    let pipeline = offline_pipeline();
    let query = "incategory:A|B deepcat:C hastemplate:\"D e\" intitle:F insource:/g+/ \
                 filew:>10 words -intitle:\"h i\"";
    let compiled = pipeline.compile(query);
    assert_eq!(compiled.nodes.len(), 7);

    for (name, grammar) in pipeline.features() {
        if grammar.is_greedy() || grammar.allows_empty() {
            continue;
        }
        let tokenizer = KeywordTokenizer::new(name, grammar).unwrap();
        assert!(
            tokenizer.find_matches(&compiled.residual).is_empty(),
            "{name} still matches in {:?}",
            compiled.residual
        );
    }
}

#[test]
fn test_articletopic_refusal_collapses_query() {
    let compiled = offline_pipeline().compile("articletopic:nonsense intitle:foo");
    assert!(!compiled.results_possible());
    assert_eq!(compiled.context().combined_filter(), FilterNode::MatchNone);
}

#[test]
fn test_query_length_limit_exempts_category_text() {
    let config = AppConfig {
        max_query_length: 20,
        ..AppConfig::default()
    };
    let pipeline = default_pipeline(&config, &Services::offline()).unwrap();

    let long_category = format!("incategory:{} short", "x".repeat(40));
    assert!(pipeline.compile(&long_category).results_possible());

    let compiled = pipeline.compile(&"word ".repeat(10));
    assert!(!compiled.results_possible());
    assert_eq!(compiled.context().diagnostics()[0].key, MessageKey::QueryTooLong);
}

#[test]
fn test_search_type_reports_heaviest_syntax() {
    let compiled = offline_pipeline().compile("prefix:Foo");
    assert_eq!(compiled.context().search_type(), "prefix");

    let compiled = offline_pipeline().compile("intitle:a insource:/b/");
    assert_eq!(compiled.context().search_type(), "regex");

    let compiled = offline_pipeline().compile("plain words");
    assert_eq!(compiled.context().search_type(), "full_text");
}
