#![no_main]

use keyql::features::default_pipeline;
use keyql::query::KeywordPipeline;
use keyql::services::Services;
use keyql::utils::AppConfig;
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

static PIPELINE: OnceLock<KeywordPipeline> = OnceLock::new();

fuzz_target!(|data: &str| {
    let pipeline = PIPELINE.get_or_init(|| {
        default_pipeline(&AppConfig::default(), &Services::offline()).expect("default registry")
    });

    // Compiling arbitrary text must never panic, and the residual is always
    // no longer than the input
    let compiled = pipeline.compile(data);
    assert!(compiled.residual.len() <= data.len());
    let _ = compiled.host.backend_filter();
});
