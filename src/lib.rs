//! # keyql - keyword query compiler
//!
//! keyql turns hybrid search strings such as
//! `intitle:"gold rush" incategory:Music deepcat:Jazz widgets` into a
//! backend filter tree plus the residual free text, while tracking
//! diagnostics, highlighting and rescoring instructions, and whether the
//! query may be federated to sister sites.
//!
//! ## Architecture
//!
//! - [`query`] - Grammar, tokenizer, feature contract, build context and the pipeline driver
//! - [`features`] - Built-in keywords (`intitle`, `incategory`, `deepcat`, ...)
//! - [`services`] - External category graph and page lookup used during expansion
//! - [`output`] - Terminal rendering
//! - [`utils`] - Configuration and text helpers
//!
//! ## Quick Start
//!
//! ```no_run
//! use keyql::features::default_pipeline;
//! use keyql::services::Services;
//! use keyql::utils::AppConfig;
//!
//! let config = AppConfig::default();
//! let pipeline = default_pipeline(&config, &Services::offline()).unwrap();
//! let compiled = pipeline.compile(r#"intitle:"gold rush" widgets"#);
//!
//! assert_eq!(compiled.residual, r#""gold rush" widgets"#);
//! println!("{}", compiled.host.backend_filter());
//! ```

pub mod features;
pub mod output;
pub mod query;
pub mod services;
pub mod utils;
