//! # ffdh
//!
//! Firebase Functions Deployment Helper.
//!
//! Firebase limits how many functions a single `firebase deploy` may touch.
//! This library picks a subset of the functions listed in a project's
//! `functions.json` and runs `firebase deploy --only` for just that subset.
//!
//! ## Features
//!
//! - Preflight validation of the project files and the Firebase CLI
//! - Selection by name prefix/suffix
//! - Deterministic batching into contiguous slices
//! - Discrete-argument invocation with optional output capture and timeout
//!
//! ## Usage
//!
//! ```ignore
//! use ffdh::selector::{select, BatchSpec, SelectionMode};
//! use ffdh::validator::validate;
//!
//! let ctx = validate(&project_dir, "firebase", None)?;
//! let names = select(&ctx.functions, &SelectionMode::Batch(BatchSpec::new(4, 1)?))?;
//! ```

/// CLI configuration and argument parsing
pub mod config;

/// Deployment orchestration
pub mod deployer;

/// Error types for deployment operations
pub mod error;

/// Deploy command construction and execution
pub mod invoker;

/// Project file loading (`functions.json`, `firebase.json`)
pub mod manifest;

/// Function selection by search or batch
pub mod selector;

/// Preflight project validation
pub mod validator;
