#![doc = "sca-upload-core: pipeline library for the SCATool CI upload step."]

//! Resolves the files a remote analysis service needs, checks that they form
//! at least one complete file-type group, and uploads them in one multipart
//! request. The host environment (CI variables, exit codes, step outputs) is
//! handled by the `sca-upload` binary crate.
//!
//! Stages, in run order: [`credential`], [`fetch`], [`resolve`], [`validate`],
//! [`upload`], [`notify`]; [`pipeline`] chains them.

pub mod config;
pub mod contract;
pub mod credential;
pub mod error;
pub mod fetch;
pub mod notify;
pub mod pipeline;
pub mod resolve;
#[cfg(any(test, feature = "test-export-mocks"))]
pub mod testing;
pub mod upload;
pub mod validate;

pub use error::{ErrorClass, Result, RunError};
