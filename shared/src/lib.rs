//! Building blocks shared by the coverage services.
//!
//! Every service talks to the same relational store through [`db::CoverageStore`],
//! authenticates devices through [`auth::KeyValidator`] and reports failures with
//! [`error::ServiceError`].

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod metrics_defs;

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;
