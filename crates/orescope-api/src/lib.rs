//! Async client for the orescope screening backend.
//!
//! The backend exposes its screening queries as PostgREST remote procedures.
//! This crate owns the transport mechanics only:
//!
//! - **[`RpcClient`]**: one typed method per remote function, each a single
//!   HTTP round-trip. Retry and failure policy belong to `orescope-core`.
//! - **[`models`]**: wire row types with lenient numeric decoding.
//! - **[`Error`]**: transport, remote, and decoding failures, with
//!   [`Error::is_function_not_found`] for the one terminal case.

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{RpcClient, functions};
pub use error::Error;
pub use models::{
    CompanyRow, FilterParams, LatestPriceRow, MatchingIdRow, MetricRangeRow, PageQuery,
    PageResponse,
};
pub use transport::TransportConfig;
