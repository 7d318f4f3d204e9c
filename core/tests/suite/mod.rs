//! Loader contract scenarios.

mod caching;
mod failures;
mod foreign;
mod ordering;
