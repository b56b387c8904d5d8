pub mod config;
pub mod controller;
pub mod fetch_error;
pub mod fixtures;
pub mod outlet_resolver;
pub mod stats_fetcher;
