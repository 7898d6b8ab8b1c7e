pub mod api;
pub mod config;
pub mod error;
pub mod geo;
pub mod rate_limit;
pub mod redirect;
pub mod store;
