//! Result extraction strategies, one per supported engine.
//!
//! Each module provides a struct implementing [`crate::engine::ResultExtractor`]
//! that knows where an engine's result blocks live in its HTML.

pub mod baidu;
pub mod bing;
pub mod google;

pub use baidu::BaiduExtractor;
pub use bing::BingExtractor;
pub use google::GoogleExtractor;
