//! HTTP page fetching and HTML link extraction.
//!
//! This crate provides:
//! - [`PageFetcher`]: a plain HTTP(S) fetcher with local-target protection
//! - [`ads_search_url`] / [`extract_profile_links`]: ads-library search
//!   URLs and the Facebook profile links found on a results page

pub mod fetcher;
pub mod links;

pub use fetcher::PageFetcher;
pub use links::{ads_search_url, extract_profile_links};
