pub mod census;
pub mod craigslist;
pub mod fetch;
pub mod synthetic;
pub mod traits;
pub mod types;

pub use census::CensusRentProvider;
pub use craigslist::CraigslistProvider;
pub use fetch::{Fetcher, HttpFetcher};
pub use synthetic::SyntheticProvider;
pub use traits::ProviderAdapter;
pub use types::ProviderReport;

/// Provider identifiers the planner may choose from
pub const KNOWN_PLATFORMS: [&str; 5] = ["craigslist", "apartments", "zillow", "rentals", "census"];

pub fn is_known_platform(name: &str) -> bool {
    KNOWN_PLATFORMS.contains(&name)
}
