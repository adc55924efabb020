use serde::{Deserialize, Serialize};

/// A single rental listing as returned by a provider
///
/// Prices stay in the provider's own formatting ("$2,150/month", "$1.9k")
/// because sources disagree on how they report them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub title: String,
    pub price: String,
    /// "Neighborhood, City"
    pub location: String,
    pub link: String,
    /// Label of the source that produced this listing
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// "Studio", "1", "2", "3", ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<String>,
    /// Freeform floor area, e.g. "650 sq ft"
    #[serde(default, rename = "sqft", skip_serializing_if = "Option::is_none")]
    pub floor_area: Option<String>,
}

impl Listing {
    /// True when every required field carries text
    pub fn is_complete(&self) -> bool {
        [
            &self.title,
            &self.price,
            &self.location,
            &self.link,
            &self.platform,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }
}

/// Inclusive monthly rent bounds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriceRange {
    pub min: u32,
    pub max: u32,
}

impl PriceRange {
    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}

/// Per-request search plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchStrategy {
    /// Provider identifiers in priority order
    pub platforms: Vec<String>,
    /// Upper bound on the final number of listings
    pub max_listings: usize,
    /// Phrasings to try; the original query is always among them
    pub search_terms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<PriceRange>,
}

impl SearchStrategy {
    pub const FALLBACK_MAX_LISTINGS: usize = 20;

    /// Conservative plan used whenever planning fails
    pub fn fallback(query: &str) -> Self {
        Self {
            platforms: vec!["craigslist".to_string(), "apartments".to_string()],
            max_listings: Self::FALLBACK_MAX_LISTINGS,
            search_terms: vec![query.to_string()],
            price_range: None,
        }
    }

    /// How many listings a single provider may contribute
    pub fn per_provider_cap(&self) -> usize {
        if self.platforms.is_empty() {
            return 0;
        }
        self.max_listings / self.platforms.len()
    }
}

/// Inbound request: free-text query plus target city
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub city: String,
}

/// Outbound response carrying the summarizer's prose
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub result: String,
    /// Listings contributed per platform
    #[serde(default)]
    pub sources: std::collections::BTreeMap<String, usize>,
}
