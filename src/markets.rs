//! Static market data: city locales, neighborhoods, rent bands and
//! platform ranking weights. Built once at startup and shared read-only.

use std::collections::HashMap;
use std::sync::Arc;

/// Locale used when a city is not in the table
pub const DEFAULT_LOCALE: &str = "newyork";

/// Monthly rent band in dollars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBand {
    pub min: u32,
    pub max: u32,
}

impl PriceBand {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Scale both ends by whole percentages, flooring to whole dollars
    pub fn scaled(&self, min_percent: u32, max_percent: u32) -> Self {
        Self {
            min: self.min * min_percent / 100,
            max: self.max * max_percent / 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarketTables {
    locales: HashMap<String, String>,
    neighborhoods: HashMap<String, Vec<String>>,
    default_neighborhoods: Vec<String>,
    price_bands: HashMap<String, PriceBand>,
    default_price_band: PriceBand,
    platform_weights: HashMap<String, i32>,
}

impl MarketTables {
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Override a platform's ranking weight
    pub fn with_platform_weight(mut self, platform: &str, weight: i32) -> Self {
        self.platform_weights.insert(platform.to_string(), weight);
        self
    }

    pub fn locale_for(&self, city: &str) -> Option<&str> {
        lookup(&self.locales, city).map(String::as_str)
    }

    pub fn neighborhoods_for(&self, city: &str) -> &[String] {
        lookup(&self.neighborhoods, city)
            .map(Vec::as_slice)
            .unwrap_or(&self.default_neighborhoods)
    }

    pub fn price_band_for(&self, city: &str) -> PriceBand {
        lookup(&self.price_bands, city)
            .copied()
            .unwrap_or(self.default_price_band)
    }

    /// Ranking weight for a platform label; unknown platforms weigh 0
    pub fn weight_for(&self, platform: &str) -> i32 {
        self.platform_weights.get(platform).copied().unwrap_or(0)
    }
}

/// Exact match first, then a case-insensitive match on the trimmed name
fn lookup<'a, V>(table: &'a HashMap<String, V>, city: &str) -> Option<&'a V> {
    table.get(city).or_else(|| {
        let wanted = city.trim();
        table
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, value)| value)
    })
}

impl Default for MarketTables {
    fn default() -> Self {
        let locales: HashMap<String, String> = [
            ("New York City", "newyork"),
            ("San Francisco", "sfbay"),
            ("Los Angeles", "losangeles"),
            ("Chicago", "chicago"),
            ("Boston", "boston"),
            ("Seattle", "seattle"),
            ("Washington DC", "washingtondc"),
            ("Miami", "miami"),
            ("Atlanta", "atlanta"),
            ("Dallas", "dallas"),
            ("Houston", "houston"),
            ("Philadelphia", "philadelphia"),
            ("Toronto", "toronto"),
            ("Vancouver", "vancouver"),
            ("Montreal", "montreal"),
        ]
        .into_iter()
        .map(|(city, locale)| (city.to_string(), locale.to_string()))
        .collect();

        let neighborhoods: HashMap<String, Vec<String>> = [
            (
                "New York City",
                ["Manhattan", "Brooklyn", "Queens", "Bronx", "Staten Island"],
            ),
            (
                "Los Angeles",
                ["Hollywood", "Santa Monica", "Beverly Hills", "West Hollywood", "Downtown"],
            ),
            ("San Francisco", ["Mission", "SOMA", "Castro", "Marina", "Nob Hill"]),
            (
                "Chicago",
                ["River North", "Lincoln Park", "Wicker Park", "Logan Square", "The Loop"],
            ),
            (
                "Boston",
                ["Back Bay", "North End", "Cambridge", "Beacon Hill", "South End"],
            ),
        ]
        .into_iter()
        .map(|(city, hoods)| {
            (
                city.to_string(),
                hoods.iter().map(|h| h.to_string()).collect(),
            )
        })
        .collect();

        let default_neighborhoods: Vec<String> =
            ["Downtown", "Midtown", "Uptown", "Westside", "Eastside"]
                .iter()
                .map(|h| h.to_string())
                .collect();

        let price_bands: HashMap<String, PriceBand> = [
            ("New York City", PriceBand::new(2500, 5000)),
            ("San Francisco", PriceBand::new(2800, 4500)),
            ("Los Angeles", PriceBand::new(2000, 4000)),
            ("Chicago", PriceBand::new(1500, 3000)),
            ("Boston", PriceBand::new(2200, 4200)),
        ]
        .into_iter()
        .map(|(city, band)| (city.to_string(), band))
        .collect();

        let platform_weights: HashMap<String, i32> = [
            ("apartments.com", 3),
            ("zillow", 2),
            ("craigslist", 1),
            ("rentals.com", 1),
        ]
        .into_iter()
        .map(|(platform, weight)| (platform.to_string(), weight))
        .collect();

        Self {
            locales,
            neighborhoods,
            default_neighborhoods,
            price_bands,
            default_price_band: PriceBand::new(1200, 2500),
            platform_weights,
        }
    }
}

/// Maps human city names to provider locale tokens
#[derive(Debug, Clone)]
pub struct CityResolver {
    tables: Arc<MarketTables>,
}

impl CityResolver {
    pub fn new(tables: Arc<MarketTables>) -> Self {
        Self { tables }
    }

    /// Resolve a city to its locale; unknown cities map to [`DEFAULT_LOCALE`]
    pub fn resolve(&self, city: &str) -> &str {
        self.tables.locale_for(city).unwrap_or(DEFAULT_LOCALE)
    }
}
