//! Fan-out, collection, deduplication and ranking of provider results.

use crate::markets::MarketTables;
use crate::models::{Listing, SearchStrategy};
use crate::providers::types::ProviderResult;
use crate::providers::{ProviderAdapter, ProviderReport};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Final listings plus what each platform contributed
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub listings: Vec<Listing>,
    pub reports: Vec<ProviderReport>,
}

/// Registry of provider adapters keyed by platform identifier
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    adapters: HashMap<&'static str, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.adapters.insert(adapter.source_name(), adapter);
        self
    }

    pub fn get(&self, platform: &str) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(platform).cloned()
    }

    pub fn platforms(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.adapters.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

pub struct AggregationEngine {
    registry: ProviderRegistry,
    tables: Arc<MarketTables>,
    guard_timeout: Duration,
}

impl AggregationEngine {
    pub fn new(
        registry: ProviderRegistry,
        tables: Arc<MarketTables>,
        guard_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            tables,
            guard_timeout,
        }
    }

    /// Run the strategy against every planned platform.
    ///
    /// Provider failures, panics and timeouts are logged and contribute
    /// nothing, and listings missing a required field are dropped. The
    /// result is at most `strategy.max_listings` long. Dropping the returned
    /// future aborts any provider still in flight.
    pub async fn aggregate(
        &self,
        query: &str,
        city: &str,
        strategy: &SearchStrategy,
    ) -> Aggregation {
        let results = self.fan_out(query, city, strategy).await;

        let mut reports = Vec::with_capacity(results.len());
        let mut collected = Vec::new();
        for result in results {
            match result.outcome {
                Ok(listings) => {
                    let listings: Vec<Listing> =
                        listings.into_iter().filter(Listing::is_complete).collect();
                    info!(
                        platform = %result.platform,
                        count = listings.len(),
                        "Provider contributed listings"
                    );
                    reports.push(ProviderReport {
                        platform: result.platform,
                        listings: listings.len(),
                        error: None,
                    });
                    collected.extend(listings);
                }
                Err(e) => {
                    warn!(platform = %result.platform, error = %e, "❌ Provider search failed");
                    reports.push(ProviderReport {
                        platform: result.platform,
                        listings: 0,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let unique = deduplicate(collected);
        let mut ranked = rank(unique, &self.tables);
        ranked.truncate(strategy.max_listings);

        info!(total = ranked.len(), max = strategy.max_listings, "Aggregation complete");
        Aggregation {
            listings: ranked,
            reports,
        }
    }

    /// One task per platform, awaited in strategy order so collection order
    /// never depends on which provider finishes first.
    async fn fan_out(
        &self,
        query: &str,
        city: &str,
        strategy: &SearchStrategy,
    ) -> Vec<ProviderResult> {
        let shared = Arc::new(strategy.clone());
        let mut tasks = TaskGuard(Vec::with_capacity(strategy.platforms.len()));

        for platform in &strategy.platforms {
            let Some(adapter) = self.registry.get(platform) else {
                tasks.0.push(None);
                continue;
            };

            info!("🔍 Searching {}...", platform);
            let (query, city, strategy) = (query.to_string(), city.to_string(), shared.clone());
            let guard = self.guard_timeout;
            tasks.0.push(Some(tokio::spawn(async move {
                match tokio::time::timeout(guard, adapter.search(&query, &city, &strategy)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(anyhow::anyhow!("Provider timed out after {:?}", guard)),
                }
            })));
        }

        let mut results = Vec::with_capacity(tasks.0.len());
        for (platform, task) in strategy.platforms.iter().zip(tasks.0.iter_mut()) {
            let outcome = match task {
                Some(handle) => match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(anyhow::anyhow!("Provider task failed: {}", e)),
                },
                None => Err(anyhow::anyhow!("Platform {} not supported", platform)),
            };
            results.push(ProviderResult {
                platform: platform.clone(),
                outcome,
            });
        }
        results
    }
}

/// Aborts every provider task still running when dropped
struct TaskGuard<T>(Vec<Option<JoinHandle<T>>>);

impl<T> Drop for TaskGuard<T> {
    fn drop(&mut self) {
        for handle in self.0.iter().flatten() {
            handle.abort();
        }
    }
}

/// Drop listings whose lowercase title and exact location were already seen
pub fn deduplicate(listings: Vec<Listing>) -> Vec<Listing> {
    let mut seen = HashSet::new();
    listings
        .into_iter()
        .filter(|l| seen.insert((l.title.to_lowercase(), l.location.clone())))
        .collect()
}

/// Stable sort by platform weight, heaviest first
pub fn rank(mut listings: Vec<Listing>, tables: &MarketTables) -> Vec<Listing> {
    listings.sort_by_key(|l| std::cmp::Reverse(tables.weight_for(&l.platform)));
    listings
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;

    struct Fixed {
        name: &'static str,
        listings: Vec<Listing>,
    }

    #[async_trait]
    impl ProviderAdapter for Fixed {
        async fn search(&self, _q: &str, _c: &str, _s: &SearchStrategy) -> Result<Vec<Listing>> {
            Ok(self.listings.clone())
        }

        fn source_name(&self) -> &'static str {
            self.name
        }
    }

    struct Failing;

    #[async_trait]
    impl ProviderAdapter for Failing {
        async fn search(&self, _q: &str, _c: &str, _s: &SearchStrategy) -> Result<Vec<Listing>> {
            anyhow::bail!("upstream exploded")
        }

        fn source_name(&self) -> &'static str {
            "rentals"
        }
    }

    struct Panicking;

    #[async_trait]
    impl ProviderAdapter for Panicking {
        async fn search(&self, _q: &str, _c: &str, _s: &SearchStrategy) -> Result<Vec<Listing>> {
            panic!("adapter bug")
        }

        fn source_name(&self) -> &'static str {
            "census"
        }
    }

    struct Stalled;

    #[async_trait]
    impl ProviderAdapter for Stalled {
        async fn search(&self, _q: &str, _c: &str, _s: &SearchStrategy) -> Result<Vec<Listing>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }

        fn source_name(&self) -> &'static str {
            "apartments"
        }
    }

    fn listing(title: &str, location: &str, price: &str, platform: &str) -> Listing {
        Listing {
            title: title.to_string(),
            price: price.to_string(),
            location: location.to_string(),
            link: format!("https://{}/{}", platform, title.replace(' ', "-")),
            platform: platform.to_string(),
            description: None,
            bedrooms: None,
            bathrooms: None,
            floor_area: None,
        }
    }

    fn strategy(platforms: &[&str], max_listings: usize) -> SearchStrategy {
        SearchStrategy {
            platforms: platforms.iter().map(|p| p.to_string()).collect(),
            max_listings,
            search_terms: vec!["1br".to_string()],
            price_range: None,
        }
    }

    fn engine(registry: ProviderRegistry) -> AggregationEngine {
        AggregationEngine::new(
            registry,
            MarketTables::default().shared(),
            Duration::from_millis(200),
        )
    }

    #[test]
    fn test_deduplicate_keeps_first_seen() {
        let listings = vec![
            listing("Sunny 1BR", "Midtown, X City", "$2,000", "craigslist"),
            listing("sunny 1br", "Midtown, X City", "$1,800", "zillow"),
            listing("Sunny 1BR", "Uptown, X City", "$2,000", "zillow"),
            listing("Sunny 1BR", "midtown, X City", "$2,000", "zillow"),
        ];
        let unique = deduplicate(listings);

        assert_eq!(unique.len(), 3);
        assert_eq!(unique[0].price, "$2,000");
        assert_eq!(unique[0].platform, "craigslist");
    }

    #[test]
    fn test_rank_is_stable_within_weight() {
        let tables = MarketTables::default();
        let ranked = rank(
            vec![
                listing("a", "X", "$1", "craigslist"),
                listing("b", "X", "$1", "unknown"),
                listing("c", "X", "$1", "rentals.com"),
                listing("d", "X", "$1", "apartments.com"),
                listing("e", "X", "$1", "zillow"),
                listing("f", "X", "$1", "craigslist"),
            ],
            &tables,
        );
        let titles: Vec<_> = ranked.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, vec!["d", "e", "a", "c", "f", "b"]);
    }

    #[tokio::test]
    async fn test_duplicate_across_providers_keeps_first_platform() {
        let registry = ProviderRegistry::new()
            .register(Arc::new(Fixed {
                name: "zillow",
                listings: vec![listing("Sunny 1BR", "Midtown, X City", "$2,400", "zillow")],
            }))
            .register(Arc::new(Fixed {
                name: "craigslist",
                listings: vec![listing("Sunny 1BR", "Midtown, X City", "$1,900", "craigslist")],
            }));

        let result = engine(registry.clone())
            .aggregate("1br", "X City", &strategy(&["craigslist", "zillow"], 20))
            .await;
        assert_eq!(result.listings.len(), 1);
        assert_eq!(result.listings[0].price, "$1,900");

        let result = engine(registry)
            .aggregate("1br", "X City", &strategy(&["zillow", "craigslist"], 20))
            .await;
        assert_eq!(result.listings.len(), 1);
        assert_eq!(result.listings[0].price, "$2,400");
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let registry = ProviderRegistry::new()
            .register(Arc::new(Failing))
            .register(Arc::new(Panicking))
            .register(Arc::new(Stalled))
            .register(Arc::new(Fixed {
                name: "zillow",
                listings: vec![listing("Loft", "Eastside, X City", "$1,500", "zillow")],
            }));

        let result = engine(registry)
            .aggregate(
                "1br",
                "X City",
                &strategy(&["rentals", "census", "apartments", "myspace", "zillow"], 20),
            )
            .await;

        assert_eq!(result.listings.len(), 1);
        assert_eq!(result.listings[0].title, "Loft");

        let platforms: Vec<_> = result.reports.iter().map(|r| r.platform.as_str()).collect();
        assert_eq!(platforms, vec!["rentals", "census", "apartments", "myspace", "zillow"]);
        let failed: Vec<_> = result.reports.iter().map(|r| !r.succeeded()).collect();
        assert_eq!(failed, vec![true, true, true, true, false]);
        assert!(result.reports[3].error.as_deref().unwrap().contains("not supported"));
    }

    struct Abandonable {
        dropped: Arc<std::sync::atomic::AtomicBool>,
    }

    struct SetOnDrop(Arc<std::sync::atomic::AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ProviderAdapter for Abandonable {
        async fn search(&self, _q: &str, _c: &str, _s: &SearchStrategy) -> Result<Vec<Listing>> {
            let _flag = SetOnDrop(self.dropped.clone());
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }

        fn source_name(&self) -> &'static str {
            "zillow"
        }
    }

    #[tokio::test]
    async fn test_cancelled_request_abandons_providers() {
        let dropped = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let registry = ProviderRegistry::new().register(Arc::new(Abandonable {
            dropped: dropped.clone(),
        }));
        let engine = AggregationEngine::new(
            registry,
            MarketTables::default().shared(),
            Duration::from_secs(3600),
        );

        let plan = strategy(&["zillow"], 20);
        let request = engine.aggregate("1br", "X City", &plan);
        assert!(tokio::time::timeout(Duration::from_millis(50), request).await.is_err());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(dropped.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_incomplete_listings_are_dropped() {
        let mut blank = listing("No link", "Downtown, X City", "$1,200", "zillow");
        blank.link.clear();
        let registry = ProviderRegistry::new().register(Arc::new(Fixed {
            name: "zillow",
            listings: vec![blank, listing("Has link", "Downtown, X City", "$1,300", "zillow")],
        }));

        let result = engine(registry)
            .aggregate("1br", "X City", &strategy(&["zillow"], 20))
            .await;
        assert_eq!(result.listings.len(), 1);
        assert_eq!(result.reports[0].listings, 1);
    }

    #[tokio::test]
    async fn test_empty_platforms() {
        let result = engine(ProviderRegistry::new())
            .aggregate("1br", "X City", &strategy(&[], 20))
            .await;
        assert!(result.listings.is_empty());
        assert!(result.reports.is_empty());
    }

    #[tokio::test]
    async fn test_output_is_ranked_and_truncated() {
        let many = |platform: &'static str, name: &'static str| Fixed {
            name,
            listings: (0..8)
                .map(|i| {
                    listing(&format!("{} {}", name, i), "Downtown, X City", "$1,000", platform)
                })
                .collect(),
        };
        let registry = ProviderRegistry::new()
            .register(Arc::new(many("craigslist", "craigslist")))
            .register(Arc::new(many("apartments.com", "apartments")));

        let result = engine(registry)
            .aggregate("1br", "X City", &strategy(&["craigslist", "apartments"], 10))
            .await;

        assert_eq!(result.listings.len(), 10);
        assert!(result.listings[..8].iter().all(|l| l.platform == "apartments.com"));
        assert_eq!(result.listings[8].title, "craigslist 0");
        assert_eq!(result.listings[9].title, "craigslist 1");
    }
}
