use crate::config::Config;
use crate::engine::{Aggregation, AggregationEngine, ProviderRegistry};
use crate::llm::{GeminiClient, TextGenerator};
use crate::markets::MarketTables;
use crate::models::{SearchRequest, SearchResponse, SearchStrategy};
use crate::planner::StrategyPlanner;
use crate::providers::{
    CensusRentProvider, CraigslistProvider, Fetcher, HttpFetcher, SyntheticProvider,
};
use crate::summarizer::{SummarizeError, Summarizer};
use crate::synthesizer::ListingSynthesizer;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Timeout for calls to the language model
const MODEL_TIMEOUT: Duration = Duration::from_secs(30);

/// Plans, aggregates and summarizes one housing search at a time
pub struct HousingAgent {
    planner: StrategyPlanner,
    engine: AggregationEngine,
    summarizer: Summarizer,
}

impl HousingAgent {
    pub fn new(
        planner: StrategyPlanner,
        engine: AggregationEngine,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            planner,
            engine,
            summarizer,
        }
    }

    /// Wire the default providers and Gemini-backed planner/summarizer
    pub fn from_config(config: &Config) -> Result<Self> {
        let tables = MarketTables::default().shared();
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(config.provider_timeout)?);
        let registry = default_registry(fetcher, tables.clone(), config)?;
        info!(platforms = ?registry.platforms(), "Registered providers");
        let engine = AggregationEngine::new(registry, tables, config.provider_guard_timeout());

        let generator: Option<Arc<dyn TextGenerator>> = match &config.gemini_api_key {
            Some(key) => {
                let mut client =
                    GeminiClient::new(key, MODEL_TIMEOUT)?.with_model(&config.gemini_model);
                if let Some(url) = &config.gemini_base_url {
                    client = client.with_base_url(url);
                }
                Some(Arc::new(client))
            }
            None => None,
        };

        let (planner, summarizer) = match generator {
            Some(generator) => (
                StrategyPlanner::new(generator.clone()),
                Summarizer::new(generator),
            ),
            None => (StrategyPlanner::offline(), Summarizer::unconfigured()),
        };

        Ok(Self::new(planner, engine, summarizer))
    }

    /// Plan and aggregate without summarizing; never fails
    pub async fn search(&self, query: &str, city: &str) -> (SearchStrategy, Aggregation) {
        info!("🤖 Search agent: analyzing \"{}\" for {}", query, city);
        let strategy = self.planner.plan(query, city).await;
        let aggregation = self.engine.aggregate(query, city, &strategy).await;
        (strategy, aggregation)
    }

    /// Full request: only summarization can fail
    pub async fn handle(&self, request: SearchRequest) -> Result<SearchResponse, SummarizeError> {
        let (_, aggregation) = self.search(&request.query, &request.city).await;
        self.respond(&request, &aggregation).await
    }

    /// Summarize an aggregation already gathered for `request`
    pub async fn respond(
        &self,
        request: &SearchRequest,
        aggregation: &Aggregation,
    ) -> Result<SearchResponse, SummarizeError> {
        let result = self
            .summarizer
            .summarize(&request.query, &request.city, &aggregation.listings)
            .await?;

        let sources = aggregation
            .reports
            .iter()
            .map(|r| (r.platform.clone(), r.listings))
            .collect();

        Ok(SearchResponse { result, sources })
    }
}

/// Every known provider, sharing one fetcher and one set of market tables
pub fn default_registry(
    fetcher: Arc<dyn Fetcher>,
    tables: Arc<MarketTables>,
    config: &Config,
) -> Result<ProviderRegistry> {
    let synthesizer = ListingSynthesizer::new(tables.clone());

    Ok(ProviderRegistry::new()
        .register(Arc::new(CraigslistProvider::new(
            fetcher.clone(),
            tables,
            config.provider_timeout,
        )))
        .register(Arc::new(SyntheticProvider::apartments(synthesizer.clone())))
        .register(Arc::new(SyntheticProvider::zillow(synthesizer.clone())))
        .register(Arc::new(SyntheticProvider::rentals(synthesizer)))
        .register(Arc::new(CensusRentProvider::new(
            fetcher,
            &config.census_api_url,
            config.provider_timeout,
        )?)))
}
