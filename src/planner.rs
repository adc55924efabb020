//! Turns a query and city into a search plan.
//!
//! The plan comes from the language model when it answers with usable JSON.
//! Anything else, including no model being configured, yields
//! [`SearchStrategy::fallback`].

use crate::llm::{strip_code_blocks, TextGenerator};
use crate::models::{PriceRange, SearchStrategy};
use crate::providers::is_known_platform;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

pub const MIN_LISTINGS: usize = 10;
pub const MAX_LISTINGS: usize = 50;

/// Plan as the model writes it, before validation.
///
/// Only `platforms` is strictly typed; the other fields are read loosely so a
/// null or fractional value drops that field instead of the whole plan.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanResponse {
    platforms: Vec<String>,
    #[serde(default)]
    max_listings: Value,
    #[serde(default)]
    search_terms: Value,
    #[serde(default)]
    price_range: Value,
}

pub struct StrategyPlanner {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl StrategyPlanner {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    /// Planner that always uses the fallback strategy
    pub fn offline() -> Self {
        Self { generator: None }
    }

    /// Never fails: any planning problem degrades to the fallback strategy
    pub async fn plan(&self, query: &str, city: &str) -> SearchStrategy {
        let Some(generator) = &self.generator else {
            info!("🤖 No planning model configured, using fallback strategy");
            return SearchStrategy::fallback(query);
        };

        let response = match generator.generate(&build_prompt(query, city)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Planning request failed, using fallback strategy");
                return SearchStrategy::fallback(query);
            }
        };

        match parse_plan(&response, query) {
            Ok(strategy) => {
                info!(
                    platforms = ?strategy.platforms,
                    max_listings = strategy.max_listings,
                    terms = strategy.search_terms.len(),
                    "🎯 Search strategy planned"
                );
                strategy
            }
            Err(e) => {
                warn!(error = %e, "Unusable planning response, using fallback strategy");
                SearchStrategy::fallback(query)
            }
        }
    }
}

pub fn build_prompt(query: &str, city: &str) -> String {
    format!(
        r#"You plan housing searches. Read the rental search below and answer with a JSON search plan.

Query: "{query}"
City: "{city}"

Decide:
1. Which sources to use, most useful first (craigslist, apartments, zillow, rentals, census)
2. How many listings to aim for (between {min} and {max})
3. Other phrasings of the search worth trying, starting with the query itself
4. The monthly price range, only if the query states one

Answer with JSON only, in exactly this shape:
{{
  "platforms": ["craigslist", "apartments"],
  "maxListings": 30,
  "searchTerms": ["{query}", "another phrasing"],
  "priceRange": {{"min": 1000, "max": 3000}}
}}"#,
        query = query,
        city = city,
        min = MIN_LISTINGS,
        max = MAX_LISTINGS,
    )
}

/// Parse and validate a model response into a strategy for `query`
pub fn parse_plan(response: &str, query: &str) -> Result<SearchStrategy> {
    let raw: PlanResponse = serde_json::from_str(strip_code_blocks(response))
        .context("Planning response is not a JSON plan")?;

    let mut platforms: Vec<String> = Vec::new();
    for platform in raw.platforms {
        let platform = platform.trim().to_lowercase();
        if !is_known_platform(&platform) {
            warn!(platform = %platform, "Ignoring unknown platform in plan");
        } else if !platforms.contains(&platform) {
            platforms.push(platform);
        }
    }
    if platforms.is_empty() {
        anyhow::bail!("Plan names no known platforms");
    }

    let max_listings = whole_number(&raw.max_listings)
        .map(|n| (n.min(MAX_LISTINGS as u64) as usize).max(MIN_LISTINGS))
        .unwrap_or(SearchStrategy::FALLBACK_MAX_LISTINGS);

    let mut search_terms = vec![query.to_string()];
    let planned = raw.search_terms.as_array().map(Vec::as_slice).unwrap_or_default();
    for term in planned.iter().filter_map(Value::as_str) {
        let term = term.trim();
        if !term.is_empty() && !search_terms.iter().any(|t| t.eq_ignore_ascii_case(term)) {
            search_terms.push(term.to_string());
        }
    }

    let price_range = price_range(&raw.price_range);
    if price_range.is_none() && !raw.price_range.is_null() {
        warn!(price_range = %raw.price_range, "Ignoring unusable price range in plan");
    }

    Ok(SearchStrategy {
        platforms,
        max_listings,
        search_terms,
        price_range,
    })
}

/// Non-negative number, rounded; "30", 30 and 30.0 all read as 30
fn whole_number(value: &Value) -> Option<u64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n.is_finite() && n >= 0.0).then(|| n.round() as u64)
}

/// A missing lower bound means "no minimum"; a missing upper bound or an
/// inverted range is unusable
fn price_range(value: &Value) -> Option<PriceRange> {
    let bound = |key: &str| whole_number(value.get(key)?).map(|n| n.min(u32::MAX as u64) as u32);
    let max = bound("max")?;
    let min = match value.get("min") {
        None | Some(Value::Null) => 0,
        Some(_) => bound("min")?,
    };
    Some(PriceRange { min, max }).filter(PriceRange::is_valid)
}
