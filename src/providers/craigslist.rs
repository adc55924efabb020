use crate::markets::{CityResolver, MarketTables};
use crate::models::{Listing, PriceRange, SearchStrategy};
use crate::providers::fetch::Fetcher;
use crate::providers::traits::ProviderAdapter;
use crate::synthesizer::ListingSynthesizer;
use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

const PLATFORM: &str = "craigslist";

/// Live Craigslist adapter: one fetch per search term, synthesis on failure
pub struct CraigslistProvider {
    fetcher: Arc<dyn Fetcher>,
    resolver: CityResolver,
    tables: Arc<MarketTables>,
    synthesizer: ListingSynthesizer,
    timeout: Duration,
    /// Bound on a whole search across all terms
    budget: Duration,
}

impl CraigslistProvider {
    /// The search budget defaults to one and a half request timeouts, which
    /// keeps a full search inside the engine's guard of two.
    pub fn new(fetcher: Arc<dyn Fetcher>, tables: Arc<MarketTables>, timeout: Duration) -> Self {
        Self {
            fetcher,
            resolver: CityResolver::new(tables.clone()),
            synthesizer: ListingSynthesizer::new(tables.clone()),
            tables,
            timeout,
            budget: timeout * 3 / 2,
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Apartment search URL for a locale, forwarding price bounds when planned
    pub fn search_url(locale: &str, term: &str, price_range: Option<PriceRange>) -> Result<Url> {
        let base = format!("https://{}.craigslist.org/search/apa", locale);
        let mut url = Url::parse(&base).context("Invalid Craigslist base URL")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", term);
            if let Some(range) = price_range {
                pairs.append_pair("min_price", &range.min.to_string());
                pairs.append_pair("max_price", &range.max.to_string());
            }
        }
        Ok(url)
    }

    /// Fetch one term within `timeout`, absorbing any failure into
    /// synthesized listings
    async fn search_term(
        &self,
        term: &str,
        city: &str,
        strategy: &SearchStrategy,
        cap: usize,
        timeout: Duration,
    ) -> Vec<Listing> {
        let locale = self.resolver.resolve(city);
        let url = match Self::search_url(locale, term, strategy.price_range) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, term, "Could not build Craigslist URL, using simulated data");
                return self.synthesizer.synthesize(PLATFORM, term, city, cap);
            }
        };

        match tokio::time::timeout(timeout, self.fetcher.get(&url)).await {
            Ok(Ok(html)) => {
                let listings = self.parse_listings(&html, &url, city);
                if listings.is_empty() {
                    info!("No listings parsed for \"{}\", using simulated data", term);
                    self.synthesizer.synthesize(PLATFORM, term, city, cap)
                } else {
                    info!("✅ Parsed {} Craigslist listings for \"{}\"", listings.len(), term);
                    listings
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, term, "Craigslist fetch failed, using simulated data");
                self.synthesizer.synthesize(PLATFORM, term, city, cap)
            }
            Err(_) => {
                warn!(term, ?timeout, "Craigslist fetch timed out, using simulated data");
                self.synthesizer.synthesize(PLATFORM, term, city, cap)
            }
        }
    }

    /// Structured data first, then result cards, then bare price tokens
    pub fn parse_listings(&self, html: &str, page_url: &Url, city: &str) -> Vec<Listing> {
        let document = Html::parse_document(html);
        let neighborhoods = self.tables.neighborhoods_for(city);

        let structured = parse_json_ld(&document, city);
        if !structured.is_empty() {
            debug!("Extracted {} listings from JSON-LD", structured.len());
            return structured;
        }

        let cards = parse_result_cards(&document, page_url, city);
        if !cards.is_empty() {
            debug!("Extracted {} listings from result cards", cards.len());
            return cards;
        }

        let patterned = parse_price_tokens(html, page_url, city, neighborhoods);
        if !patterned.is_empty() {
            debug!("Extracted {} listings from price tokens", patterned.len());
        }
        patterned
    }
}

#[async_trait]
impl ProviderAdapter for CraigslistProvider {
    async fn search(
        &self,
        query: &str,
        city: &str,
        strategy: &SearchStrategy,
    ) -> Result<Vec<Listing>> {
        info!("Starting Craigslist search for \"{}\" in {}", query, city);

        let cap = strategy.per_provider_cap();
        let deadline = Instant::now() + self.budget;
        let mut listings = Vec::new();

        for term in &strategy.search_terms {
            if listings.len() >= cap {
                break;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(
                    term,
                    budget = ?self.budget,
                    "Craigslist search budget spent, using simulated data"
                );
                let missing = cap - listings.len();
                listings.extend(self.synthesizer.synthesize(PLATFORM, term, city, missing));
                break;
            }
            let timeout = remaining.min(self.timeout);
            listings.extend(self.search_term(term, city, strategy, cap, timeout).await);
        }

        listings.truncate(cap);
        Ok(listings)
    }

    fn source_name(&self) -> &'static str {
        PLATFORM
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn located(hood: Option<&str>, city: &str) -> String {
    match hood.map(|h| h.trim().trim_matches(|c| c == '(' || c == ')').trim()) {
        Some(h) if !h.is_empty() => format!("{}, {}", h, city),
        _ => format!("Citywide, {}", city),
    }
}

/// JSON scalar rendered as listing text
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn dollar_price(raw: String) -> String {
    if raw.starts_with('$') {
        raw
    } else {
        format!("${}", raw)
    }
}

fn json_ld_records(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|v| json_ld_records(v, out)),
        Value::Object(mut map) => {
            if let Some(items) = map.remove("itemListElement").or_else(|| map.remove("@graph")) {
                json_ld_records(items, out);
            } else if let Some(item) = map.remove("item") {
                json_ld_records(item, out);
            } else {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

fn parse_json_ld(document: &Html, city: &str) -> Vec<Listing> {
    let mut records = Vec::new();
    for script in document.select(&selector(r#"script[type="application/ld+json"]"#)) {
        let text = script.text().collect::<String>();
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => json_ld_records(value, &mut records),
            Err(e) => debug!(error = %e, "Skipping malformed JSON-LD block"),
        }
    }

    records
        .iter()
        .filter_map(|record| {
            let title = record.get("name").and_then(scalar_text)?;
            let price = record
                .get("offers")
                .and_then(|o| o.get("price"))
                .or_else(|| record.get("price"))
                .and_then(scalar_text)?;
            let link = record.get("url").and_then(scalar_text)?;
            let hood = record
                .get("address")
                .and_then(|a| a.get("addressLocality"))
                .and_then(Value::as_str);

            Some(Listing {
                title,
                price: dollar_price(price),
                location: located(hood, city),
                link,
                platform: PLATFORM.to_string(),
                description: record.get("description").and_then(scalar_text),
                bedrooms: record.get("numberOfBedrooms").and_then(scalar_text),
                bathrooms: record.get("numberOfBathroomsTotal").and_then(scalar_text),
                floor_area: record
                    .get("floorSize")
                    .and_then(|f| f.get("value"))
                    .and_then(scalar_text)
                    .map(|v| format!("{} sq ft", v)),
            })
        })
        .collect()
}

fn parse_result_cards(document: &Html, page_url: &Url, city: &str) -> Vec<Listing> {
    // Current static markup, then the legacy result-info rows
    let layouts = [
        ("li.cl-static-search-result", "div.title", "div.price", "div.location", "a"),
        (".result-info", ".result-title", ".result-price", ".result-hood", ".result-title"),
    ];

    for (card_css, title_css, price_css, hood_css, link_css) in layouts {
        let (title_sel, price_sel, hood_sel, link_sel) = (
            selector(title_css),
            selector(price_css),
            selector(hood_css),
            selector(link_css),
        );

        let listings: Vec<Listing> = document
            .select(&selector(card_css))
            .filter_map(|card| {
                let title = card.select(&title_sel).next().map(element_text)?;
                let price = card.select(&price_sel).next().map(element_text)?;
                let href = card
                    .select(&link_sel)
                    .next()
                    .and_then(|a| a.value().attr("href"))?;
                let link = page_url.join(href).ok()?.to_string();
                if title.is_empty() || price.is_empty() {
                    return None;
                }
                let hood = card.select(&hood_sel).next().map(element_text);

                Some(Listing {
                    title,
                    price,
                    location: located(hood.as_deref(), city),
                    link,
                    platform: PLATFORM.to_string(),
                    description: None,
                    bedrooms: None,
                    bathrooms: None,
                    floor_area: None,
                })
            })
            .collect();

        if !listings.is_empty() {
            return listings;
        }
    }

    Vec::new()
}

fn price_token_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\s?(\d{1,3}(?:,\d{3})+|\d{3,5})\b").unwrap())
}

/// Pair price-like tokens positionally with a rotating neighborhood list
fn parse_price_tokens(
    html: &str,
    page_url: &Url,
    city: &str,
    neighborhoods: &[String],
) -> Vec<Listing> {
    if neighborhoods.is_empty() {
        return Vec::new();
    }

    price_token_pattern()
        .captures_iter(html)
        .enumerate()
        .map(|(i, caps)| {
            let hood = &neighborhoods[i % neighborhoods.len()];
            Listing {
                title: format!("Rental in {} (listing {})", hood, i + 1),
                price: format!("${}/month", &caps[1]),
                location: format!("{}, {}", hood, city),
                link: format!("{}#result-{}", page_url, i),
                platform: PLATFORM.to_string(),
                description: None,
                bedrooms: None,
                bathrooms: None,
                floor_area: None,
            }
        })
        .collect()
}
