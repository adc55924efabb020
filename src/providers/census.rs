use crate::models::{Listing, SearchStrategy};
use crate::providers::fetch::Fetcher;
use crate::providers::traits::ProviderAdapter;
use crate::synthesizer::format_dollars;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_CENSUS_URL: &str =
    "https://api.census.gov/data/2022/acs/acs5?get=NAME,B25064_001E&for=place:*";
pub const CENSUS_LINK: &str = "https://data.census.gov/";

const PLATFORM: &str = "census";

/// Median gross rent for one census place
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceRent {
    /// e.g. "Chicago city, Illinois"
    pub name: String,
    pub median_rent: u32,
}

/// Analytics source: one summary record per city from the ACS rent table
pub struct CensusRentProvider {
    fetcher: Arc<dyn Fetcher>,
    dataset_url: Url,
    timeout: Duration,
    places: OnceCell<Vec<PlaceRent>>,
}

impl CensusRentProvider {
    pub fn new(fetcher: Arc<dyn Fetcher>, dataset_url: &str, timeout: Duration) -> Result<Self> {
        let dataset_url = Url::parse(dataset_url).context("Invalid census dataset URL")?;
        Ok(Self {
            fetcher,
            dataset_url,
            timeout,
            places: OnceCell::new(),
        })
    }

    /// Dataset is fetched once and kept; failed loads are retried next request
    async fn places(&self) -> Result<&[PlaceRent]> {
        let places = self
            .places
            .get_or_try_init(|| async {
                let body = tokio::time::timeout(self.timeout, self.fetcher.get(&self.dataset_url))
                    .await
                    .context("Census request timed out")??;
                let places = parse_dataset(&body)?;
                info!("Loaded median rents for {} census places", places.len());
                Ok::<_, anyhow::Error>(places)
            })
            .await?;
        Ok(places)
    }
}

#[async_trait]
impl ProviderAdapter for CensusRentProvider {
    async fn search(
        &self,
        _query: &str,
        city: &str,
        strategy: &SearchStrategy,
    ) -> Result<Vec<Listing>> {
        if strategy.per_provider_cap() == 0 {
            return Ok(Vec::new());
        }

        let places = self.places().await?;
        let Some(place) = match_place(places, city) else {
            debug!(city, "City not found in census dataset");
            return Ok(Vec::new());
        };

        Ok(vec![Listing {
            title: format!("Median rent in {}", city),
            price: format!("{}/month (median)", format_dollars(place.median_rent)),
            location: format!("Citywide, {}", city),
            link: CENSUS_LINK.to_string(),
            platform: PLATFORM.to_string(),
            description: Some(format!(
                "Median gross rent across {} from the American Community Survey 5-year estimates.",
                place.name
            )),
            bedrooms: None,
            bathrooms: None,
            floor_area: None,
        }])
    }

    fn source_name(&self) -> &'static str {
        PLATFORM
    }
}

/// Parse the census API's header-plus-rows array format
pub fn parse_dataset(body: &str) -> Result<Vec<PlaceRent>> {
    let rows: Vec<Vec<Value>> =
        serde_json::from_str(body).context("Census response is not a row array")?;
    let mut rows = rows.into_iter();

    let header = rows.next().context("Census response has no header row")?;
    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.as_str() == Some(name))
            .with_context(|| format!("Census response lacks column {}", name))
    };
    let name_col = column("NAME")?;
    let rent_col = column("B25064_001E")?;

    Ok(rows
        .filter_map(|row| {
            let name = row.get(name_col)?.as_str()?.to_string();
            // Suppressed estimates come back as negative sentinels or null
            let median_rent = match row.get(rent_col)? {
                Value::String(s) => s.parse::<i64>().ok()?,
                Value::Number(n) => n.as_i64()?,
                _ => return None,
            };
            let median_rent = u32::try_from(median_rent).ok().filter(|r| *r > 0)?;
            Some(PlaceRent { name, median_rent })
        })
        .collect())
}

/// "Chicago city, Illinois" -> "chicago", "Washington DC" -> "washington"
fn place_key(name: &str) -> String {
    let place = name.split(',').next().unwrap_or(name).trim().to_lowercase();
    let place = [" dc", " d.c."]
        .iter()
        .find_map(|district| place.strip_suffix(district))
        .unwrap_or(place.as_str());
    [" city", " town", " village", " cdp", " municipality", " borough"]
        .iter()
        .find_map(|suffix| place.strip_suffix(suffix))
        .unwrap_or(place)
        .trim()
        .to_string()
}

/// First place whose name matches the city, ignoring a trailing "City"
pub fn match_place<'a>(places: &'a [PlaceRent], city: &str) -> Option<&'a PlaceRent> {
    let wanted = place_key(city);
    if wanted.is_empty() {
        return None;
    }
    places.iter().find(|p| place_key(&p.name) == wanted)
}
