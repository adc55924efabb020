use crate::models::{Listing, SearchStrategy};
use crate::providers::traits::ProviderAdapter;
use crate::synthesizer::ListingSynthesizer;
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// Provider backed purely by the listing synthesizer
pub struct SyntheticProvider {
    id: &'static str,
    label: &'static str,
    synthesizer: ListingSynthesizer,
}

impl SyntheticProvider {
    pub fn new(id: &'static str, label: &'static str, synthesizer: ListingSynthesizer) -> Self {
        Self {
            id,
            label,
            synthesizer,
        }
    }

    pub fn apartments(synthesizer: ListingSynthesizer) -> Self {
        Self::new("apartments", "apartments.com", synthesizer)
    }

    pub fn zillow(synthesizer: ListingSynthesizer) -> Self {
        Self::new("zillow", "zillow", synthesizer)
    }

    pub fn rentals(synthesizer: ListingSynthesizer) -> Self {
        Self::new("rentals", "rentals.com", synthesizer)
    }
}

#[async_trait]
impl ProviderAdapter for SyntheticProvider {
    async fn search(
        &self,
        query: &str,
        city: &str,
        strategy: &SearchStrategy,
    ) -> Result<Vec<Listing>> {
        info!("Searching {} for \"{}\" in {}", self.label, query, city);
        Ok(self
            .synthesizer
            .synthesize(self.label, query, city, strategy.per_provider_cap()))
    }

    fn source_name(&self) -> &'static str {
        self.id
    }
}
