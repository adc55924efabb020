//! Prompt building and the call to the text-generation service that turns
//! aggregated listings into prose.

use crate::llm::TextGenerator;
use crate::models::Listing;
use std::fmt::Write;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Listings rendered into one prompt
pub const MAX_PROMPT_LISTINGS: usize = 15;

const ATTEMPTS: usize = 2;
const EMPTY_SUMMARY: &str = "No results found.";

/// User-visible summarization failures; messages never carry upstream text
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("Missing summarization API key.")]
    NotConfigured,
    #[error("Error contacting summarization service.")]
    Unavailable,
}

pub fn build_prompt(query: &str, city: &str, listings: &[Listing]) -> String {
    if listings.is_empty() {
        return format!(
            "You are a helpful housing assistant. No listings were found for \"{query}\" in {city}.\n\n\
             Do not invent, describe or link to specific listings. Instead give general guidance for \
             this search in {city}: neighborhoods worth considering, typical rents, where to look and \
             what to watch out for."
        );
    }

    let shown = &listings[..listings.len().min(MAX_PROMPT_LISTINGS)];
    let mut prompt = format!(
        "You are a helpful housing assistant. Here are {} listings for \"{}\" in {}, \
         gathered from several sources:\n\n",
        shown.len(),
        query,
        city
    );

    for listing in shown {
        let _ = writeln!(
            prompt,
            "- {} ({}) {} [View Listing]({}) via {}",
            listing.title, listing.price, listing.location, listing.link, listing.platform
        );
        let details: Vec<String> = [
            listing.bedrooms.as_ref().map(|b| format!("bedrooms: {}", b)),
            listing.bathrooms.as_ref().map(|b| format!("bathrooms: {}", b)),
            listing.floor_area.clone(),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !details.is_empty() {
            let _ = writeln!(prompt, "  {}", details.join(" · "));
        }
    }

    prompt.push_str(
        "\nSummarize the best options, give practical tips, and highlight anything notable. \
         Only discuss the listings above. Do NOT make up listings.",
    );
    prompt
}

pub struct Summarizer {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    pub fn unconfigured() -> Self {
        Self { generator: None }
    }

    /// Summarize listings, retrying a failed call once
    pub async fn summarize(
        &self,
        query: &str,
        city: &str,
        listings: &[Listing],
    ) -> Result<String, SummarizeError> {
        let generator = self.generator.as_ref().ok_or(SummarizeError::NotConfigured)?;
        let prompt = build_prompt(query, city, listings);

        for attempt in 1..=ATTEMPTS {
            match generator.generate(&prompt).await {
                Ok(text) if text.trim().is_empty() => return Ok(EMPTY_SUMMARY.to_string()),
                Ok(text) => return Ok(text),
                Err(e) => warn!(attempt, error = %e, "Summarization request failed"),
            }
        }

        Err(SummarizeError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
        reply: &'static str,
    }

    #[async_trait]
    impl TextGenerator for Flaky {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                anyhow::bail!("https://secret.internal/?key=abc returned 500");
            }
            Ok(self.reply.to_string())
        }
    }

    fn flaky(failures: usize, reply: &'static str) -> Arc<Flaky> {
        Arc::new(Flaky {
            failures,
            calls: AtomicUsize::new(0),
            reply,
        })
    }

    fn listing(i: usize) -> Listing {
        Listing {
            title: format!("Listing {}", i),
            price: "$1,500/month".to_string(),
            location: "Downtown, Denver".to_string(),
            link: format!("https://example.org/{}", i),
            platform: "zillow".to_string(),
            description: None,
            bedrooms: Some("2".to_string()),
            bathrooms: None,
            floor_area: Some("700 sq ft".to_string()),
        }
    }

    #[test]
    fn test_prompt_caps_listings() {
        let listings: Vec<_> = (0..20).map(listing).collect();
        let prompt = build_prompt("2 bed", "Denver", &listings);

        assert!(prompt.contains("Here are 15 listings"));
        assert!(prompt.contains("[View Listing](https://example.org/14)"));
        assert!(!prompt.contains("https://example.org/15)"));
        assert!(prompt.contains("bedrooms: 2 · 700 sq ft"));
        assert!(prompt.contains("Do NOT make up listings"));
    }

    #[test]
    fn test_empty_prompt_forbids_fabrication() {
        let prompt = build_prompt("2 bed", "Denver", &[]);
        assert!(prompt.contains("No listings were found"));
        assert!(prompt.contains("Do not invent"));
        assert!(!prompt.contains("View Listing"));
    }

    #[tokio::test]
    async fn test_retries_once() {
        let generator = flaky(1, "Great options downtown.");
        let summary = Summarizer::new(generator.clone())
            .summarize("2 bed", "Denver", &[listing(0)])
            .await
            .unwrap();

        assert_eq!(summary, "Great options downtown.");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_with_generic_error() {
        let generator = flaky(5, "unused");
        let err = Summarizer::new(generator.clone())
            .summarize("2 bed", "Denver", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, SummarizeError::Unavailable));
        assert!(!err.to_string().contains("secret"));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_reply() {
        let summary = Summarizer::new(flaky(0, "  "))
            .summarize("2 bed", "Denver", &[])
            .await
            .unwrap();
        assert_eq!(summary, "No results found.");
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let err = Summarizer::unconfigured()
            .summarize("2 bed", "Denver", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SummarizeError::NotConfigured));
    }
}
