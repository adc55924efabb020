pub mod agent;
pub mod config;
pub mod engine;
pub mod llm;
pub mod markets;
pub mod models;
pub mod planner;
pub mod providers;
pub mod summarizer;
pub mod synthesizer;

pub use agent::HousingAgent;
pub use config::Config;
pub use engine::{Aggregation, AggregationEngine, ProviderRegistry};
pub use models::{Listing, SearchRequest, SearchResponse, SearchStrategy};
