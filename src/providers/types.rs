use crate::models::Listing;
use serde::Serialize;

/// Outcome of invoking one provider during fan-out
#[derive(Debug)]
pub(crate) struct ProviderResult {
    pub platform: String,
    pub outcome: anyhow::Result<Vec<Listing>>,
}

/// What a provider contributed to an aggregation
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProviderReport {
    pub platform: String,
    pub listings: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProviderReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}
