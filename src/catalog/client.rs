//! Catalog service client
//!
//! Thin blocking facade over the PokeAPI REST service. Worker threads call the
//! blocking methods; internally requests run on a private tokio runtime.

use futures_util::StreamExt;
use tokio::runtime::Runtime;
use tracing::{debug, warn};

use super::types::{
    PokemonDetail, PokemonIndexPage, PokemonResource, PokemonSummary, SpeciesResource,
};

const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";

/// How many detail fetches run concurrently during a bulk listing
const LISTING_CONCURRENCY: usize = 8;

/// Errors from the catalog service
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The key resolved to no entry, even after the species fallback
    #[error("no catalog entry for '{0}'")]
    NotFound(String),
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog returned no usable entries")]
    EmptyListing,
    #[error("catalog client setup failed: {0}")]
    Setup(String),
}

/// Client for the read-only catalog service
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    runtime: Runtime,
}

impl CatalogClient {
    /// Create a client against the public API
    pub fn new() -> Result<Self, CatalogError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        let runtime = Runtime::new().map_err(|e| CatalogError::Setup(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            runtime,
        })
    }

    /// Fetch the first `count` catalog entries as summaries, in catalog order.
    ///
    /// Entries whose detail fetch fails are skipped with a warning rather than
    /// failing the whole listing; an empty result is still an error.
    pub fn list_summaries(&self, count: u32) -> Result<Vec<PokemonSummary>, CatalogError> {
        self.runtime.block_on(self.list_summaries_async(count))
    }

    /// Fetch one entry by numeric id or lowercase name.
    pub fn get_detail(&self, key: &str) -> Result<PokemonDetail, CatalogError> {
        self.runtime.block_on(self.get_detail_async(key))
    }

    /// Fetch raw image bytes (artwork sprites).
    pub fn fetch_image(&self, url: &str) -> Result<Vec<u8>, CatalogError> {
        self.runtime.block_on(async {
            let bytes = self
                .http
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;
            Ok(bytes.to_vec())
        })
    }

    async fn list_summaries_async(&self, count: u32) -> Result<Vec<PokemonSummary>, CatalogError> {
        let index: PokemonIndexPage = self
            .http
            .get(format!("{}/pokemon?limit={}&offset=0", self.base_url, count))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!("Catalog index returned {} entries", index.results.len());

        let summaries: Vec<Option<PokemonSummary>> =
            futures_util::stream::iter(index.results.into_iter().map(|entry| async move {
                match self.fetch_resource(&entry.url).await {
                    Ok(resource) => Some(PokemonDetail::from(resource).summary()),
                    Err(e) => {
                        warn!("Skipping catalog entry '{}': {}", entry.name, e);
                        None
                    }
                }
            }))
            .buffered(LISTING_CONCURRENCY)
            .collect()
            .await;

        let summaries: Vec<PokemonSummary> = summaries.into_iter().flatten().collect();
        if summaries.is_empty() {
            return Err(CatalogError::EmptyListing);
        }

        Ok(summaries)
    }

    async fn fetch_resource(&self, url: &str) -> Result<PokemonResource, CatalogError> {
        let resource = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resource)
    }

    async fn get_detail_async(&self, key: &str) -> Result<PokemonDetail, CatalogError> {
        let key = key.trim().to_lowercase();

        // Direct lookup first
        let response = self
            .http
            .get(format!("{}/pokemon/{}", self.base_url, key))
            .send()
            .await?;
        if response.status().is_success() {
            let resource: PokemonResource = response.json().await?;
            return Ok(resource.into());
        }

        // Some entries are addressable only at the species level (regional and
        // form-prefixed names). Resolve the species id, then re-fetch the
        // canonical record.
        if !key.chars().all(|c| c.is_ascii_digit()) {
            debug!("Direct lookup for '{}' failed, trying species fallback", key);

            let species_response = self
                .http
                .get(format!("{}/pokemon-species/{}", self.base_url, key))
                .send()
                .await?;
            if species_response.status().is_success() {
                let species: SpeciesResource = species_response.json().await?;
                let final_response = self
                    .http
                    .get(format!("{}/pokemon/{}", self.base_url, species.id))
                    .send()
                    .await?;
                if final_response.status().is_success() {
                    let resource: PokemonResource = final_response.json().await?;
                    return Ok(resource.into());
                }
            }
        }

        Err(CatalogError::NotFound(key))
    }
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_carries_key() {
        let err = CatalogError::NotFound("missingno".to_string());
        assert_eq!(err.to_string(), "no catalog entry for 'missingno'");
    }

    #[test]
    fn test_client_construction() {
        let client = CatalogClient::with_base_url("http://localhost:1");
        assert!(client.is_ok());
    }
}
