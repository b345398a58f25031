//! Shared application state between the dashboard views and workers

use crate::catalog::PokemonSummary;
use crate::config::AppConfig;

/// Central state shared across dashboard views
#[derive(Debug, Clone, Default)]
pub struct SharedAppState {
    /// Application configuration
    pub config: AppConfig,
    /// Loaded catalog summaries, in catalog order (frozen after load)
    pub catalog: Vec<PokemonSummary>,
    /// Runtime state (not persisted)
    pub runtime: RuntimeState,
}

impl SharedAppState {
    /// Create a new shared state with the given configuration
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            catalog: Vec::new(),
            runtime: RuntimeState::default(),
        }
    }

    /// Find a loaded summary by id
    pub fn summary_by_id(&self, id: u32) -> Option<&PokemonSummary> {
        self.catalog.iter().find(|s| s.id == id)
    }
}

/// Command to control the scanner from the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerCommand {
    /// Open a new scan session
    Open,
    /// Cancel and close the active session
    Close,
}

/// Request to open the detail view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    /// Numeric id or lowercase name, passed to the catalog lookup
    pub key: String,
    /// Start narration as soon as the record arrives
    pub auto_narrate: bool,
}

/// Runtime state that is not persisted
#[derive(Debug, Clone, Default)]
pub struct RuntimeState {
    /// Whether the startup catalog listing is still in flight
    pub catalog_loading: bool,
    /// Error from the catalog listing, if it failed outright
    pub catalog_error: Option<String>,
    /// Whether a scan session is currently active
    pub scanner_active: bool,
    /// Last transient error message (if any)
    pub last_error: Option<String>,
    /// Pending scanner command from the UI
    pub scanner_command: Option<ScannerCommand>,
    /// Pending request to open a detail view
    pub detail_request: Option<DetailRequest>,
}

impl RuntimeState {
    /// Clear any error state
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Set an error message
    pub fn set_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lookup_by_id() {
        let mut state = SharedAppState::new(AppConfig::default());
        state.catalog.push(PokemonSummary {
            id: 7,
            name: "squirtle".to_string(),
            types: vec!["water".to_string()],
            artwork_url: None,
        });

        assert_eq!(state.summary_by_id(7).unwrap().name, "squirtle");
        assert!(state.summary_by_id(8).is_none());
    }

    #[test]
    fn test_error_roundtrip() {
        let mut runtime = RuntimeState::default();
        runtime.set_error("boom");
        assert_eq!(runtime.last_error.as_deref(), Some("boom"));
        runtime.clear_error();
        assert!(runtime.last_error.is_none());
    }
}
