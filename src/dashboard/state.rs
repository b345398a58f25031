//! Dashboard view state management

use crate::catalog::PokemonDetail;
use crate::scanner::ScanStatus;
use crate::shared::DetailRequest;

/// Current view in the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashboardView {
    #[default]
    Dex,
    Scanner,
    Settings,
}

impl DashboardView {
    /// Get the display name for this view
    pub fn name(&self) -> &'static str {
        match self {
            DashboardView::Dex => "Dex",
            DashboardView::Scanner => "Scanner",
            DashboardView::Settings => "Settings",
        }
    }

    /// Get the icon character for this view
    pub fn icon(&self) -> &'static str {
        match self {
            DashboardView::Dex => "D",
            DashboardView::Scanner => "S",
            DashboardView::Settings => "=",
        }
    }
}

/// Overall dashboard state
#[derive(Default)]
pub struct DashboardState {
    /// Current active view
    pub current_view: DashboardView,
    /// Dex view state
    pub dex: DexViewState,
    /// Scanner view state
    pub scanner: ScannerViewState,
    /// Settings view state
    pub settings: SettingsViewState,
    /// Detail modal, when open
    pub detail: Option<DetailViewState>,
}

/// Dex view state
#[derive(Debug, Default)]
pub struct DexViewState {
    /// Search text (matched against name, or exact id)
    pub search_query: String,
    /// Active type filter chip
    pub selected_type: Option<String>,
}

/// Scanner view state
pub struct ScannerViewState {
    /// Latest session status snapshot
    pub status: ScanStatus,
    /// Transient notice line under the HUD (no-match, unknown subject, errors)
    pub notice: Option<String>,
    /// Capture button pressed this frame (remote backend)
    pub request_capture: bool,
    /// Live preview texture
    pub preview_texture: Option<egui::TextureHandle>,
    /// Preview frame dimensions
    pub preview_size: Option<(u32, u32)>,
}

impl Default for ScannerViewState {
    fn default() -> Self {
        Self {
            status: ScanStatus::Closed,
            notice: None,
            request_capture: false,
            preview_texture: None,
            preview_size: None,
        }
    }
}

impl std::fmt::Debug for ScannerViewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerViewState")
            .field("status", &self.status)
            .field("notice", &self.notice)
            .field("preview_size", &self.preview_size)
            .finish()
    }
}

/// Detail modal state; dropped when the modal closes
pub struct DetailViewState {
    /// The originating request
    pub request: DetailRequest,
    /// Fetched record, once the lookup lands
    pub record: Option<PokemonDetail>,
    /// Lookup failure, surfaced in the modal
    pub error: Option<String>,
    /// Artwork texture for the header
    pub artwork: Option<egui::TextureHandle>,
}

impl DetailViewState {
    pub fn new(request: DetailRequest) -> Self {
        Self {
            request,
            record: None,
            error: None,
            artwork: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.record.is_none() && self.error.is_none()
    }
}

/// Settings view state
#[derive(Debug, Default)]
pub struct SettingsViewState {
    /// Unsaved changes flag
    pub has_unsaved_changes: bool,
    /// Feedback after a save attempt
    pub save_feedback: Option<String>,
}
