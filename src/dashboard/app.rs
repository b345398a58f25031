//! Dashboard application entry point
//!
//! Owns the scan session controller, the narrator, the artwork cache and the
//! background catalog loader; views communicate intents through the shared
//! runtime state and the per-view structs.

use crossbeam_channel::{bounded, Receiver};
use eframe::egui;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::{CatalogClient, PokemonDetail, PokemonSummary};
use crate::dashboard::artwork::ArtworkCache;
use crate::dashboard::components::render_sidebar;
use crate::dashboard::state::{DashboardState, DashboardView, DetailViewState, ScannerViewState};
use crate::dashboard::theme;
use crate::dashboard::views::{
    render_detail_modal, render_dex_view, render_scanner_view, render_settings_view, DetailAction,
};
use crate::narrate::{narration_text, Narrator};
use crate::scanner::{ScanController, ScanEvent, ScanStatus};
use crate::shared::{DetailRequest, ScannerCommand, SharedAppState};

/// The main dashboard application
pub struct DashboardApp {
    /// Shared application state
    shared_state: Arc<RwLock<SharedAppState>>,
    /// Dashboard-specific state
    dashboard_state: DashboardState,
    /// Whether theme has been applied
    theme_applied: bool,
    /// Catalog service client, shared with workers
    client: Arc<CatalogClient>,
    /// Active scan session, at most one at a time
    scanner: Option<ScanController>,
    /// Narration engine
    narrator: Narrator,
    /// Artwork texture cache
    artwork: ArtworkCache,
    /// Pending catalog listing result
    catalog_rx: Option<Receiver<Result<Vec<PokemonSummary>, String>>>,
    /// Pending detail lookup result
    detail_rx: Option<Receiver<Result<PokemonDetail, String>>>,
}

impl DashboardApp {
    /// Create the dashboard and kick off the catalog listing
    pub fn new(shared_state: Arc<RwLock<SharedAppState>>, client: Arc<CatalogClient>) -> Self {
        let narrator = {
            let state = shared_state.read();
            Narrator::new(&state.config.narration, &state.config.vision)
        };

        let mut app = Self {
            shared_state,
            dashboard_state: DashboardState::default(),
            theme_applied: false,
            artwork: ArtworkCache::new(client.clone()),
            client,
            scanner: None,
            narrator,
            catalog_rx: None,
            detail_rx: None,
        };
        app.spawn_catalog_load();
        app
    }

    /// Fetch the catalog listing on a background thread
    fn spawn_catalog_load(&mut self) {
        let limit = {
            let mut state = self.shared_state.write();
            state.runtime.catalog_loading = true;
            state.runtime.catalog_error = None;
            state.config.general.catalog_limit
        };

        let (tx, rx) = bounded(1);
        let client = self.client.clone();
        std::thread::Builder::new()
            .name("catalog-load".to_string())
            .spawn(move || {
                info!("Loading {} catalog entries...", limit);
                let result = client.list_summaries(limit).map_err(|e| e.to_string());
                let _ = tx.send(result);
            })
            .expect("failed to spawn catalog loader");

        self.catalog_rx = Some(rx);
    }

    fn pump_catalog(&mut self) {
        let Some(rx) = &self.catalog_rx else { return };
        let Ok(result) = rx.try_recv() else { return };
        self.catalog_rx = None;

        let mut state = self.shared_state.write();
        state.runtime.catalog_loading = false;
        match result {
            Ok(summaries) => {
                info!("Catalog loaded: {} entries", summaries.len());
                state.catalog = summaries;
            }
            Err(e) => {
                warn!("Catalog listing failed: {}", e);
                state.runtime.catalog_error = Some(e);
            }
        }
    }

    /// Process scanner open/close commands from the UI
    fn process_scanner_commands(&mut self) {
        let command = {
            let mut state = self.shared_state.write();
            state.runtime.scanner_command.take()
        };

        match command {
            Some(ScannerCommand::Open) => self.open_scanner(),
            Some(ScannerCommand::Close) => {
                self.close_scanner();
                self.dashboard_state.current_view = DashboardView::Dex;
            }
            None => {}
        }
    }

    fn open_scanner(&mut self) {
        if self.scanner.is_some() {
            return;
        }

        let (config, catalog) = {
            let state = self.shared_state.read();
            (state.config.clone(), state.catalog.clone())
        };
        if catalog.is_empty() {
            self.shared_state
                .write()
                .runtime
                .set_error("Catalog not loaded yet; cannot scan");
            return;
        }

        self.dashboard_state.scanner = ScannerViewState {
            status: ScanStatus::Initializing,
            ..Default::default()
        };
        self.scanner = Some(ScanController::start(&config, catalog, self.client.clone()));
        self.shared_state.write().runtime.scanner_active = true;
        self.dashboard_state.current_view = DashboardView::Scanner;
    }

    /// Cancel and drop the active session. Dropping joins the worker, which
    /// releases the camera and recognizer.
    fn close_scanner(&mut self) {
        if let Some(controller) = self.scanner.take() {
            controller.cancel();
            drop(controller);
        }
        let mut state = self.shared_state.write();
        state.runtime.scanner_active = false;
        self.dashboard_state.scanner.status = ScanStatus::Closed;
        self.dashboard_state.scanner.notice = None;
    }

    /// Drain scan session events, forward capture presses, refresh the preview
    fn pump_scanner(&mut self, ctx: &egui::Context) {
        let Some(controller) = &self.scanner else { return };

        if self.dashboard_state.scanner.request_capture {
            self.dashboard_state.scanner.request_capture = false;
            controller.trigger_capture();
        }

        let mut identified: Option<PokemonSummary> = None;
        while let Some(event) = controller.poll_event() {
            match event {
                ScanEvent::Status(status) => {
                    if matches!(status, ScanStatus::Matched(_)) {
                        self.dashboard_state.scanner.notice = None;
                    }
                    self.dashboard_state.scanner.status = status;
                }
                ScanEvent::Identified(summary) => identified = Some(summary),
                ScanEvent::UnknownSubject(name) => {
                    self.dashboard_state.scanner.notice = Some(format!(
                        "Identified \"{}\", but it doesn't match a known entry.",
                        name
                    ));
                }
                ScanEvent::NothingRecognized => {
                    self.dashboard_state.scanner.notice =
                        Some("Could not identify the subject. Adjust the frame and try again.".to_string());
                }
                ScanEvent::CycleError(detail) => {
                    self.dashboard_state.scanner.notice =
                        Some(format!("Recognition error: {}", detail));
                }
            }
        }

        if let Some(frame) = controller.take_preview() {
            let image = egui::ColorImage::from_rgba_unmultiplied(
                [frame.width as usize, frame.height as usize],
                &frame.rgba,
            );
            match &mut self.dashboard_state.scanner.preview_texture {
                Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
                None => {
                    self.dashboard_state.scanner.preview_texture = Some(ctx.load_texture(
                        "scan-preview",
                        image,
                        egui::TextureOptions::LINEAR,
                    ));
                }
            }
            self.dashboard_state.scanner.preview_size = Some((frame.width, frame.height));
        }

        let worker_done = controller.is_finished();

        if let Some(summary) = identified {
            // Hand-off: the session is over, open the detail view
            let auto_narrate = self.shared_state.read().config.general.auto_narrate;
            self.close_scanner();
            self.dashboard_state.current_view = DashboardView::Dex;
            self.shared_state.write().runtime.detail_request = Some(DetailRequest {
                key: summary.id.to_string(),
                auto_narrate,
            });
            return;
        }

        // Worker wound down on its own (e.g. closed after a discarded cycle)
        if worker_done && self.dashboard_state.scanner.status == ScanStatus::Closed {
            self.close_scanner();
        }
    }

    /// Open the detail modal for a pending request and start the lookup
    fn process_detail_request(&mut self) {
        let request = {
            let mut state = self.shared_state.write();
            state.runtime.detail_request.take()
        };
        let Some(request) = request else { return };

        self.narrator.stop();
        self.dashboard_state.detail = Some(DetailViewState::new(request.clone()));

        let (tx, rx) = bounded(1);
        let client = self.client.clone();
        std::thread::Builder::new()
            .name("detail-fetch".to_string())
            .spawn(move || {
                let result = client.get_detail(&request.key).map_err(|e| e.to_string());
                let _ = tx.send(result);
            })
            .expect("failed to spawn detail fetch");

        self.detail_rx = Some(rx);
    }

    fn pump_detail(&mut self) {
        let Some(rx) = &self.detail_rx else { return };
        let Ok(result) = rx.try_recv() else { return };
        self.detail_rx = None;

        let Some(detail) = &mut self.dashboard_state.detail else { return };
        match result {
            Ok(record) => {
                self.artwork.request(record.id, record.artwork_url.as_deref());
                if detail.request.auto_narrate {
                    self.narrator.speak(&narration_text(&record));
                }
                detail.record = Some(record);
            }
            Err(e) => {
                warn!("Detail lookup failed: {}", e);
                detail.error = Some(e);
            }
        }
    }

    /// Render the detail modal and apply its resulting action
    fn show_detail_modal(&mut self, ctx: &egui::Context) {
        let Some(detail) = &mut self.dashboard_state.detail else { return };

        // Keep the header artwork in sync with the cache
        if let Some(record) = &detail.record {
            if detail.artwork.is_none() {
                detail.artwork = self.artwork.texture(record.id).cloned();
            }
        }

        let action = render_detail_modal(ctx, detail, self.narrator.is_speaking());
        match action {
            DetailAction::Close => {
                self.narrator.stop();
                self.dashboard_state.detail = None;
                self.detail_rx = None;
            }
            DetailAction::ToggleNarration => {
                if self.narrator.is_speaking() {
                    self.narrator.stop();
                } else if let Some(record) = &detail.record {
                    self.narrator.speak(&narration_text(record));
                }
            }
            DetailAction::None => {}
        }
    }

    /// Create eframe options for the dashboard window
    pub fn options() -> eframe::NativeOptions {
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([1100.0, 720.0])
                .with_min_inner_size([860.0, 540.0])
                .with_title("EliDex"),
            ..Default::default()
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Apply theme once
        if !self.theme_applied {
            theme::apply_theme(ctx);
            self.theme_applied = true;
        }

        self.pump_catalog();
        self.process_scanner_commands();
        self.pump_scanner(ctx);
        self.process_detail_request();
        self.pump_detail();
        self.artwork.pump(ctx);

        if let Some(error) = self.narrator.take_error() {
            self.shared_state.write().runtime.set_error(error);
        }

        // The live feed needs continuous repaints while a session is running
        if self.scanner.is_some() {
            ctx.request_repaint();
        }

        // Sidebar panel
        egui::SidePanel::left("sidebar")
            .resizable(false)
            .default_width(180.0)
            .show(ctx, |ui| {
                render_sidebar(ui, &mut self.dashboard_state.current_view);
            });

        // Transient error bar
        let last_error = self.shared_state.read().runtime.last_error.clone();
        if let Some(error) = last_error {
            egui::TopBottomPanel::bottom("error-bar").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(theme::ThemeColors::ACCENT_ERROR, error);
                    if ui.small_button("Dismiss").clicked() {
                        self.shared_state.write().runtime.clear_error();
                    }
                });
            });
        }

        // Main content panel
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::Frame::none().inner_margin(24.0).show(ui, |ui| {
                match self.dashboard_state.current_view {
                    DashboardView::Dex => {
                        render_dex_view(
                            ui,
                            &mut self.dashboard_state.dex,
                            &self.shared_state,
                            &mut self.artwork,
                        );
                    }
                    DashboardView::Scanner => {
                        render_scanner_view(
                            ui,
                            &mut self.dashboard_state.scanner,
                            &self.shared_state,
                        );
                    }
                    DashboardView::Settings => {
                        render_settings_view(
                            ui,
                            &mut self.dashboard_state.settings,
                            &self.shared_state,
                        );
                    }
                }
            });
        });

        // Detail modal on top of everything
        self.show_detail_modal(ctx);
    }
}

impl Drop for DashboardApp {
    fn drop(&mut self) {
        self.narrator.stop();
        self.close_scanner();
    }
}

/// Run the dashboard application
pub fn run_dashboard(
    shared_state: Arc<RwLock<SharedAppState>>,
    client: Arc<CatalogClient>,
) -> Result<(), eframe::Error> {
    let app = DashboardApp::new(shared_state, client);
    eframe::run_native(
        "EliDex",
        DashboardApp::options(),
        Box::new(|_cc| Ok(Box::new(app))),
    )
}
