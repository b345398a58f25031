//! Scanner view - live feed, HUD overlay, and scan controls

use egui::{Color32, Pos2, Rect, RichText, Stroke, Vec2};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::dashboard::components::{CardStatus, StatusCard};
use crate::dashboard::state::ScannerViewState;
use crate::dashboard::theme::{color_with_alpha, ThemeColors};
use crate::recognize::RecognizerBackend;
use crate::scanner::{ScanFailure, ScanStatus};
use crate::shared::{ScannerCommand, SharedAppState};

/// Render the scanner view
pub fn render_scanner_view(
    ui: &mut egui::Ui,
    state: &mut ScannerViewState,
    shared_state: &Arc<RwLock<SharedAppState>>,
) {
    let (active, backend, region_fraction) = {
        let app_state = shared_state.read();
        (
            app_state.runtime.scanner_active,
            app_state.config.scanner.backend,
            app_state.config.camera.region_fraction,
        )
    };

    if !active {
        render_idle_panel(ui, backend, shared_state);
        return;
    }

    if let ScanStatus::Failed(failure) = state.status.clone() {
        render_failure_panel(ui, &failure, shared_state);
        return;
    }

    ui.heading(RichText::new("Scanner").size(24.0).strong());
    ui.add_space(8.0);

    // Live feed with HUD overlay
    let available = ui.available_size();
    let feed_height = (available.y - 120.0).max(200.0);

    match (&state.preview_texture, state.preview_size) {
        (Some(texture), Some((w, h))) => {
            let aspect = w as f32 / h as f32;
            let mut size = Vec2::new(feed_height * aspect, feed_height);
            if size.x > available.x {
                size = Vec2::new(available.x, available.x / aspect);
            }

            let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
            ui.painter().image(
                texture.id(),
                rect,
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
            paint_hud(ui, rect, region_fraction, &state.status);
        }
        _ => {
            let (rect, _) = ui.allocate_exact_size(
                Vec2::new(available.x, feed_height),
                egui::Sense::hover(),
            );
            ui.painter()
                .rect_filled(rect, egui::Rounding::same(8.0), Color32::BLACK);
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "Waiting for camera feed...",
                egui::FontId::proportional(16.0),
                ThemeColors::TEXT_SECONDARY,
            );
        }
    }

    ui.add_space(8.0);

    // Status line
    ui.horizontal(|ui| {
        ui.label(RichText::new("»").color(ThemeColors::ACCENT_PRIMARY).strong());
        ui.label(
            RichText::new(hud_text(&state.status, backend))
                .monospace()
                .color(ThemeColors::TEXT_PRIMARY),
        );
    });
    if let Some(notice) = &state.notice {
        ui.label(RichText::new(notice).color(ThemeColors::ACCENT_WARNING).size(13.0));
    }

    ui.add_space(8.0);

    // Controls
    ui.horizontal(|ui| {
        if backend == RecognizerBackend::RemoteVision {
            let ready = state.status == ScanStatus::Scanning;
            if ui
                .add_enabled(
                    ready,
                    egui::Button::new(RichText::new("Capture").color(Color32::WHITE))
                        .fill(ThemeColors::ACCENT_SECONDARY)
                        .min_size(egui::vec2(120.0, 36.0)),
                )
                .clicked()
            {
                state.request_capture = true;
            }
            ui.add_space(8.0);
        }

        if ui
            .add(
                egui::Button::new(RichText::new("Abort Scan").color(Color32::WHITE))
                    .fill(ThemeColors::ACCENT_ERROR)
                    .min_size(egui::vec2(120.0, 36.0)),
            )
            .clicked()
        {
            shared_state.write().runtime.scanner_command = Some(ScannerCommand::Close);
        }
    });
}

/// The HUD status line, mirroring the session state machine
fn hud_text(status: &ScanStatus, backend: RecognizerBackend) -> String {
    match status {
        ScanStatus::Initializing => "Initializing Pokedex Vision...".to_string(),
        ScanStatus::AwaitingPermission => "Requesting optical sensor access...".to_string(),
        ScanStatus::Scanning => {
            if backend.is_polling() {
                "Scanning for signature...".to_string()
            } else {
                "Ready to scan".to_string()
            }
        }
        ScanStatus::Analyzing => "Analyzing subject...".to_string(),
        ScanStatus::Matched(name) => format!("Visual Match: {}", name.to_uppercase()),
        ScanStatus::Failed(failure) => failure.to_string(),
        ScanStatus::Closed => "Scanner offline".to_string(),
    }
}

/// Target frame, corner brackets and crosshair over the live feed
fn paint_hud(ui: &egui::Ui, feed: Rect, region_fraction: f32, status: &ScanStatus) {
    let painter = ui.painter();

    let side = feed.width().min(feed.height()) * region_fraction.clamp(0.05, 1.0);
    let target = Rect::from_center_size(feed.center(), Vec2::splat(side));

    let accent = if matches!(status, ScanStatus::Matched(_)) {
        ThemeColors::ACCENT_SUCCESS
    } else {
        ThemeColors::ACCENT_PRIMARY
    };

    painter.rect_stroke(
        target,
        egui::Rounding::same(12.0),
        Stroke::new(1.0, color_with_alpha(Color32::WHITE, 60)),
    );

    // Corner brackets
    let len = side * 0.15;
    let stroke = Stroke::new(3.0, accent);
    for (corner, dx, dy) in [
        (target.left_top(), 1.0, 1.0),
        (target.right_top(), -1.0, 1.0),
        (target.left_bottom(), 1.0, -1.0),
        (target.right_bottom(), -1.0, -1.0),
    ] {
        painter.line_segment([corner, corner + Vec2::new(dx * len, 0.0)], stroke);
        painter.line_segment([corner, corner + Vec2::new(0.0, dy * len)], stroke);
    }

    // Central crosshair
    let cross = side * 0.05;
    let center = target.center();
    let faint = Stroke::new(1.0, color_with_alpha(Color32::WHITE, 100));
    painter.line_segment(
        [center - Vec2::new(cross, 0.0), center + Vec2::new(cross, 0.0)],
        faint,
    );
    painter.line_segment(
        [center - Vec2::new(0.0, cross), center + Vec2::new(0.0, cross)],
        faint,
    );
}

/// Landing panel shown when no session is active
fn render_idle_panel(
    ui: &mut egui::Ui,
    backend: RecognizerBackend,
    shared_state: &Arc<RwLock<SharedAppState>>,
) {
    ui.heading(RichText::new("Scanner").size(24.0).strong());
    ui.add_space(8.0);
    ui.label(
        RichText::new("Point the camera at a Pokemon card or artwork to identify it.")
            .color(ThemeColors::TEXT_SECONDARY),
    );
    ui.label(
        RichText::new(format!("Recognition backend: {}", backend.label()))
            .size(13.0)
            .color(ThemeColors::TEXT_MUTED),
    );

    ui.add_space(20.0);

    let (catalog_len, catalog_loading) = {
        let app_state = shared_state.read();
        (app_state.catalog.len(), app_state.runtime.catalog_loading)
    };
    let catalog_ready = !catalog_loading && catalog_len > 0;

    ui.horizontal(|ui| {
        let (value, status) = if catalog_loading {
            ("Loading...".to_string(), CardStatus::Warning)
        } else if catalog_len > 0 {
            (format!("{} entries", catalog_len), CardStatus::Active)
        } else {
            ("Unavailable".to_string(), CardStatus::Error)
        };
        StatusCard::new("Catalog", value, status).show(ui);

        ui.add_space(16.0);

        let backend_status = if catalog_ready { CardStatus::Active } else { CardStatus::Inactive };
        StatusCard::new("Recognition", backend.label(), backend_status).show(ui);
    });

    ui.add_space(20.0);

    if ui
        .add_enabled(
            catalog_ready,
            egui::Button::new(RichText::new("Start Scan").color(Color32::WHITE))
                .fill(ThemeColors::ACCENT_PRIMARY)
                .min_size(egui::vec2(160.0, 40.0)),
        )
        .clicked()
    {
        shared_state.write().runtime.scanner_command = Some(ScannerCommand::Open);
    }

    if !catalog_ready {
        ui.label(
            RichText::new("Waiting for the catalog to finish loading...")
                .size(13.0)
                .color(ThemeColors::TEXT_MUTED),
        );
    }
}

/// Full-panel terminal failure message, dismissible back to the dex
fn render_failure_panel(
    ui: &mut egui::Ui,
    failure: &ScanFailure,
    shared_state: &Arc<RwLock<SharedAppState>>,
) {
    ui.add_space(40.0);
    ui.vertical_centered(|ui| {
        ui.label(
            RichText::new("Optical Sensor Error")
                .size(22.0)
                .color(ThemeColors::ACCENT_ERROR)
                .strong(),
        );
        ui.add_space(8.0);
        ui.label(RichText::new(failure.to_string()).color(ThemeColors::TEXT_SECONDARY));
        ui.add_space(20.0);

        if ui
            .add(
                egui::Button::new(RichText::new("Return to Dex").color(Color32::BLACK))
                    .fill(Color32::WHITE)
                    .min_size(egui::vec2(150.0, 36.0)),
            )
            .clicked()
        {
            shared_state.write().runtime.scanner_command = Some(ScannerCommand::Close);
        }
    });
}
