//! Settings view - configuration editing and persistence

use egui::RichText;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::config;
use crate::dashboard::state::SettingsViewState;
use crate::dashboard::theme::ThemeColors;
use crate::recognize::RecognizerBackend;
use crate::shared::SharedAppState;

/// Render the settings view
pub fn render_settings_view(
    ui: &mut egui::Ui,
    state: &mut SettingsViewState,
    shared_state: &Arc<RwLock<SharedAppState>>,
) {
    ui.heading(RichText::new("Settings").size(24.0).strong());
    ui.add_space(4.0);
    ui.label(
        RichText::new("Scanner changes apply to the next scan session.")
            .size(13.0)
            .color(ThemeColors::TEXT_MUTED),
    );
    ui.add_space(12.0);

    let mut app_state = shared_state.write();
    let config = &mut app_state.config;
    let mut changed = false;

    egui::ScrollArea::vertical().show(ui, |ui| {
        section(ui, "General", |ui| {
            ui.horizontal(|ui| {
                ui.label("Catalog entries to load");
                changed |= ui
                    .add(egui::DragValue::new(&mut config.general.catalog_limit).range(1..=1025))
                    .changed();
            });
            changed |= ui
                .checkbox(&mut config.general.auto_narrate, "Narrate automatically after a scan match")
                .changed();
        });

        section(ui, "Scanner", |ui| {
            ui.horizontal(|ui| {
                ui.label("Recognition backend");
                for backend in [RecognizerBackend::LocalOcr, RecognizerBackend::RemoteVision] {
                    changed |= ui
                        .radio_value(&mut config.scanner.backend, backend, backend.label())
                        .changed();
                }
            });
            ui.horizontal(|ui| {
                ui.label("Poll interval (ms)");
                changed |= ui
                    .add(egui::Slider::new(&mut config.scanner.poll_interval_ms, 200..=3000))
                    .changed();
            });
            ui.horizontal(|ui| {
                ui.label("Error backoff (ms)");
                changed |= ui
                    .add(egui::Slider::new(&mut config.scanner.error_backoff_ms, 500..=5000))
                    .changed();
            });
            ui.horizontal(|ui| {
                ui.label("Match hold (ms)");
                changed |= ui
                    .add(egui::Slider::new(&mut config.scanner.match_hold_ms, 0..=2000))
                    .changed();
            });
        });

        section(ui, "Camera", |ui| {
            ui.horizontal(|ui| {
                ui.label("Device index");
                changed |= ui
                    .add(egui::DragValue::new(&mut config.camera.device_index).range(0..=16))
                    .changed();
            });
            ui.horizontal(|ui| {
                ui.label("Scan region");
                changed |= ui
                    .add(
                        egui::Slider::new(&mut config.camera.region_fraction, 0.3..=1.0)
                            .fixed_decimals(2),
                    )
                    .changed();
            });
        });

        section(ui, "Vision Service", |ui| {
            ui.horizontal(|ui| {
                ui.label("Model");
                changed |= ui.text_edit_singleline(&mut config.vision.model).changed();
            });
            ui.horizontal(|ui| {
                ui.label("API key environment variable");
                changed |= ui
                    .text_edit_singleline(&mut config.vision.api_key_env)
                    .changed();
            });
        });

        section(ui, "Narration", |ui| {
            changed |= ui.checkbox(&mut config.narration.enabled, "Enabled").changed();
            ui.horizontal(|ui| {
                ui.label("Voice");
                changed |= ui.text_edit_singleline(&mut config.narration.voice).changed();
            });
            ui.horizontal(|ui| {
                ui.label("Volume");
                changed |= ui
                    .add(egui::Slider::new(&mut config.narration.volume, 0.0..=1.0))
                    .changed();
            });
        });

        ui.add_space(8.0);
        ui.horizontal(|ui| {
            if ui
                .add(
                    egui::Button::new(RichText::new("Save Settings").color(egui::Color32::WHITE))
                        .fill(ThemeColors::ACCENT_SUCCESS)
                        .min_size(egui::vec2(130.0, 32.0)),
                )
                .clicked()
            {
                state.save_feedback = Some(match save(config) {
                    Ok(()) => "Settings saved".to_string(),
                    Err(e) => format!("Save failed: {}", e),
                });
                state.has_unsaved_changes = false;
            }

            if state.has_unsaved_changes {
                ui.label(
                    RichText::new("Unsaved changes")
                        .size(13.0)
                        .color(ThemeColors::ACCENT_WARNING),
                );
            } else if let Some(feedback) = &state.save_feedback {
                ui.label(RichText::new(feedback).size(13.0).color(ThemeColors::TEXT_MUTED));
            }
        });
    });

    if changed {
        state.has_unsaved_changes = true;
        state.save_feedback = None;
    }
}

fn save(config: &config::AppConfig) -> anyhow::Result<()> {
    let path = config::get_config_dir()?.join("config.toml");
    config::save_config(config, &path)
}

fn section(ui: &mut egui::Ui, title: &str, add_contents: impl FnOnce(&mut egui::Ui)) {
    egui::Frame::none()
        .fill(ThemeColors::BG_MEDIUM)
        .rounding(egui::Rounding::same(8.0))
        .inner_margin(14.0)
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new(title).strong().size(16.0));
            ui.add_space(6.0);
            add_contents(ui);
        });
    ui.add_space(8.0);
}
