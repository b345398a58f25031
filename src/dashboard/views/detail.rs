//! Detail modal - stats, traits, abilities and narration for one entry

use egui::{Color32, RichText, Rounding, Vec2};

use crate::dashboard::components::type_badge;
use crate::dashboard::components::type_badge::capitalize;
use crate::dashboard::state::DetailViewState;
use crate::dashboard::theme::{color_with_alpha, type_color, ThemeColors};

/// What the modal asked the app to do this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailAction {
    None,
    Close,
    ToggleNarration,
}

/// Render the detail modal over the current view.
/// `narrating` reflects whether an utterance is currently playing.
pub fn render_detail_modal(
    ctx: &egui::Context,
    state: &mut DetailViewState,
    narrating: bool,
) -> DetailAction {
    let mut action = DetailAction::None;

    egui::Window::new("entry-detail")
        .title_bar(false)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, Vec2::ZERO)
        .fixed_size(Vec2::new(460.0, 540.0))
        .show(ctx, |ui| {
            if state.is_loading() {
                ui.add_space(60.0);
                ui.vertical_centered(|ui| {
                    ui.spinner();
                    ui.add_space(8.0);
                    ui.label(RichText::new("Fetching Data...").color(ThemeColors::TEXT_SECONDARY));
                });
                ui.add_space(60.0);
                return;
            }

            if let Some(error) = state.error.clone() {
                ui.add_space(40.0);
                ui.vertical_centered(|ui| {
                    ui.colored_label(ThemeColors::ACCENT_ERROR, "Entry unavailable");
                    ui.label(RichText::new(error).size(13.0).color(ThemeColors::TEXT_SECONDARY));
                    ui.add_space(16.0);
                    if ui.button("Close").clicked() {
                        action = DetailAction::Close;
                    }
                });
                ui.add_space(40.0);
                return;
            }

            let Some(record) = state.record.clone() else {
                return;
            };

            let theme = record
                .types
                .first()
                .map(|t| type_color(t))
                .unwrap_or(ThemeColors::ACCENT_SECONDARY);

            // Header band tinted by the primary type
            egui::Frame::none()
                .fill(color_with_alpha(theme, 200))
                .rounding(Rounding::same(10.0))
                .inner_margin(14.0)
                .show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.horizontal(|ui| {
                        ui.label(
                            RichText::new(format!("#{:03}", record.id))
                                .size(28.0)
                                .color(color_with_alpha(Color32::WHITE, 120))
                                .strong(),
                        );
                        ui.with_layout(
                            egui::Layout::right_to_left(egui::Align::Center),
                            |ui| {
                                if ui
                                    .add(egui::Button::new(RichText::new("X").color(Color32::WHITE)))
                                    .clicked()
                                {
                                    action = DetailAction::Close;
                                }
                            },
                        );
                    });

                    ui.vertical_centered(|ui| {
                        if let Some(texture) = &state.artwork {
                            ui.add(
                                egui::Image::new(texture)
                                    .fit_to_exact_size(Vec2::new(180.0, 180.0)),
                            );
                        } else {
                            ui.add_space(60.0);
                        }
                    });
                });

            ui.add_space(10.0);

            ui.vertical_centered(|ui| {
                ui.horizontal(|ui| {
                    ui.with_layout(
                        egui::Layout::centered_and_justified(egui::Direction::LeftToRight),
                        |ui| {
                            ui.horizontal(|ui| {
                                ui.label(
                                    RichText::new(capitalize(&record.name)).size(26.0).strong(),
                                );
                                let (speak_label, speak_fill) = if narrating {
                                    ("■", ThemeColors::ACCENT_PRIMARY)
                                } else {
                                    ("♪", ThemeColors::BG_LIGHT)
                                };
                                if ui
                                    .add(
                                        egui::Button::new(RichText::new(speak_label))
                                            .fill(speak_fill)
                                            .rounding(Rounding::same(14.0)),
                                    )
                                    .on_hover_text("Listen to Pokedex entry")
                                    .clicked()
                                {
                                    action = DetailAction::ToggleNarration;
                                }
                            });
                        },
                    );
                });

                ui.horizontal(|ui| {
                    ui.with_layout(
                        egui::Layout::centered_and_justified(egui::Direction::LeftToRight),
                        |ui| {
                            ui.horizontal(|ui| {
                                for type_name in &record.types {
                                    type_badge(ui, type_name, true);
                                }
                            });
                        },
                    );
                });
            });

            ui.add_space(10.0);

            // Base stats
            egui::Frame::none()
                .fill(ThemeColors::BG_LIGHT)
                .rounding(Rounding::same(8.0))
                .inner_margin(12.0)
                .show(ui, |ui| {
                    ui.set_width(ui.available_width());
                    ui.label(RichText::new("Base Stats").strong());
                    ui.add_space(4.0);
                    for stat in &record.stats {
                        stat_bar(ui, &stat.name, stat.value, theme);
                    }
                });

            ui.add_space(8.0);

            // Physical traits and abilities
            ui.columns(2, |columns| {
                egui::Frame::none()
                    .fill(ThemeColors::BG_LIGHT)
                    .rounding(Rounding::same(8.0))
                    .inner_margin(12.0)
                    .show(&mut columns[0], |ui| {
                        ui.label(RichText::new("Physical Traits").strong());
                        ui.add_space(4.0);
                        ui.label(format!("Height: {} m", record.height_m()));
                        ui.label(format!("Weight: {} kg", record.weight_kg()));
                    });

                egui::Frame::none()
                    .fill(ThemeColors::BG_LIGHT)
                    .rounding(Rounding::same(8.0))
                    .inner_margin(12.0)
                    .show(&mut columns[1], |ui| {
                        ui.label(RichText::new("Abilities").strong());
                        ui.add_space(4.0);
                        for ability in &record.abilities {
                            let name = capitalize(&ability.name.replace('-', " "));
                            if ability.is_hidden {
                                ui.colored_label(
                                    ThemeColors::ACCENT_WARNING,
                                    format!("{} (Hidden)", name),
                                );
                            } else {
                                ui.label(name);
                            }
                        }
                    });
            });
        });

    action
}

/// One labeled stat row with a proportional bar (0..=255)
fn stat_bar(ui: &mut egui::Ui, name: &str, value: u32, accent: Color32) {
    ui.horizontal(|ui| {
        ui.add_sized(
            Vec2::new(130.0, 16.0),
            egui::Label::new(
                RichText::new(capitalize(&name.replace('-', " ")))
                    .size(13.0)
                    .color(ThemeColors::TEXT_SECONDARY),
            ),
        );
        ui.add_sized(
            Vec2::new(34.0, 16.0),
            egui::Label::new(RichText::new(value.to_string()).size(13.0).strong()),
        );

        let (rect, _) = ui.allocate_exact_size(
            Vec2::new(ui.available_width(), 8.0),
            egui::Sense::hover(),
        );
        ui.painter()
            .rect_filled(rect, Rounding::same(4.0), ThemeColors::BG_MEDIUM);
        let fraction = (value.min(255) as f32 / 255.0).clamp(0.0, 1.0);
        let fill = egui::Rect::from_min_size(
            rect.min,
            Vec2::new(rect.width() * fraction, rect.height()),
        );
        ui.painter().rect_filled(fill, Rounding::same(4.0), accent);
    });
}
