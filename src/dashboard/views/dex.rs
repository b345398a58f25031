//! Dex view - searchable card grid of the loaded catalog

use egui::RichText;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::catalog::{PokemonSummary, TYPE_NAMES};
use crate::dashboard::artwork::{ArtworkCache, ArtworkState};
use crate::dashboard::components::{type_badge, type_badge::capitalize};
use crate::dashboard::state::DexViewState;
use crate::dashboard::theme::{color_with_alpha, type_color, ThemeColors};
use crate::shared::{DetailRequest, ScannerCommand, SharedAppState};

const CARD_WIDTH: f32 = 148.0;
const CARD_ART_SIZE: f32 = 110.0;

/// Render the dex view
pub fn render_dex_view(
    ui: &mut egui::Ui,
    state: &mut DexViewState,
    shared_state: &Arc<RwLock<SharedAppState>>,
    artwork: &mut ArtworkCache,
) {
    let (catalog, loading, catalog_error) = {
        let app_state = shared_state.read();
        (
            app_state.catalog.clone(),
            app_state.runtime.catalog_loading,
            app_state.runtime.catalog_error.clone(),
        )
    };

    ui.horizontal(|ui| {
        ui.heading(RichText::new("Pokedex").size(24.0).strong());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui
                .add(
                    egui::Button::new(RichText::new("Scan Pokemon").color(egui::Color32::WHITE))
                        .fill(ThemeColors::ACCENT_PRIMARY)
                        .min_size(egui::vec2(140.0, 32.0)),
                )
                .clicked()
            {
                shared_state.write().runtime.scanner_command = Some(ScannerCommand::Open);
            }
        });
    });
    ui.add_space(8.0);

    // Search field
    ui.horizontal(|ui| {
        ui.label(RichText::new("Search").color(ThemeColors::TEXT_SECONDARY));
        ui.add(
            egui::TextEdit::singleline(&mut state.search_query)
                .hint_text("name or number...")
                .desired_width(280.0),
        );
        if !state.search_query.is_empty() && ui.small_button("x").clicked() {
            state.search_query.clear();
        }
    });

    ui.add_space(8.0);

    // Type filter chips
    egui::ScrollArea::horizontal()
        .id_salt("type-chips")
        .show(ui, |ui| {
            ui.horizontal(|ui| {
                let all_selected = state.selected_type.is_none();
                if chip(ui, "All Types", all_selected, ThemeColors::ACCENT_SECONDARY) {
                    state.selected_type = None;
                }
                for type_name in TYPE_NAMES {
                    let selected = state.selected_type.as_deref() == Some(type_name);
                    if chip(ui, &capitalize(type_name), selected, type_color(type_name)) {
                        state.selected_type = if selected {
                            None
                        } else {
                            Some(type_name.to_string())
                        };
                    }
                }
            });
        });

    ui.add_space(12.0);
    ui.separator();
    ui.add_space(8.0);

    if let Some(error) = catalog_error {
        ui.colored_label(ThemeColors::ACCENT_ERROR, format!("Catalog failed to load: {}", error));
        return;
    }

    if loading {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label(RichText::new("Fetching catalog data...").color(ThemeColors::TEXT_SECONDARY));
        });
        return;
    }

    let filtered = filter_summaries(&catalog, &state.search_query, state.selected_type.as_deref());

    if filtered.is_empty() {
        ui.add_space(40.0);
        ui.vertical_centered(|ui| {
            ui.label(RichText::new("No Pokemon Found").size(20.0).strong());
            ui.label(
                RichText::new("Try adjusting your search or filters.")
                    .color(ThemeColors::TEXT_SECONDARY),
            );
        });
        return;
    }

    let mut clicked: Option<u32> = None;
    egui::ScrollArea::vertical()
        .id_salt("dex-grid")
        .show(ui, |ui| {
            ui.horizontal_wrapped(|ui| {
                for summary in &filtered {
                    if render_card(ui, summary, artwork) {
                        clicked = Some(summary.id);
                    }
                }
            });
        });

    if let Some(id) = clicked {
        let mut app_state = shared_state.write();
        app_state.runtime.detail_request = Some(DetailRequest {
            key: id.to_string(),
            // Manual clicks don't auto-play narration
            auto_narrate: false,
        });
    }
}

/// Filter catalog summaries by search text (name substring or exact id) and
/// by the selected type chip.
fn filter_summaries<'a>(
    catalog: &'a [PokemonSummary],
    query: &str,
    selected_type: Option<&str>,
) -> Vec<&'a PokemonSummary> {
    let query = query.trim().to_lowercase();
    catalog
        .iter()
        .filter(|p| {
            let matches_search =
                query.is_empty() || p.name.contains(&query) || p.id.to_string() == query;
            let matches_type =
                selected_type.map_or(true, |t| p.types.iter().any(|pt| pt == t));
            matches_search && matches_type
        })
        .collect()
}

/// One grid card; returns true when clicked
fn render_card(ui: &mut egui::Ui, summary: &PokemonSummary, artwork: &mut ArtworkCache) -> bool {
    let frame = egui::Frame::none()
        .fill(ThemeColors::BG_MEDIUM)
        .rounding(egui::Rounding::same(10.0))
        .inner_margin(10.0)
        .show(ui, |ui| {
            ui.set_width(CARD_WIDTH);
            ui.vertical_centered(|ui| {
                match artwork.request(summary.id, summary.artwork_url.as_deref()) {
                    ArtworkState::Ready(texture) => {
                        ui.add(
                            egui::Image::new(texture)
                                .fit_to_exact_size(egui::vec2(CARD_ART_SIZE, CARD_ART_SIZE)),
                        );
                    }
                    ArtworkState::Pending => {
                        let (rect, _) = ui.allocate_exact_size(
                            egui::vec2(CARD_ART_SIZE, CARD_ART_SIZE),
                            egui::Sense::hover(),
                        );
                        ui.painter().rect_filled(
                            rect,
                            egui::Rounding::same(8.0),
                            ThemeColors::BG_LIGHT,
                        );
                    }
                    ArtworkState::Failed => {
                        let (rect, _) = ui.allocate_exact_size(
                            egui::vec2(CARD_ART_SIZE, CARD_ART_SIZE),
                            egui::Sense::hover(),
                        );
                        ui.painter().text(
                            rect.center(),
                            egui::Align2::CENTER_CENTER,
                            "?",
                            egui::FontId::proportional(32.0),
                            ThemeColors::TEXT_MUTED,
                        );
                    }
                }

                ui.label(
                    RichText::new(format!("#{:03}", summary.id))
                        .size(11.0)
                        .color(ThemeColors::TEXT_MUTED),
                );
                ui.label(RichText::new(capitalize(&summary.name)).size(15.0).strong());

                ui.horizontal(|ui| {
                    for type_name in &summary.types {
                        type_badge(ui, type_name, false);
                    }
                });
            });
        });

    frame.response.interact(egui::Sense::click()).clicked()
}

/// One filter chip; returns true when clicked
fn chip(ui: &mut egui::Ui, label: &str, selected: bool, accent: egui::Color32) -> bool {
    let (fill, text_color) = if selected {
        (accent, egui::Color32::WHITE)
    } else {
        (ThemeColors::BG_LIGHT, ThemeColors::TEXT_SECONDARY)
    };

    ui.add(
        egui::Button::new(RichText::new(label).size(13.0).color(text_color))
            .fill(fill)
            .stroke(egui::Stroke::new(1.0, color_with_alpha(accent, 120)))
            .rounding(egui::Rounding::same(14.0)),
    )
    .clicked()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<PokemonSummary> {
        vec![
            PokemonSummary {
                id: 1,
                name: "bulbasaur".to_string(),
                types: vec!["grass".to_string(), "poison".to_string()],
                artwork_url: None,
            },
            PokemonSummary {
                id: 25,
                name: "pikachu".to_string(),
                types: vec!["electric".to_string()],
                artwork_url: None,
            },
        ]
    }

    #[test]
    fn test_filter_by_name_substring() {
        let list = catalog();
        let hits = filter_summaries(&list, "pika", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "pikachu");
    }

    #[test]
    fn test_filter_by_exact_id() {
        let list = catalog();
        let hits = filter_summaries(&list, "25", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 25);
        // Partial id strings are not id matches
        assert!(filter_summaries(&list, "2", None).is_empty());
    }

    #[test]
    fn test_filter_by_type() {
        let list = catalog();
        let hits = filter_summaries(&list, "", Some("poison"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "bulbasaur");
    }

    #[test]
    fn test_filter_combines_search_and_type() {
        let list = catalog();
        assert!(filter_summaries(&list, "pika", Some("grass")).is_empty());
        assert_eq!(filter_summaries(&list, "", None).len(), 2);
    }
}
