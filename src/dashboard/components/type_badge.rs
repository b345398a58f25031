//! Type tag badge

use egui::{Color32, RichText, Rounding};

use crate::dashboard::theme::type_color;

/// Capitalize a type or ability tag for display
pub fn capitalize(tag: &str) -> String {
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Render one rounded type badge
pub fn type_badge(ui: &mut egui::Ui, type_name: &str, large: bool) {
    let (text_size, pad) = if large { (13.0, egui::vec2(10.0, 4.0)) } else { (11.0, egui::vec2(7.0, 2.0)) };

    egui::Frame::none()
        .fill(type_color(type_name))
        .rounding(Rounding::same(10.0))
        .inner_margin(egui::Margin::symmetric(pad.x, pad.y))
        .show(ui, |ui| {
            ui.label(
                RichText::new(capitalize(type_name))
                    .size(text_size)
                    .color(Color32::WHITE)
                    .strong(),
            );
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("grass"), "Grass");
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("x"), "X");
    }
}
