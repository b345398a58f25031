//! Dashboard views

pub mod detail;
pub mod dex;
pub mod scanner;
pub mod settings;

pub use detail::{render_detail_modal, DetailAction};
pub use dex::render_dex_view;
pub use scanner::render_scanner_view;
pub use settings::render_settings_view;
