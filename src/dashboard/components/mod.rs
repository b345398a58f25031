//! Reusable dashboard components

pub mod sidebar;
pub mod status_card;
pub mod type_badge;

pub use sidebar::render_sidebar;
pub use status_card::{CardStatus, StatusCard};
pub use type_badge::type_badge;
