// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Session acquisition plus read-only listing views.
//
// Security Level: None
// Middleware: None

pub mod assets;
pub mod auth;
pub mod health;

pub use assets::{get_asset, list_assets, list_contacts, list_images, list_user_assets};
pub use auth::{login, logout, register};
pub use health::{health, root};
