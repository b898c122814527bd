// handlers/protected/mod.rs - Protected handlers
//
// Security Level: authentication required; listing writes additionally
// require ownership of the `:asset_id` in the path.
// Middleware: `authorize` with an authenticated or owner gate chain

pub mod assets;
pub mod contacts;
pub mod images;
pub mod me;

pub use assets::{create_asset, delete_asset, update_asset};
pub use contacts::{add_contact, delete_contact, update_contact};
pub use images::{add_images, delete_image};
pub use me::{change_password, clear_profile_image, me, my_assets, set_profile_image};
