pub mod asset;
pub mod contact;
pub mod image;
pub mod user;

pub use asset::{Asset, NewAsset};
pub use contact::{Contact, NewContact};
pub use image::Image;
pub use user::{NewPrincipal, Principal, Role};
