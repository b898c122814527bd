pub mod asset_service;
pub mod media;

pub use asset_service::{AssetCreator, AssetFields, ContactFields, CreateError, CreationReport, ImageUpload, StepOutcome};
pub use media::{BlobStore, FsBlobStore, MediaError, MediaManager};
