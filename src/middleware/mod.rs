pub mod auth;
pub mod gates;
pub mod response;

pub use auth::{authorize, extract_token, OwnedAsset};
pub use gates::{AdminGate, AuthenticationGate, AuthorizationContext, GateChain, GateError, OwnershipGate};
pub use response::{ApiResponse, ApiResult};
