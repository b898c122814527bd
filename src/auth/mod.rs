pub mod cookie;
pub mod identity;
pub mod password;
pub mod token;

pub use identity::{IdentityError, IdentityResolver};
pub use password::{hash_password, verify_missing_principal, verify_password, PasswordError, MIN_PASSWORD_LENGTH};
pub use token::{JwtMaker, TokenError, TokenMaker, TokenPayload};
