// handlers/mod.rs - three-tier handler layout
//
// Public (no gate) → Protected (authentication, optionally ownership)
// → Elevated (authentication + admin role). The tiers are enforced by the
// gate chains attached in `app::router`; handlers in protected/ and
// elevated/ read the resulting `AuthorizationContext`.

pub mod elevated;
pub mod multipart;
pub mod pagination;
pub mod protected;
pub mod public;
