// handlers/elevated/mod.rs - Elevated handlers
//
// Security Level: authentication + admin role
// Middleware: `authorize` with an admin gate chain

pub mod users;

pub use users::list_users;
