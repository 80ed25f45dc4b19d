// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Service descriptor, health probe and session token acquisition.
//
// Security Level: None (completely public access)
// Route Prefix: No /api prefix (e.g., /, /health, /auth/*)

pub mod auth;
pub mod root;

pub use root::{health, root};
