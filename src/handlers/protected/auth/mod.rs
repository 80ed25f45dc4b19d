// handlers/protected/auth/mod.rs - Session introspection and revocation

pub mod session;

pub use session::{logout, validate, whoami};
