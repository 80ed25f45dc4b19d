// handlers/protected/mod.rs - Protected handlers (session token required)
//
// Every route here runs behind `session_auth_middleware`, which puts an
// `AuthUser` into request extensions. Internal requests carry a synthetic
// user with `internal = true`.
//
// Route Prefix: /api/*

pub mod approval;
pub mod auth;
pub mod chat;
pub mod companies;
pub mod documents;
pub mod forms;
pub mod responses;
pub mod workflows;
