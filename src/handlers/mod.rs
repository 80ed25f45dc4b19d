// handlers/mod.rs - 2-Tier Handler Architecture
//
// Public (no auth) → Protected (session token or internal request marker)
//
// Handlers stay thin: extract, call one service, wrap the result.
pub mod public; // Tier 1: No authentication required (/, /health, /auth/*)
pub mod protected; // Tier 2: Session token required (/api/*)

pub mod download;
pub mod multipart;
