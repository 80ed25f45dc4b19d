pub mod auth;
pub mod response;

pub use auth::{session_auth_middleware, AuthUser, INTERNAL_REQUEST_HEADER};
pub use response::{ApiResponse, ApiResult};
