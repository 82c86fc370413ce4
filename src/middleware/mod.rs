pub mod admin;
pub mod identity;
pub mod response;

pub use admin::require_admin_middleware;
pub use identity::identity_middleware;
pub use response::{ApiResponse, ApiResult};
