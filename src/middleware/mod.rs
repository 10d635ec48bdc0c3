pub mod auth;
pub mod bearer;
pub mod response;

pub use auth::{
    require_any_internal_role, require_navbar_role, require_user_admin_role, session_auth_middleware, AuthUser,
};
pub use bearer::navbar_token_middleware;
pub use response::{ApiResponse, ApiResult};
