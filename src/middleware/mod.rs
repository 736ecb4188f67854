pub mod auth;
pub mod body;
pub mod response;

pub use auth::RequireAdmin;
pub use body::JsonBody;
pub use response::{ApiResponse, ApiResult};
