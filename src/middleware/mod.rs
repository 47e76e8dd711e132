pub mod auth;
pub mod body;
pub mod errors;
pub mod validate;

pub use auth::jwt_auth_middleware;
pub use body::ParsedBody;
pub use errors::format_errors;
pub use validate::{ParamRules, ParamSchema, Rule, Verified};
