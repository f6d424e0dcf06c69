pub mod cookies;
pub mod identity;
pub mod middleware;
pub mod passwords;
pub mod tokens;

pub use middleware::auth_middleware;
