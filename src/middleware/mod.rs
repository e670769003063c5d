pub mod auth;
pub mod https;
pub mod rate_limit;

pub use auth::*;
pub use https::*;
pub use rate_limit::*;
