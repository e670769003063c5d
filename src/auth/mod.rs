pub mod jwt;
pub mod password;
pub mod verification;

pub use jwt::*;
pub use password::*;
pub use verification::*;
