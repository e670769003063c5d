pub mod chat;
pub mod email_domain;
pub mod generation;
pub mod mailer;
pub mod payments;
pub mod rate_limiter;
pub mod redis;

pub use chat::*;
pub use email_domain::*;
pub use generation::*;
pub use mailer::*;
pub use payments::*;
pub use rate_limiter::*;
pub use self::redis::*;
