pub mod conversation;
pub mod journal;
pub mod payment;
pub mod user;

pub use conversation::*;
pub use journal::*;
pub use payment::*;
pub use user::*;
