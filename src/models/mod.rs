pub mod conversation;
pub mod message;
pub mod presence;

pub use conversation::*;
pub use message::*;
pub use presence::*;
