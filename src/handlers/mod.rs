pub mod chat;
pub mod voice;

pub use chat::*;
pub use voice::*;
