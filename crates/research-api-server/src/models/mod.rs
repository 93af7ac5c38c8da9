pub mod chat;
pub mod search;

pub use chat::{Message, MessageType, QueryRequest, Role, SessionId, StreamRecord, Turn};
pub use search::SearchResult;
