pub mod chat;
pub mod exercise;
pub mod media;

pub use chat::{ChatMessage, ChatRole, InlineData, Part};
pub use exercise::{parse_batch, Exercise, DEFAULT_PREFIX, DEFAULT_STATEMENT};
pub use media::{mime_from_path, MediaKind, UploadedFile};
