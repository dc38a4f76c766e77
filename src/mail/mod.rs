pub mod inbox;
pub mod types;

pub use inbox::{InboxError, load_inbox};
pub use types::{ActionItem, Category, DraftReply, Email, EmailId, Summary};
