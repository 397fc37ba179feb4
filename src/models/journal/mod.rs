pub mod queries;
pub mod receipt;
pub mod types;

pub use receipt::Receipt;
pub use types::{Journal, JournalDetail, JournalEntry, JournalStatus};
