pub mod date_key;
pub mod full_charge;
pub mod journal_entry;
pub mod log_item;
pub mod record;

pub use date_key::DateKey;
pub use full_charge::FullChargeEntry;
pub use journal_entry::{ActionType, EmotionTag, EntryDraft, JournalEntry, SleepReport};
pub use log_item::{timeline, LogItem, SortOrder};
pub use record::JournalRecord;
