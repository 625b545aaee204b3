//! Per-mailbox message index.
//!
//! Every mirrored mailbox has a `cached-messages.json` file: a JSON array
//! of [`CacheData`] in the order messages were fetched. Display code reads
//! snapshots of it; the sync engine and mutations rewrite it atomically.

mod index;
mod model;
mod skipped;
mod validity;

pub use index::CacheIndex;
pub use model::{Address, CacheData, Envelope};
pub use skipped::{read_skipped_uids, write_skipped_uids};
pub use validity::{read_uid_validity, write_uid_validity};
