pub mod config;
pub mod detector;
pub mod error;
pub mod record;
pub mod state;

pub use config::Config;
pub use error::RelayError;
pub use record::{parse_timestamp, ChangeKind, Record, UNTITLED};
pub use state::SyncState;
