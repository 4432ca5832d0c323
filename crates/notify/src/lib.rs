//! Message formatting and delivery for the relay.
//!
//! This crate provides:
//! - `Notifier` trait for the outbound messaging channel
//! - Telegram Bot API notifier
//! - `Formatter` that turns source records into message text

pub mod formatter;
pub mod telegram;
pub mod traits;

pub use formatter::{Formatter, Markup, StatusKind};
pub use telegram::{escape_html, escape_markdown_v2, TelegramNotifier};
pub use traits::{DispatchResult, Notification, Notifier, NotifyError};
