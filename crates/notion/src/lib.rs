//! Notion side of the relay.
//!
//! - [`NotionClient`]: database queries and page retrieval behind the
//!   [`SourceClient`] trait
//! - webhook event parsing and HMAC signature checks
//! - webhook subscription management with a local cache

pub mod client;
pub mod error;
pub mod events;
pub mod page;
pub mod signature;
pub mod subscriptions;

pub use client::{query_body, NotionClient, QueryFilter, SourceClient};
pub use error::SourceError;
pub use events::{EventAction, WebhookEvent};
pub use page::Page;
pub use signature::SIGNATURE_HEADER;
pub use subscriptions::{
    generate_secret, DeleteOutcome, Subscription, SubscriptionApi, SubscriptionCache,
    SubscriptionError, SubscriptionManager, SubscriptionStatus,
};
