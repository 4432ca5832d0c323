//! Inbound webhook payloads and their classification.

use relay_core::ChangeKind;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventEntity {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub updated_properties: Vec<String>,
}

/// A webhook notification body. Every field is optional so that handshake
/// bodies and unknown event shapes still parse.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub timestamp: Option<String>,
    pub entity: Option<EventEntity>,
    pub data: Option<EventData>,
    pub verification_token: Option<String>,
}

/// What the receiver should do with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventAction {
    /// Subscription handshake carrying the token to configure as secret.
    Verification { token: String },
    /// A page change to fetch and relay.
    Page {
        page_id: String,
        kind: ChangeKind,
        updated_properties: Vec<String>,
    },
    Ignored { reason: String },
}

impl WebhookEvent {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn classify(&self) -> EventAction {
        if let Some(token) = self.verification_token.as_deref().filter(|t| !t.is_empty()) {
            return EventAction::Verification {
                token: token.to_string(),
            };
        }

        let Some(event_type) = self.event_type.as_deref() else {
            return EventAction::Ignored {
                reason: "missing event type".to_string(),
            };
        };

        let Some(kind) = ChangeKind::from_event_type(event_type) else {
            return EventAction::Ignored {
                reason: format!("event type {event_type} is not relayed"),
            };
        };

        let entity = self.entity.clone().unwrap_or_default();
        match (entity.kind.as_deref(), entity.id) {
            (Some("page"), Some(page_id)) if !page_id.is_empty() => EventAction::Page {
                page_id,
                kind,
                updated_properties: self
                    .data
                    .as_ref()
                    .map(|d| d.updated_properties.clone())
                    .unwrap_or_default(),
            },
            (kind, id) => EventAction::Ignored {
                reason: format!(
                    "unexpected entity (type={}, id={})",
                    kind.unwrap_or("none"),
                    id.as_deref().unwrap_or("none")
                ),
            },
        }
    }
}
