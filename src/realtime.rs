/// Live change notifications for one owner's bookmarks
use serde::{Deserialize, Serialize};

use crate::queries::{BOOKMARKS_TABLE, OWNER_COLUMN};
use crate::subscription::SubscriptionGuard;

/// What to listen to: one table, filtered server-side to one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelTopic {
    pub name: String,
    pub schema: String,
    pub table: String,
    pub filter: String,
    /// "*" = insert, update and delete
    pub event: String,
}

impl ChannelTopic {
    pub fn for_owner(owner_id: &str) -> ChannelTopic {
        ChannelTopic {
            name: format!("{}-{}", BOOKMARKS_TABLE, owner_id),
            schema: "public".to_string(),
            table: BOOKMARKS_TABLE.to_string(),
            filter: format!("{}=eq.{}", OWNER_COLUMN, owner_id),
            event: "*".to_string(),
        }
    }
}

/// Row-level change kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// The part of a change payload we read; the rows themselves are re-fetched
#[derive(Debug, Clone, Deserialize)]
pub struct ChangePayload {
    #[serde(rename = "eventType")]
    pub event_type: ChangeKind,
}

/// Channel lifecycle reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelStatus {
    Subscribed,
    ChannelError,
    TimedOut,
    Closed,
}

/// The change-notification transport
pub trait ChangeFeed {
    /// Open a channel for `topic`; it stays open until the guard is dropped
    fn subscribe(
        &self,
        topic: &ChannelTopic,
        on_change: Box<dyn Fn(ChangeKind)>,
        on_status: Box<dyn Fn(ChannelStatus)>,
    ) -> SubscriptionGuard;
}

/// Holds the single open channel, keyed by the owner it was opened for
#[derive(Debug, Default)]
pub struct ChannelSlot {
    active: Option<(String, SubscriptionGuard)>,
}

impl ChannelSlot {
    pub fn new() -> ChannelSlot {
        ChannelSlot::default()
    }

    pub fn owner(&self) -> Option<&str> {
        self.active.as_ref().map(|(owner, _)| owner.as_str())
    }

    /// Detach the current channel; the caller drops it to release it
    pub fn take(&mut self) -> Option<SubscriptionGuard> {
        self.active.take().map(|(_, guard)| guard)
    }

    /// Store a freshly opened channel, returning whatever was there before
    pub fn install(&mut self, owner_id: &str, guard: SubscriptionGuard) -> Option<SubscriptionGuard> {
        self.active
            .replace((owner_id.to_string(), guard))
            .map(|(_, previous)| previous)
    }
}
