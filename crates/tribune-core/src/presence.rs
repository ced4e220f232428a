//! Ephemeral typing indicators, kept in memory only.
//!
//! Each (conversation, user) signal carries a deadline; signals past their
//! TTL are invisible to readers and reaped by the periodic purge.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use tribune_shared::{ConversationId, UserId};

pub struct PresenceTracker {
    ttl: Duration,
    typing: Mutex<HashMap<ConversationId, HashMap<UserId, Instant>>>,
}

impl PresenceTracker {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            typing: Mutex::new(HashMap::new()),
        }
    }

    /// Record that `user` started (`true`) or stopped (`false`) typing.
    /// Starting again refreshes the TTL.
    pub async fn set_typing(&self, conversation: &ConversationId, user: &UserId, typing: bool) {
        let mut map = self.typing.lock().await;
        if typing {
            map.entry(conversation.clone())
                .or_default()
                .insert(user.clone(), Instant::now());
        } else if let Some(users) = map.get_mut(conversation) {
            users.remove(user);
            if users.is_empty() {
                map.remove(conversation);
            }
        }
    }

    /// Users currently typing in `conversation`, sorted by id.  Expired
    /// signals are excluded but not removed; the purge handles removal.
    pub async fn typing_users(&self, conversation: &ConversationId) -> Vec<UserId> {
        let map = self.typing.lock().await;
        let mut users: Vec<UserId> = match map.get(conversation) {
            Some(users) => users
                .iter()
                .filter(|(_, seen)| seen.elapsed() < self.ttl)
                .map(|(user, _)| user.clone())
                .collect(),
            None => Vec::new(),
        };
        users.sort();
        users
    }

    /// Drop expired signals.  Returns how many were removed.
    pub async fn purge_stale(&self) -> usize {
        let mut map = self.typing.lock().await;
        let before: usize = map.values().map(|users| users.len()).sum();
        for users in map.values_mut() {
            users.retain(|_, seen| seen.elapsed() < self.ttl);
        }
        map.retain(|_, users| !users.is_empty());
        let after: usize = map.values().map(|users| users.len()).sum();
        let removed = before - after;
        if removed > 0 {
            debug!(removed, "purged stale typing signals");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(name: &str) -> ConversationId {
        ConversationId::new(name)
    }

    #[tokio::test]
    async fn test_typing_signal_round_trip() {
        let tracker = PresenceTracker::new(Duration::from_secs(10));
        let conv = conversation("general");
        let user = UserId::new("typer-1");

        tracker.set_typing(&conv, &user, true).await;
        assert_eq!(tracker.typing_users(&conv).await, vec![user.clone()]);

        tracker.set_typing(&conv, &user, false).await;
        assert!(tracker.typing_users(&conv).await.is_empty());
    }

    #[tokio::test]
    async fn test_typing_again_refreshes_deadline() {
        let tracker = PresenceTracker::new(Duration::from_millis(800));
        let conv = conversation("general");
        let refreshed = UserId::new("typer-1");
        let lapsed = UserId::new("typer-2");

        tracker.set_typing(&conv, &refreshed, true).await;
        tracker.set_typing(&conv, &lapsed, true).await;

        tokio::time::sleep(Duration::from_millis(500)).await;
        tracker.set_typing(&conv, &refreshed, true).await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        // The second signal restamped the deadline; the untouched one lapsed.
        assert_eq!(tracker.typing_users(&conv).await, vec![refreshed]);
    }

    #[tokio::test]
    async fn test_typing_users_sorted_and_scoped() {
        let tracker = PresenceTracker::new(Duration::from_secs(10));
        let conv = conversation("general");

        tracker.set_typing(&conv, &UserId::new("zoe"), true).await;
        tracker.set_typing(&conv, &UserId::new("ada"), true).await;
        tracker
            .set_typing(&conversation("other"), &UserId::new("mila"), true)
            .await;

        let users = tracker.typing_users(&conv).await;
        assert_eq!(users, vec![UserId::new("ada"), UserId::new("zoe")]);
    }

    #[tokio::test]
    async fn test_expired_signals_are_invisible() {
        let tracker = PresenceTracker::new(Duration::ZERO);
        let conv = conversation("general");

        tracker.set_typing(&conv, &UserId::new("typer-1"), true).await;
        assert!(tracker.typing_users(&conv).await.is_empty());
    }

    #[tokio::test]
    async fn test_purge_drops_expired_only() {
        let tracker = PresenceTracker::new(Duration::ZERO);
        let conv = conversation("general");

        tracker.set_typing(&conv, &UserId::new("typer-1"), true).await;
        tracker.set_typing(&conv, &UserId::new("typer-2"), true).await;
        assert_eq!(tracker.purge_stale().await, 2);
        assert_eq!(tracker.purge_stale().await, 0);
    }

    #[tokio::test]
    async fn test_stop_typing_unknown_is_noop() {
        let tracker = PresenceTracker::new(Duration::from_secs(10));
        let conv = conversation("general");
        tracker
            .set_typing(&conv, &UserId::new("stranger"), false)
            .await;
        assert!(tracker.typing_users(&conv).await.is_empty());
    }
}
