//! Active-session registry.
//!
//! A player holds at most one game at a time, whatever the game. Claiming a
//! slot is a single check-and-insert under the registry lock.

use crate::casino::blackjack::Table;
use coinbot_types::{
    api::MessageHandle,
    casino::{Account, ChannelId, PlayerId},
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::{sync::Mutex as AsyncMutex, time::Instant};
use tracing::debug;

/// An open blackjack hand awaiting player actions.
#[derive(Debug)]
pub struct BlackjackSession {
    pub account: Account,
    pub channel: ChannelId,
    pub handle: Option<MessageHandle>,
    pub table: Table,
    pub touched: Instant,
    /// Set once settled; late actions on a stale reference are rejected.
    pub closed: bool,
}

pub type SharedSession = Arc<AsyncMutex<BlackjackSession>>;

enum Entry {
    /// A slot round or auto-play batch, owned by a [SessionGuard].
    Round,
    Blackjack(SharedSession),
}

#[derive(Default)]
pub struct Registry {
    entries: Mutex<HashMap<PlayerId, Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<PlayerId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `player`, or `None` if they already have a game.
    pub fn try_claim(&self, player: PlayerId) -> Option<SessionGuard<'_>> {
        let mut entries = self.entries();
        if entries.contains_key(&player) {
            return None;
        }
        entries.insert(player, Entry::Round);
        debug!(%player, "session claimed");
        Some(SessionGuard {
            registry: self,
            player,
            armed: true,
        })
    }

    pub fn is_active(&self, player: PlayerId) -> bool {
        self.entries().contains_key(&player)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn blackjack(&self, player: PlayerId) -> Option<SharedSession> {
        match self.entries().get(&player) {
            Some(Entry::Blackjack(session)) => Some(session.clone()),
            _ => None,
        }
    }

    pub fn blackjack_sessions(&self) -> Vec<(PlayerId, SharedSession)> {
        self.entries()
            .iter()
            .filter_map(|(player, entry)| match entry {
                Entry::Blackjack(session) => Some((*player, session.clone())),
                Entry::Round => None,
            })
            .collect()
    }

    /// Remove `player`'s blackjack entry if it is still `session`.
    pub fn release_blackjack(&self, player: PlayerId, session: &SharedSession) -> bool {
        let mut entries = self.entries();
        let current = matches!(
            entries.get(&player),
            Some(Entry::Blackjack(existing)) if Arc::ptr_eq(existing, session)
        );
        if current {
            entries.remove(&player);
            debug!(%player, "blackjack session released");
        }
        current
    }
}

/// Holds a claimed registry slot; releases it on drop.
pub struct SessionGuard<'a> {
    registry: &'a Registry,
    player: PlayerId,
    armed: bool,
}

impl SessionGuard<'_> {
    pub fn player(&self) -> PlayerId {
        self.player
    }

    /// Keep the slot past this guard as an open blackjack hand.
    pub fn into_blackjack(mut self, session: BlackjackSession) -> SharedSession {
        let shared = Arc::new(AsyncMutex::new(session));
        self.registry
            .entries()
            .insert(self.player, Entry::Blackjack(shared.clone()));
        self.armed = false;
        shared
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.registry.entries().remove(&self.player);
            debug!(player = %self.player, "session released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::casino::GameRng;
    use coinbot_types::casino::{GuildId, NATURAL_RETURN};

    fn session(player: PlayerId) -> BlackjackSession {
        let mut rng = GameRng::new(1);
        BlackjackSession {
            account: Account::new(GuildId(1), player),
            channel: ChannelId(1),
            handle: None,
            table: Table::new(10, NATURAL_RETURN, &mut rng).unwrap(),
            touched: Instant::now(),
            closed: false,
        }
    }

    #[test]
    fn test_claim_is_exclusive() {
        let registry = Registry::new();
        let guard = registry.try_claim(PlayerId(1)).unwrap();
        assert!(registry.try_claim(PlayerId(1)).is_none());
        assert!(registry.try_claim(PlayerId(2)).is_some());
        assert_eq!(guard.player(), PlayerId(1));
        drop(guard);
        assert!(!registry.is_active(PlayerId(1)));
        assert!(registry.try_claim(PlayerId(1)).is_some());
    }

    #[tokio::test]
    async fn test_blackjack_outlives_guard() {
        let registry = Registry::new();
        let guard = registry.try_claim(PlayerId(1)).unwrap();
        let shared = guard.into_blackjack(session(PlayerId(1)));
        assert!(registry.is_active(PlayerId(1)));
        assert!(registry.try_claim(PlayerId(1)).is_none());
        assert_eq!(registry.blackjack_sessions().len(), 1);

        let other = Arc::new(AsyncMutex::new(session(PlayerId(1))));
        assert!(!registry.release_blackjack(PlayerId(1), &other));
        assert!(registry.release_blackjack(PlayerId(1), &shared));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_round_is_not_blackjack() {
        let registry = Registry::new();
        let _guard = registry.try_claim(PlayerId(1)).unwrap();
        assert!(registry.blackjack(PlayerId(1)).is_none());
        assert!(registry.blackjack_sessions().is_empty());
    }
}
