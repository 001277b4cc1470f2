use super::{GuildId, PlayerId};
use serde::Serialize;
use std::cmp::Reverse;

/// Leaderboard entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub player: PlayerId,
    pub balance: i64,
    pub rank: u32,
}

/// Richest players of one guild, sorted by balance descending.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Leaderboard {
    pub guild: GuildId,
    pub limit: usize,
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new(guild: GuildId, limit: usize) -> Self {
        Self {
            guild,
            limit,
            entries: Vec::new(),
        }
    }

    pub fn from_balances(
        guild: GuildId,
        limit: usize,
        balances: impl IntoIterator<Item = (PlayerId, i64)>,
    ) -> Self {
        let mut leaderboard = Self::new(guild, limit);
        for (player, balance) in balances {
            leaderboard.update(player, balance);
        }
        leaderboard
    }

    pub fn update(&mut self, player: PlayerId, balance: i64) {
        // Find and remove existing entry for this player
        if let Some(idx) = self.entries.iter().position(|e| e.player == player) {
            self.entries.remove(idx);
        }

        // Full board and not better than the lowest: nothing to do
        if self.entries.len() >= self.limit {
            if let Some(last) = self.entries.last() {
                let entry = (balance, Reverse(player));
                if entry <= (last.balance, Reverse(last.player)) {
                    return;
                }
            }
            if self.limit == 0 {
                return;
            }
        }

        // Entries are sorted descending by balance; ties keep lower ids first
        let insert_pos = self
            .entries
            .binary_search_by(|e| balance.cmp(&e.balance).then(e.player.cmp(&player)))
            .unwrap_or_else(|pos| pos);

        self.entries.insert(
            insert_pos,
            LeaderboardEntry {
                player,
                balance,
                rank: 0,
            },
        );

        self.entries.truncate(self.limit);
        for (i, entry) in self.entries.iter_mut().enumerate() {
            entry.rank = (i + 1) as u32;
        }
    }
}
