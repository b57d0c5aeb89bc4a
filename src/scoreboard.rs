//! End-of-match scoreboard
//!
//! Handed to the persistence service when a match ends, as JSON.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, Result};
use crate::sim::actor::PlayerId;

/// Totals for one player over a match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerTotals {
    pub player: PlayerId,
    pub bots_spawned: u32,
    /// Bots still alive when the match ended
    pub survivors: u32,
    pub kills: u32,
    pub deaths: u32,
    pub damage_dealt: f32,
    pub damage_taken: f32,
}

impl PlayerTotals {
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            ..Default::default()
        }
    }
}

/// Final results of one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    /// RNG seed, enough to replay the match with the same intents
    pub seed: u64,
    pub duration_ms: f64,
    pub winner: Option<PlayerId>,
    /// Ranked: most kills first, then most damage dealt
    pub players: Vec<PlayerTotals>,
}

impl MatchReport {
    pub fn new(
        seed: u64,
        duration_ms: f64,
        winner: Option<PlayerId>,
        players: impl IntoIterator<Item = PlayerTotals>,
    ) -> Self {
        let mut players: Vec<PlayerTotals> = players.into_iter().collect();
        players.sort_by(|a, b| {
            b.kills
                .cmp(&a.kills)
                .then(b.damage_dealt.total_cmp(&a.damage_dealt))
                .then(a.player.cmp(&b.player))
        });
        Self {
            seed,
            duration_ms,
            winner,
            players,
        }
    }

    /// 1-indexed rank of a player, None if they did not take part
    pub fn rank_of(&self, player: PlayerId) -> Option<usize> {
        self.players
            .iter()
            .position(|p| p.player == player)
            .map(|i| i + 1)
    }

    pub fn totals(&self, player: PlayerId) -> Option<&PlayerTotals> {
        self.players.iter().find(|p| p.player == player)
    }

    /// Best-ranked player (if any)
    pub fn top_player(&self) -> Option<PlayerId> {
        self.players.first().map(|p| p.player)
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|source| ConfigurationError::Serialize {
            what: "match report",
            source,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| ConfigurationError::Parse {
            what: "match report",
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(player: u32, kills: u32, damage: f32) -> PlayerTotals {
        PlayerTotals {
            kills,
            damage_dealt: damage,
            ..PlayerTotals::new(PlayerId(player))
        }
    }

    #[test]
    fn test_ranking() {
        let report = MatchReport::new(
            1,
            5000.0,
            Some(PlayerId(2)),
            vec![totals(1, 1, 300.0), totals(2, 3, 100.0), totals(3, 1, 450.0)],
        );
        assert_eq!(report.top_player(), Some(PlayerId(2)));
        assert_eq!(report.rank_of(PlayerId(3)), Some(2));
        assert_eq!(report.rank_of(PlayerId(1)), Some(3));
        assert_eq!(report.rank_of(PlayerId(9)), None);
    }

    #[test]
    fn test_ties_break_on_player_id() {
        let report = MatchReport::new(1, 0.0, None, vec![totals(5, 0, 0.0), totals(4, 0, 0.0)]);
        assert_eq!(report.top_player(), Some(PlayerId(4)));
    }

    #[test]
    fn test_empty_report() {
        let report = MatchReport::new(1, 0.0, None, Vec::new());
        assert!(report.is_empty());
        assert_eq!(report.top_player(), None);
    }

    #[test]
    fn test_json_roundtrip() {
        let report = MatchReport::new(42, 1234.5, Some(PlayerId(1)), vec![totals(1, 2, 80.0)]);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"winner\":1"));
        assert_eq!(MatchReport::from_json(&json).unwrap(), report);
    }
}
