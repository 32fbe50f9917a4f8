use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::profile::UserId;
use crate::storage::{encode_record, load_record, KvStore, RecordKind, StorageKey};
use crate::MAX_GUESSES;

/// Win/loss counters for one player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRecord {
    pub total_played: u32,
    pub wins: u32,
    pub current_streak: u32,
    pub max_streak: u32,
    /// `distribution[k]` counts wins in exactly `k + 1` guesses.
    pub distribution: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Local>>,
}

impl StatsRecord {
    pub fn zeroed(user_id: Option<UserId>) -> Self {
        Self {
            total_played: 0,
            wins: 0,
            current_streak: 0,
            max_streak: 0,
            distribution: vec![0; MAX_GUESSES],
            user_id,
            last_updated: None,
        }
    }

    /// Count one finished game. Unconditional: callers make sure each game
    /// is counted once.
    pub fn record(&mut self, won: bool, guess_count: usize, now: DateTime<Local>) {
        self.total_played += 1;
        self.last_updated = Some(now);

        if won {
            self.wins += 1;
            self.current_streak += 1;
            self.max_streak = self.max_streak.max(self.current_streak);
            match self.distribution.get_mut(guess_count.wrapping_sub(1)) {
                Some(slot) => *slot += 1,
                None => warn!(guess_count, "win outside the guess distribution"),
            }
        } else {
            self.current_streak = 0;
        }
    }

    /// Rounded share of games won, 0 when nothing has been played.
    pub fn win_percentage(&self) -> u32 {
        if self.total_played == 0 {
            0
        } else {
            (f64::from(self.wins) / f64::from(self.total_played) * 100.0).round() as u32
        }
    }

    /// Largest bucket, at least 1, for scaling bar charts.
    pub fn max_distribution(&self) -> u32 {
        self.distribution.iter().copied().max().unwrap_or(0).max(1)
    }

    fn normalized(mut self) -> Self {
        self.distribution.resize(MAX_GUESSES, 0);
        self
    }
}

fn stats_key(user: Option<&UserId>) -> StorageKey {
    StorageKey::scoped(RecordKind::Statistics, user)
}

/// Statistics for `user`, zeroed when none are stored or the record is unreadable.
pub fn load_stats(store: &dyn KvStore, user: Option<&UserId>) -> StatsRecord {
    match load_record::<StatsRecord>(store, &stats_key(user)) {
        Some(mut stats) => {
            if let Some(user) = user {
                stats.user_id = Some(user.clone());
            }
            stats.normalized()
        }
        None => StatsRecord::zeroed(user.cloned()),
    }
}

/// Load, count one game, and return the updated record with its storage entry
/// so it can be written together with the session.
pub fn stats_entry_after(
    store: &dyn KvStore,
    won: bool,
    guess_count: usize,
    user: Option<&UserId>,
    now: DateTime<Local>,
) -> Result<(StatsRecord, (StorageKey, String))> {
    let mut stats = load_stats(store, user);
    stats.record(won, guess_count, now);
    let entry = (stats_key(user), encode_record(&stats)?);
    Ok((stats, entry))
}

/// Count one finished game and persist it.
pub fn record_result(
    store: &mut dyn KvStore,
    won: bool,
    guess_count: usize,
    user: Option<&UserId>,
    now: DateTime<Local>,
) -> Result<StatsRecord> {
    let (stats, (key, value)) = stats_entry_after(store, won, guess_count, user, now)?;
    store.set(&key, &value)?;
    info!(won, guess_count, played = stats.total_played, "recorded result");
    Ok(stats)
}
