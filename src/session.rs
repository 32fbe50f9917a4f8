use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::evaluator::{key_states, Evaluation, KeyStates};
use crate::profile::UserId;
use crate::storage::{encode_record, load_record, KvStore, RecordKind, StorageKey};
use crate::{MAX_GUESSES, WORD_LENGTH};

/// Where a session stands. `Won` and `Lost` are terminal for the day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoSession,
    InProgress,
    Won,
    Lost,
}

impl Phase {
    pub fn is_over(self) -> bool {
        matches!(self, Phase::Won | Phase::Lost)
    }
}

/// One player's attempt at one solution, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub guesses: Vec<String>,
    pub current_guess: String,
    pub game_won: bool,
    pub game_over: bool,
    pub solution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_played: Option<DateTime<Local>>,
    /// Set once the finished game has been counted in the statistics.
    #[serde(default)]
    pub stats_recorded: bool,
}

impl SessionState {
    pub fn new(solution: &str, user_id: Option<UserId>) -> Self {
        Self {
            guesses: Vec::new(),
            current_guess: String::new(),
            game_won: false,
            game_over: false,
            solution: solution.to_string(),
            user_id,
            last_played: None,
            stats_recorded: false,
        }
    }

    pub fn phase(&self) -> Phase {
        match (self.guesses.is_empty(), self.game_over, self.game_won) {
            (true, false, _) => Phase::NoSession,
            (_, true, true) => Phase::Won,
            (_, true, false) => Phase::Lost,
            (false, false, _) => Phase::InProgress,
        }
    }

    /// Append an accepted guess and settle the win/loss flags.
    ///
    /// Ignored once the session is over.
    pub fn record_guess(&mut self, guess: &str) -> Phase {
        if self.game_over {
            return self.phase();
        }
        self.guesses.push(guess.to_string());
        self.current_guess.clear();
        self.game_won = guess == self.solution;
        self.game_over = self.game_won || self.guesses.len() >= MAX_GUESSES;
        self.phase()
    }
}

/// A session restored from storage together with its derived keyboard state.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedSession {
    pub state: SessionState,
    pub evaluations: Vec<Evaluation>,
    pub key_states: KeyStates,
}

/// The records that persist `state`: the unscoped legacy slot, plus the
/// user's own slot when the session belongs to a user.
pub fn session_entries(
    state: &SessionState,
    evaluations: &[Evaluation],
    now: DateTime<Local>,
) -> Result<Vec<(StorageKey, String)>> {
    let mut stamped = state.clone();
    stamped.last_played = Some(now);
    let state_json = encode_record(&stamped)?;
    let evaluations_json = encode_record(&evaluations)?;

    let mut entries = vec![
        (StorageKey::global(RecordKind::GameState), state_json.clone()),
        (StorageKey::global(RecordKind::Evaluations), evaluations_json.clone()),
    ];
    if let Some(user) = &state.user_id {
        entries.push((StorageKey::for_user(RecordKind::GameState, user), state_json));
        entries.push((StorageKey::for_user(RecordKind::Evaluations, user), evaluations_json));
    }
    Ok(entries)
}

/// Persist `state` if it belongs to today's puzzle. Returns whether anything was written.
pub fn save_session(
    store: &mut dyn KvStore,
    state: &SessionState,
    evaluations: &[Evaluation],
    today_solution: &str,
    now: DateTime<Local>,
) -> Result<bool> {
    if state.solution != today_solution {
        debug!("not saving session for a solution other than today's");
        return Ok(false);
    }
    store.set_many(&session_entries(state, evaluations, now)?)?;
    Ok(true)
}

fn load_slot(store: &dyn KvStore, user: Option<&UserId>, today_solution: &str) -> Option<SavedSession> {
    let state: SessionState = load_record(store, &StorageKey::scoped(RecordKind::GameState, user))?;
    let evaluations: Vec<Evaluation> =
        load_record(store, &StorageKey::scoped(RecordKind::Evaluations, user))?;

    if state.solution != today_solution {
        debug!(user = ?user.map(UserId::as_str), "discarding stale session");
        return None;
    }

    let word_length = state.solution.chars().count();
    let aligned = word_length == WORD_LENGTH
        && state.guesses.len() <= MAX_GUESSES
        && evaluations.len() == state.guesses.len()
        && state
            .guesses
            .iter()
            .zip(&evaluations)
            .all(|(guess, evaluation)| {
                guess.chars().count() == word_length && evaluation.len() == word_length
            });
    if !aligned {
        warn!(user = ?user.map(UserId::as_str), "discarding session with mismatched evaluations");
        return None;
    }

    let key_states = key_states(
        state
            .guesses
            .iter()
            .map(String::as_str)
            .zip(evaluations.iter().map(Vec::as_slice)),
    );
    Some(SavedSession {
        state,
        evaluations,
        key_states,
    })
}

/// Restore today's session: the user's own slot first, then the legacy slot.
///
/// Stale or malformed records read as no session.
pub fn load_session(store: &dyn KvStore, user: Option<&UserId>, today_solution: &str) -> Option<SavedSession> {
    if let Some(user) = user {
        if let Some(saved) = load_slot(store, Some(user), today_solution) {
            return Some(saved);
        }
    }
    load_slot(store, None, today_solution)
}
