use chrono::{DateTime, Local};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

use crate::error::Result;
use crate::storage::{load_record, save_record, KvStore, RecordKind, StorageKey};

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_LEN: usize = 26;

/// Opaque per-device player identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// A fresh `user_<base36>` identifier.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        UserId(format!("user_{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    pub created_at: DateTime<Local>,
    pub last_played: DateTime<Local>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl UserProfile {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            user_id: UserId::generate(),
            created_at: now,
            last_played: now,
            nickname: None,
        }
    }
}

fn profile_key() -> StorageKey {
    StorageKey::global(RecordKind::UserProfile)
}

/// Load the device's profile, refreshing `last_played`, or create one.
///
/// The identifier is only regenerated when no profile is stored or the stored
/// one is unreadable. When the store itself fails, a throwaway profile is
/// returned and nothing is written, so the stored identity survives.
/// Write failures are logged; the returned profile is usable either way.
pub fn get_or_create_profile(store: &mut dyn KvStore, now: DateTime<Local>) -> UserProfile {
    let key = profile_key();
    let stored = match store.get(&key) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(error = %err, "failed to read user profile; using a temporary one");
            return UserProfile::new(now);
        }
    };

    let profile = match stored.map(|raw| serde_json::from_str::<UserProfile>(&raw)) {
        Some(Ok(mut profile)) => {
            profile.last_played = now;
            profile
        }
        Some(Err(err)) => {
            warn!(error = %err, "replacing malformed user profile");
            UserProfile::new(now)
        }
        None => {
            let profile = UserProfile::new(now);
            info!(user = %profile.user_id, "created user profile");
            profile
        }
    };

    if let Err(err) = save_record(store, &key, &profile) {
        warn!(error = %err, "failed to save user profile");
    }
    profile
}

pub fn set_nickname(store: &mut dyn KvStore, profile: &mut UserProfile, nickname: Option<String>) -> Result<()> {
    profile.nickname = nickname;
    save_record(store, &profile_key(), profile)
}

/// True until the player has dismissed the introduction once.
pub fn needs_intro(store: &dyn KvStore) -> bool {
    load_record::<bool>(store, &StorageKey::global(RecordKind::HasPlayedBefore)) != Some(true)
}

pub fn mark_intro_seen(store: &mut dyn KvStore) -> Result<()> {
    save_record(store, &StorageKey::global(RecordKind::HasPlayedBefore), &true)
}

/// Forget one user's saved game and statistics.
pub fn clear_user_data(store: &mut dyn KvStore, user: &UserId) -> Result<()> {
    for kind in [RecordKind::GameState, RecordKind::Evaluations, RecordKind::Statistics] {
        store.remove(&StorageKey::for_user(kind, user))?;
    }
    info!(user = %user, "cleared user data");
    Ok(())
}
