use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::keys::GUEST_SCORES_KEY;
use super::store::KeyValueStore;

/// A score recorded locally while playing as a guest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestScoreEntry {
    pub game_key: String,
    pub score: f64,
    /// Epoch milliseconds
    pub timestamp: i64,
}

/// The stored list exactly as persisted. Anything that is not a JSON list
/// reads as empty.
fn stored_list(store: &dyn KeyValueStore) -> Vec<Value> {
    let raw = match store.get_item(GUEST_SCORES_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            debug!(error = %e, "Guest scores unreadable");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Array(items)) => items,
        Ok(_) => {
            warn!("Stored guest scores are not a list");
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "Stored guest scores are malformed");
            Vec::new()
        }
    }
}

fn decode(item: &Value) -> Option<GuestScoreEntry> {
    GuestScoreEntry::deserialize(item).ok()
}

/// Reads every stored guest score; list elements that do not decode are skipped
pub fn guest_scores(store: &dyn KeyValueStore) -> Vec<GuestScoreEntry> {
    stored_list(store).iter().filter_map(decode).collect()
}

/// Appends a score unless the exact (game, score) pair is already stored.
/// Returns whether a new entry was appended; a failed write is not reported.
///
/// Stored elements are written back untouched, including ones this version
/// cannot decode. Non-finite scores are rejected.
pub fn add_guest_score(store: &dyn KeyValueStore, game_key: &str, score: f64) -> bool {
    if !score.is_finite() {
        debug!(game_key = %game_key, "Ignoring non-finite guest score");
        return false;
    }

    let mut items = stored_list(store);
    if items
        .iter()
        .filter_map(decode)
        .any(|entry| entry.game_key == game_key && entry.score == score)
    {
        debug!(game_key = %game_key, score = score, "Guest score already recorded");
        return false;
    }

    let entry = GuestScoreEntry {
        game_key: game_key.to_string(),
        score,
        timestamp: Utc::now().timestamp_millis(),
    };
    match serde_json::to_value(&entry) {
        Ok(value) => items.push(value),
        Err(e) => {
            warn!(error = %e, "Failed to encode guest score");
            return false;
        }
    }

    save_guest_scores(store, &items);
    true
}

fn save_guest_scores(store: &dyn KeyValueStore, items: &[Value]) {
    let raw = match serde_json::to_string(items) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Failed to encode guest scores");
            return;
        }
    };
    if let Err(e) = store.set_item(GUEST_SCORES_KEY, &raw) {
        debug!(error = %e, "Guest scores not saved");
    }
}

/// Scores for one game, in insertion order
pub fn guest_scores_for_game(store: &dyn KeyValueStore, game_key: &str) -> Vec<GuestScoreEntry> {
    guest_scores(store)
        .into_iter()
        .filter(|entry| entry.game_key == game_key)
        .collect()
}

/// Best score per game across everything stored locally
pub fn guest_best_scores(store: &dyn KeyValueStore) -> BTreeMap<String, f64> {
    let mut best_by_game: BTreeMap<String, f64> = BTreeMap::new();

    for entry in guest_scores(store) {
        best_by_game
            .entry(entry.game_key)
            .and_modify(|best| {
                if entry.score > *best {
                    *best = entry.score;
                }
            })
            .or_insert(entry.score);
    }

    best_by_game
}
