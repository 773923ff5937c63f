use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name shown for users without a usable profile
pub const PLACEHOLDER_NAME: &str = "Player";

/// Who a leaderboard row belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardUserInfo {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_base64: Option<String>,
}

impl LeaderboardUserInfo {
    /// Generic identity for a user whose profile could not be resolved
    pub fn placeholder(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            first_name: PLACEHOLDER_NAME.to_string(),
            last_name: String::new(),
            display_name: PLACEHOLDER_NAME.to_string(),
            avatar_url: None,
            avatar_base64: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: u32,
    pub score: f64,
    pub user: LeaderboardUserInfo,
}

/// One raw `{score, user}` pair from a cache record
#[derive(Debug, Clone, PartialEq)]
pub struct RawScore {
    pub user: String,
    pub score: f64,
}

impl RawScore {
    pub fn new(user: impl Into<String>, score: f64) -> Self {
        Self {
            user: user.into(),
            score,
        }
    }

    /// Accepts numeric strings for the score. Pairs without a user id or with a
    /// non-finite score are rejected.
    pub fn from_value(value: &Value) -> Option<Self> {
        let user = match value.get("user")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        if user.is_empty() {
            return None;
        }

        let score = match value.get("score")? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        score.is_finite().then_some(Self { user, score })
    }
}

/// Aggregate score history of one game, as stored in the cache collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheRecord {
    pub id: String,
    pub game_key: Option<String>,
    pub high_scores: Vec<RawScore>,
    pub updated: Option<String>,
}

impl CacheRecord {
    /// Lenient decode: a missing or non-list `high_scores` is empty and
    /// unusable pairs are dropped
    pub fn from_value(value: &Value) -> Self {
        let text = |field: &str| value.get(field).and_then(Value::as_str).map(str::to_string);

        Self {
            id: text("id").unwrap_or_default(),
            game_key: text("gamekey"),
            high_scores: value
                .get("high_scores")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(RawScore::from_value).collect())
                .unwrap_or_default(),
            updated: text("updated"),
        }
    }
}

/// The fields of a user profile record that the leaderboard shows
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// File name of the uploaded avatar, if any
    pub avatar: Option<String>,
    pub avatar_base64: Option<String>,
    /// The raw record, kept for building file URLs
    pub record: Value,
}

impl UserProfile {
    pub fn from_value(value: &Value) -> Option<Self> {
        let text = |field: &str| {
            value
                .get(field)
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        Some(Self {
            id: text("id")?,
            first_name: text("firstName").unwrap_or_default(),
            last_name: text("lastName").unwrap_or_default(),
            avatar: text("avatar"),
            avatar_base64: text("avatarbase64"),
            record: value.clone(),
        })
    }

    /// First and last name joined, or the placeholder when both are blank
    pub fn display_name(&self) -> String {
        let joined = [self.first_name.as_str(), self.last_name.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if joined.is_empty() {
            PLACEHOLDER_NAME.to_string()
        } else {
            joined
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::number(json!({"user": "a", "score": 10}), Some(RawScore::new("a", 10.0)))]
    #[case::numeric_string(json!({"user": "a", "score": " 12.5 "}), Some(RawScore::new("a", 12.5)))]
    #[case::empty_user(json!({"user": "", "score": 10}), None)]
    #[case::missing_user(json!({"score": 10}), None)]
    #[case::text_score(json!({"user": "a", "score": "lots"}), None)]
    #[case::null_score(json!({"user": "a", "score": null}), None)]
    fn test_raw_score_decoding(#[case] value: Value, #[case] expected: Option<RawScore>) {
        assert_eq!(RawScore::from_value(&value), expected);
    }

    #[test]
    fn test_cache_record_tolerates_missing_scores() {
        let record = CacheRecord::from_value(&json!({"id": "c1", "gamekey": "snake"}));
        assert_eq!(record.game_key.as_deref(), Some("snake"));
        assert!(record.high_scores.is_empty());

        let record = CacheRecord::from_value(&json!({"id": "c1", "high_scores": "oops"}));
        assert!(record.high_scores.is_empty());
    }

    #[rstest]
    #[case("Ada", "Lovelace", "Ada Lovelace")]
    #[case("Ada", "", "Ada")]
    #[case("", "Lovelace", "Lovelace")]
    #[case("  ", "", "Player")]
    fn test_profile_display_name(#[case] first: &str, #[case] last: &str, #[case] expected: &str) {
        let profile = UserProfile::from_value(&json!({
            "id": "u1",
            "firstName": first,
            "lastName": last,
        }))
        .unwrap();
        assert_eq!(profile.display_name(), expected);
    }

    #[test]
    fn test_user_info_serializes_camel_case() {
        let info = LeaderboardUserInfo::placeholder("u1");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["displayName"], "Player");
        assert!(json.get("avatarUrl").is_none());
    }
}
