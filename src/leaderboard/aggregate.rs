use std::cmp::Ordering;
use std::collections::HashMap;

use super::models::{LeaderboardEntry, LeaderboardUserInfo, RawScore, UserProfile};
use crate::storage::{GuestScoreEntry, LocalIdentity};

/// Number of rows a leaderboard shows
pub const LEADERBOARD_SIZE: usize = 10;

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Best score per user id
pub fn best_by_user(scores: &[RawScore]) -> HashMap<String, f64> {
    let mut best: HashMap<String, f64> = HashMap::new();
    for raw in scores {
        best.entry(raw.user.clone())
            .and_modify(|current| {
                if raw.score > *current {
                    *current = raw.score;
                }
            })
            .or_insert(raw.score);
    }
    best
}

/// Highest `limit` users, best first. Equal scores are ordered by user id.
pub fn top_scores(best: HashMap<String, f64>, limit: usize) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = best.into_iter().collect();
    ranked.sort_by(|(user_a, a), (user_b, b)| descending(*a, *b).then_with(|| user_a.cmp(user_b)));
    ranked.truncate(limit);
    ranked
}

/// Turns a profile into display info; `avatar_url` resolves an uploaded avatar file
pub fn user_info(
    profile: &UserProfile,
    avatar_url: impl Fn(&UserProfile, &str) -> Option<String>,
) -> LeaderboardUserInfo {
    LeaderboardUserInfo {
        user_id: profile.id.clone(),
        first_name: profile.first_name.clone(),
        last_name: profile.last_name.clone(),
        display_name: profile.display_name(),
        avatar_url: profile
            .avatar
            .as_deref()
            .and_then(|file| avatar_url(profile, file)),
        avatar_base64: profile.avatar_base64.clone(),
    }
}

/// Assigns ranks in the given (already sorted) order and joins profiles;
/// users without a profile get the placeholder identity
pub fn rank_entries(
    top: Vec<(String, f64)>,
    profiles: &HashMap<String, LeaderboardUserInfo>,
) -> Vec<LeaderboardEntry> {
    top.into_iter()
        .enumerate()
        .map(|(index, (user_id, score))| LeaderboardEntry {
            rank: index as u32 + 1,
            score,
            user: profiles
                .get(&user_id)
                .cloned()
                .unwrap_or_else(|| LeaderboardUserInfo::placeholder(&user_id)),
        })
        .collect()
}

/// A guest only competes with themselves: their best `limit` scores, each
/// shown with the guest identity
pub fn guest_entries(
    scores: &[GuestScoreEntry],
    identity: &LocalIdentity,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let mut values: Vec<f64> = scores.iter().map(|entry| entry.score).collect();
    values.sort_by(|a, b| descending(*a, *b));
    values.truncate(limit);

    let user = LeaderboardUserInfo {
        user_id: identity.user_id.clone(),
        first_name: identity.display_name.clone(),
        last_name: String::new(),
        display_name: identity.display_name.clone(),
        avatar_url: identity.avatar_url.clone(),
        avatar_base64: identity.avatar_base64.clone(),
    };

    values
        .into_iter()
        .enumerate()
        .map(|(index, score)| LeaderboardEntry {
            rank: index as u32 + 1,
            score,
            user: user.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn raw(pairs: &[(&str, f64)]) -> Vec<RawScore> {
        pairs.iter().map(|(u, s)| RawScore::new(*u, *s)).collect()
    }

    #[test]
    fn test_worked_example() {
        let scores = raw(&[("a", 10.0), ("b", 20.0), ("a", 15.0)]);

        let best = best_by_user(&scores);
        assert_eq!(best, HashMap::from([("a".to_string(), 15.0), ("b".to_string(), 20.0)]));

        let entries = rank_entries(top_scores(best, LEADERBOARD_SIZE), &HashMap::new());
        assert_eq!(entries.len(), 2);
        assert_eq!((entries[0].rank, entries[0].score), (1, 20.0));
        assert_eq!(entries[0].user.user_id, "b");
        assert_eq!((entries[1].rank, entries[1].score), (2, 15.0));
        assert_eq!(entries[1].user.user_id, "a");
    }

    #[test]
    fn test_best_by_user_keeps_one_maximum_per_user() {
        let scores = raw(&[
            ("a", 3.0),
            ("b", -1.0),
            ("a", 9.0),
            ("c", 0.0),
            ("b", -5.0),
            ("a", 4.0),
        ]);

        let best = best_by_user(&scores);
        assert_eq!(best.len(), 3);
        assert_eq!(best["a"], 9.0);
        assert_eq!(best["b"], -1.0);
        assert_eq!(best["c"], 0.0);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(3, 3)]
    #[case(10, 10)]
    #[case(25, 10)]
    fn test_entries_are_capped_and_ranked(#[case] users: usize, #[case] expected: usize) {
        let scores: Vec<RawScore> = (0..users)
            .flat_map(|i| {
                let user = format!("user-{i}");
                vec![
                    RawScore::new(user.clone(), i as f64),
                    RawScore::new(user, (i * 7 % 13) as f64),
                ]
            })
            .collect();

        let entries = rank_entries(
            top_scores(best_by_user(&scores), LEADERBOARD_SIZE),
            &HashMap::new(),
        );

        assert_eq!(entries.len(), expected);
        for (index, entry) in entries.iter().enumerate() {
            assert_eq!(entry.rank as usize, index + 1);
        }
        for pair in entries.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_profiles_are_joined_and_missing_ones_use_placeholder() {
        let profile = UserProfile::from_value(&json!({
            "id": "b",
            "firstName": "Grace",
            "lastName": "Hopper",
            "avatar": "grace.png",
        }))
        .unwrap();
        let info = user_info(&profile, |p, file| Some(format!("files/{}/{}", p.id, file)));
        let profiles = HashMap::from([("b".to_string(), info)]);

        let entries = rank_entries(vec![("b".to_string(), 20.0), ("a".to_string(), 15.0)], &profiles);

        assert_eq!(entries[0].user.display_name, "Grace Hopper");
        assert_eq!(entries[0].user.avatar_url.as_deref(), Some("files/b/grace.png"));
        assert_eq!(entries[1].user, LeaderboardUserInfo::placeholder("a"));
    }

    #[test]
    fn test_guest_entries_rank_own_scores() {
        let scores: Vec<GuestScoreEntry> = [5.0, 50.0, 20.0]
            .iter()
            .map(|score| GuestScoreEntry {
                game_key: "snake".to_string(),
                score: *score,
                timestamp: 1,
            })
            .collect();
        let identity = LocalIdentity {
            user_id: "guest-1".to_string(),
            display_name: "Pixel".to_string(),
            avatar_url: None,
            avatar_base64: Some("data".to_string()),
        };

        let entries = guest_entries(&scores, &identity, 2);

        assert_eq!(entries.len(), 2);
        assert_eq!((entries[0].rank, entries[0].score), (1, 50.0));
        assert_eq!((entries[1].rank, entries[1].score), (2, 20.0));
        assert!(entries.iter().all(|e| e.user.user_id == "guest-1"));
        assert_eq!(entries[0].user.display_name, "Pixel");
        assert_eq!(entries[0].user.avatar_base64.as_deref(), Some("data"));
    }
}
