//! Names of the entries this application keeps in local storage.

/// Identifier of the signed-in (or guest) user
pub const USER_ID_KEY: &str = "arcadeUserId";
pub const USER_NAME_KEY: &str = "arcadeUserName";
pub const USER_AVATAR_BASE64_KEY: &str = "arcadeUserAvatarBase64";
pub const USER_AVATAR_URL_KEY: &str = "arcadeUserAvatarURL";

/// Auth store owned by the record client (`{"token": "...", "model": {...}}`)
pub const AUTH_TOKEN_KEY: &str = "pb_auth";

/// Reserved for the embedded extension runtime
pub const NAMESPACE_KEY: &str = "extensions.turbowarp.org/local-storage:misarcade";

/// JSON list of guest score entries
pub const GUEST_SCORES_KEY: &str = "misarcade_guest_scores";

/// Every key we may write; removed one by one when a full clear is not possible
pub const KNOWN_KEYS: [&str; 7] = [
    USER_ID_KEY,
    USER_NAME_KEY,
    USER_AVATAR_BASE64_KEY,
    USER_AVATAR_URL_KEY,
    AUTH_TOKEN_KEY,
    NAMESPACE_KEY,
    GUEST_SCORES_KEY,
];

/// User ids starting with this prefix belong to local-only guests
pub const GUEST_ID_PREFIX: &str = "guest-";
