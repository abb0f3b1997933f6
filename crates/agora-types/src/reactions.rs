//! Set-union / set-difference bookkeeping for a message's reaction map.
//! Toggling is the caller's decision; both operations are idempotent.

use crate::models::Reactions;

/// Add `username` under `emoji`. Returns true if the map changed.
pub fn add(reactions: &mut Reactions, username: &str, emoji: &str) -> bool {
    reactions
        .entry(emoji.to_string())
        .or_default()
        .insert(username.to_string())
}

/// Remove `username` from `emoji`, pruning the key once nobody is left.
/// Returns true if the map changed.
pub fn remove(reactions: &mut Reactions, username: &str, emoji: &str) -> bool {
    let Some(users) = reactions.get_mut(emoji) else {
        return false;
    };
    let removed = users.remove(username);
    if users.is_empty() {
        reactions.remove(emoji);
    }
    removed
}
