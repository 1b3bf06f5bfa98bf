use serde::{Deserialize, Serialize};
use tracing::debug;

/// How an accepted keystroke lands in the typed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AppendPolicy {
    /// One character per keystroke.
    #[default]
    Once,
    /// Two characters per keystroke, as the first versions of the game
    /// recorded them. Doubles every speed figure.
    Twice,
}

impl AppendPolicy {
    pub fn from_double_append(double_append: bool) -> Self {
        if double_append {
            AppendPolicy::Twice
        } else {
            AppendPolicy::Once
        }
    }
}

/// Whether `c` may be typed at all: any character occurring anywhere in the
/// target counts, regardless of position.
pub fn is_allowed(target: &str, c: char) -> bool {
    target.contains(c)
}

/// Applies one keystroke to `typed`. Returns false when the key was filtered.
pub fn apply_key(policy: AppendPolicy, target: &str, typed: &mut String, c: char) -> bool {
    if !is_allowed(target, c) {
        debug!(key = ?c, "ignoring key not in target");
        return false;
    }

    typed.push(c);
    if policy == AppendPolicy::Twice {
        typed.push(c);
    }
    true
}
