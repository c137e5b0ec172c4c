//! Editor configuration.
//!
//! Read from environment variables, following the same convention as the
//! rest of the toolchain:
//! - `PIPEGRAPH_DUPLICATE_OFFSET`: `"dx,dy"` canvas offset applied to
//!   duplicates (default: `"10,10"`)
//! - `PIPEGRAPH_HISTORY_LIMIT`: number of undo steps kept (default: `100`)

use pipegraph_core::Position;

pub const DUPLICATE_OFFSET_VAR: &str = "PIPEGRAPH_DUPLICATE_OFFSET";
pub const HISTORY_LIMIT_VAR: &str = "PIPEGRAPH_HISTORY_LIMIT";

/// Tunables shared by the editing engines.
#[derive(Debug, Clone, PartialEq)]
pub struct EditorConfig {
    /// Offset between an original node and its duplicate when no explicit
    /// drop position is given.
    pub duplicate_offset: Position,
    /// Maximum number of undo steps retained by a session.
    pub history_limit: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            duplicate_offset: Position::new(10.0, 10.0),
            history_limit: 100,
        }
    }
}

impl EditorConfig {
    /// Loads the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the configuration through `lookup`. Malformed values are
    /// logged and replaced by their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = EditorConfig::default();

        if let Some(raw) = lookup(DUPLICATE_OFFSET_VAR) {
            match parse_offset(&raw) {
                Some(offset) => config.duplicate_offset = offset,
                None => tracing::warn!(
                    var = DUPLICATE_OFFSET_VAR,
                    value = %raw,
                    "ignoring malformed offset"
                ),
            }
        }

        if let Some(raw) = lookup(HISTORY_LIMIT_VAR) {
            match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => config.history_limit = limit,
                _ => tracing::warn!(
                    var = HISTORY_LIMIT_VAR,
                    value = %raw,
                    "ignoring malformed history limit"
                ),
            }
        }

        config
    }
}

fn parse_offset(raw: &str) -> Option<Position> {
    let (x, y) = raw.split_once(',')?;
    Some(Position::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}
