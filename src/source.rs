use crate::host::InputKind;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::warn;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumIter, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScrollSource {
    Touch,
    Wheel,
    Keyboard,
    #[default]
    Other,
    Programmatic,
}

/// Keys that commonly scroll the focused container.
pub const SCROLL_KEYS: &[&str] = &[
    "ArrowUp",
    "ArrowDown",
    "ArrowLeft",
    "ArrowRight",
    "PageUp",
    "PageDown",
    "Home",
    "End",
    " ",
];

impl ScrollSource {
    /// Parses a source name, falling back to `Other` for anything outside the
    /// enumeration. Never fails.
    pub fn parse_or_other(value: &str) -> Self {
        match Self::from_str(value) {
            Ok(source) => source,
            Err(_) => {
                warn!("Invalid scroll source: {:?}, defaulting to 'other'", value);
                ScrollSource::Other
            }
        }
    }

    /// Every source name, comma separated.
    pub fn known_names() -> String {
        Self::iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// The source an input event implies, if it is one that scrolls.
    pub fn from_input(kind: &InputKind) -> Option<Self> {
        match kind {
            InputKind::Wheel => Some(ScrollSource::Wheel),
            InputKind::TouchStart | InputKind::TouchMove => Some(ScrollSource::Touch),
            InputKind::KeyDown { key } if is_scroll_key(key) => Some(ScrollSource::Keyboard),
            InputKind::KeyDown { .. } => None,
        }
    }
}

pub fn is_scroll_key(key: &str) -> bool {
    SCROLL_KEYS.contains(&key)
}
