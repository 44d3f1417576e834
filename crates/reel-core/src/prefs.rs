//! Preference keys and their value types.
//!
//! Preferences are a flat key-value map. Every key has a fixed name, a
//! static default and a value type that serializes to JSON. Reading a key
//! that was never written (or whose stored value no longer decodes) yields
//! the default.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Raw preference map as persisted: key name to JSON value.
pub type PrefMap = BTreeMap<String, serde_json::Value>;

/// Bound for types that can be stored under a [`PrefKey`].
pub trait PrefValue:
    Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
}

impl<T> PrefValue for T where
    T: Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
}

/// A typed preference key.
pub struct PrefKey<T> {
    name: &'static str,
    default: fn() -> T,
}

impl<T: PrefValue> PrefKey<T> {
    /// Define a key with its stored name and default.
    pub const fn new(name: &'static str, default: fn() -> T) -> Self {
        Self { name, default }
    }

    /// The stored name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The value reported when the key was never written.
    pub fn default_value(&self) -> T {
        (self.default)()
    }

    /// Read this key from a preference map, falling back to the default.
    pub fn read(&self, map: &PrefMap) -> T {
        map.get(self.name)
            .and_then(|raw| serde_json::from_value(raw.clone()).ok())
            .unwrap_or_else(self.default)
    }

    /// Encode a value for storage.
    pub fn encode(&self, value: &T) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(value)
    }
}

impl<T> Clone for PrefKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PrefKey<T> {}

impl<T> fmt::Debug for PrefKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrefKey({})", self.name)
    }
}

/// Sort order applied to the visible list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Title ascending.
    #[default]
    #[serde(rename = "title")]
    Title,
    /// Newest release year first.
    #[serde(rename = "year")]
    YearDesc,
    /// Highest score first.
    #[serde(rename = "rating")]
    RatingDesc,
    /// Most recently completed first, never-completed last.
    #[serde(rename = "date")]
    CompletionDesc,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [
        SortOrder::Title,
        SortOrder::YearDesc,
        SortOrder::RatingDesc,
        SortOrder::CompletionDesc,
    ];

    /// Stored name of the order.
    pub const fn as_str(self) -> &'static str {
        match self {
            SortOrder::Title => "title",
            SortOrder::YearDesc => "year",
            SortOrder::RatingDesc => "rating",
            SortOrder::CompletionDesc => "date",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOrder::ALL
            .iter()
            .copied()
            .find(|order| order.as_str() == s)
            .ok_or_else(|| format!("unknown sort order: {s}"))
    }
}

/// UI theme selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    System,
    Light,
    Dark,
}

/// The fixed set of preference keys.
pub mod keys {
    use super::{PrefKey, SortOrder, ThemeMode};

    /// Cosmetic local session switch.
    pub const IS_SESSION_ACTIVE: PrefKey<bool> = PrefKey::new("isSessionActive", || false);

    /// Name shown while a session is active.
    pub const DISPLAY_NAME: PrefKey<String> = PrefKey::new("displayName", String::new);

    pub const THEME_MODE: PrefKey<ThemeMode> = PrefKey::new("themeMode", ThemeMode::default);

    pub const SORT_ORDER: PrefKey<SortOrder> = PrefKey::new("sortOrder", SortOrder::default);

    pub const FAVORITES_ONLY: PrefKey<bool> = PrefKey::new("favoritesOnly", || false);
}
