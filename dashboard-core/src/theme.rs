use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{StoreError, store::KeyValueStore};

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "dark" => Some(Theme::Dark),
            "light" => Some(Theme::Light),
            _ => None,
        }
    }

    /// Saved preference if there is one, otherwise the system's. Any saved
    /// value other than "dark" reads as light.
    pub fn load(store: &impl KeyValueStore, system_prefers_dark: bool) -> Self {
        match store.get(THEME_KEY) {
            Some(saved) if Theme::parse(&saved) == Some(Theme::Dark) => Theme::Dark,
            Some(_) => Theme::Light,
            None if system_prefers_dark => Theme::Dark,
            None => Theme::Light,
        }
    }

    pub fn save(self, store: &mut impl KeyValueStore) -> Result<(), StoreError> {
        store.set(THEME_KEY, self.as_str())
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    /// Flip the effective theme and persist the result.
    pub fn toggle(
        store: &mut impl KeyValueStore,
        system_prefers_dark: bool,
    ) -> Result<Self, StoreError> {
        let next = Theme::load(store, system_prefers_dark).toggled();
        next.save(store)?;
        Ok(next)
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
