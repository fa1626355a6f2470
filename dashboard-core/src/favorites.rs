use tracing::{debug, warn};

use crate::{StoreError, store::KeyValueStore};

/// Storage key holding the JSON array of favorite city names.
pub const FAVORITES_KEY: &str = "weatherDashboard_favorites";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// A case-insensitive match already exists; nothing was stored.
    AlreadyPresent,
    /// The name was blank; nothing was stored.
    Blank,
}

/// Favorite cities, unique case-insensitively, kept in insertion order.
#[derive(Debug)]
pub struct Favorites<S> {
    store: S,
}

impl<S: KeyValueStore> Favorites<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stored favorites; missing or corrupt data reads as an empty list.
    pub fn list(&self) -> Vec<String> {
        let Some(raw) = self.store.get(FAVORITES_KEY) else {
            return Vec::new();
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Ignoring corrupt favorites list: {}", e);
            Vec::new()
        })
    }

    pub fn contains(&self, city: &str) -> bool {
        self.list().iter().any(|fav| same_city(fav, city))
    }

    pub fn add(&mut self, city: &str) -> Result<AddOutcome, StoreError> {
        let city = city.trim();
        if city.is_empty() {
            return Ok(AddOutcome::Blank);
        }

        let mut favorites = self.list();
        if favorites.iter().any(|fav| same_city(fav, city)) {
            debug!(city, "Favorite already present");
            return Ok(AddOutcome::AlreadyPresent);
        }

        favorites.push(city.to_string());
        self.save(&favorites)?;
        Ok(AddOutcome::Added)
    }

    /// Removes every case-insensitive match and returns how many went.
    pub fn remove(&mut self, city: &str) -> Result<usize, StoreError> {
        let city = city.trim();
        let mut favorites = self.list();
        let before = favorites.len();

        favorites.retain(|fav| !same_city(fav, city));
        self.save(&favorites)?;

        Ok(before - favorites.len())
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn save(&mut self, favorites: &[String]) -> Result<(), StoreError> {
        let json = serde_json::to_string(favorites)?;
        self.store.set(FAVORITES_KEY, &json)
    }
}

fn same_city(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}
