//! Saved camera locations.
//!
//! Process-lifetime bookmarks of camera state. Persistence, and the
//! camera easing that consumes these, belong to external collaborators.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A bookmarked camera state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedLocation {
    /// Map center as `(lng, lat)`.
    pub center: DVec2,
    /// Camera zoom level.
    pub zoom: f64,
    /// Camera pitch in degrees.
    pub pitch: f64,
    /// Camera bearing in degrees.
    pub bearing: f64,
    /// User-facing bookmark name.
    pub name: String,
}

/// Append-only list of saved locations, removed by index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedLocations {
    locations: Vec<SavedLocation>,
}

impl SavedLocations {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a bookmark.
    pub fn add(&mut self, location: SavedLocation) {
        self.locations.push(location);
    }

    /// Removes the bookmark at `index`, if it exists.
    pub fn remove(&mut self, index: usize) -> Option<SavedLocation> {
        if index < self.locations.len() {
            Some(self.locations.remove(index))
        } else {
            None
        }
    }

    /// Returns the stored bookmarks in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[SavedLocation] {
        &self.locations
    }

    /// Returns the number of bookmarks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Returns true if no bookmark is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(name: &str) -> SavedLocation {
        SavedLocation {
            center: DVec2::new(121.536609, 25.044808),
            zoom: 12.5,
            pitch: 0.0,
            bearing: 0.0,
            name: name.to_string(),
        }
    }

    #[test]
    fn test_add_and_remove_by_index() {
        let mut saved = SavedLocations::new();
        saved.add(location("office"));
        saved.add(location("home"));
        assert_eq!(saved.len(), 2);

        let removed = saved.remove(0).unwrap();
        assert_eq!(removed.name, "office");
        assert_eq!(saved.as_slice()[0].name, "home");

        assert!(saved.remove(5).is_none());
        assert_eq!(saved.len(), 1);
    }
}
