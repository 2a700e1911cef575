//! Loading-state coordination.
//!
//! The [`LoadingSet`] is a multiset of in-flight task tags: layer ids
//! whose data is being fetched or generated, plus a `Rendering` sentinel
//! inserted around every layer mutation and cleared when the rendering
//! collaborator reports a settled frame. While the set is non-empty the
//! map is not settled, and the filter engine must refuse to run.

use crate::config::LayerId;

/// Tag of one in-flight task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadTag {
    /// A layer whose backing data is being fetched or built.
    Layer(LayerId),
    /// A render pass that has not settled yet.
    Rendering,
}

/// Multiset of in-flight task tags.
///
/// A tag may be present more than once (several mutations can be
/// awaiting the same render settle); clearing a tag removes every
/// occurrence, matching the all-at-once settle signal.
#[derive(Debug, Default)]
pub struct LoadingSet {
    tags: Vec<LoadTag>,
}

impl LoadingSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a tag occurrence.
    pub fn insert(&mut self, tag: LoadTag) {
        self.tags.push(tag);
    }

    /// Removes every occurrence of a tag.
    pub fn clear_tag(&mut self, tag: &LoadTag) {
        self.tags.retain(|t| t != tag);
    }

    /// Removes every occurrence of a layer tag.
    pub fn clear_layer(&mut self, id: &LayerId) {
        self.clear_tag(&LoadTag::Layer(id.clone()));
    }

    /// Returns true if any occurrence of the tag is present.
    #[must_use]
    pub fn contains(&self, tag: &LoadTag) -> bool {
        self.tags.contains(tag)
    }

    /// Returns true if a layer is mid-load.
    #[must_use]
    pub fn contains_layer(&self, id: &LayerId) -> bool {
        self.contains(&LoadTag::Layer(id.clone()))
    }

    /// Returns true if no task is in flight: the settled barrier.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Returns the ids of all layers currently mid-load.
    #[must_use]
    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.tags
            .iter()
            .filter_map(|tag| match tag {
                LoadTag::Layer(id) => Some(id.clone()),
                LoadTag::Rendering => None,
            })
            .collect()
    }

    /// Removes every tag.
    pub fn clear(&mut self) {
        self.tags.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerKind;

    #[test]
    fn test_multiset_clear_removes_all_occurrences() {
        let mut loading = LoadingSet::new();
        loading.insert(LoadTag::Rendering);
        loading.insert(LoadTag::Rendering);
        assert!(!loading.is_empty());

        loading.clear_tag(&LoadTag::Rendering);
        assert!(loading.is_empty());
    }

    #[test]
    fn test_layer_tags() {
        let id = LayerId::derive("youbike", LayerKind::Geojson);
        let mut loading = LoadingSet::new();
        loading.insert(LoadTag::Layer(id.clone()));
        loading.insert(LoadTag::Rendering);

        assert!(loading.contains_layer(&id));
        assert_eq!(loading.layer_ids(), vec![id.clone()]);

        loading.clear_layer(&id);
        assert!(!loading.contains_layer(&id));
        // The rendering sentinel is untouched.
        assert!(loading.contains(&LoadTag::Rendering));
    }
}
