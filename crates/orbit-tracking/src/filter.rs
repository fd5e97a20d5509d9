//! Filter Engine
//!
//! Derives the visible subset of the catalog from a [`FilterState`]. Pure:
//! the dashboard re-runs it on every keystroke.

use crate::model::{FilterState, TrackedObject};

/// Case-insensitive substring match on catalog id or name
fn matches_search(object: &TrackedObject, needle_lower: &str) -> bool {
    needle_lower.is_empty()
        || object.catalog_id.to_lowercase().contains(needle_lower)
        || object.name.to_lowercase().contains(needle_lower)
}

/// Both criteria, with the search text already lowercased
fn matches_lowered(object: &TrackedObject, filter: &FilterState, needle_lower: &str) -> bool {
    matches_search(object, needle_lower)
        && (filter.orbit_classes.is_empty() || filter.orbit_classes.contains(&object.orbit_class()))
}

pub fn matches(object: &TrackedObject, filter: &FilterState) -> bool {
    matches_lowered(object, filter, &filter.search.to_lowercase())
}

/// Objects passing both the search and the orbit-class filter, in input order
pub fn filter_objects<'a>(objects: &'a [TrackedObject], filter: &FilterState) -> Vec<&'a TrackedObject> {
    let needle = filter.search.to_lowercase();
    objects
        .iter()
        .filter(|object| matches_lowered(object, filter, &needle))
        .collect()
}
