use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// One batch of changes against a keyed entity collection.
///
/// Creations carry full records, updates carry partial records. Iteration follows the
/// order the entries arrived in.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(bound(deserialize = "C: Deserialize<'de>, U: Deserialize<'de>"))]
pub struct Delta<C, U = C> {
    #[serde(default)]
    pub creations: IndexMap<String, C>,
    #[serde(default)]
    pub updates: IndexMap<String, U>,
    #[serde(default)]
    pub removals: Vec<String>,
}

impl<C, U> Default for Delta<C, U> {
    fn default() -> Self {
        Self {
            creations: IndexMap::new(),
            updates: IndexMap::new(),
            removals: Vec::new(),
        }
    }
}

impl<C, U> Delta<C, U> {
    pub fn is_empty(&self) -> bool {
        self.creations.is_empty() && self.updates.is_empty() && self.removals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.creations.len() + self.updates.len() + self.removals.len()
    }
}

/// Lifecycle hooks a keyed collection exposes to the reconciler.
///
/// `on_update` for an unknown id and `on_remove` for an absent id must be no-ops.
pub trait DeltaTarget<C, U> {
    fn on_create(&mut self, id: &str, value: C);
    fn on_update(&mut self, id: &str, value: U);
    fn on_remove(&mut self, id: &str);
}

/// What a single `apply_delta` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaSummary {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub stale_removals: usize,
}

/// Apply creations, then updates, then removals.
///
/// A removal naming an id that the same delta also creates is stale and skipped, so a
/// fresh creation is never clobbered. Repeated removals of one id reach the target once.
pub fn apply_delta<C, U, T>(delta: Delta<C, U>, target: &mut T) -> DeltaSummary
where
    T: DeltaTarget<C, U> + ?Sized,
{
    let mut summary = DeltaSummary::default();
    let created_ids: IndexSet<String> = delta.creations.keys().cloned().collect();

    for (id, value) in delta.creations {
        target.on_create(&id, value);
        summary.created += 1;
    }

    for (id, value) in delta.updates {
        target.on_update(&id, value);
        summary.updated += 1;
    }

    let mut removed: IndexSet<String> = IndexSet::new();
    for id in delta.removals {
        if created_ids.contains(&id) {
            log::debug!("Skipping stale removal of freshly created entity {}", id);
            summary.stale_removals += 1;
            continue;
        }
        if !removed.insert(id.clone()) {
            continue;
        }
        target.on_remove(&id);
        summary.removed += 1;
    }

    summary
}
