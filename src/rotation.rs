//! Next-image selection and catalog drift reconciliation.
//!
//! The engine is pure apart from its RNG: it receives the previous state by
//! value, never touches the store, and hands back the state the caller
//! should commit once the image is on screen.

use chrono::Utc;
use rand::Rng;
use rotation_model::{NOT_STARTED, OrderMode, RotationState, SCHEMA_VERSION};
use tracing::{debug, info};

use crate::scan::{Catalog, ImageEntry};

/// How the current position was recovered from the previous state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Nothing shown yet; selection starts before the first image.
    Start,
    /// The last shown image is still present at this position.
    Named(usize),
    /// The last shown image is gone; the stored index, clamped to the
    /// catalog, stands in for it. `None` means the clamp landed on "start".
    Clamped(Option<usize>),
}

impl Anchor {
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Start => None,
            Self::Named(pos) => Some(*pos),
            Self::Clamped(pos) => *pos,
        }
    }
}

/// Where the previous state sits in the current catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub anchor: Anchor,
    /// `true` when the stored index could not be used as-is.
    pub reconciled: bool,
    /// `true` when the catalog size or the anchor file changed since the
    /// state was written.
    pub catalog_changed: bool,
}

/// Outcome of one [`RotationEngine::advance`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationResult {
    /// The image to paint, or `None` when the catalog is empty.
    pub chosen: Option<ImageEntry>,
    /// The state to commit after a successful paint.
    pub state: RotationState,
    pub reconciled: bool,
    pub catalog_changed: bool,
}

/// Locate the previous state's position inside `catalog`.
///
/// The last shown name wins over the stored index; the index is only
/// consulted, clamped to the new bounds, when that image is gone.
pub fn reconcile(catalog: &Catalog, state: &RotationState) -> Reconciliation {
    let size_changed = state.is_started() && state.image_count != catalog.len();

    if let Some(name) = state.last_image_name.as_deref()
        && let Some(pos) = catalog.position_of(name)
    {
        let replaced = match (&state.last_image_marker, catalog.get(pos)) {
            (Some(marker), Some(entry)) => *marker != entry.marker,
            _ => false,
        };
        return Reconciliation {
            anchor: Anchor::Named(pos),
            reconciled: state.position() != Some(pos),
            catalog_changed: size_changed || replaced,
        };
    }

    if !state.is_started() {
        return Reconciliation {
            anchor: Anchor::Start,
            reconciled: false,
            catalog_changed: false,
        };
    }

    let clamped = clamp_index(state.current_index, catalog.len());
    Reconciliation {
        anchor: Anchor::Clamped(clamped),
        reconciled: state.last_image_name.is_some() || clamped != state.position(),
        catalog_changed: size_changed || state.last_image_name.is_some(),
    }
}

fn clamp_index(index: i64, len: usize) -> Option<usize> {
    if index <= NOT_STARTED || len == 0 {
        return None;
    }
    let last = len - 1;
    Some(usize::try_from(index).map_or(last, |i| i.min(last)))
}

/// Selection policy plus the randomness it draws from.
#[derive(Debug)]
pub struct RotationEngine<R> {
    rng: R,
    history_depth: usize,
}

impl<R: Rng> RotationEngine<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            history_depth: 0,
        }
    }

    /// Random mode also avoids the last `depth` images while other
    /// candidates remain. Zero disables the history.
    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history_depth = depth;
        self
    }

    /// Compute the next image and the state to commit after painting it.
    pub fn advance(&mut self, catalog: &Catalog, previous: RotationState) -> RotationResult {
        if catalog.is_empty() {
            debug!("catalog empty; nothing to advance");
            return RotationResult {
                chosen: None,
                state: previous,
                reconciled: false,
                catalog_changed: false,
            };
        }

        let rec = reconcile(catalog, &previous);
        if rec.reconciled {
            info!(
                last = previous.last_image_name.as_deref().unwrap_or("-"),
                stored_index = previous.current_index,
                anchor = ?rec.anchor,
                images = catalog.len(),
                "reconciled rotation position"
            );
        }

        let current = rec.anchor.position();
        let next = match previous.order_mode {
            OrderMode::Sequential => next_sequential(current, catalog.len()),
            OrderMode::Random => self.next_random(catalog, current, &previous.recent_images),
        };
        let chosen = catalog.get(next).cloned();

        let state = match &chosen {
            Some(entry) => self.next_state(previous, next, entry, catalog.len()),
            None => previous,
        };
        RotationResult {
            chosen,
            state,
            reconciled: rec.reconciled,
            catalog_changed: rec.catalog_changed,
        }
    }

    fn next_random(
        &mut self,
        catalog: &Catalog,
        current: Option<usize>,
        recent: &[String],
    ) -> usize {
        let len = catalog.len();
        if len == 1 {
            return 0;
        }
        let recent = &recent[..recent.len().min(self.history_depth)];
        let others: Vec<usize> = (0..len).filter(|pos| Some(*pos) != current).collect();
        let fresh: Vec<usize> = others
            .iter()
            .copied()
            .filter(|pos| {
                catalog
                    .get(*pos)
                    .is_some_and(|entry| !recent.contains(&entry.name))
            })
            .collect();
        let pool = if fresh.is_empty() { &others } else { &fresh };
        pool[self.rng.random_range(0..pool.len())]
    }

    fn next_state(
        &self,
        previous: RotationState,
        position: usize,
        entry: &ImageEntry,
        image_count: usize,
    ) -> RotationState {
        let mut recent = previous.recent_images;
        if self.history_depth > 0 {
            recent.retain(|name| *name != entry.name);
            recent.insert(0, entry.name.clone());
            recent.truncate(self.history_depth);
        } else {
            recent.clear();
        }
        RotationState {
            schema_version: SCHEMA_VERSION,
            order_mode: previous.order_mode,
            current_index: i64::try_from(position).unwrap_or(i64::MAX),
            last_image_name: Some(entry.name.clone()),
            recent_images: recent,
            image_count,
            last_image_marker: Some(entry.marker),
            updated_at: Some(Utc::now()),
        }
    }
}

/// Step forward one slot, wrapping from the last image to the first.
fn next_sequential(current: Option<usize>, len: usize) -> usize {
    current.map_or(0, |pos| (pos + 1) % len)
}
