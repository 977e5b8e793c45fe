use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use super::batch::{BlendMode, RenderState};

/// Fingerprint selecting a pipeline.
///
/// The texture of a [`RenderState`] is not part of the key; it only selects the
/// resource set bound at draw time. `format` is the render target's output
/// format, so switching to a target of another format builds new pipelines
/// instead of reusing incompatible ones.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PipelineKey<F> {
    pub blend: BlendMode,
    pub scissor_test: bool,
    pub format: F,
}

impl<F> PipelineKey<F> {
    pub fn new(state: &RenderState, format: F) -> Self {
        Self {
            blend: state.blend,
            scissor_test: state.use_scissor_rect,
            format,
        }
    }
}

/// Lazily populated map from key to pipeline.
///
/// Entries are created once and kept until the cache is dropped or cleared.
pub struct PipelineCache<K, P> {
    entries: HashMap<K, P>,
    created: usize,
}

impl<K, P> Default for PipelineCache<K, P> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            created: 0,
        }
    }
}

impl<K: Eq + Hash, P> PipelineCache<K, P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached pipeline for `key`, building it with `create` on a miss.
    ///
    /// A failed `create` leaves the cache untouched.
    pub fn get_or_try_create<E>(
        &mut self,
        key: K,
        create: impl FnOnce(&K) -> Result<P, E>,
    ) -> Result<&P, E> {
        match self.entries.entry(key) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let pipeline = create(e.key())?;
                self.created += 1;
                Ok(e.insert(pipeline))
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &K) -> Option<&P> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total pipelines built over the cache's lifetime.
    pub fn created(&self) -> usize {
        self.created
    }

    /// Drops every cached pipeline.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
