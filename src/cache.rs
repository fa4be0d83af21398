//! Per-field codec cache: a field's codec is built at most once per cache and
//! shared by every segment instance.
//!
//! The cache is an explicit object injected into the segment engine, not
//! ambient global state: independent caches can coexist in one process, and
//! tests get isolation by constructing their own.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::codec::ArcCodec;
use crate::error::DefinitionError;

/// Identity of one field of one owning type. Used only as a cache key, never
/// serialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyKey {
    pub owner: TypeId,
    pub field: &'static str,
}

impl PropertyKey {
    pub fn new<Owner: 'static>(field: &'static str) -> Self {
        PropertyKey {
            owner: TypeId::of::<Owner>(),
            field,
        }
    }
}

type BuildResult = Result<Arc<dyn Any + Send + Sync>, DefinitionError>;
type Slot = Arc<OnceLock<BuildResult>>;

/// Memoizes built field codecs by [`PropertyKey`].
///
/// The map lock is held only to hand out a per-key slot; the build itself
/// runs outside it, so a slow build for one key never serializes unrelated
/// keys. A deterministic build failure is cached like a success.
#[derive(Default)]
pub struct FieldCodecCache {
    slots: RwLock<HashMap<PropertyKey, Slot>>,
}

impl FieldCodecCache {
    pub fn new() -> Self {
        FieldCodecCache::default()
    }

    /// First call for `key` runs `build` exactly once and stores the result;
    /// later calls return the stored codec without invoking `build` again,
    /// including calls racing the first from other threads.
    pub fn get_or_build<T: 'static>(
        &self,
        key: PropertyKey,
        build: impl FnOnce() -> Result<ArcCodec<T>, DefinitionError>,
    ) -> Result<ArcCodec<T>, DefinitionError> {
        let field = key.field;
        let slot = self.slot(key);
        let outcome = slot.get_or_init(|| {
            build().map(|codec| Arc::new(codec) as Arc<dyn Any + Send + Sync>)
        });
        match outcome {
            Ok(any) => any
                .downcast_ref::<ArcCodec<T>>()
                .cloned()
                .ok_or(DefinitionError::CacheTypeConflict { field }),
            Err(e) => Err(e.clone()),
        }
    }

    /// Number of keys with a slot (built, building, or failed).
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached codec; the next use of each key rebuilds.
    pub fn clear(&self) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn slot(&self, key: PropertyKey) -> Slot {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(slot);
        }
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key).or_default())
    }
}

impl fmt::Debug for FieldCodecCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCodecCache")
            .field("entries", &self.len())
            .finish()
    }
}
