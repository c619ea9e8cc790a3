//! Bump-allocated float arena holding typed records.
//!
//! Every scene object (material, geometry, light) lives as a fixed-size run
//! of `f32`s inside one store per family. Records are tagged with a small
//! integer type id kept in a parallel list, so the arena plus that list is
//! everything a consumer needs to walk the store: a host evaluator uses
//! [`ObjectStore::view`], an external one receives [`ObjectStore::arena`],
//! [`ObjectStore::filled`], [`ObjectStore::len`] and
//! [`ObjectStore::type_ids`] and reconstructs the same view with
//! [`StoreView::from_raw`].
//!
//! Records are never freed or resized individually; they live as long as
//! the store.

use std::borrow::Cow;
use std::fmt::Debug;

use strahl_math::Vec3;
use thiserror::Error;

/// Errors raised by store allocation and lookup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{family} store overflow: record needs {requested} floats, {filled}/{capacity} already used")]
    Overflow {
        family: &'static str,
        requested: usize,
        filled: usize,
        capacity: usize,
    },

    #[error("{family} slot {slot} out of range ({len} records)")]
    SlotOutOfRange {
        family: &'static str,
        slot: usize,
        len: usize,
    },

    #[error("{family} record {slot} has unknown type id {type_id}")]
    UnknownTypeId {
        family: &'static str,
        slot: usize,
        type_id: u32,
    },

    #[error("{family} buffer truncated: records need {needed} floats, {available} available")]
    Truncated {
        family: &'static str,
        needed: usize,
        available: usize,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The closed set of variants one store family can hold.
///
/// Each variant has a stable integer id and a fixed float count; both are
/// part of the on-buffer layout and must agree with the device kernel.
pub trait RecordKind: Copy + Eq + Debug + Send + Sync + 'static {
    /// Family name used in logs and errors.
    const FAMILY: &'static str;

    fn type_id(self) -> u32;

    fn from_type_id(id: u32) -> Option<Self>;

    /// Number of floats a record of this kind occupies.
    fn size(self) -> usize;
}

/// A value object that populates a freshly allocated record.
pub trait RecordConfig {
    type Kind: RecordKind;

    /// Variant this config produces.
    fn kind(&self) -> Self::Kind;

    /// Write the fields into the record window.
    fn apply(&self, window: &mut WindowMut<'_>);
}

/// Read-only window onto one record's floats.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    data: &'a [f32],
}

impl<'a> Window<'a> {
    pub fn new(data: &'a [f32]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read field `i`. Panics if `i` lies outside the record.
    #[inline]
    pub fn read(&self, i: usize) -> f32 {
        assert!(
            i < self.data.len(),
            "packed field {} out of range for record of size {}",
            i,
            self.data.len()
        );
        self.data[i]
    }

    /// Read three consecutive fields starting at `i`.
    #[inline]
    pub fn read_vec3(&self, i: usize) -> Vec3 {
        Vec3::new(self.read(i), self.read(i + 1), self.read(i + 2))
    }

    /// Read a field holding a slot reference.
    #[inline]
    pub fn read_slot(&self, i: usize) -> usize {
        self.read(i) as usize
    }

    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }
}

/// Mutable window onto one record's floats.
#[derive(Debug)]
pub struct WindowMut<'a> {
    data: &'a mut [f32],
}

impl<'a> WindowMut<'a> {
    pub fn new(data: &'a mut [f32]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn read(&self, i: usize) -> f32 {
        Window::new(&*self.data).read(i)
    }

    /// Write field `i`. Panics if `i` lies outside the record.
    #[inline]
    pub fn write(&mut self, i: usize, value: f32) {
        assert!(
            i < self.data.len(),
            "packed field {} out of range for record of size {}",
            i,
            self.data.len()
        );
        self.data[i] = value;
    }

    #[inline]
    pub fn write_vec3(&mut self, i: usize, v: Vec3) {
        self.write(i, v.x);
        self.write(i + 1, v.y);
        self.write(i + 2, v.z);
    }

    #[inline]
    pub fn write_slot(&mut self, i: usize, slot: usize) {
        self.write(i, slot as f32);
    }
}

/// A decoded reference to one record.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a, K> {
    pub kind: K,
    pub slot: usize,
    pub window: Window<'a>,
}

/// Fixed-capacity arena of typed records.
#[derive(Debug, Clone)]
pub struct ObjectStore<K: RecordKind> {
    arena: Vec<f32>,
    filled: usize,
    kinds: Vec<K>,
    offsets: Vec<usize>,
    type_ids: Vec<u32>,
}

impl<K: RecordKind> ObjectStore<K> {
    /// Create a store with room for `capacity` floats.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            arena: vec![0.0; capacity],
            filled: 0,
            kinds: Vec::new(),
            offsets: Vec::new(),
            type_ids: Vec::new(),
        }
    }

    /// Allocate a record at the tail of the arena and populate it from `config`.
    ///
    /// Returns the new record's slot index. Fails without touching the
    /// store if the record does not fit.
    pub fn allocate<C>(&mut self, config: &C) -> StoreResult<usize>
    where
        C: RecordConfig<Kind = K>,
    {
        let kind = config.kind();
        let size = kind.size();
        if self.filled + size > self.arena.len() {
            return Err(StoreError::Overflow {
                family: K::FAMILY,
                requested: size,
                filled: self.filled,
                capacity: self.arena.len(),
            });
        }

        let slot = self.kinds.len();
        let offset = self.filled;
        self.filled += size;
        self.kinds.push(kind);
        self.offsets.push(offset);
        self.type_ids.push(kind.type_id());

        config.apply(&mut WindowMut::new(&mut self.arena[offset..offset + size]));

        log::debug!(
            "Allocated {} {:?} in slot {} ({}/{} floats)",
            K::FAMILY,
            kind,
            slot,
            self.filled,
            self.arena.len()
        );
        Ok(slot)
    }

    /// Look up a record by slot.
    pub fn get(&self, slot: usize) -> StoreResult<Record<'_, K>> {
        let (kind, offset) = self.locate(slot)?;
        Ok(Record {
            kind,
            slot,
            window: Window::new(&self.arena[offset..offset + kind.size()]),
        })
    }

    /// Mutable access to a record's window.
    pub fn get_mut(&mut self, slot: usize) -> StoreResult<(K, WindowMut<'_>)> {
        let (kind, offset) = self.locate(slot)?;
        Ok((kind, WindowMut::new(&mut self.arena[offset..offset + kind.size()])))
    }

    fn locate(&self, slot: usize) -> StoreResult<(K, usize)> {
        match (self.kinds.get(slot), self.offsets.get(slot)) {
            (Some(&kind), Some(&offset)) => Ok((kind, offset)),
            _ => Err(StoreError::SlotOutOfRange {
                family: K::FAMILY,
                slot,
                len: self.kinds.len(),
            }),
        }
    }

    /// The raw float arena, including unused capacity past [`Self::filled`].
    pub fn arena(&self) -> &[f32] {
        &self.arena
    }

    /// Number of floats in use.
    pub fn filled(&self) -> usize {
        self.filled
    }

    pub fn capacity(&self) -> usize {
        self.arena.len()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Type id of every record, in slot order.
    pub fn type_ids(&self) -> &[u32] {
        &self.type_ids
    }

    /// Borrow the store as a read-only view for evaluation.
    pub fn view(&self) -> StoreView<'_, K> {
        StoreView {
            arena: &self.arena[..self.filled],
            kinds: Cow::Borrowed(&self.kinds),
            offsets: Cow::Borrowed(&self.offsets),
        }
    }
}

/// Read-only view over a store's records.
///
/// Either borrowed from an [`ObjectStore`] or rebuilt from raw buffers.
#[derive(Debug, Clone)]
pub struct StoreView<'a, K: RecordKind> {
    arena: &'a [f32],
    kinds: Cow<'a, [K]>,
    offsets: Cow<'a, [usize]>,
}

impl<'a, K: RecordKind> StoreView<'a, K> {
    /// Reinterpret raw buffers as a store.
    ///
    /// Record offsets are recovered by summing the sizes implied by each
    /// type id, so `type_ids` alone determines the layout of `arena`.
    pub fn from_raw(arena: &'a [f32], filled: usize, type_ids: &[u32]) -> StoreResult<Self> {
        let mut kinds = Vec::with_capacity(type_ids.len());
        let mut offsets = Vec::with_capacity(type_ids.len());
        let mut cursor = 0;

        for (slot, &type_id) in type_ids.iter().enumerate() {
            let kind = K::from_type_id(type_id).ok_or(StoreError::UnknownTypeId {
                family: K::FAMILY,
                slot,
                type_id,
            })?;
            kinds.push(kind);
            offsets.push(cursor);
            cursor += kind.size();
        }

        let available = filled.min(arena.len());
        if cursor > available {
            return Err(StoreError::Truncated {
                family: K::FAMILY,
                needed: cursor,
                available,
            });
        }

        Ok(Self {
            arena: &arena[..cursor],
            kinds: Cow::Owned(kinds),
            offsets: Cow::Owned(offsets),
        })
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Record at `slot`, or `None` if out of range.
    pub fn get(&self, slot: usize) -> Option<Record<'a, K>> {
        let kind = *self.kinds.get(slot)?;
        let offset = *self.offsets.get(slot)?;
        let arena: &'a [f32] = self.arena;
        Some(Record {
            kind,
            slot,
            window: Window::new(&arena[offset..offset + kind.size()]),
        })
    }

    /// Iterate records in slot order.
    pub fn iter(&self) -> impl Iterator<Item = Record<'a, K>> + '_ {
        (0..self.len()).filter_map(move |slot| self.get(slot))
    }
}
