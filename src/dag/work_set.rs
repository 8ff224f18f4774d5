// src/dag/work_set.rs

//! Insertion-ordered navigable set used as the scheduler's ready queue.
//!
//! Elements are ordered by the stamp they received when they were added, not
//! by their value. Entries live in an arena addressed by slot index; two
//! indexes point into it:
//!
//! - `by_stamp`: stamp -> slot, the total order;
//! - `by_element`: element -> slot, membership and navigation anchors.
//!
//! Both indexes are only ever changed by `insert_entry` and `detach`, so they
//! cannot drift apart. The set is not synchronized; the owner serializes
//! access (the [`Scheduler`](crate::dag::Scheduler) owns it by value).

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, btree_map};
use std::fmt;
use std::hash::Hash;
use std::ops::Bound;

use crate::errors::WorkSetError;

/// An element paired with its order stamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedEntry<E> {
    element: E,
    stamp: u64,
}

impl<E> OrderedEntry<E> {
    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn stamp(&self) -> u64 {
        self.stamp
    }
}

/// Navigable set ordered by insertion.
///
/// The next stamp is one past the greatest stamp currently present, so stamps
/// are strictly increasing among surviving entries. Stamps freed at the tail
/// (by `poll_last`, `remove` of the last element, or `clear`) are reused.
#[derive(Clone)]
pub struct OrderedWorkSet<E> {
    slots: Vec<Option<OrderedEntry<E>>>,
    free: Vec<usize>,
    by_stamp: BTreeMap<u64, usize>,
    by_element: HashMap<E, usize>,
}

impl<E> Default for OrderedWorkSet<E> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            by_stamp: BTreeMap::new(),
            by_element: HashMap::new(),
        }
    }
}

impl<E: Clone + Eq + Hash> OrderedWorkSet<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_stamp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_stamp.is_empty()
    }

    pub fn contains(&self, element: &E) -> bool {
        self.by_element.contains_key(element)
    }

    /// Current order stamp of `element`, if present.
    pub fn stamp_of(&self, element: &E) -> Option<u64> {
        let slot = *self.by_element.get(element)?;
        self.entry_at(slot).map(OrderedEntry::stamp)
    }

    /// Insert `element` after every present element.
    ///
    /// Returns `false` and leaves the set untouched if it is already present.
    pub fn add(&mut self, element: E) -> bool {
        if self.by_element.contains_key(&element) {
            return false;
        }
        let stamp = self.next_stamp();
        self.insert_entry(element, stamp);
        true
    }

    /// Returns `false` if `element` was not present.
    pub fn remove(&mut self, element: &E) -> bool {
        match self.by_element.get(element).copied() {
            Some(slot) => self.detach(slot).is_some(),
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.by_stamp.clear();
        self.by_element.clear();
    }

    /// Earliest inserted surviving element.
    pub fn first(&self) -> Result<&E, WorkSetError> {
        self.by_stamp
            .first_key_value()
            .and_then(|(_, &slot)| self.element_at(slot))
            .ok_or(WorkSetError::Empty)
    }

    /// Latest inserted surviving element.
    pub fn last(&self) -> Result<&E, WorkSetError> {
        self.by_stamp
            .last_key_value()
            .and_then(|(_, &slot)| self.element_at(slot))
            .ok_or(WorkSetError::Empty)
    }

    pub fn poll_first(&mut self) -> Result<E, WorkSetError> {
        let slot = match self.by_stamp.first_key_value() {
            Some((_, &slot)) => slot,
            None => return Err(WorkSetError::Empty),
        };
        self.detach(slot)
            .map(|entry| entry.element)
            .ok_or(WorkSetError::Empty)
    }

    pub fn poll_last(&mut self) -> Result<E, WorkSetError> {
        let slot = match self.by_stamp.last_key_value() {
            Some((_, &slot)) => slot,
            None => return Err(WorkSetError::Empty),
        };
        self.detach(slot)
            .map(|entry| entry.element)
            .ok_or(WorkSetError::Empty)
    }

    /// Greatest element ordered strictly before `element`.
    pub fn lower(&self, element: &E) -> Result<Option<&E>, WorkSetError> {
        let stamp = self.require_stamp(element)?;
        Ok(self.first_in(self.by_stamp.range(..stamp).next_back()))
    }

    /// Greatest element ordered at or before `element`.
    pub fn floor(&self, element: &E) -> Result<Option<&E>, WorkSetError> {
        let stamp = self.require_stamp(element)?;
        Ok(self.first_in(self.by_stamp.range(..=stamp).next_back()))
    }

    /// Least element ordered at or after `element`.
    pub fn ceiling(&self, element: &E) -> Result<Option<&E>, WorkSetError> {
        let stamp = self.require_stamp(element)?;
        Ok(self.first_in(self.by_stamp.range(stamp..).next()))
    }

    /// Least element ordered strictly after `element`.
    pub fn higher(&self, element: &E) -> Result<Option<&E>, WorkSetError> {
        let stamp = self.require_stamp(element)?;
        Ok(self.first_in(
            self.by_stamp
                .range((Bound::Excluded(stamp), Bound::Unbounded))
                .next(),
        ))
    }

    /// Elements in insertion order.
    pub fn iter(&self) -> Iter<'_, E> {
        Iter {
            slots: &self.slots,
            order: self.by_stamp.values(),
        }
    }

    /// Elements in reverse insertion order. Stamps are left untouched.
    pub fn descending_iter(&self) -> std::iter::Rev<Iter<'_, E>> {
        self.iter().rev()
    }

    /// Snapshot of the elements in reverse insertion order.
    pub fn descending_set(&self) -> Self {
        self.descending_iter().cloned().collect()
    }

    pub fn to_vec(&self) -> Vec<E> {
        self.iter().cloned().collect()
    }

    /// Snapshot of the elements ordered between `from` and `to`.
    ///
    /// The returned set is independent of `self`.
    pub fn sub_set(
        &self,
        from: &E,
        from_inclusive: bool,
        to: &E,
        to_inclusive: bool,
    ) -> Result<Self, WorkSetError> {
        let low = self.require_stamp(from)?;
        let high = self.require_stamp(to)?;
        if low > high {
            return Err(WorkSetError::InvalidRange);
        }
        if low == high && !(from_inclusive && to_inclusive) {
            return Ok(Self::new());
        }
        Ok(self.snapshot((bound(low, from_inclusive), bound(high, to_inclusive))))
    }

    /// Snapshot of the elements ordered before `to`.
    pub fn head_set(&self, to: &E, inclusive: bool) -> Result<Self, WorkSetError> {
        let high = self.require_stamp(to)?;
        Ok(self.snapshot((Bound::Unbounded, bound(high, inclusive))))
    }

    /// Snapshot of the elements ordered after `from`.
    pub fn tail_set(&self, from: &E, inclusive: bool) -> Result<Self, WorkSetError> {
        let low = self.require_stamp(from)?;
        Ok(self.snapshot((bound(low, inclusive), Bound::Unbounded)))
    }

    /// Ordering by current stamp, for generic ordered-collection algorithms.
    ///
    /// Elements that are not present order after every present element.
    pub fn comparator(&self) -> impl Fn(&E, &E) -> Ordering + '_ {
        move |a, b| match (self.stamp_of(a), self.stamp_of(b)) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    /// Strict variant of [`comparator`](Self::comparator): both elements must be present.
    pub fn compare(&self, a: &E, b: &E) -> Result<Ordering, WorkSetError> {
        Ok(self.require_stamp(a)?.cmp(&self.require_stamp(b)?))
    }

    /// `true` iff every element of `items` is present.
    pub fn contains_all<'a>(&self, items: impl IntoIterator<Item = &'a E>) -> bool
    where
        E: 'a,
    {
        items.into_iter().all(|element| self.contains(element))
    }

    /// Add every element of `items`.
    ///
    /// Returns `true` iff at least one element was newly inserted.
    pub fn add_all(&mut self, items: impl IntoIterator<Item = E>) -> bool {
        let mut changed = false;
        for element in items {
            if self.add(element) {
                changed = true;
            }
        }
        changed
    }

    /// Not supported: the ready queue is only changed element by element.
    pub fn retain_all<'a>(
        &mut self,
        _items: impl IntoIterator<Item = &'a E>,
    ) -> Result<bool, WorkSetError>
    where
        E: 'a,
    {
        Err(WorkSetError::Unsupported("retain_all"))
    }

    /// Not supported: the ready queue is only changed element by element.
    pub fn remove_all<'a>(
        &mut self,
        _items: impl IntoIterator<Item = &'a E>,
    ) -> Result<bool, WorkSetError>
    where
        E: 'a,
    {
        Err(WorkSetError::Unsupported("remove_all"))
    }

    /// Check that both indexes describe the same set of entries.
    #[doc(hidden)]
    pub fn is_consistent(&self) -> bool {
        if self.by_stamp.len() != self.by_element.len() {
            return false;
        }
        let occupied = self.slots.iter().filter(|slot| slot.is_some()).count();
        if occupied != self.by_stamp.len() {
            return false;
        }
        self.by_stamp.iter().all(|(&stamp, &slot)| match self.entry_at(slot) {
            Some(entry) => {
                entry.stamp == stamp && self.by_element.get(&entry.element) == Some(&slot)
            }
            None => false,
        })
    }

    fn next_stamp(&self) -> u64 {
        self.by_stamp
            .last_key_value()
            .map_or(0, |(&stamp, _)| stamp + 1)
    }

    fn insert_entry(&mut self, element: E, stamp: u64) {
        let entry = OrderedEntry {
            element: element.clone(),
            stamp,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };
        self.by_stamp.insert(stamp, slot);
        self.by_element.insert(element, slot);
    }

    fn detach(&mut self, slot: usize) -> Option<OrderedEntry<E>> {
        let entry = self.slots.get_mut(slot)?.take()?;
        self.by_stamp.remove(&entry.stamp);
        self.by_element.remove(&entry.element);
        self.free.push(slot);
        Some(entry)
    }

    fn require_stamp(&self, element: &E) -> Result<u64, WorkSetError> {
        self.stamp_of(element).ok_or(WorkSetError::NotPresent)
    }

    fn entry_at(&self, slot: usize) -> Option<&OrderedEntry<E>> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    fn element_at(&self, slot: usize) -> Option<&E> {
        self.entry_at(slot).map(OrderedEntry::element)
    }

    fn first_in(&self, hit: Option<(&u64, &usize)>) -> Option<&E> {
        hit.and_then(|(_, &slot)| self.element_at(slot))
    }

    fn snapshot(&self, range: (Bound<u64>, Bound<u64>)) -> Self {
        self.by_stamp
            .range(range)
            .filter_map(|(_, &slot)| self.element_at(slot).cloned())
            .collect()
    }
}

fn bound(stamp: u64, inclusive: bool) -> Bound<u64> {
    if inclusive {
        Bound::Included(stamp)
    } else {
        Bound::Excluded(stamp)
    }
}

/// Iterator over an [`OrderedWorkSet`] in insertion order.
pub struct Iter<'a, E> {
    slots: &'a [Option<OrderedEntry<E>>],
    order: btree_map::Values<'a, u64, usize>,
}

impl<'a, E> Iter<'a, E> {
    fn resolve(&self, slot: usize) -> Option<&'a E> {
        self.slots
            .get(slot)
            .and_then(Option::as_ref)
            .map(|entry| &entry.element)
    }
}

impl<'a, E> Iterator for Iter<'a, E> {
    type Item = &'a E;

    fn next(&mut self) -> Option<&'a E> {
        let slot = *self.order.next()?;
        self.resolve(slot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl<E> DoubleEndedIterator for Iter<'_, E> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let slot = *self.order.next_back()?;
        self.resolve(slot)
    }
}

impl<E> ExactSizeIterator for Iter<'_, E> {}

impl<'a, E: Clone + Eq + Hash> IntoIterator for &'a OrderedWorkSet<E> {
    type Item = &'a E;
    type IntoIter = Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<E: Clone + Eq + Hash> FromIterator<E> for OrderedWorkSet<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut set = Self::new();
        set.add_all(iter);
        set
    }
}

impl<E: Clone + Eq + Hash> Extend<E> for OrderedWorkSet<E> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        self.add_all(iter);
    }
}

impl<E: Clone + Eq + Hash + fmt::Debug> fmt::Debug for OrderedWorkSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
