/// Stable handle to a value stored in a [`Slab`].
///
/// A key pairs the slot index with the generation the slot had when the
/// value was inserted. Once the value is removed the generation is bumped,
/// so stale keys never alias a newer occupant of the same slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Key {
    pub(crate) index: usize,
    pub(crate) generation: u32,
}

/// A single slot of the slab.
struct Slot<T> {
    /// Incremented every time the slot is vacated.
    generation: u32,
    value: Option<T>,
}

/// A generational arena.
///
/// A `Slab` stores values of type `T` in a contiguous array and hands out
/// [`Key`]s that stay valid until the value is removed. Freed slots are
/// reused, which keeps indices small and dense.
pub(crate) struct Slab<T> {
    /// Storage for items. Vacant slots hold `None`.
    slots: Vec<Slot<T>>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates an empty slab with room for `capacity` values before growing.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Inserts the value built by `f`, which receives the key it will live under.
    ///
    /// Reuses a free slot when one is available, otherwise appends.
    pub(crate) fn insert_with(&mut self, f: impl FnOnce(Key) -> T) -> Key {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                self.slots.len() - 1
            }
        };

        let slot = &mut self.slots[index];
        let key = Key {
            index,
            generation: slot.generation,
        };

        slot.value = Some(f(key));
        self.len += 1;

        key
    }

    /// Returns a mutable reference to the value stored under `key`.
    ///
    /// Returns `None` if the key is stale or was never issued by this slab.
    pub(crate) fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.index)?;

        if slot.generation != key.generation {
            return None;
        }

        slot.value.as_mut()
    }

    /// Removes and returns the value stored under `key`.
    ///
    /// The slot becomes free and its generation is bumped, invalidating
    /// every outstanding copy of `key`.
    pub(crate) fn remove(&mut self, key: Key) -> Option<T> {
        let slot = self.slots.get_mut(key.index)?;

        if slot.generation != key.generation {
            return None;
        }

        let value = slot.value.take()?;

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.len -= 1;

        Some(value)
    }

    /// Number of live values.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Removes every live value and returns them.
    ///
    /// All keys issued so far become stale.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        let mut values = Vec::with_capacity(self.len);

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(value) = slot.value.take() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index);
                values.push(value);
            }
        }

        self.len = 0;
        values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove() {
        let mut slab = Slab::with_capacity(2);

        let a = slab.insert_with(|_| "a");
        let b = slab.insert_with(|_| "b");

        assert_eq!(slab.len(), 2);
        assert_eq!(slab.remove(a), Some("a"));
        assert_eq!(slab.get_mut(b).copied(), Some("b"));
        assert_eq!(slab.len(), 1);
    }

    #[test]
    fn insert_with_sees_its_own_key() {
        let mut slab = Slab::with_capacity(1);

        let key = slab.insert_with(|key| key);

        assert_eq!(slab.get_mut(key).copied(), Some(key));
    }

    #[test]
    fn stale_key_does_not_alias_reused_slot() {
        let mut slab = Slab::with_capacity(1);

        let old = slab.insert_with(|_| 1);
        slab.remove(old);
        let new = slab.insert_with(|_| 2);

        assert_eq!(old.index, new.index);
        assert!(slab.get_mut(old).is_none());
        assert_eq!(slab.remove(old), None);
        assert_eq!(slab.get_mut(new).copied(), Some(2));
    }

    #[test]
    fn drain_empties_and_invalidates() {
        let mut slab = Slab::with_capacity(4);

        let keys: Vec<_> = (0..3).map(|i| slab.insert_with(|_| i)).collect();
        let mut values = slab.drain();
        values.sort();

        assert_eq!(values, vec![0, 1, 2]);
        assert_eq!(slab.len(), 0);
        assert!(keys.iter().all(|key| slab.get_mut(*key).is_none()));
    }
}
