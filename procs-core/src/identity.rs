use parking_lot::Mutex;

use crate::{
    id::{Id, Marker},
    Epoch, Index,
};
use std::{fmt::Debug, marker::PhantomData};

/// A simple structure to allocate [`Id`] identifiers.
///
/// Calling [`alloc`] returns a fresh, never-before-seen id. Calling [`free`]
/// marks an id as dead; it will never be returned again by `alloc`.
///
/// `IdentityManager` returns `Id`s whose index values are suitable for use as
/// indices into a `Storage<T>` that holds those ids' referents:
///
/// - Every live id has a distinct index value. Each live id's index selects a
///   distinct element in the vector.
///
/// - `IdentityManager` prefers low index numbers. Freed indices are reused,
///   lowest first, before new index values are handed out.
///
/// - A reused index comes back with its epoch bumped, so a stale id never
///   compares equal to the new one. An index whose epoch is exhausted is
///   retired.
///
/// [`alloc`]: IdentityManager::alloc
/// [`free`]: IdentityManager::free
#[derive(Debug, Default)]
struct IdentityValues {
    free: Vec<(Index, Epoch)>,
    next_index: Index,
    /// Number of live ids.
    count: usize,
    /// Number of ids ever freed.
    freed: usize,
}

impl IdentityValues {
    fn alloc(&mut self) -> (Index, Epoch) {
        self.count += 1;

        let lowest = self
            .free
            .iter()
            .enumerate()
            .min_by_key(|(_, &(index, _))| index)
            .map(|(at, _)| at);

        match lowest {
            Some(at) => {
                let (index, epoch) = self.free.swap_remove(at);
                (index, epoch + 1)
            }
            None => {
                let index = self.next_index;
                self.next_index += 1;
                (index, 1)
            }
        }
    }

    fn release(&mut self, index: Index, epoch: Epoch) {
        if epoch < Epoch::MAX {
            self.free.push((index, epoch));
        }

        self.count -= 1;
        self.freed += 1;
    }
}

#[derive(Debug)]
pub(crate) struct IdentityManager<T: Marker> {
    values: Mutex<IdentityValues>,
    _phantom: PhantomData<T>,
}

impl<T: Marker> IdentityManager<T> {
    pub(crate) fn new() -> Self {
        Self {
            values: Mutex::new(IdentityValues::default()),
            _phantom: PhantomData,
        }
    }

    pub(crate) fn alloc(&self) -> Id<T> {
        let (index, epoch) = self.values.lock().alloc();
        Id::zip(index, epoch)
    }

    pub(crate) fn free(&self, id: Id<T>) {
        let (index, epoch) = id.unzip();
        self.values.lock().release(index, epoch);
    }

    /// Returns the number of live ids and the number of ids ever freed.
    pub(crate) fn counts(&self) -> (usize, usize) {
        let values = self.values.lock();
        (values.count, values.freed)
    }
}

#[test]
fn test_epoch_end_of_life() {
    use crate::id;

    let man = IdentityManager::<id::markers::Buffer>::new();
    let id1 = man.alloc();
    assert_eq!(id1.unzip(), (0, 1));
    man.free(id1);
    let id2 = man.alloc();
    // confirm that the epoch 1 is no longer re-used
    assert_eq!(id2.unzip(), (0, 2));
    assert_ne!(id1, id2);
}

#[test]
fn test_lowest_index_first() {
    use crate::id;

    let man = IdentityManager::<id::markers::Texture>::new();
    let ids = (0..4).map(|_| man.alloc()).collect::<Vec<_>>();
    man.free(ids[3]);
    man.free(ids[1]);

    assert_eq!(man.alloc().unzip(), (1, 2));
    assert_eq!(man.alloc().unzip(), (3, 2));
    assert_eq!(man.alloc().unzip(), (4, 1));
    assert_eq!(man.counts(), (5, 2));
}
