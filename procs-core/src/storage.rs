use std::sync::Arc;

use thiserror::Error;

use crate::id::Id;
use crate::resource::Resource;
use crate::Epoch;

/// An entry in a `Storage::map` table.
#[derive(Debug)]
pub(crate) enum Element<T> {
    /// There are no live ids with this index.
    Vacant,

    /// There is one live id with this index, allocated at the given
    /// epoch, and `refs` external references to it.
    Occupied {
        value: Arc<T>,
        epoch: Epoch,
        refs: u32,
    },
}

/// A handle that does not refer to a live object.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind} handle is invalid")]
pub struct InvalidId {
    /// The kind of object the handle was supposed to refer to.
    pub kind: &'static str,
}

/// A table of `T` values indexed by the id type `I`.
///
/// The table is represented as a vector indexed by the ids' index
/// values, so you should use an id allocator like `IdentityManager`
/// that keeps the index values dense and close to zero.
#[derive(Debug)]
pub(crate) struct Storage<T>
where
    T: Resource,
{
    pub(crate) map: Vec<Element<T>>,
}

impl<T> Storage<T>
where
    T: Resource,
{
    pub(crate) fn new() -> Self {
        Self { map: Vec::new() }
    }

    fn invalid() -> InvalidId {
        InvalidId { kind: T::TYPE }
    }

    fn element_mut(&mut self, id: Id<T::Marker>) -> Result<(&Arc<T>, &mut u32), InvalidId> {
        let (index, epoch) = id.unzip();

        match self.map.get_mut(index as usize) {
            Some(Element::Occupied {
                value,
                epoch: storage_epoch,
                refs,
            }) if *storage_epoch == epoch => Ok((value, refs)),
            _ => Err(Self::invalid()),
        }
    }

    pub(crate) fn contains(&self, id: Id<T::Marker>) -> bool {
        self.get(id).is_ok()
    }

    /// Get a reference to an item behind a potentially invalid ID.
    ///
    /// Fails if there is an epoch mismatch, or the entry is empty.
    pub(crate) fn get(&self, id: Id<T::Marker>) -> Result<&Arc<T>, InvalidId> {
        let (index, epoch) = id.unzip();

        match self.map.get(index as usize) {
            Some(Element::Occupied {
                value,
                epoch: storage_epoch,
                ..
            }) if *storage_epoch == epoch => Ok(value),
            _ => Err(Self::invalid()),
        }
    }

    pub(crate) fn insert(&mut self, id: Id<T::Marker>, value: Arc<T>) {
        let (index, epoch) = id.unzip();
        let index = index as usize;

        if index >= self.map.len() {
            self.map.resize_with(index + 1, || Element::Vacant);
        }

        match std::mem::replace(
            &mut self.map[index],
            Element::Occupied {
                value,
                epoch,
                refs: 1,
            },
        ) {
            Element::Vacant => {}
            Element::Occupied {
                epoch: storage_epoch,
                ..
            } => {
                panic!("Index {index:?} of {} is already occupied with epoch {storage_epoch}", T::TYPE);
            }
        }
    }

    /// Add an external reference to a live id, returning the new count.
    pub(crate) fn add_ref(&mut self, id: Id<T::Marker>) -> Result<u32, InvalidId> {
        let (_, refs) = self.element_mut(id)?;
        *refs = refs.saturating_add(1);
        Ok(*refs)
    }

    /// Drop an external reference to a live id.
    ///
    /// Returns the value if this was the last reference, in which case the
    /// slot is vacated.
    pub(crate) fn release(&mut self, id: Id<T::Marker>) -> Result<Option<Arc<T>>, InvalidId> {
        let (_, refs) = self.element_mut(id)?;
        *refs -= 1;

        if *refs > 0 {
            return Ok(None);
        }

        let (index, _) = id.unzip();

        match std::mem::replace(&mut self.map[index as usize], Element::Vacant) {
            Element::Occupied { value, .. } => Ok(Some(value)),
            Element::Vacant => Err(Self::invalid()),
        }
    }

    #[cfg(test)]
    pub(crate) fn refs(&self, id: Id<T::Marker>) -> Result<u32, InvalidId> {
        let (index, epoch) = id.unzip();

        match self.map.get(index as usize) {
            Some(Element::Occupied {
                epoch: storage_epoch,
                refs,
                ..
            }) if *storage_epoch == epoch => Ok(*refs),
            _ => Err(Self::invalid()),
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (Id<T::Marker>, &Arc<T>)> {
        self.map
            .iter()
            .enumerate()
            .filter_map(move |(index, x)| match x {
                Element::Occupied { value, epoch, .. } => {
                    Some((Id::zip(index as crate::Index, *epoch), value))
                }
                _ => None,
            })
    }

    pub(crate) fn kind(&self) -> &'static str {
        T::TYPE
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}
