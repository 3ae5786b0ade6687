use std::{mem, sync::Arc};

use parking_lot::RwLock;

use crate::{
    id::Id,
    identity::IdentityManager,
    resource::Resource,
    storage::{InvalidId, Storage},
};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RegistryReport {
    /// Number of slots in the backing storage, live or vacant.
    pub num_allocated: usize,
    /// Number of ids the user still holds at least one reference to.
    pub num_kept_from_user: usize,
    /// Number of ids the user has released for good.
    pub num_released_from_user: usize,
    pub element_size: usize,
}

impl RegistryReport {
    pub fn is_empty(&self) -> bool {
        self.num_kept_from_user == 0
    }
}

/// Registry is the primary holder of each object type.
///
/// Every object is stored behind an `Arc`, and the registry holds one of
/// those `Arc`s for as long as the id has external references. Releasing the
/// last external reference removes the object from the registry, but the
/// object itself may live on if another object still refers to it, such as a
/// bind group keeping its buffers alive.
#[derive(Debug)]
pub struct Registry<T: Resource> {
    identity: IdentityManager<T::Marker>,
    storage: RwLock<Storage<T>>,
}

impl<T: Resource> Registry<T> {
    pub(crate) fn new() -> Self {
        Self {
            identity: IdentityManager::new(),
            storage: RwLock::new(Storage::new()),
        }
    }

    fn insert_locked(&self, storage: &mut Storage<T>, value: Arc<T>) -> Id<T::Marker> {
        let id = self.identity.alloc();
        value.info().set_id(Some(id.into_raw()));
        storage.insert(id, value);
        id
    }

    /// Register a new object, with a single external reference.
    pub(crate) fn register(&self, value: T) -> (Id<T::Marker>, Arc<T>) {
        let value = Arc::new(value);
        let id = self.insert_locked(&mut self.storage.write(), value.clone());
        (id, value)
    }

    /// Hand out an external reference to an object that already exists.
    ///
    /// If the object is still registered under a live id, that id gains a
    /// reference and is returned. Otherwise the object is registered again
    /// under a fresh id.
    pub(crate) fn acquire(&self, value: &Arc<T>) -> Id<T::Marker> {
        let mut storage = self.storage.write();

        if let Some(raw) = value.info().id() {
            let id = Id::from_raw(raw);

            if let Ok(existing) = storage.get(id) {
                if Arc::ptr_eq(existing, value) && storage.add_ref(id).is_ok() {
                    return id;
                }
            }
        }

        self.insert_locked(&mut storage, value.clone())
    }

    pub(crate) fn get(&self, id: Id<T::Marker>) -> Result<Arc<T>, InvalidId> {
        self.storage.read().get(id).cloned()
    }

    pub(crate) fn contains(&self, id: Id<T::Marker>) -> bool {
        self.storage.read().contains(id)
    }

    pub(crate) fn add_ref(&self, id: Id<T::Marker>) -> Result<(), InvalidId> {
        self.storage.write().add_ref(id)?;
        Ok(())
    }

    /// Drop one external reference.
    ///
    /// Returns the object when the last reference was dropped. The id is freed
    /// at that point and will never be valid again.
    pub(crate) fn release(&self, id: Id<T::Marker>) -> Result<Option<Arc<T>>, InvalidId> {
        let value = self.storage.write().release(id)?;

        if let Some(value) = &value {
            value.info().set_id(None);
            self.identity.free(id);
        }

        Ok(value)
    }

    #[cfg(test)]
    pub(crate) fn refs(&self, id: Id<T::Marker>) -> Result<u32, InvalidId> {
        self.storage.read().refs(id)
    }

    /// Remove every object, returning them so they can be dropped outside of
    /// the lock.
    pub(crate) fn clear(&self) -> Vec<Arc<T>> {
        let mut storage = self.storage.write();
        let ids = storage.iter().map(|(id, _)| id).collect::<Vec<_>>();
        let mut values = Vec::with_capacity(ids.len());

        for id in ids {
            while let Ok(value) = storage.release(id) {
                if let Some(value) = value {
                    value.info().set_id(None);
                    self.identity.free(id);
                    values.push(value);
                    break;
                }
            }
        }

        values
    }

    pub fn generate_report(&self) -> RegistryReport {
        let storage = self.storage.read();
        let (num_kept_from_user, num_released_from_user) = self.identity.counts();

        RegistryReport {
            num_allocated: storage.len(),
            num_kept_from_user,
            num_released_from_user,
            element_size: mem::size_of::<T>(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.storage.read().kind()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::Registry;
    use crate::resource::{Resource, ResourceInfo};

    #[derive(Debug)]
    struct TestData {
        info: ResourceInfo,
    }

    impl Resource for TestData {
        type Marker = ();
        const TYPE: &'static str = "Test";

        fn info(&self) -> &ResourceInfo {
            &self.info
        }
    }

    fn data() -> TestData {
        TestData {
            info: ResourceInfo::new(None, false),
        }
    }

    #[test]
    fn release_frees_on_last_reference() {
        let registry = Registry::<TestData>::new();
        let (id, _) = registry.register(data());

        registry.add_ref(id).unwrap();
        assert!(registry.release(id).unwrap().is_none());
        assert!(registry.release(id).unwrap().is_some());
        assert_eq!(registry.release(id).unwrap_err().kind, "Test");

        let report = registry.generate_report();
        assert_eq!(report.num_kept_from_user, 0);
        assert_eq!(report.num_released_from_user, 1);
    }

    #[test]
    fn acquire_reuses_live_id() {
        let registry = Registry::<TestData>::new();
        let (id, value) = registry.register(data());

        assert_eq!(registry.acquire(&value), id);
        assert_eq!(registry.refs(id).unwrap(), 2);

        registry.release(id).unwrap();
        registry.release(id).unwrap();
        assert!(!registry.contains(id));

        let again = registry.acquire(&value);
        assert_ne!(again, id);
        assert!(Arc::ptr_eq(&registry.get(again).unwrap(), &value));
    }

    #[test]
    fn registry() {
        let registry = Registry::<TestData>::new();
        std::thread::scope(|s| {
            for _ in 0..5 {
                s.spawn(|| {
                    for _ in 0..1000 {
                        let (id, _) = registry.register(data());
                        registry.release(id).unwrap();
                    }
                });
            }
        });

        assert!(registry.generate_report().is_empty());
    }
}
