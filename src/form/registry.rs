use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use super::values::FieldKey;
use crate::scroll::ElementId;

static FIELD_HANDLE_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldHandleId(pub u64);

impl FieldHandleId {
    pub fn next() -> Self {
        Self(FIELD_HANDLE_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

/// Opaque reference to the element a field is rendered into.
///
/// The render layer attaches the platform element once mounted; the scroll
/// coordinator reads it back when measuring.
#[derive(Clone, Debug)]
pub struct FieldHandle {
    id: FieldHandleId,
    key: FieldKey,
    element: Arc<RwLock<Option<ElementId>>>,
}

impl FieldHandle {
    fn new(key: FieldKey) -> Self {
        Self {
            id: FieldHandleId::next(),
            key,
            element: Arc::new(RwLock::new(None)),
        }
    }

    pub fn id(&self) -> FieldHandleId {
        self.id
    }

    pub fn key(&self) -> &FieldKey {
        &self.key
    }

    pub fn attach(&self, element: ElementId) {
        let mut slot = match self.element.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = Some(element);
    }

    pub fn detach(&self) {
        let mut slot = match self.element.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = None;
    }

    pub fn element(&self) -> Option<ElementId> {
        match self.element.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.element().is_some()
    }
}

impl PartialEq for FieldHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for FieldHandle {}

/// One handle per declared field, fixed for the controller's lifetime.
#[derive(Clone, Debug, Default)]
pub struct FieldRegistry {
    handles: IndexMap<FieldKey, FieldHandle>,
}

impl FieldRegistry {
    pub fn create<'a>(keys: impl IntoIterator<Item = &'a FieldKey>) -> Self {
        let handles = keys
            .into_iter()
            .map(|key| (key.clone(), FieldHandle::new(key.clone())))
            .collect();
        Self { handles }
    }

    pub fn get(&self, key: &str) -> Option<&FieldHandle> {
        self.handles.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldHandle> {
        self.handles.values()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
