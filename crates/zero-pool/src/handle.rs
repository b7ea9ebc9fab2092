use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::Pooled;

/// A move-only owning pointer into a [`crate::Pool`], grounded on the
/// original source's `ScopedPtr<T, Traits>`. Cloning deep-copies the
/// pointee through the pool; dropping runs the pointee's destructor and
/// returns the slot for reuse.
pub struct Handle<T: Pooled + 'static> {
    ptr: NonNull<T>,
}

impl<T: Pooled + 'static> Handle<T> {
    pub fn new(value: T) -> Self {
        let ptr = T::pool().acquire(value);
        Self { ptr }
    }

    /// Pointer-identity comparison, distinct from the pointee's own
    /// `PartialEq` (which compares values).
    pub fn ptr_eq(&self, other: &Handle<T>) -> bool {
        self.ptr == other.ptr
    }
}

impl<T: Pooled> Deref for Handle<T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: `ptr` was acquired from `T::pool()` and is kept alive
        // and uniquely owned by this `Handle` until `Drop`.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: Pooled> DerefMut for Handle<T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: see `Deref`; unique ownership gives exclusive access.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: Pooled + Clone> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Handle::new((**self).clone())
    }
}

impl<T: Pooled + 'static> Drop for Handle<T> {
    fn drop(&mut self) {
        // SAFETY: `ptr` was acquired from `T::pool()` by this `Handle`
        // and is released exactly once, here.
        unsafe { T::pool().release(self.ptr) };
    }
}

impl<T: Pooled + PartialEq> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl<T: Pooled + Eq> Eq for Handle<T> {}

impl<T: Pooled + Hash> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (**self).hash(state)
    }
}

impl<T: Pooled + fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (**self).fmt(f)
    }
}

// SAFETY: a `Handle<T>` uniquely owns its pointee, so it can be sent
// across threads whenever `T` can.
unsafe impl<T: Pooled + Send> Send for Handle<T> {}
unsafe impl<T: Pooled + Sync> Sync for Handle<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Pool;
    use std::sync::OnceLock;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Sample(u32);

    impl Pooled for Sample {
        fn pool() -> &'static Pool<Self> {
            static POOL: OnceLock<Pool<Sample>> = OnceLock::new();
            POOL.get_or_init(Pool::new)
        }
    }

    #[test]
    fn deref_gives_pointee_access() {
        let h = Handle::new(Sample(42));
        assert_eq!(*h, Sample(42));
    }

    #[test]
    fn clone_deep_copies() {
        let a = Handle::new(Sample(1));
        let b = a.clone();
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn ptr_eq_distinguishes_identity_from_value() {
        let a = Handle::new(Sample(7));
        let b = Handle::new(Sample(7));
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
        assert!(a.ptr_eq(&a));
    }
}
