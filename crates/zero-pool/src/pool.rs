use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use crossbeam_queue::SegQueue;

/// Node slots per slab. The original source has no fixed slab size (its
/// `ScopedPtrTraits` specializations call straight into a general
/// allocator); this port batches allocation into fixed slabs, matching
/// the spec's "2 MiB slabs, bump-pointer allocation" contract.
const SLAB_LEN: usize = 512;

/// One fixed-size arena. `cursor` is a bump pointer local to this slab —
/// keeping it per-slab rather than pool-wide means a thread still holding
/// a stale `current` pointer from before a slab swap can only ever run
/// its `fetch_add` past `SLAB_LEN` on the old slab and fall through to
/// `install_next_slab` again, never reusing a slot some other thread has
/// already handed out.
struct Slab<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    cursor: AtomicU32,
}

impl<T> Slab<T> {
    fn new() -> Self {
        let slots = (0..SLAB_LEN)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            slots,
            cursor: AtomicU32::new(0),
        }
    }

    fn slot_ptr(&self, index: usize) -> NonNull<T> {
        // SAFETY: `index` is always checked against `SLAB_LEN` by the
        // caller before this is called.
        let cell = &self.slots[index];
        NonNull::new(cell.get() as *mut T).expect("slab slot pointer is never null")
    }
}

/// A process-wide allocator for one node type. Released slots are reused
/// through a lock-free free list; new slots come from a bump pointer
/// into the current slab, with slab installation races resolved by a CAS
/// on `current` rather than any lock. Slabs are never returned to the
/// allocator for the life of the process (matching the original's
/// "allocate, never free the backing store" trade-off), which is also
/// what makes leaking them via `Box::leak` sound.
pub struct Pool<T> {
    free_list: SegQueue<NonNull<T>>,
    current: AtomicPtr<Slab<T>>,
}

// SAFETY: `Pool<T>` only ever hands out `NonNull<T>` pointers into boxed
// slabs it owns for as long as the pool is alive (it never shrinks), and
// access to each slot is synchronized through `Handle<T>`'s unique
// ownership, so sharing the pool itself across threads is sound as long
// as `T: Send`.
unsafe impl<T: Send> Sync for Pool<T> {}
unsafe impl<T: Send> Send for Pool<T> {}

impl<T> Pool<T> {
    pub fn new() -> Self {
        let first: *mut Slab<T> = Box::leak(Box::new(Slab::new()));
        Self {
            free_list: SegQueue::new(),
            current: AtomicPtr::new(first),
        }
    }

    /// Acquires an uninitialized slot, writes `value` into it, and
    /// returns an owning pointer. Reuses a released slot if the free
    /// list is non-empty; otherwise bumps the current slab's cursor,
    /// installing a fresh slab if it is exhausted.
    pub fn acquire(&self, value: T) -> NonNull<T> {
        if let Some(ptr) = self.free_list.pop() {
            // SAFETY: pointers on the free list were released via
            // `release`, which ran the previous value's destructor in
            // place; the slot is valid but uninitialized memory.
            unsafe { ptr.as_ptr().write(value) };
            return ptr;
        }

        loop {
            let slab_ptr = self.current.load(Ordering::Acquire);
            // SAFETY: slabs are leaked, never freed, so `slab_ptr` stays
            // valid for the life of the pool.
            let slab = unsafe { &*slab_ptr };
            let index = slab.cursor.fetch_add(1, Ordering::AcqRel) as usize;
            if index < SLAB_LEN {
                let ptr = slab.slot_ptr(index);
                // SAFETY: each `index` below `SLAB_LEN` is handed out to
                // exactly one `fetch_add` caller, so no two acquirers
                // ever write the same slot.
                unsafe { ptr.as_ptr().write(value) };
                return ptr;
            }
            self.install_next_slab(slab_ptr);
        }
    }

    /// Installs a new slab as `current` if no other thread already did
    /// so since `observed` was read. Loses the race gracefully: the
    /// thread that lost drops its freshly allocated slab and retries
    /// against whichever slab won.
    fn install_next_slab(&self, observed: *mut Slab<T>) {
        if self.current.load(Ordering::Acquire) != observed {
            return;
        }
        let new_slab: *mut Slab<T> = Box::leak(Box::new(Slab::new()));
        if self
            .current
            .compare_exchange(observed, new_slab, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            // SAFETY: this slab was never installed and no pointer into
            // it was ever handed out, so reclaiming it here is sound.
            unsafe { drop(Box::from_raw(new_slab)) };
        }
    }

    /// Runs `T`'s destructor in place and returns the slot to the free
    /// list for reuse.
    ///
    /// # Safety
    /// `ptr` must have been returned by `acquire` on this pool and must
    /// not be used again (including by another call to `release`) after
    /// this call.
    pub unsafe fn release(&self, ptr: NonNull<T>) {
        std::ptr::drop_in_place(ptr.as_ptr());
        self.free_list.push(ptr);
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_then_release_reuses_the_slot() {
        let pool: Pool<u32> = Pool::new();
        let a = pool.acquire(1);
        unsafe { pool.release(a) };
        let b = pool.acquire(2);
        assert_eq!(a, b);
        unsafe { pool.release(b) };
    }

    #[test]
    fn allocates_past_a_single_slab() {
        let pool: Pool<u32> = Pool::new();
        let mut ptrs = Vec::new();
        for i in 0..(SLAB_LEN * 2 + 3) {
            ptrs.push(pool.acquire(i as u32));
        }
        for (i, ptr) in ptrs.iter().enumerate() {
            unsafe { assert_eq!(*ptr.as_ptr(), i as u32) };
        }
        for ptr in ptrs {
            unsafe { pool.release(ptr) };
        }
    }

    #[test]
    fn concurrent_acquisition_never_hands_out_the_same_slot_twice() {
        use std::collections::HashSet;
        use std::sync::Arc;
        use std::thread;

        let pool: Arc<Pool<u32>> = Arc::new(Pool::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    (0..(SLAB_LEN / 4))
                        .map(|i| pool.acquire((t * 1000 + i) as u32).as_ptr() as usize)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for ptr in h.join().unwrap() {
                assert!(seen.insert(ptr), "the same slot was handed out twice");
            }
        }
    }
}
