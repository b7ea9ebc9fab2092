//! A slab-backed node pool and the owning [`Handle`] smart pointer built
//! on top of it.
//!
//! Grounded on `Util.hpp`'s `ScopedPtr<T, Traits>` and the seven
//! `ScopedPtrTraits` specializations the original source declares for
//! `Expression`, `Enum`, `Array`, `Tuple`, `Record`, `FunctionType`, and
//! `Type`. Rather than seven hand-written trait specializations, this
//! port uses one generic [`Pool<T>`] and asks each node type to provide
//! its own process-wide singleton through the [`Pooled`] trait.

mod handle;
mod pool;

pub use handle::Handle;
pub use pool::Pool;

/// A type that can be allocated out of a process-wide [`Pool`]. Each
/// concrete AST payload type (in `zero-ast`) implements this once,
/// backed by a `static OnceLock<Pool<Self>>`.
pub trait Pooled: Sized {
    fn pool() -> &'static Pool<Self>;
}
