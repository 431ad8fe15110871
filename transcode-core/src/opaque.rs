//! Caller-owned user data carried through coders untouched.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An optional tag a caller attaches to a media unit.
///
/// The engine never looks inside; it only clones the handle when a unit is
/// referenced and moves it from inputs to the outputs they produce.
#[derive(Clone)]
pub struct Opaque(Arc<dyn Any + Send + Sync>);

impl Opaque {
    /// Wrap a value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the value if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Check whether two tags are the same allocation.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Opaque(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downcast() {
        let tag = Opaque::new(42u64);
        assert_eq!(tag.downcast_ref::<u64>(), Some(&42));
        assert!(tag.downcast_ref::<u32>().is_none());
        assert!(Opaque::ptr_eq(&tag, &tag.clone()));
    }
}
