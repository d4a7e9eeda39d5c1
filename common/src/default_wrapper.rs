//! A wrapper that allows values to be moved out from behind mutable
//! references by swapping in the type's default value

use std::{
    mem,
    ops::{Deref, DerefMut},
};

/// A wrapper around a defaultable value that may be taken by replacing it
/// with the default
///
/// Useful for startup structs that hold channel receivers until a worker
/// thread takes ownership of them
#[derive(Clone, Debug)]
pub struct DefaultWrapper<T: Default>(T);

impl<T: Default> DefaultWrapper<T> {
    /// Construct a new wrapper around the given value
    pub fn new(inner: T) -> Self {
        Self(inner)
    }

    /// Take ownership of the wrapped value, leaving the default in its place
    pub fn take(&mut self) -> T {
        mem::take(&mut self.0)
    }

    /// Replace the wrapped value, returning the previous value
    pub fn replace(&mut self, inner: T) -> T {
        mem::replace(&mut self.0, inner)
    }

    /// Consume the wrapper, returning the wrapped value
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Default> Default for DefaultWrapper<T> {
    fn default() -> Self {
        Self(T::default())
    }
}

impl<T: Default> Deref for DefaultWrapper<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Default> DerefMut for DefaultWrapper<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// A default wrapper around an optional value, the most common use of the
/// wrapper
pub type DefaultOption<T> = DefaultWrapper<Option<T>>;

/// Wrap a value in a `DefaultOption`
pub fn default_option<T>(inner: T) -> DefaultOption<T> {
    DefaultWrapper::new(Some(inner))
}

#[cfg(test)]
mod test {
    use super::{DefaultWrapper, default_option};

    /// Tests taking a value out of the wrapper
    #[test]
    fn test_take_leaves_default() {
        let mut wrapper = default_option(42u64);
        assert_eq!(wrapper.take(), Some(42));
        assert_eq!(wrapper.take(), None);
    }

    /// Tests replacing a wrapped value
    #[test]
    fn test_replace_returns_previous() {
        let mut wrapper = DefaultWrapper::new(1u64);
        assert_eq!(wrapper.replace(2), 1);
        assert_eq!(wrapper.into_inner(), 2);
    }
}
