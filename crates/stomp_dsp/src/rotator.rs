//! Algorithm Rotator
//!
//! Fixed ordered catalog plus one atomic index. Rotation wraps in both
//! directions and may be driven from any thread while the processing thread
//! reads the active entry.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::DspError;

/// Circular selector over an immutable catalog
#[derive(Debug)]
pub struct Rotator<T> {
    items: Vec<T>,
    index: AtomicUsize,
}

impl<T> Rotator<T> {
    /// Create a rotator positioned on the first entry
    ///
    /// An empty catalog is a configuration error.
    pub fn new(items: Vec<T>) -> Result<Self, DspError> {
        if items.is_empty() {
            return Err(DspError::EmptyCatalog);
        }
        Ok(Self {
            items,
            index: AtomicUsize::new(0),
        })
    }

    /// Step forward and return the newly active entry
    pub fn next(&self) -> &T {
        let len = self.items.len();
        self.rotate(|i| (i + 1) % len)
    }

    /// Step backward and return the newly active entry
    pub fn prev(&self) -> &T {
        let len = self.items.len();
        self.rotate(|i| if i == 0 { len - 1 } else { i - 1 })
    }

    /// Active entry
    #[inline]
    pub fn current(&self) -> &T {
        &self.items[self.index()]
    }

    /// Active position in the catalog
    #[inline]
    pub fn index(&self) -> usize {
        self.index.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn rotate(&self, step: impl Fn(usize) -> usize) -> &T {
        let mut current = self.index.load(Ordering::Acquire);
        loop {
            let next = step(current);
            match self
                .index
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return &self.items[next],
                Err(actual) => current = actual,
            }
        }
    }
}
