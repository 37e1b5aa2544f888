//! Windowed Batch Buffer
//!
//! Adapts arbitrarily sized batches to a transform that only accepts
//! fixed-size windows. Each call:
//!
//! ```text
//!   batch: [ head ........ | window | window | ... | tail ]
//!            │                 │                     │
//!            ▼                 ▼                     ▼
//!   (a) completes the      (b) run directly     (c) held back for
//!       pending window         from the batch       the next call
//! ```
//!
//! Concatenated output is identical however the input stream is chunked.

use crate::error::DspError;

/// A block algorithm that needs exactly `window_size` samples at a time
pub trait WindowTransform: Send {
    /// Transform one full window in place
    fn transform(&mut self, window: &mut [i16]);
}

impl<F> WindowTransform for F
where
    F: FnMut(&mut [i16]) + Send,
{
    fn transform(&mut self, window: &mut [i16]) {
        self(window)
    }
}

/// Reshapes batches into windows for a [`WindowTransform`]
pub struct WindowedBuffer<T> {
    window_size: usize,
    pending: Vec<i16>,
    transform: T,
}

impl<T: WindowTransform> WindowedBuffer<T> {
    pub fn new(window_size: usize, transform: T) -> Result<Self, DspError> {
        if window_size == 0 {
            return Err(DspError::InvalidWindowSize(window_size));
        }
        Ok(Self {
            window_size,
            pending: Vec::with_capacity(window_size),
            transform,
        })
    }

    /// Feed a batch and collect every window it completes
    pub fn process(&mut self, batch: &[i16]) -> Vec<i16> {
        let mut output = Vec::with_capacity(batch.len() + self.pending.len());
        let mut rest = batch;

        // (a) top up the pending window
        if !self.pending.is_empty() {
            let needed = self.window_size - self.pending.len();
            if rest.len() < needed {
                self.pending.extend_from_slice(rest);
                return output;
            }
            let (head, tail) = rest.split_at(needed);
            self.pending.extend_from_slice(head);
            self.transform.transform(&mut self.pending);
            output.append(&mut self.pending);
            rest = tail;
        }

        // (b) whole windows straight from the batch
        let whole = rest.len() - rest.len() % self.window_size;
        let (windows, tail) = rest.split_at(whole);
        let start = output.len();
        output.extend_from_slice(windows);
        for window in output[start..].chunks_exact_mut(self.window_size) {
            self.transform.transform(window);
        }

        // (c) keep the remainder
        self.pending.extend_from_slice(tail);
        output
    }

    /// Number of samples waiting for a full window
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    pub fn transform_mut(&mut self) -> &mut T {
        &mut self.transform
    }

    /// Drop any partially collected window
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
