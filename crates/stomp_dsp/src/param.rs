//! Parameter Scheduler
//!
//! A bounded value that can jump immediately or glide toward a goal over a
//! fixed number of processing steps. The processing thread calls
//! [`Parameter::advance`] once per sample; control code may set or adjust the
//! value from any thread at any time.
//!
//! ```text
//!   control thread                     processing thread
//!   set_ramped(0.5, 4410) ──┐      ┌── advance() / advance() / ...
//!                           ▼      ▼
//!                    Mutex<{ current, goal, delta }>
//! ```

use parking_lot::Mutex;

use crate::error::DspError;

#[derive(Debug, Clone, Copy)]
struct State {
    current: f64,
    goal: f64,
    delta: f64,
}

/// A bounded, time-smoothed control value
///
/// `current` always lies in `[min, max]`.
#[derive(Debug)]
pub struct Parameter {
    min: f64,
    max: f64,
    state: Mutex<State>,
}

impl Parameter {
    /// Create a parameter
    ///
    /// # Arguments
    /// * `min` - Lower bound (inclusive)
    /// * `max` - Upper bound (inclusive), must exceed `min`
    /// * `initial` - Starting value, clamped into the bounds
    pub fn new(min: f64, max: f64, initial: f64) -> Result<Self, DspError> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(DspError::InvalidBounds { min, max });
        }
        let initial = initial.clamp(min, max);
        Ok(Self {
            min,
            max,
            state: Mutex::new(State {
                current: initial,
                goal: initial,
                delta: 0.0,
            }),
        })
    }

    #[inline]
    fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    /// Jump to `value` (clamped), cancelling any ramp in progress
    pub fn set_now(&self, value: f64) -> f64 {
        let mut state = self.state.lock();
        self.set_now_locked(&mut state, value)
    }

    fn set_now_locked(&self, state: &mut State, value: f64) -> f64 {
        let value = self.clamp(value);
        state.current = value;
        state.goal = value;
        state.delta = 0.0;
        value
    }

    /// Glide to `target` (clamped) over `steps` calls to [`advance`](Self::advance)
    ///
    /// Returns the clamped goal.
    pub fn set_ramped(&self, target: f64, steps: u32) -> Result<f64, DspError> {
        if steps == 0 {
            return Err(DspError::ZeroRampSteps);
        }
        let mut state = self.state.lock();
        Ok(self.set_ramped_locked(&mut state, target, steps))
    }

    fn set_ramped_locked(&self, state: &mut State, target: f64, steps: u32) -> f64 {
        let goal = self.clamp(target);
        state.goal = goal;
        state.delta = (goal - state.current) / steps as f64;
        goal
    }

    /// Apply `adjust` to the current goal and jump to the result
    ///
    /// `adjust` runs exactly once, while the parameter is locked.
    pub fn adjust_now<F>(&self, adjust: F) -> f64
    where
        F: FnOnce(f64) -> f64,
    {
        let mut state = self.state.lock();
        let value = adjust(state.goal);
        self.set_now_locked(&mut state, value)
    }

    /// Apply `adjust` to the current goal and glide to the result over `steps`
    pub fn adjust_ramped<F>(&self, adjust: F, steps: u32) -> Result<f64, DspError>
    where
        F: FnOnce(f64) -> f64,
    {
        if steps == 0 {
            return Err(DspError::ZeroRampSteps);
        }
        let mut state = self.state.lock();
        let target = adjust(state.goal);
        Ok(self.set_ramped_locked(&mut state, target, steps))
    }

    /// Move one step toward the goal and return the new current value
    ///
    /// # Real-time Safety
    /// No allocations, O(1). Holds the lock only for the update.
    #[inline]
    pub fn advance(&self) -> f64 {
        let mut state = self.state.lock();
        if state.delta != 0.0 {
            state.current += state.delta;
            if (state.current - state.goal).abs() < state.delta.abs() {
                state.current = state.goal;
                state.delta = 0.0;
            }
            // Float drift may carry the value past a bound on the last step
            state.current = self.clamp(state.current);
        }
        state.current
    }

    /// Current value
    #[inline]
    pub fn current(&self) -> f64 {
        self.state.lock().current
    }

    /// Value the parameter is moving toward
    pub fn goal(&self) -> f64 {
        self.state.lock().goal
    }

    /// Whether a ramp is in progress
    pub fn is_ramping(&self) -> bool {
        self.state.lock().delta != 0.0
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_bounds() {
        assert!(matches!(
            Parameter::new(1.0, 1.0, 1.0),
            Err(DspError::InvalidBounds { .. })
        ));
        assert!(Parameter::new(2.0, 1.0, 1.5).is_err());
        assert!(Parameter::new(f64::NAN, 1.0, 0.5).is_err());
    }

    #[test]
    fn test_initial_is_clamped() {
        let p = Parameter::new(0.0, 1.0, 5.0).unwrap();
        assert_eq!(p.current(), 1.0);
    }

    #[test]
    fn test_set_now_holds() {
        let p = Parameter::new(0.1, 100.0, 1.0).unwrap();
        assert_eq!(p.set_now(250.0), 100.0);
        for _ in 0..10 {
            assert_eq!(p.advance(), 100.0);
        }
        assert!(!p.is_ramping());
    }

    #[test]
    fn test_set_ramped_reaches_goal() {
        let p = Parameter::new(0.0, 10.0, 0.0).unwrap();
        assert_eq!(p.set_ramped(4.0, 8).unwrap(), 4.0);

        let mut last = p.current();
        for _ in 0..8 {
            let next = p.advance();
            assert!(next >= last);
            last = next;
        }
        assert_eq!(p.current(), 4.0);
        assert!(!p.is_ramping());

        // Stays put afterwards
        assert_eq!(p.advance(), 4.0);
    }

    #[test]
    fn test_set_ramped_downward_with_awkward_steps() {
        let p = Parameter::new(0.001, 0.999, 0.9).unwrap();
        p.set_ramped(0.1, 7).unwrap();
        let mut last = p.current();
        for _ in 0..7 {
            let next = p.advance();
            assert!(next <= last);
            last = next;
        }
        assert_eq!(p.current(), 0.1);
    }

    #[test]
    fn test_set_ramped_zero_steps() {
        let p = Parameter::new(0.0, 1.0, 0.5).unwrap();
        assert_eq!(p.set_ramped(1.0, 0), Err(DspError::ZeroRampSteps));
        assert_eq!(p.current(), 0.5);
    }

    #[test]
    fn test_set_ramped_clamps_target() {
        let p = Parameter::new(0.0, 1.0, 0.5).unwrap();
        assert_eq!(p.set_ramped(-3.0, 2).unwrap(), 0.0);
        p.advance();
        p.advance();
        assert_eq!(p.current(), 0.0);
    }

    #[test]
    fn test_adjust_applies_to_goal() {
        let p = Parameter::new(0.1, 100.0, 1.0).unwrap();
        p.set_ramped(10.0, 100).unwrap();
        // Goal is 10, not the in-flight current value
        let goal = p.adjust_ramped(|g| g * 2.0, 10).unwrap();
        assert_eq!(goal, 20.0);

        assert_eq!(p.adjust_now(|g| g / 4.0), 5.0);
        assert_eq!(p.current(), 5.0);
    }

    #[test]
    fn test_adjust_runs_once() {
        let p = Parameter::new(0.0, 10.0, 1.0).unwrap();
        let mut calls = 0;
        p.adjust_now(|g| {
            calls += 1;
            g + 1.0
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_concurrent_updates_stay_in_bounds() {
        use std::sync::Arc;
        use std::thread;

        let p = Arc::new(Parameter::new(0.0, 1.0, 0.5).unwrap());
        let writer = {
            let p = Arc::clone(&p);
            thread::spawn(move || {
                for i in 0..1000 {
                    p.set_ramped((i % 7) as f64 / 3.0, 3).unwrap();
                }
            })
        };
        for _ in 0..10_000 {
            let v = p.advance();
            assert!((0.0..=1.0).contains(&v));
        }
        writer.join().unwrap();
    }
}
