//! Parameter automation primitive
//!
//! Every audible control change in the engine (master gain, dry/wet
//! mixes, fades on transport transitions) goes through a `ParamRamp`
//! so that values move in short linear segments instead of steps,
//! which would otherwise produce clicks and pops.

/// Default ramp length in milliseconds for control changes.
pub const DEFAULT_RAMP_MS: f32 = 10.0;

/// A control value that moves linearly toward a target.
///
/// The ramp is advanced once per audio frame via [`ParamRamp::next`].
/// Retargeting mid-ramp restarts the segment from the *current* value,
/// so rapid repeated calls are last-call-wins: there is no queue of
/// pending ramps.
#[derive(Debug, Clone)]
pub struct ParamRamp {
    current: f32,
    target: f32,
    step: f32,
    remaining: u32,
}

impl ParamRamp {
    /// Create a ramp settled at `initial`.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            step: 0.0,
            remaining: 0,
        }
    }

    /// Schedule a linear ramp from the current value to `target` over
    /// `ramp_frames` audio frames. Zero frames snaps immediately.
    pub fn set_target(&mut self, target: f32, ramp_frames: u32) {
        if ramp_frames == 0 {
            self.snap(target);
            return;
        }
        self.target = target;
        self.step = (target - self.current) / ramp_frames as f32;
        self.remaining = ramp_frames;
    }

    /// Schedule a ramp expressed in milliseconds at the given sample rate.
    pub fn set_target_ms(&mut self, target: f32, ramp_ms: f32, sample_rate: u32) {
        let frames = ((ramp_ms / 1000.0) * sample_rate as f32).round() as u32;
        self.set_target(target, frames.max(1));
    }

    /// Jump to `value` without ramping.
    pub fn snap(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.step = 0.0;
        self.remaining = 0;
    }

    /// Advance by one frame and return the value for that frame.
    #[inline]
    pub fn next(&mut self) -> f32 {
        if self.remaining > 0 {
            self.current += self.step;
            self.remaining -= 1;
            if self.remaining == 0 {
                // Land exactly on target, avoiding float drift
                self.current = self.target;
            }
        }
        self.current
    }

    /// Current value without advancing.
    pub fn value(&self) -> f32 {
        self.current
    }

    /// Final value of the ramp in flight (or the settled value).
    pub fn target(&self) -> f32 {
        self.target
    }

    /// True when no ramp is in flight.
    pub fn is_settled(&self) -> bool {
        self.remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settles_on_target() {
        let mut ramp = ParamRamp::new(0.0);
        ramp.set_target(1.0, 10);

        for _ in 0..10 {
            ramp.next();
        }

        assert!(ramp.is_settled());
        assert_eq!(ramp.value(), 1.0);
    }

    #[test]
    fn monotonic_while_ramping() {
        let mut ramp = ParamRamp::new(0.2);
        ramp.set_target(0.9, 50);

        let mut prev = ramp.value();
        for _ in 0..50 {
            let v = ramp.next();
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn retarget_starts_from_current_value() {
        let mut ramp = ParamRamp::new(0.0);
        ramp.set_target(1.0, 100);

        for _ in 0..50 {
            ramp.next();
        }
        let midpoint = ramp.value();
        assert!((midpoint - 0.5).abs() < 0.02);

        // Last-call-wins: the new segment begins at the midpoint
        ramp.set_target(0.0, 10);
        let first = ramp.next();
        assert!(first < midpoint);
        for _ in 0..9 {
            ramp.next();
        }
        assert_eq!(ramp.value(), 0.0);
    }

    #[test]
    fn snap_cancels_ramp() {
        let mut ramp = ParamRamp::new(0.0);
        ramp.set_target(1.0, 100);
        ramp.next();

        ramp.snap(0.3);
        assert!(ramp.is_settled());
        assert_eq!(ramp.next(), 0.3);
    }

    #[test]
    fn ms_conversion() {
        let mut ramp = ParamRamp::new(0.0);
        ramp.set_target_ms(1.0, 10.0, 44100);

        // 10ms at 44.1kHz is 441 frames
        for _ in 0..440 {
            ramp.next();
        }
        assert!(!ramp.is_settled());
        ramp.next();
        assert!(ramp.is_settled());
    }
}
