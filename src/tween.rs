//! Timed value animation with easing curves.
//!
//! A [`Tween`] interpolates from a start value to an end value over a
//! duration. It is advanced explicitly with the frame delta, so the reveal
//! sequence is fully deterministic under a fixed clock.
//!
//! | Ease | Curve |
//! |------|-------|
//! | `Linear` | `t` |
//! | `Power1Out` | `1 - (1-t)²` |
//! | `Power2Out` | `1 - (1-t)³` |
//! | `Power2InOut` | cubic in, cubic out |
//! | `SineInOut` | `-(cos(πt) - 1) / 2` |
//! | `BackIn(s)` / `BackOut(s)` | overshoots by `s` |
//! | `ElasticOut(a, p)` | decaying oscillation with amplitude `a`, period `p` |

use glam::Vec3;
use std::f32::consts::{PI, TAU};

/// Easing curve mapping linear progress in [0, 1] to eased progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ease {
    Linear,
    Power1Out,
    Power2Out,
    Power2InOut,
    SineInOut,
    BackIn(f32),
    BackOut(f32),
    ElasticOut(f32, f32),
}

impl Ease {
    /// Eased progress for `t` (clamped to [0, 1]). Ends map exactly to 0 and 1.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        if t == 0.0 || t == 1.0 {
            return t;
        }
        match self {
            Ease::Linear => t,
            Ease::Power1Out => 1.0 - (1.0 - t).powi(2),
            Ease::Power2Out => 1.0 - (1.0 - t).powi(3),
            Ease::Power2InOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
                }
            }
            Ease::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
            Ease::BackIn(s) => (s + 1.0) * t * t * t - s * t * t,
            Ease::BackOut(s) => {
                let u = t - 1.0;
                1.0 + (s + 1.0) * u * u * u + s * u * u
            }
            Ease::ElasticOut(amplitude, period) => {
                let amplitude = amplitude.max(1.0);
                let omega = TAU / period;
                let shift = period / TAU * (1.0 / amplitude).asin();
                amplitude * 2f32.powf(-10.0 * t) * ((t - shift) * omega).sin() + 1.0
            }
        }
    }
}

/// Values a tween can interpolate.
pub trait Tweenable: Copy {
    fn lerp_to(self, end: Self, t: f32) -> Self;
}

impl Tweenable for f32 {
    fn lerp_to(self, end: Self, t: f32) -> Self {
        self + (end - self) * t
    }
}

impl Tweenable for Vec3 {
    fn lerp_to(self, end: Self, t: f32) -> Self {
        self + (end - self) * t
    }
}

/// Repetition mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// Play once and finish.
    Once,
    /// Forever, alternating direction each cycle.
    YoyoForever,
}

/// Animation of one value.
#[derive(Debug, Clone)]
pub struct Tween<T: Tweenable> {
    start: T,
    end: T,
    duration: f32,
    delay: f32,
    ease: Ease,
    repeat: Repeat,
    elapsed: f32,
    finished: bool,
}

impl<T: Tweenable> Tween<T> {
    pub fn new(start: T, end: T, duration: f32, ease: Ease) -> Self {
        Self {
            start,
            end,
            duration: duration.max(0.0),
            delay: 0.0,
            ease,
            repeat: Repeat::Once,
            elapsed: 0.0,
            finished: false,
        }
    }

    /// Wait `delay` seconds before starting.
    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay.max(0.0);
        self
    }

    /// Swing back and forth between start and end forever.
    pub fn yoyo_forever(mut self) -> Self {
        self.repeat = Repeat::YoyoForever;
        self
    }

    /// Advance by `delta` seconds.
    ///
    /// Returns `true` on the single call during which the tween completes.
    /// Infinite tweens never complete.
    pub fn advance(&mut self, delta: f32) -> bool {
        if self.finished {
            return false;
        }
        self.elapsed += delta.max(0.0);
        if self.repeat == Repeat::Once && self.elapsed >= self.delay + self.duration {
            self.finished = true;
            return true;
        }
        false
    }

    /// Current interpolated value.
    pub fn value(&self) -> T {
        self.start.lerp_to(self.end, self.ease.apply(self.progress()))
    }

    /// Linear progress of the current cycle in [0, 1].
    pub fn progress(&self) -> f32 {
        if self.finished {
            return 1.0;
        }
        let active = self.elapsed - self.delay;
        if active <= 0.0 {
            return 0.0;
        }
        if self.duration <= 0.0 {
            return 1.0;
        }
        match self.repeat {
            Repeat::Once => (active / self.duration).min(1.0),
            Repeat::YoyoForever => {
                let cycle = (active / self.duration).floor() as u64;
                let local = (active % self.duration) / self.duration;
                if cycle % 2 == 0 {
                    local
                } else {
                    1.0 - local
                }
            }
        }
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EASES: [Ease; 8] = [
        Ease::Linear,
        Ease::Power1Out,
        Ease::Power2Out,
        Ease::Power2InOut,
        Ease::SineInOut,
        Ease::BackIn(1.5),
        Ease::BackOut(1.7),
        Ease::ElasticOut(1.0, 0.5),
    ];

    #[test]
    fn test_eases_hit_endpoints() {
        for ease in EASES {
            assert_eq!(ease.apply(0.0), 0.0, "{ease:?}");
            assert_eq!(ease.apply(1.0), 1.0, "{ease:?}");
        }
    }

    #[test]
    fn test_power2_inout_is_symmetric() {
        let e = Ease::Power2InOut;
        assert!((e.apply(0.5) - 0.5).abs() < 1e-6);
        assert!((e.apply(0.25) + e.apply(0.75) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_back_out_overshoots() {
        let peak = (1..100).map(|i| Ease::BackOut(1.7).apply(i as f32 / 100.0)).fold(0.0, f32::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn test_back_in_dips_below_zero() {
        assert!(Ease::BackIn(1.5).apply(0.2) < 0.0);
    }

    #[test]
    fn test_elastic_out_oscillates_around_one() {
        let e = Ease::ElasticOut(1.0, 0.5);
        assert!(e.apply(0.3) > 1.0 || e.apply(0.55) > 1.0);
        assert!((e.apply(0.95) - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_tween_completes_once() {
        let mut tween = Tween::new(0.0_f32, 10.0, 1.0, Ease::Linear);
        assert!(!tween.advance(0.5));
        assert!((tween.value() - 5.0).abs() < 1e-6);
        assert!(tween.advance(0.6));
        assert!(!tween.advance(0.1));
        assert_eq!(tween.value(), 10.0);
        assert!(tween.is_finished());
    }

    #[test]
    fn test_delay_holds_start() {
        let mut tween = Tween::new(Vec3::ZERO, Vec3::ONE, 2.0, Ease::BackOut(1.7)).with_delay(0.5);
        tween.advance(0.4);
        assert_eq!(tween.value(), Vec3::ZERO);
        assert!(!tween.advance(2.0));
        assert!(tween.advance(0.2));
        assert_eq!(tween.value(), Vec3::ONE);
    }

    #[test]
    fn test_yoyo_never_finishes_and_swings_back() {
        let mut tween = Tween::new(-5.0_f32, -3.5, 2.0, Ease::SineInOut).yoyo_forever();
        assert!(!tween.advance(2.0));
        assert!((tween.value() - -5.0).abs() < 1e-4 || (tween.value() - -3.5).abs() < 1e-4);
        tween.advance(1.0);
        assert!((tween.value() - -4.25).abs() < 1e-4);
        for _ in 0..1000 {
            assert!(!tween.advance(0.1));
        }
        assert!(!tween.is_finished());
    }

    #[test]
    fn test_zero_duration_jumps_to_end() {
        let mut tween = Tween::new(1.0_f32, 2.0, 0.0, Ease::Linear);
        assert!(tween.advance(0.0));
        assert_eq!(tween.value(), 2.0);
    }
}
