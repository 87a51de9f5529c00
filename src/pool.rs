//! Fixed-capacity particle pools.
//!
//! All three particle effects allocate their slots once at startup and never
//! grow. They share the [`ParticleSystem`] interface so the frame simulator
//! can tick them uniformly, and they publish positions through a
//! [`PointBuffer`] whose storage the renderer reads directly.
//!
//! | Pool | Slot lifecycle |
//! |------|----------------|
//! | [`HoverPool`] | explicit active/inactive, spawned on demand |
//! | [`PetalRain`](crate::petals::PetalRain) | always active, recycled by height |
//! | [`FireflySwarm`](crate::fireflies::FireflySwarm) | always active, never recycled |

use glam::Vec3;

use crate::config::{HoverSettings, PaletteSettings};
use crate::instances::Category;
use crate::spawn::SpawnRng;

/// Per-frame values every pool may need.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// Elapsed seconds since start.
    pub time: f32,
    /// Seconds since the previous frame.
    pub delta: f32,
    /// Frame number, starting at 1 for the first step.
    pub frame: u64,
}

/// Common interface of the pooled particle effects.
pub trait ParticleSystem {
    /// Fixed number of slots.
    fn capacity(&self) -> usize;

    /// Slots currently contributing to the effect.
    fn live_count(&self) -> usize;

    /// Advance every slot by one frame.
    fn tick(&mut self, frame: &FrameContext, rng: &mut SpawnRng);
}

/// Flat position (and optional colour) storage shared with the renderer.
#[derive(Debug, Clone)]
pub struct PointBuffer {
    positions: Vec<Vec3>,
    colors: Option<Vec<Vec3>>,
    dirty: bool,
}

impl PointBuffer {
    /// Buffer of `len` points, all at `fill`.
    pub fn new(len: usize, fill: Vec3) -> Self {
        Self {
            positions: vec![fill; len],
            colors: None,
            dirty: true,
        }
    }

    /// Same as [`PointBuffer::new`] with a per-point colour array.
    pub fn with_colors(len: usize, fill: Vec3) -> Self {
        Self {
            positions: vec![fill; len],
            colors: Some(vec![Vec3::ZERO; len]),
            dirty: true,
        }
    }

    /// Build from existing positions.
    pub fn from_positions(positions: Vec<Vec3>) -> Self {
        Self {
            positions,
            colors: None,
            dirty: true,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [Vec3] {
        self.dirty = true;
        &mut self.positions
    }

    pub fn colors(&self) -> Option<&[Vec3]> {
        self.colors.as_deref()
    }

    #[inline]
    pub fn set_position(&mut self, index: usize, position: Vec3) {
        self.positions[index] = position;
        self.dirty = true;
    }

    #[inline]
    pub fn set_color(&mut self, index: usize, color: Vec3) {
        if let Some(colors) = &mut self.colors {
            colors[index] = color;
            self.dirty = true;
        }
    }

    /// Whether the contents changed since the last upload.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force a re-upload on the next present.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Acknowledge an upload.
    #[inline]
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

/// Mutable state of one sparkle slot. Position and colour live in the
/// pool's [`PointBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HoverSlot {
    pub active: bool,
    /// Remaining normalized lifetime.
    pub life: f32,
    /// Whole ticks until the slot is freed.
    pub ticks_left: usize,
    pub velocity: Vec3,
}

/// Sparkles emitted by swelling flowers.
///
/// Free slots are kept on a stack, so spawning is O(1). The stack starts in
/// reverse index order, making slot 0 the first one handed out. When every
/// slot is busy a spawn request is dropped without error.
#[derive(Debug, Clone)]
pub struct HoverPool {
    slots: Vec<HoverSlot>,
    free: Vec<usize>,
    points: PointBuffer,
    settings: HoverSettings,
    primary_color: Vec3,
    secondary_color: Vec3,
}

impl HoverPool {
    /// Allocate the pool with every slot inactive and parked off screen.
    pub fn new(settings: &HoverSettings, palette: &PaletteSettings) -> Self {
        let capacity = settings.capacity;
        Self {
            slots: vec![HoverSlot::default(); capacity],
            free: (0..capacity).rev().collect(),
            points: PointBuffer::with_colors(capacity, hidden(settings)),
            settings: settings.clone(),
            primary_color: palette.primary_sparkle,
            secondary_color: palette.secondary_sparkle,
        }
    }

    /// Activate a free slot near `origin`.
    ///
    /// Returns the slot index, or `None` if the pool is exhausted.
    pub fn spawn(&mut self, origin: Vec3, category: Category, rng: &mut SpawnRng) -> Option<usize> {
        let index = self.free.pop()?;
        let s = &self.settings;

        let position = Vec3::new(
            origin.x + rng.jitter(s.jitter),
            origin.y + rng.random(),
            origin.z + rng.jitter(s.jitter),
        );
        let color = match category {
            Category::Primary => self.primary_color,
            Category::Secondary => self.secondary_color,
        };
        let velocity = Vec3::new(
            rng.jitter(s.drift),
            rng.random_range(s.rise_min, s.rise_max),
            rng.jitter(s.drift),
        );

        self.slots[index] = HoverSlot {
            active: true,
            life: 1.0,
            ticks_left: lifetime_ticks(s.decay),
            velocity,
        };
        self.points.set_position(index, position);
        self.points.set_color(index, color);
        Some(index)
    }

    /// State of one slot.
    pub fn slot(&self, index: usize) -> &HoverSlot {
        &self.slots[index]
    }

    /// Positions and colours for the renderer.
    pub fn points(&self) -> &PointBuffer {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut PointBuffer {
        &mut self.points
    }

    /// Number of frames a sparkle lives at most.
    pub fn max_lifetime_frames(&self) -> usize {
        lifetime_ticks(self.settings.decay)
    }
}

impl ParticleSystem for HoverPool {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn live_count(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    // Decay is per call, not scaled by the frame delta.
    fn tick(&mut self, _frame: &FrameContext, _rng: &mut SpawnRng) {
        let decay = self.settings.decay;
        let parked = hidden(&self.settings);
        let mut changed = false;

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !slot.active {
                continue;
            }
            changed = true;
            slot.life -= decay;
            slot.ticks_left = slot.ticks_left.saturating_sub(1);
            // Freed after exactly `lifetime_ticks(decay)` calls
            if slot.ticks_left == 0 {
                slot.active = false;
                self.points.positions[index].y = parked.y;
                self.free.push(index);
            } else {
                self.points.positions[index] += slot.velocity;
            }
        }

        if changed {
            self.points.mark_dirty();
        }
    }
}

/// Ticks for `life` to fall from 1 to 0 at `decay` per tick.
fn lifetime_ticks(decay: f32) -> usize {
    (1.0 / decay).ceil().max(1.0) as usize
}

fn hidden(settings: &HoverSettings) -> Vec3 {
    Vec3::new(0.0, settings.hidden_y, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(capacity: usize) -> HoverPool {
        let settings = HoverSettings {
            capacity,
            ..HoverSettings::default()
        };
        HoverPool::new(&settings, &PaletteSettings::default())
    }

    fn frame() -> FrameContext {
        FrameContext { time: 0.0, delta: 1.0 / 60.0, frame: 1 }
    }

    #[test]
    fn test_first_spawn_uses_slot_zero() {
        let mut pool = pool(4);
        let mut rng = SpawnRng::new(Some(0));
        assert_eq!(pool.spawn(Vec3::ZERO, Category::Primary, &mut rng), Some(0));
        assert_eq!(pool.spawn(Vec3::ZERO, Category::Primary, &mut rng), Some(1));
    }

    #[test]
    fn test_exhausted_pool_drops_spawns() {
        let mut pool = pool(8);
        let mut rng = SpawnRng::new(Some(0));
        let spawned = (0..13)
            .filter_map(|_| pool.spawn(Vec3::ZERO, Category::Secondary, &mut rng))
            .count();
        assert_eq!(spawned, 8);
        assert_eq!(pool.live_count(), 8);
        assert_eq!(pool.capacity(), 8);
    }

    #[test]
    fn test_spawn_sets_palette_and_upward_velocity() {
        let mut pool = pool(2);
        let mut rng = SpawnRng::new(Some(1));
        let a = pool.spawn(Vec3::new(10.0, 2.0, -3.0), Category::Primary, &mut rng).unwrap();
        let b = pool.spawn(Vec3::ZERO, Category::Secondary, &mut rng).unwrap();

        let colors = pool.points().colors().unwrap();
        assert_eq!(colors[a], Vec3::new(1.0, 0.2, 0.5));
        assert_eq!(colors[b], Vec3::new(1.0, 0.9, 0.5));

        let slot = pool.slot(a);
        assert!(slot.active);
        assert_eq!(slot.life, 1.0);
        assert!(slot.velocity.y >= 0.1 && slot.velocity.y < 0.25);
        assert!(slot.velocity.x.abs() <= 0.05);

        let p = pool.points().positions()[a];
        assert!((p.x - 10.0).abs() <= 0.5);
        assert!(p.y >= 2.0 && p.y < 3.0);
        assert!((p.z + 3.0).abs() <= 0.5);
    }

    #[test]
    fn test_life_decreases_and_slot_is_recycled() {
        let mut pool = pool(1);
        let mut rng = SpawnRng::new(Some(2));
        let index = pool.spawn(Vec3::ZERO, Category::Primary, &mut rng).unwrap();
        let limit = pool.max_lifetime_frames();

        let mut last_life = pool.slot(index).life;
        let mut ticks = 0;
        while pool.slot(index).active {
            pool.tick(&frame(), &mut rng);
            ticks += 1;
            if pool.slot(index).active {
                assert!(pool.slot(index).life < last_life);
                last_life = pool.slot(index).life;
            }
            assert!(ticks <= limit, "sparkle outlived {limit} ticks");
        }

        assert_eq!(ticks, limit);
        assert_eq!(pool.points().positions()[index].y, -500.0);
        assert_eq!(pool.live_count(), 0);
        assert_eq!(pool.spawn(Vec3::ZERO, Category::Primary, &mut rng), Some(index));
    }

    #[test]
    fn test_default_sparkle_lives_fifty_ticks() {
        let mut pool = pool(1);
        let mut rng = SpawnRng::new(Some(4));
        let index = pool.spawn(Vec3::ZERO, Category::Secondary, &mut rng).unwrap();
        assert_eq!(pool.max_lifetime_frames(), 50);

        for _ in 0..49 {
            pool.tick(&frame(), &mut rng);
        }
        assert!(pool.slot(index).active);
        assert!(pool.slot(index).life > 0.0);

        pool.tick(&frame(), &mut rng);
        assert!(!pool.slot(index).active);
        assert_eq!(pool.live_count(), 0);
    }

    #[test]
    fn test_lifetime_rounds_partial_ticks_up() {
        assert_eq!(lifetime_ticks(0.02), 50);
        assert_eq!(lifetime_ticks(0.3), 4);
        assert_eq!(lifetime_ticks(2.0), 1);
    }

    #[test]
    fn test_active_sparkle_rises() {
        let mut pool = pool(1);
        let mut rng = SpawnRng::new(Some(3));
        let index = pool.spawn(Vec3::ZERO, Category::Primary, &mut rng).unwrap();
        let before = pool.points().positions()[index];
        pool.tick(&frame(), &mut rng);
        let after = pool.points().positions()[index];
        assert!(after.y > before.y);
    }
}
