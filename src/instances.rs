//! Instance store: placed flowers and the two render batches they live in.
//!
//! Every [`PlacedInstance`] belongs to exactly one [`Category`] and occupies
//! one fixed slot of that category's [`InstanceBatch`]. Position, yaw and
//! category never change after placement; only the eased scale is updated
//! each frame.

use glam::{EulerRot, Mat4, Quat, Vec2, Vec3};

use crate::config::{SwaySettings, SwellSettings};
use crate::spawn::SpawnRng;

/// Which silhouette a point falls into and therefore which batch renders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Inside the heart (red flowers).
    Primary,
    /// Outside the heart (white flowers).
    Secondary,
}

impl Category {
    /// Both categories in batch order.
    pub const ALL: [Category; 2] = [Category::Primary, Category::Secondary];

    /// Batch index of this category.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Category::Primary => 0,
            Category::Secondary => 1,
        }
    }
}

/// A dense, fixed-capacity array of instance transforms sharing one material.
///
/// Slots `0..visible()` are occupied; the renderer draws exactly that many.
#[derive(Debug, Clone)]
pub struct InstanceBatch {
    transforms: Vec<Mat4>,
    visible: usize,
    dirty: bool,
}

impl InstanceBatch {
    /// Create an empty batch with `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            transforms: vec![Mat4::IDENTITY; capacity],
            visible: 0,
            dirty: true,
        }
    }

    /// Create a batch whose first `count` slots are all occupied.
    pub fn filled(capacity: usize, count: usize) -> Self {
        let mut batch = Self::with_capacity(capacity);
        batch.visible = count.min(capacity);
        batch
    }

    /// Total number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.transforms.len()
    }

    /// Number of occupied slots.
    #[inline]
    pub fn visible(&self) -> usize {
        self.visible
    }

    /// Claim the next free slot. Returns `None` when the batch is full.
    pub fn allocate(&mut self) -> Option<usize> {
        if self.visible >= self.capacity() {
            return None;
        }
        let slot = self.visible;
        self.visible += 1;
        self.dirty = true;
        Some(slot)
    }

    /// Write a transform into an occupied slot.
    #[inline]
    pub fn set(&mut self, slot: usize, transform: Mat4) {
        debug_assert!(slot < self.visible, "slot {slot} is not allocated");
        self.transforms[slot] = transform;
        self.dirty = true;
    }

    /// Transform stored at `slot`.
    #[inline]
    pub fn get(&self, slot: usize) -> Mat4 {
        self.transforms[slot]
    }

    /// Only the occupied slots.
    pub fn visible_transforms(&self) -> &[Mat4] {
        &self.transforms[..self.visible]
    }

    /// Whether the transforms changed since the last upload.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Acknowledge an upload.
    #[inline]
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

/// One procedurally placed flower.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedInstance {
    /// Ground position (x, z).
    pub position: Vec2,
    pub base_scale: f32,
    pub current_scale: f32,
    /// Scale the instance eased toward on its last update.
    pub target_scale: f32,
    /// Fixed yaw offset in radians.
    pub yaw: f32,
    pub category: Category,
    /// Slot within the category's batch.
    pub slot: usize,
}

impl PlacedInstance {
    /// Scale this instance eases toward given the current ground point.
    pub fn swell_target(&self, ground: Option<Vec3>, swell: &SwellSettings) -> f32 {
        if self.is_swelling(ground, swell) {
            self.base_scale * swell.factor
        } else {
            self.base_scale
        }
    }

    /// Whether the ground point lies strictly inside this instance's swell radius.
    #[inline]
    pub fn is_swelling(&self, ground: Option<Vec3>, swell: &SwellSettings) -> bool {
        match ground {
            Some(point) => {
                let d = self.position - Vec2::new(point.x, point.z);
                d.length_squared() < swell.radius * swell.radius
            }
            None => false,
        }
    }
}

/// Per-category occupancy after placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldSummary {
    pub primary: usize,
    pub secondary: usize,
    /// Points discarded because their batch was already full.
    pub dropped: usize,
}

impl FieldSummary {
    /// Total placed instances across both batches.
    pub fn placed(&self) -> usize {
        self.primary + self.secondary
    }
}

/// Input for one per-instance update pass.
#[derive(Debug, Clone, Copy)]
pub struct FieldFrame<'a> {
    /// Elapsed seconds.
    pub time: f32,
    /// Cursor ground point, if there is a meaningful one this frame.
    pub ground: Option<Vec3>,
    pub sway: &'a SwaySettings,
    pub swell: &'a SwellSettings,
}

/// All placed instances plus their two category batches.
#[derive(Debug, Clone)]
pub struct InstanceStore {
    instances: Vec<PlacedInstance>,
    batches: [InstanceBatch; 2],
    height: f32,
    dropped: usize,
}

impl InstanceStore {
    /// Create an empty store whose batches each hold `capacity` slots.
    pub fn new(capacity: usize, height: f32) -> Self {
        Self {
            instances: Vec::with_capacity(capacity),
            batches: [
                InstanceBatch::with_capacity(capacity),
                InstanceBatch::with_capacity(capacity),
            ],
            height,
            dropped: 0,
        }
    }

    /// Place an instance into its category's next free slot.
    ///
    /// Returns `false` (and counts the point as dropped) when that batch is
    /// already full.
    pub fn place(&mut self, position: Vec2, yaw: f32, scale: f32, category: Category) -> bool {
        let batch = &mut self.batches[category.index()];
        let Some(slot) = batch.allocate() else {
            self.dropped += 1;
            return false;
        };
        let instance = PlacedInstance {
            position,
            base_scale: scale,
            current_scale: scale,
            target_scale: scale,
            yaw,
            category,
            slot,
        };
        let transform = compose(self.height, &instance, Vec3::new(0.0, yaw, 0.0));
        batch.set(slot, transform);
        self.instances.push(instance);
        true
    }

    /// All placed instances in placement order.
    pub fn instances(&self) -> &[PlacedInstance] {
        &self.instances
    }

    /// Number of placed instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Whether nothing was placed.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// The batch rendering `category`.
    pub fn batch(&self, category: Category) -> &InstanceBatch {
        &self.batches[category.index()]
    }

    /// Mutable access for the render boundary to acknowledge uploads.
    pub fn batch_mut(&mut self, category: Category) -> &mut InstanceBatch {
        &mut self.batches[category.index()]
    }

    /// Per-category occupancy.
    pub fn summary(&self) -> FieldSummary {
        FieldSummary {
            primary: self.batches[0].visible(),
            secondary: self.batches[1].visible(),
            dropped: self.dropped,
        }
    }

    /// Advance every instance by one frame.
    ///
    /// Applies the wind sway and slow yaw drift, eases the scale toward its
    /// swell target, and rewrites the instance's batch slot. `emit` is called
    /// with a spawn point whenever a swelling instance wins its sparkle roll.
    pub fn update<F>(&mut self, frame: &FieldFrame<'_>, rng: &mut SpawnRng, mut emit: F)
    where
        F: FnMut(Vec3, Category),
    {
        let FieldFrame { time, ground, sway, swell } = *frame;
        let alpha = swell.smoothing;

        for instance in &mut self.instances {
            let wind_x = (time + instance.position.x * sway.spatial_frequency).sin() * sway.amplitude;
            let wind_z = (time + instance.position.y * sway.spatial_frequency).cos() * sway.amplitude;

            instance.target_scale = instance.swell_target(ground, swell);
            if instance.is_swelling(ground, swell) && rng.chance(swell.spawn_chance) {
                emit(
                    Vec3::new(instance.position.x, swell.spawn_height, instance.position.y),
                    instance.category,
                );
            }

            instance.current_scale = instance.current_scale * alpha + instance.target_scale * (1.0 - alpha);

            let euler = Vec3::new(wind_z, instance.yaw + time * sway.yaw_drift, wind_x);
            let transform = compose(self.height, instance, euler);
            self.batches[instance.category.index()].set(instance.slot, transform);
        }
    }
}

/// Build an instance matrix from position, XYZ Euler rotation and uniform scale.
fn compose(height: f32, instance: &PlacedInstance, euler: Vec3) -> Mat4 {
    Mat4::from_scale_rotation_translation(
        Vec3::splat(instance.current_scale),
        Quat::from_euler(EulerRot::XYZ, euler.x, euler.y, euler.z),
        Vec3::new(instance.position.x, height, instance.position.y),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame<'a>(ground: Option<Vec3>, sway: &'a SwaySettings, swell: &'a SwellSettings) -> FieldFrame<'a> {
        FieldFrame { time: 0.0, ground, sway, swell }
    }

    #[test]
    fn test_batch_allocate_until_full() {
        let mut batch = InstanceBatch::with_capacity(2);
        assert_eq!(batch.allocate(), Some(0));
        assert_eq!(batch.allocate(), Some(1));
        assert_eq!(batch.allocate(), None);
        assert_eq!(batch.visible(), 2);
    }

    #[test]
    fn test_place_drops_when_batch_full() {
        let mut store = InstanceStore::new(1, 0.1);
        assert!(store.place(Vec2::ZERO, 0.0, 2.0, Category::Primary));
        assert!(!store.place(Vec2::ONE, 0.0, 2.0, Category::Primary));
        assert!(store.place(Vec2::ONE, 0.0, 2.0, Category::Secondary));

        let summary = store.summary();
        assert_eq!(summary.primary, 1);
        assert_eq!(summary.secondary, 1);
        assert_eq!(summary.dropped, 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_slots_are_sequential_per_category() {
        let mut store = InstanceStore::new(8, 0.1);
        store.place(Vec2::ZERO, 0.0, 2.0, Category::Primary);
        store.place(Vec2::ZERO, 0.0, 2.0, Category::Secondary);
        store.place(Vec2::ZERO, 0.0, 2.0, Category::Primary);
        let slots: Vec<_> = store.instances().iter().map(|i| (i.category, i.slot)).collect();
        assert_eq!(
            slots,
            vec![(Category::Primary, 0), (Category::Secondary, 0), (Category::Primary, 1)]
        );
    }

    #[test]
    fn test_scale_eases_toward_swell_target() {
        let sway = SwaySettings::default();
        let swell = SwellSettings { spawn_chance: 0.0, ..SwellSettings::default() };
        let mut store = InstanceStore::new(4, 0.1);
        store.place(Vec2::ZERO, 0.0, 2.0, Category::Primary);
        let mut rng = SpawnRng::new(Some(0));

        store.update(&frame(Some(Vec3::ZERO), &sway, &swell), &mut rng, |_, _| {});
        // 2.0 * 0.9 + 2.6 * 0.1
        assert!((store.instances()[0].current_scale - 2.06).abs() < 1e-5);

        for _ in 0..200 {
            store.update(&frame(Some(Vec3::ZERO), &sway, &swell), &mut rng, |_, _| {});
        }
        assert!((store.instances()[0].current_scale - 2.6).abs() < 1e-3);

        // Without a ground point the scale relaxes back
        for _ in 0..200 {
            store.update(&frame(None, &sway, &swell), &mut rng, |_, _| {});
        }
        assert!((store.instances()[0].current_scale - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_swell_radius_is_strict() {
        let swell = SwellSettings::default();
        let instance = PlacedInstance {
            position: Vec2::new(25.0, 0.0),
            base_scale: 2.0,
            current_scale: 2.0,
            target_scale: 2.0,
            yaw: 0.0,
            category: Category::Secondary,
            slot: 0,
        };
        assert_eq!(instance.swell_target(Some(Vec3::ZERO), &swell), 2.0);
        assert!((instance.swell_target(Some(Vec3::new(0.5, 0.0, 0.0)), &swell) - 2.6).abs() < 1e-6);
        assert_eq!(instance.swell_target(None, &swell), 2.0);
    }

    #[test]
    fn test_update_records_target_scale() {
        let sway = SwaySettings::default();
        let swell = SwellSettings { spawn_chance: 0.0, ..SwellSettings::default() };
        let mut store = InstanceStore::new(4, 0.1);
        store.place(Vec2::new(0.5, 0.0), 0.0, 2.0, Category::Primary);
        store.place(Vec2::new(40.0, 0.0), 0.0, 1.5, Category::Secondary);
        let mut rng = SpawnRng::new(Some(0));

        store.update(&frame(Some(Vec3::ZERO), &sway, &swell), &mut rng, |_, _| {});
        assert!((store.instances()[0].target_scale - 2.0 * swell.factor).abs() < 1e-6);
        assert_eq!(store.instances()[1].target_scale, 1.5);

        store.update(&frame(None, &sway, &swell), &mut rng, |_, _| {});
        assert_eq!(store.instances()[0].target_scale, 2.0);
    }

    #[test]
    fn test_emits_only_when_swelling() {
        let sway = SwaySettings::default();
        let swell = SwellSettings { spawn_chance: 1.0, ..SwellSettings::default() };
        let mut store = InstanceStore::new(4, 0.1);
        store.place(Vec2::new(1.0, 1.0), 0.0, 2.0, Category::Primary);
        store.place(Vec2::new(100.0, 0.0), 0.0, 2.0, Category::Secondary);
        let mut rng = SpawnRng::new(Some(0));

        let mut emitted = Vec::new();
        store.update(&frame(Some(Vec3::ZERO), &sway, &swell), &mut rng, |p, c| emitted.push((p, c)));
        assert_eq!(emitted, vec![(Vec3::new(1.0, 2.0, 1.0), Category::Primary)]);
    }

    #[test]
    fn test_transform_translation_and_scale() {
        let sway = SwaySettings::default();
        let swell = SwellSettings::default();
        let mut store = InstanceStore::new(1, 0.1);
        store.place(Vec2::new(3.0, -4.0), 1.0, 2.0, Category::Primary);
        let mut rng = SpawnRng::new(Some(0));
        store.update(&frame(None, &sway, &swell), &mut rng, |_, _| {});

        let (scale, _, translation) = store.batch(Category::Primary).get(0).to_scale_rotation_translation();
        assert!((translation - Vec3::new(3.0, 0.1, -4.0)).length() < 1e-5);
        assert!((scale - Vec3::splat(2.0)).length() < 1e-4);
    }
}
