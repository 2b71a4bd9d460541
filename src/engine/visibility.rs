// Directional surface visibility.
//
// Each room surface fades out when it faces away from the camera so the
// viewer always looks into the room instead of at its outer shell:
//
//   d = dot(surface_normal, camera_direction)
//   d >  visible            → opacity 1
//   hidden < d <= visible   → linear fade
//   d <= hidden             → opacity 0
//
// Meshes bound to a surface are shown iff its opacity is > 0 (never faded).
// The recompute itself lives in systems::visibility_system.

use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};

// ============================================================================
// THRESHOLDS
// ============================================================================

/// Pair of dot-product cutoffs for one surface category.
///
/// Zero (orthogonal) would be the textbook cutoff but looks wrong with the
/// isometric rig, hence the slightly negative, hand-tuned values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibilityThreshold {
    /// Above this the surface is fully opaque.
    pub visible: f32,
    /// At or below this the surface is fully hidden.
    pub hidden: f32,
}

impl VisibilityThreshold {
    pub const WALLS: Self = Self { visible: -0.12, hidden: -0.135 };
    pub const FLOOR: Self = Self { visible: -0.045, hidden: -0.06 };
    pub const CEILING: Self = Self { visible: -0.07, hidden: -0.085 };

    /// True when both cutoffs are finite and `hidden < visible`.
    pub fn is_valid(&self) -> bool {
        self.visible.is_finite() && self.hidden.is_finite() && self.hidden < self.visible
    }
}

/// three.js `MathUtils.mapLinear`: maps `x` from `[a1, a2]` onto `[b1, b2]`.
pub fn map_linear(x: f32, a1: f32, a2: f32, b1: f32, b2: f32) -> f32 {
    b1 + (x - a1) * (b2 - b1) / (a2 - a1)
}

/// Opacity of a surface with outward `normal` seen along `camera_direction`.
///
/// Always in `[0, 1]`. A collapsed band (`visible <= hidden`) degrades to a
/// hard cut at `visible` instead of dividing by zero.
pub fn surface_opacity(normal: Vec3, camera_direction: Vec3, threshold: VisibilityThreshold) -> f32 {
    let d = normal.dot(camera_direction);

    if d > threshold.visible {
        return 1.0;
    }
    if threshold.visible <= threshold.hidden {
        return 0.0;
    }

    map_linear(d, threshold.hidden, threshold.visible, 0.0, 1.0).clamp(0.0, 1.0)
}

// ============================================================================
// SURFACES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceCategory {
    Walls,
    Floor,
    Ceiling,
}

/// The six logical room surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    WallNorth,
    WallSouth,
    WallEast,
    WallWest,
    Floor,
    Ceiling,
}

impl SurfaceKind {
    pub const ALL: [SurfaceKind; 6] = [
        SurfaceKind::WallNorth,
        SurfaceKind::WallSouth,
        SurfaceKind::WallEast,
        SurfaceKind::WallWest,
        SurfaceKind::Floor,
        SurfaceKind::Ceiling,
    ];

    pub fn category(self) -> SurfaceCategory {
        match self {
            SurfaceKind::Floor => SurfaceCategory::Floor,
            SurfaceKind::Ceiling => SurfaceCategory::Ceiling,
            _ => SurfaceCategory::Walls,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SurfaceKind::WallNorth => "wall_north",
            SurfaceKind::WallSouth => "wall_south",
            SurfaceKind::WallEast => "wall_east",
            SurfaceKind::WallWest => "wall_west",
            SurfaceKind::Floor => "floor",
            SurfaceKind::Ceiling => "ceiling",
        }
    }

    /// Hidden reference plane the surface normal is read from.
    ///
    /// The authored wall meshes carry inconsistent rotations, so the normals
    /// come from these fixed planes instead. North is +X, east is +Z.
    pub fn reference_plane(self) -> ReferencePlane {
        let rotation = match self {
            SurfaceKind::WallEast => Quat::IDENTITY,
            SurfaceKind::WallWest => Quat::from_rotation_y(PI),
            SurfaceKind::WallSouth => Quat::from_rotation_y(-FRAC_PI_2),
            SurfaceKind::WallNorth => Quat::from_rotation_y(FRAC_PI_2),
            SurfaceKind::Ceiling => Quat::from_rotation_x(-FRAC_PI_2),
            SurfaceKind::Floor => Quat::from_rotation_x(FRAC_PI_2),
        };
        ReferencePlane::new(rotation)
    }
}

/// Invisible plane with a fixed orientation. Its facing is local +Z in world
/// space, the same convention as `Object3D.getWorldDirection`.
#[derive(Debug, Clone, Copy)]
pub struct ReferencePlane {
    rotation: Quat,
}

impl ReferencePlane {
    pub fn new(rotation: Quat) -> Self {
        Self { rotation }
    }

    pub fn world_direction(&self) -> Vec3 {
        (self.rotation * Vec3::Z).normalize()
    }
}

/// Unit outward normal of a surface. Captured once when the room is
/// spawned and never written again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceNormal(Vec3);

impl SurfaceNormal {
    pub fn from_reference(plane: &ReferencePlane) -> Self {
        Self(plane.world_direction())
    }

    pub fn get(&self) -> Vec3 {
        self.0
    }
}

/// Surface → material + dependent meshes.
///
/// Lives on the same entity as the surface's `SurfaceMaterial`. `targets`
/// are the mesh entities whose `Visible` flag follows `opacity > 0`. The
/// normal and threshold are fixed at construction.
#[derive(Component, Debug, Clone)]
pub struct SurfaceBinding {
    pub kind: SurfaceKind,
    pub targets: Vec<Entity>,
    normal: SurfaceNormal,
    threshold: VisibilityThreshold,
}

impl SurfaceBinding {
    pub fn new(
        kind: SurfaceKind,
        normal: SurfaceNormal,
        threshold: VisibilityThreshold,
        targets: Vec<Entity>,
    ) -> Self {
        Self {
            kind,
            targets,
            normal,
            threshold,
        }
    }

    pub fn normal(&self) -> Vec3 {
        self.normal.get()
    }

    pub fn threshold(&self) -> VisibilityThreshold {
        self.threshold
    }

    pub fn opacity(&self, camera_direction: Vec3) -> f32 {
        surface_opacity(self.normal(), camera_direction, self.threshold())
    }
}

/// Per-surface material; every mesh bound to the surface blends with this alpha.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct SurfaceMaterial {
    pub opacity: f32,
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self { opacity: 1.0 }
    }
}

// ============================================================================
// CAMERA DIRECTION
// ============================================================================

/// Current camera forward vector, always normalized.
///
/// Writing this resource is the "orientation changed" signal: the
/// visibility system only runs on frames where it was written.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct CameraDirection(Vec3);

impl CameraDirection {
    pub fn new(direction: Vec3) -> Self {
        Self(direction.normalize_or_zero())
    }

    pub fn get(&self) -> Vec3 {
        self.0
    }

    pub fn set(&mut self, direction: Vec3) {
        self.0 = direction.normalize_or_zero();
    }
}

impl Default for CameraDirection {
    fn default() -> Self {
        Self(Vec3::NEG_Z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    const EPS: f32 = 1e-5;

    fn random_unit(rng: &mut StdRng) -> Vec3 {
        loop {
            let v = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if v.length_squared() > 1e-4 {
                return v.normalize();
            }
        }
    }

    #[test]
    fn camera_facing_away_hides_wall() {
        let opacity = surface_opacity(Vec3::X, Vec3::NEG_X, VisibilityThreshold::WALLS);
        assert_eq!(opacity, 0.0);
    }

    #[test]
    fn camera_facing_along_normal_shows_wall() {
        let opacity = surface_opacity(Vec3::X, Vec3::X, VisibilityThreshold::WALLS);
        assert_eq!(opacity, 1.0);
    }

    #[test]
    fn midpoint_of_band_is_half_opaque() {
        let d = -0.1275_f32;
        let camera = Vec3::new(d, (1.0 - d * d).sqrt(), 0.0);
        let opacity = surface_opacity(Vec3::X, camera, VisibilityThreshold::WALLS);
        assert!((opacity - 0.5).abs() < 1e-3, "opacity was {opacity}");
    }

    #[test]
    fn band_edges() {
        let t = VisibilityThreshold::WALLS;
        let at = |d: f32| surface_opacity(Vec3::X, Vec3::new(d, (1.0 - d * d).sqrt(), 0.0), t);

        assert_eq!(at(t.visible), 1.0);
        assert_eq!(at(t.hidden), 0.0);
        assert_eq!(at(t.hidden - 0.2), 0.0);
    }

    #[test]
    fn opacity_stays_in_unit_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let thresholds = [
            VisibilityThreshold::WALLS,
            VisibilityThreshold::FLOOR,
            VisibilityThreshold::CEILING,
        ];

        for _ in 0..2000 {
            let normal = random_unit(&mut rng);
            let camera = random_unit(&mut rng);
            for t in thresholds {
                let o = surface_opacity(normal, camera, t);
                assert!((0.0..=1.0).contains(&o), "opacity {o} out of range");
            }
        }
    }

    #[test]
    fn opacity_is_monotonic_in_dot() {
        let t = VisibilityThreshold::FLOOR;
        let mut rng = StdRng::seed_from_u64(11);
        let mut dots: Vec<f32> = (0..500).map(|_| rng.gen_range(-0.2..0.1)).collect();
        dots.sort_by(|a, b| a.total_cmp(b));

        let mut previous = 0.0;
        for d in dots {
            let o = surface_opacity(Vec3::Y, Vec3::new((1.0 - d * d).sqrt(), d, 0.0), t);
            assert!(o + EPS >= previous, "opacity dropped from {previous} to {o} at d={d}");
            previous = o;
        }
    }

    #[test]
    fn collapsed_band_is_a_hard_cut() {
        let t = VisibilityThreshold { visible: -0.1, hidden: -0.1 };
        assert_eq!(surface_opacity(Vec3::X, Vec3::new(-0.1, 0.99, 0.0).normalize(), t), 0.0);
        assert_eq!(surface_opacity(Vec3::X, Vec3::X, t), 1.0);
        assert!(!t.is_valid());
    }

    #[test]
    fn map_linear_matches_endpoints() {
        assert_eq!(map_linear(2.0, 2.0, 4.0, 10.0, 20.0), 10.0);
        assert_eq!(map_linear(4.0, 2.0, 4.0, 10.0, 20.0), 20.0);
        assert_eq!(map_linear(3.0, 2.0, 4.0, 10.0, 20.0), 15.0);
    }

    #[test]
    fn reference_planes_give_axis_normals() {
        let expected = [
            (SurfaceKind::WallNorth, Vec3::X),
            (SurfaceKind::WallSouth, Vec3::NEG_X),
            (SurfaceKind::WallEast, Vec3::Z),
            (SurfaceKind::WallWest, Vec3::NEG_Z),
            (SurfaceKind::Floor, Vec3::NEG_Y),
            (SurfaceKind::Ceiling, Vec3::Y),
        ];

        for (kind, axis) in expected {
            let normal = SurfaceNormal::from_reference(&kind.reference_plane()).get();
            assert!(normal.abs_diff_eq(axis, EPS), "{kind:?}: {normal} != {axis}");
        }
    }

    #[test]
    fn binding_reads_its_fixed_normal() {
        let kind = SurfaceKind::WallWest;
        let binding = SurfaceBinding::new(
            kind,
            SurfaceNormal::from_reference(&kind.reference_plane()),
            VisibilityThreshold::WALLS,
            Vec::new(),
        );

        assert!(binding.normal().abs_diff_eq(Vec3::NEG_Z, EPS));
        assert_eq!(binding.threshold(), VisibilityThreshold::WALLS);
        assert_eq!(binding.opacity(Vec3::Z), 0.0);
        assert_eq!(binding.opacity(Vec3::NEG_Z), 1.0);
    }

    #[test]
    fn camera_direction_is_normalized() {
        let mut dir = CameraDirection::new(Vec3::new(0.0, 0.0, -5.0));
        assert!(dir.get().abs_diff_eq(Vec3::NEG_Z, EPS));

        dir.set(Vec3::new(3.0, 4.0, 0.0));
        assert!((dir.get().length() - 1.0).abs() < EPS);
    }
}
