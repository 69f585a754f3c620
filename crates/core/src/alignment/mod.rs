use serde::{Deserialize, Serialize};

use crate::scene::Pose;

/// Tolerances a placement must satisfy to count as aligned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentThresholds {
    /// Maximum distance between placed and target positions, in scene units.
    pub position: f32,
    /// Maximum shortest-arc angle between orientations, in degrees.
    pub rotation_degrees: f32,
}

impl Default for AlignmentThresholds {
    fn default() -> Self {
        Self {
            position: 0.01,
            rotation_degrees: 5.0,
        }
    }
}

/// Measurements taken while checking a placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignmentReport {
    pub distance: f32,
    pub angle_degrees: f32,
    pub aligned: bool,
}

/// Compares a placed pose against its target pose.
///
/// The angle is the magnitude of the relative rotation along the shortest
/// arc, so `q` and `-q` compare as identical. Measurements that are not finite
/// never count as aligned.
pub fn validate_alignment(
    placed: &Pose,
    target: &Pose,
    thresholds: &AlignmentThresholds,
) -> AlignmentReport {
    let distance = placed.position.distance(target.position);
    let angle_degrees = placed
        .rotation
        .normalize()
        .angle_between(target.rotation.normalize())
        .to_degrees();

    let aligned = distance.is_finite()
        && angle_degrees.is_finite()
        && distance <= thresholds.position
        && angle_degrees <= thresholds.rotation_degrees;

    AlignmentReport {
        distance,
        angle_degrees,
        aligned,
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};

    use super::*;

    fn thresholds() -> AlignmentThresholds {
        AlignmentThresholds {
            position: 0.01,
            rotation_degrees: 5.0,
        }
    }

    #[test]
    fn accepts_placements_within_both_tolerances() {
        let target = Pose::from_position(Vec3::new(1.0, 0.0, 0.0));
        let placed = Pose::new(
            Vec3::new(1.005, 0.0, 0.0),
            Quat::from_rotation_y(3.0_f32.to_radians()),
        );

        let report = validate_alignment(&placed, &target, &thresholds());
        assert!(report.aligned);
        assert!((report.angle_degrees - 3.0).abs() < 0.01);
    }

    #[test]
    fn rejects_positions_outside_tolerance() {
        let target = Pose::IDENTITY;
        let placed = Pose::from_position(Vec3::new(0.05, 0.0, 0.0));

        let report = validate_alignment(&placed, &target, &thresholds());
        assert!(!report.aligned);
        assert!((report.distance - 0.05).abs() < 1e-6);
    }

    #[test]
    fn rejects_rotations_outside_tolerance_on_any_axis() {
        let target = Pose::IDENTITY;
        for rotation in [
            Quat::from_rotation_x(10.0_f32.to_radians()),
            Quat::from_rotation_y(-10.0_f32.to_radians()),
            Quat::from_rotation_z(10.0_f32.to_radians()),
        ] {
            let placed = Pose::new(Vec3::ZERO, rotation);
            let report = validate_alignment(&placed, &target, &thresholds());
            assert!(!report.aligned, "{rotation:?} should be rejected");
            assert!((report.angle_degrees - 10.0).abs() < 0.01);
        }
    }

    #[test]
    fn treats_negated_quaternions_as_the_same_orientation() {
        let rotation = Quat::from_rotation_z(1.0);
        let placed = Pose::new(Vec3::ZERO, -rotation);
        let target = Pose::new(Vec3::ZERO, rotation);

        let report = validate_alignment(&placed, &target, &thresholds());
        assert!(report.aligned);
        assert!(report.angle_degrees < 0.1);
    }

    #[test]
    fn thresholds_are_inclusive() {
        let target = Pose::IDENTITY;
        let placed = Pose::from_position(Vec3::new(0.25, 0.0, 0.0));
        let exact = AlignmentThresholds {
            position: 0.25,
            rotation_degrees: 0.0,
        };

        assert!(validate_alignment(&placed, &target, &exact).aligned);
    }

    #[test]
    fn verdict_is_deterministic() {
        let target = Pose::from_degrees([0.0, 1.0, 0.0], [0.0, 45.0, 0.0]);
        let placed = Pose::from_degrees([0.004, 1.0, 0.0], [0.0, 47.0, 0.0]);

        let first = validate_alignment(&placed, &target, &thresholds());
        for _ in 0..16 {
            assert_eq!(validate_alignment(&placed, &target, &thresholds()), first);
        }
    }

    #[test]
    fn non_finite_poses_never_align() {
        let placed = Pose::from_position(Vec3::new(f32::NAN, 0.0, 0.0));
        let report = validate_alignment(&placed, &Pose::IDENTITY, &thresholds());
        assert!(!report.aligned);
    }
}
