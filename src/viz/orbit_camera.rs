use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde_derive::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};

/// Orbit camera parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitParams {
    /// Look-at point, in sensor coordinates (x right, y down, z forward).
    pub center: [f32; 3],
    /// Distance from the center after a reset.
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for OrbitParams {
    /// Resets to the sensor's own view point, looking at 1m ahead.
    fn default() -> Self {
        Self {
            center: [0.0, 0.0, 1.0],
            distance: 1.0,
            min_distance: 0.05,
            max_distance: 20.0,
        }
    }
}

impl OrbitParams {
    pub fn validate(&self) -> Result<()> {
        let valid = self.center.iter().all(|v| v.is_finite())
            && self.min_distance > 0.0
            && self.min_distance <= self.distance
            && self.distance <= self.max_distance
            && self.max_distance.is_finite();
        if !valid {
            return Err(Error::invalid_parameter(format!(
                "orbit distances must satisfy 0 < {} <= {} <= {}",
                self.min_distance, self.distance, self.max_distance
            )));
        }
        Ok(())
    }

    pub fn center(&self) -> Vector3<f32> {
        Vector3::new(self.center[0], self.center[1], self.center[2])
    }
}

/// Viewer orientation and distance around the look-at center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub rotation: UnitQuaternion<f32>,
    pub distance: f32,
}

impl CameraState {
    /// Roll, pitch and yaw angles of the accumulated rotation.
    pub fn euler_angles(&self) -> (f32, f32, f32) {
        self.rotation.euler_angles()
    }

    pub fn approx_eq(&self, other: &CameraState, epsilon: f32) -> bool {
        // 2 sin(a/2) of the relative rotation, which keeps precision near zero.
        let relative = self.rotation.inverse() * other.rotation;
        relative.imag().norm() * 2.0 <= epsilon
            && (self.distance - other.distance).abs() <= epsilon
    }
}

/// Camera that orbits a fixed center. Rotations are composed in the order
/// they are applied and always pivot on the center, so the subject stays
/// framed.
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    params: OrbitParams,
    state: CameraState,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(OrbitParams::default())
    }
}

impl OrbitCamera {
    pub fn new(params: OrbitParams) -> Self {
        Self {
            state: Self::canonical(&params),
            params,
        }
    }

    fn canonical(params: &OrbitParams) -> CameraState {
        CameraState {
            rotation: UnitQuaternion::identity(),
            distance: params.distance,
        }
    }

    pub fn params(&self) -> &OrbitParams {
        &self.params
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    fn rotate(&mut self, axis: &nalgebra::Unit<Vector3<f32>>, angle: f32) {
        if !angle.is_finite() {
            warn!(angle, "Ignoring non-finite camera rotation");
            return;
        }
        self.state.rotation *= UnitQuaternion::from_axis_angle(axis, angle);
        self.state.rotation.renormalize_fast();
    }

    /// Rotates around the vertical axis through the center.
    pub fn yaw(&mut self, angle: f32) {
        self.rotate(&Vector3::y_axis(), angle);
    }

    /// Rotates around the horizontal axis through the center.
    pub fn pitch(&mut self, angle: f32) {
        self.rotate(&Vector3::x_axis(), angle);
    }

    /// Rotates around the viewing axis.
    pub fn roll(&mut self, angle: f32) {
        self.rotate(&Vector3::z_axis(), angle);
    }

    /// Moves `scale` of the current distance toward the center, or away from
    /// it when negative. The distance stays inside `[min_distance, max_distance]`.
    pub fn move_toward_center(&mut self, scale: f32) {
        if !scale.is_finite() {
            warn!(scale, "Ignoring non-finite camera zoom");
            return;
        }
        let distance = self.state.distance * (1.0 - scale);
        self.state.distance = distance.clamp(self.params.min_distance, self.params.max_distance);
    }

    pub fn reset(&mut self) {
        self.state = Self::canonical(&self.params);
    }

    /// Camera position in sensor coordinates.
    pub fn eye(&self) -> Vector3<f32> {
        self.params.center() + self.state.rotation * Vector3::new(0.0, 0.0, -self.state.distance)
    }

    /// Sensor to camera transform.
    pub fn view(&self) -> Isometry3<f32> {
        let to_center = Isometry3::from_parts(
            Translation3::from(-self.params.center()),
            UnitQuaternion::identity(),
        );
        let orbit = Isometry3::from_parts(
            Translation3::new(0.0, 0.0, self.state.distance),
            self.state.rotation.inverse(),
        );
        orbit * to_center
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI};

    use approx::assert_abs_diff_eq;
    use nalgebra::{Point3, Vector3};
    use rstest::rstest;

    use super::{OrbitCamera, OrbitParams};

    #[test]
    fn test_canonical_view_is_sensor_view() {
        let camera = OrbitCamera::default();
        let point = Point3::new(0.3, -0.2, 2.0);
        assert_abs_diff_eq!(camera.view() * point, point, epsilon = 1e-6);
        assert_abs_diff_eq!(camera.eye(), Vector3::zeros(), epsilon = 1e-6);
    }

    #[rstest]
    #[case(0.3)]
    #[case(-1.2)]
    #[case(PI)]
    fn test_yaw_inverse(#[case] angle: f32) {
        let mut camera = OrbitCamera::default();
        camera.pitch(0.4);
        let before = camera.state();
        camera.yaw(angle);
        camera.yaw(-angle);
        assert!(camera.state().approx_eq(&before, 1e-5));
    }

    #[test]
    fn test_orbit_keeps_center_fixed() {
        let mut camera = OrbitCamera::default();
        let center = Point3::from(camera.params().center());
        camera.yaw(0.7);
        camera.pitch(-0.3);
        camera.roll(1.1);
        let center_in_view = camera.view() * center;
        assert_abs_diff_eq!(center_in_view, Point3::new(0.0, 0.0, 1.0), epsilon = 1e-5);
        assert_abs_diff_eq!(
            (camera.eye() - center.coords).norm(),
            camera.state().distance,
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_yaw_quarter_turn_moves_eye_sideways() {
        let mut camera = OrbitCamera::default();
        camera.yaw(FRAC_PI_2);
        assert_abs_diff_eq!(camera.eye(), Vector3::new(-1.0, 0.0, 1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_rotation_order_matters() {
        let mut yaw_first = OrbitCamera::default();
        yaw_first.yaw(0.5);
        yaw_first.pitch(0.5);

        let mut pitch_first = OrbitCamera::default();
        pitch_first.pitch(0.5);
        pitch_first.yaw(0.5);

        assert!(!yaw_first.state().approx_eq(&pitch_first.state(), 1e-3));
    }

    #[test]
    fn test_zoom_never_crosses_center() {
        let mut camera = OrbitCamera::default();
        for scale in [0.5, 1.0, 2.0, 50.0, -3.0, 0.999, 1.0, -0.5, 1e9, -1e9, 0.25] {
            camera.move_toward_center(scale);
            assert!(camera.state().distance > 0.0);
            assert!(camera.state().distance <= camera.params().max_distance);
        }
        camera.move_toward_center(f32::NAN);
        assert!(camera.state().distance > 0.0);
    }

    #[test]
    fn test_reset() {
        let params = OrbitParams::default();
        let mut camera = OrbitCamera::new(params);
        camera.yaw(1.0);
        camera.roll(-2.0);
        camera.move_toward_center(0.8);
        camera.reset();
        assert!(camera.state().approx_eq(&OrbitCamera::new(params).state(), 0.0));
    }

    #[test]
    fn test_validate_params() {
        assert!(OrbitParams::default().validate().is_ok());
        let params = OrbitParams {
            min_distance: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
