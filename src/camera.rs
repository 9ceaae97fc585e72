//! Camera calibration model.
//!
//! Converts the extrinsic pose and sensor options stored in the manifest into
//! the rotation, translation and pinhole intrinsic tensors consumed by the
//! view-projection downstream.

use crate::{common::*, sensor::SensorSpec};

/// Extrinsic and intrinsic calibration of one camera.
#[derive(Debug, TensorLike)]
pub struct CameraInfo {
    /// World-frame rotation matrix, `[3, 3]`.
    pub rotation: Tensor,
    /// Mounting translation, `[3]`.
    pub translation: Tensor,
    /// Pinhole intrinsic matrix, `[3, 3]`.
    pub intrinsics: Tensor,
}

/// Compute the calibration tensors for one sensor.
///
/// The manifest stores rotations in the simulator convention; they are
/// remapped to the world convention before the matrix is built:
/// `roll = radians(rotation[2] - 90)`, `pitch = -radians(rotation[1])`,
/// `yaw = -radians(rotation[0])`.
pub fn camera_info(spec: &SensorSpec) -> CameraInfo {
    let rotation = &spec.transform.rotation;
    let roll = (rotation[2] - 90.0).to_radians();
    let pitch = -rotation[1].to_radians();
    let yaw = -rotation[0].to_radians();

    let rotation = euler_to_matrix(roll, pitch, yaw);
    let translation = Tensor::of_slice(&spec.transform.location.map(|val| val as f32));
    let intrinsics = intrinsic_matrix(
        spec.sensor_options.image_size_x,
        spec.sensor_options.image_size_y,
        spec.sensor_options.fov,
    );

    CameraInfo {
        rotation,
        translation,
        intrinsics,
    }
}

/// Rotation matrix from static-XYZ Euler angles, `Rz(yaw) Ry(pitch) Rx(roll)`.
fn euler_to_matrix(roll: f64, pitch: f64, yaw: f64) -> Tensor {
    let (sr, cr) = roll.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let (sy, cy) = yaw.sin_cos();

    let elems = [
        cy * cp,
        cy * sp * sr - sy * cr,
        cy * sp * cr + sy * sr, // row 1
        sy * cp,
        sy * sp * sr + cy * cr,
        sy * sp * cr - cy * sr, // row 2
        -sp,
        cp * sr,
        cp * cr, // row 3
    ];
    Tensor::of_slice(&elems.map(|val| val as f32)).view([3, 3])
}

/// Pinhole intrinsic matrix from resolution and horizontal field of view.
fn intrinsic_matrix(image_size_x: i64, image_size_y: i64, fov_degrees: f64) -> Tensor {
    let focal = image_size_x as f64 / (2.0 * (fov_degrees * std::f64::consts::PI / 360.0).tan());
    let center_x = image_size_x as f64 / 2.0;
    let center_y = image_size_y as f64 / 2.0;

    let elems = [
        focal, 0.0, center_x, // row 1
        0.0, focal, center_y, // row 2
        0.0, 0.0, 1.0, // row 3
    ];
    Tensor::of_slice(&elems.map(|val| val as f32)).view([3, 3])
}
