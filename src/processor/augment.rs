//! Geometric image augmentation.
//!
//! The augmenter samples a 2D transform (resize, crop, horizontal flip,
//! rotation) and applies it to image pixels while accumulating the equivalent
//! pixel-coordinate homography. Downstream view projection uses the
//! accumulated rotation/translation to map 3D points into the augmented image
//! frame, so pixels and homography must stay consistent: each elementary
//! operation left-multiplies its linear part onto the running transform and
//! updates the running translation accordingly.

use crate::{common::*, config::DatasetConfig};

/// Pixel resampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resample {
    /// For rgb images.
    Bilinear,
    /// For semantic and depth images, where pixel values are codes.
    Nearest,
}

/// One sampled augmentation, shared by all image variants of one sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentationParams {
    /// Resize scale factor.
    pub resize: f64,
    /// Resized image size in (width, height) order.
    pub resize_dims: (i64, i64),
    /// Crop box (left, top, right, bottom) in resized-image coordinates.
    pub crop: (i64, i64, i64, i64),
    /// Mirror horizontally.
    pub flip: bool,
    /// Rotation about the image center, in degrees.
    pub rotate: f64,
}

/// Samples augmentation parameters and applies them to images.
#[derive(Debug, Clone)]
pub struct Augmenter {
    src_dim: (i64, i64),
    final_dim: (i64, i64),
    resize_lim: (f64, f64),
    bot_pct_lim: (f64, f64),
    rot_lim: (f64, f64),
    rand_flip: bool,
    is_train: bool,
}

impl Augmenter {
    pub fn new(config: &DatasetConfig) -> Self {
        Self {
            src_dim: (config.image_height, config.image_width),
            final_dim: config.final_dim,
            resize_lim: (config.resize_lim.0.raw(), config.resize_lim.1.raw()),
            bot_pct_lim: (config.bot_pct_lim.0.raw(), config.bot_pct_lim.1.raw()),
            rot_lim: (config.rot_lim.0.raw(), config.rot_lim.1.raw()),
            rand_flip: config.rand_flip,
            is_train: config.is_train,
        }
    }

    /// Sample augmentation parameters.
    ///
    /// Training mode draws from the injected RNG; evaluation mode is
    /// deterministic (smallest scale covering the final crop, centered
    /// horizontally, no flip, no rotation) and never touches the RNG.
    pub fn sample(&self, rng: &mut impl Rng) -> AugmentationParams {
        let (height, width) = self.src_dim;
        let (final_h, final_w) = self.final_dim;

        if self.is_train {
            let resize = rng.gen_range(self.resize_lim.0..=self.resize_lim.1);
            let new_w = (width as f64 * resize).round() as i64;
            let new_h = (height as f64 * resize).round() as i64;
            let bot_pct = rng.gen_range(self.bot_pct_lim.0..=self.bot_pct_lim.1);
            let crop_t = ((1.0 - bot_pct) * new_h as f64).round() as i64 - final_h;
            let max_offset = (new_w - final_w).max(0);
            let crop_l = if max_offset > 0 {
                rng.gen_range(0.0..=max_offset as f64).round() as i64
            } else {
                0
            };
            let flip = self.rand_flip && rng.gen::<bool>();
            let rotate = rng.gen_range(self.rot_lim.0..=self.rot_lim.1);

            AugmentationParams {
                resize,
                resize_dims: (new_w, new_h),
                crop: (crop_l, crop_t, crop_l + final_w, crop_t + final_h),
                flip,
                rotate,
            }
        } else {
            let resize = (final_h as f64 / height as f64).max(final_w as f64 / width as f64);
            let new_w = (width as f64 * resize).round() as i64;
            let new_h = (height as f64 * resize).round() as i64;
            let bot_pct = (self.bot_pct_lim.0 + self.bot_pct_lim.1) / 2.0;
            let crop_t = ((1.0 - bot_pct) * new_h as f64).round() as i64 - final_h;
            let crop_l = ((new_w - final_w).max(0) as f64 / 2.0).round() as i64;

            AugmentationParams {
                resize,
                resize_dims: (new_w, new_h),
                crop: (crop_l, crop_t, crop_l + final_w, crop_t + final_h),
                flip: false,
                rotate: 0.0,
            }
        }
    }

    /// Apply sampled parameters to one CHW image and the accumulating
    /// homography.
    ///
    /// Returns the transformed image together with the updated 2x2 rotation
    /// and 2-vector translation. Pixels cropped outside the resized image
    /// are zero-filled, as are pixels swept in by the rotation.
    pub fn transform_image(
        &self,
        image: &Tensor,
        post_rot: &Tensor,
        post_tran: &Tensor,
        params: &AugmentationParams,
        resample: Resample,
    ) -> Result<(Tensor, Tensor, Tensor)> {
        tch::no_grad(|| -> Result<_> {
            let (channels, height, width) =
                image.size3().context("expected a CHW image tensor")?;
            let (new_w, new_h) = params.resize_dims;
            let (crop_l, crop_t, crop_r, crop_b) = params.crop;
            let (final_w, final_h) = (crop_r - crop_l, crop_b - crop_t);
            ensure!(
                new_w > 0 && new_h > 0,
                "resize_dims must be positive, but got {:?}",
                params.resize_dims
            );
            ensure!(
                final_w > 0 && final_h > 0,
                "degenerate crop box {:?}",
                params.crop
            );

            // resample pixels: resize, crop, flip, rotate
            let image = image.to_kind(Kind::Float).view([1, channels, height, width]);
            let image = match resample {
                Resample::Bilinear => image.upsample_bilinear2d(&[new_h, new_w], false, None, None),
                Resample::Nearest => image.upsample_nearest2d(&[new_h, new_w], None, None),
            };
            let image = image.constant_pad_nd(&[-crop_l, crop_r - new_w, -crop_t, crop_b - new_h]);
            let image = if params.flip { image.flip(&[3]) } else { image };
            let image = if params.rotate != 0.0 {
                rotate_about_center(&image, params.rotate.to_radians(), resample)?
            } else {
                image
            };
            let image = image.view([channels, final_h, final_w]);

            // the matching homography updates, in the same operation order
            let mut post_rot = post_rot * params.resize;
            let mut post_tran =
                post_tran - Tensor::of_slice(&[crop_l as f32, crop_t as f32]);
            if params.flip {
                let reflect = Tensor::of_slice(&[-1f32, 0.0, 0.0, 1.0]).view([2, 2]);
                let offset = Tensor::of_slice(&[final_w as f32, 0.0]);
                post_rot = reflect.matmul(&post_rot);
                post_tran = reflect.matmul(&post_tran) + offset;
            }
            let rotation = rotation_2d(params.rotate.to_radians());
            let center = Tensor::of_slice(&[final_w as f32, final_h as f32]) / 2.0;
            let offset = rotation.matmul(&center.neg()) + &center;
            let post_rot = rotation.matmul(&post_rot);
            let post_tran = rotation.matmul(&post_tran) + offset;

            Ok((image, post_rot, post_tran))
        })
    }
}

/// 2D rotation matrix `[[cos, sin], [-sin, cos]]` mapping original pixel
/// coordinates to rotated ones.
fn rotation_2d(angle: f64) -> Tensor {
    let (sin, cos) = angle.sin_cos();
    Tensor::of_slice(&[cos as f32, sin as f32, -(sin as f32), cos as f32]).view([2, 2])
}

/// Rotate an NCHW image about its center by `angle` radians.
///
/// The sampling grid is the inverse of [`rotation_2d`], expressed in
/// normalized coordinates, which requires correcting for the aspect ratio.
fn rotate_about_center(image: &Tensor, angle: f64, resample: Resample) -> Result<Tensor> {
    let (batch, channels, height, width) = image.size4()?;
    let (sin, cos) = angle.sin_cos();
    let aspect = height as f64 / width as f64;

    let theta = Tensor::of_slice(&[
        cos as f32,
        (-sin * aspect) as f32,
        0.0,
        (sin / aspect) as f32,
        cos as f32,
        0.0,
    ])
    .view([1, 2, 3]);
    let grid = Tensor::affine_grid_generator(&theta, &[batch, channels, height, width], false);
    let mode = match resample {
        Resample::Bilinear => 0,
        Resample::Nearest => 1,
    };
    Ok(image.grid_sampler(&grid, mode, 0, false))
}
