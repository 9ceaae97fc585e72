//! Per-channel image normalization.

use crate::common::*;

/// ImageNet channel means.
pub const IMAGENET_MEAN: [f64; 3] = [0.485, 0.456, 0.406];
/// ImageNet channel standard deviations.
pub const IMAGENET_STD: [f64; 3] = [0.229, 0.224, 0.225];

/// Scales byte images to `[0, 1]` and standardizes each channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalize {
    mean: [f64; 3],
    std: [f64; 3],
}

impl Normalize {
    pub fn new(mean: [f64; 3], std: [f64; 3]) -> Self {
        Self { mean, std }
    }

    /// Normalize a `[3, H, W]` image with values in `[0, 255]`.
    pub fn forward(&self, image: &Tensor) -> Tensor {
        tch::no_grad(|| {
            let mean = Tensor::of_slice(&self.mean.map(|val| val as f32)).view([3, 1, 1]);
            let std = Tensor::of_slice(&self.std.map(|val| val as f32)).view([3, 1, 1]);
            (image.to_kind(Kind::Float) / 255.0 - mean) / std
        })
    }
}

impl Default for Normalize {
    fn default() -> Self {
        Self::new(IMAGENET_MEAN, IMAGENET_STD)
    }
}
