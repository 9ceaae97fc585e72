//! Encoded depth reconstruction.

use crate::common::*;

const DEPTH_SCALE: f64 = 1000.0;

/// Decode a `[3, H, W]` depth image into a `[1, H, W]` relative depth map.
///
/// The simulator packs depth as `R + G * 256 + B * 256^2`. The raw value is
/// normalized to `[0, 1000]` world units and then rescaled by the per-image
/// maximum, so the output is a relative, not absolute, depth signal in
/// `[0, 1]`. An all-zero map has no maximum to divide by and stays all-zero.
pub fn decode_depth(image: &Tensor) -> Tensor {
    let raw = image.select(0, 0)
        + image.select(0, 1) * 256.0
        + image.select(0, 2) * (256.0 * 256.0);
    let depth = raw / (256f64.powi(3) - 1.0) * DEPTH_SCALE;

    let max = f64::from(depth.max());
    let depth = if max > 0.0 { depth / max } else { depth };
    depth.unsqueeze(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn all_zero_input_stays_all_zero() {
        let depth = decode_depth(&Tensor::zeros(&[3, 4, 4], FLOAT_CPU));
        assert_eq!(depth.size(), vec![1, 4, 4]);
        assert_eq!(f64::from(depth.abs().max()), 0.0);
    }

    #[test]
    fn nonzero_input_is_rescaled_to_unit_maximum() {
        let image = Tensor::zeros(&[3, 2, 2], FLOAT_CPU);
        let _ = image.i((0, 0, 0)).fill_(10.0);
        let _ = image.i((1, 0, 1)).fill_(2.0); // 2 * 256 = 512, the maximum
        let depth = decode_depth(&image);

        assert_eq!(f64::from(depth.max()), 1.0);
        assert_eq!(f64::from(depth.min()), 0.0);
        assert_abs_diff_eq!(f64::from(depth.i((0, 0, 0))), 10.0 / 512.0, epsilon = 1e-6);
    }

    #[test]
    fn channel_weights_follow_the_encoding() {
        // equal encoded values in different channels decode identically
        let image = Tensor::zeros(&[3, 1, 3], FLOAT_CPU);
        let _ = image.i((0, 0, 0)).fill_(256.0 * 256.0); // out-of-range red, same raw value
        let _ = image.i((1, 0, 1)).fill_(256.0);
        let _ = image.i((2, 0, 2)).fill_(1.0);
        let depth = decode_depth(&image);

        let values: Vec<f32> = Vec::from(&depth.reshape(&[3]));
        assert_abs_diff_eq!(values[0], values[1], epsilon = 1e-6);
        assert_abs_diff_eq!(values[1], values[2], epsilon = 1e-6);
    }
}
