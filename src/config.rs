//! Dataset configuration.

use crate::common::*;

/// Configuration for [`CarlaDataset`](crate::dataset::CarlaDataset).
///
/// The defaults match the recording setup of the simulator logs: 352x128
/// source images augmented to a 352x128 final crop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Source image height in pixels.
    pub image_height: i64,
    /// Source image width in pixels.
    pub image_width: i64,
    /// Final image size after augmentation, in (height, width) order.
    pub final_dim: (i64, i64),
    /// Lower and upper bound of the random resize scale.
    pub resize_lim: (R64, R64),
    /// Lower and upper bound of the bottom crop fraction.
    pub bot_pct_lim: (R64, R64),
    /// Lower and upper bound of the random rotation, in degrees.
    pub rot_lim: (R64, R64),
    /// Whether to randomly mirror images horizontally.
    pub rand_flip: bool,
    /// Randomized augmentation when true, deterministic otherwise.
    pub is_train: bool,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            image_height: 128,
            image_width: 352,
            final_dim: (128, 352),
            resize_lim: (r64(0.193), r64(0.225)),
            bot_pct_lim: (r64(0.0), r64(0.22)),
            rot_lim: (r64(-5.4), r64(5.4)),
            rand_flip: true,
            is_train: false,
        }
    }
}

impl DatasetConfig {
    /// Check that dimensions are positive and limit pairs are ordered.
    pub fn validate(&self) -> Result<()> {
        let Self {
            image_height,
            image_width,
            final_dim: (final_height, final_width),
            resize_lim,
            bot_pct_lim,
            rot_lim,
            ..
        } = *self;

        ensure!(
            image_height > 0 && image_width > 0,
            "image size must be positive, but got {}x{}",
            image_width,
            image_height
        );
        ensure!(
            final_height > 0 && final_width > 0,
            "final_dim must be positive, but got {:?}",
            self.final_dim
        );
        ensure!(
            resize_lim.0 > 0.0 && resize_lim.0 <= resize_lim.1,
            "resize_lim must be positive and ordered, but got {:?}",
            resize_lim
        );
        ensure!(
            (0.0..=1.0).contains(&bot_pct_lim.0.raw())
                && bot_pct_lim.0 <= bot_pct_lim.1
                && bot_pct_lim.1 <= 1.0,
            "bot_pct_lim must be an ordered pair within [0, 1], but got {:?}",
            bot_pct_lim
        );
        ensure!(
            rot_lim.0 <= rot_lim.1,
            "rot_lim must be ordered, but got {:?}",
            rot_lim
        );
        Ok(())
    }
}
