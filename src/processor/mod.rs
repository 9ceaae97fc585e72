//! Pure per-image processors used during sample assembly.

mod augment;
mod depth;
mod normalize;
mod raster;

pub use augment::{AugmentationParams, Augmenter, Resample};
pub use depth::decode_depth;
pub use normalize::{Normalize, IMAGENET_MEAN, IMAGENET_STD};
pub use raster::{rasterize_topdown, rasterize_vehicle_mask, ROAD_COLORS, VEHICLE_COLOR};
