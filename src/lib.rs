//! Sample assembly for bird's-eye-view perception on CARLA driving logs.
//!
//! For each recorded tick of a simulated agent, the dataset assembles the
//! synchronized camera images, their calibration, the augmentation homography
//! applied to each image, and the top-down occupancy ground truth.

mod common;
pub mod camera;
pub mod config;
pub mod dataset;
pub mod processor;
pub mod sensor;

pub use camera::{camera_info, CameraInfo};
pub use config::DatasetConfig;
pub use dataset::{CarlaDataset, Sample};
pub use processor::{AugmentationParams, Augmenter, Normalize, Resample};
pub use sensor::{SensorManifest, SensorSpec};
