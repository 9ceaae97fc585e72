//! Sensor manifest model.
//!
//! Every agent directory carries a `sensors.json` manifest describing the
//! mounted sensors. The manifest is loaded once per dataset root; sensor
//! iteration order is the order of appearance in the file.

use crate::common::*;

/// Sensor type string of rgb cameras in the manifest.
pub const RGB_CAMERA_TYPE: &str = "sensor.camera.rgb";
/// Name of the top-down rgb camera, excluded from per-sensor assembly.
pub const BEV_RGB_CAMERA: &str = "birds_view_camera";
/// Directory name of the top-down semantic camera used as ground truth.
pub const BEV_SEMANTIC_CAMERA: &str = "birds_view_semantic_camera";
/// Directory suffix of per-camera semantic segmentation images.
pub const SEMANTIC_SUFFIX: &str = "_semantic";
/// Directory suffix of per-camera encoded depth images.
pub const DEPTH_SUFFIX: &str = "_depth";

/// Sensor mounting pose relative to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorTransform {
    /// Mounting position in world units.
    pub location: [f64; 3],
    /// Mounting rotation in degrees, simulator convention.
    pub rotation: [f64; 3],
}

/// Sensor resolution and field of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorOptions {
    pub image_size_x: i64,
    pub image_size_y: i64,
    pub fov: f64,
}

/// Immutable per-sensor metadata from the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSpec {
    /// Simulator sensor type, e.g. `sensor.camera.rgb`.
    pub sensor_type: String,
    pub transform: SensorTransform,
    pub sensor_options: SensorOptions,
}

impl SensorSpec {
    /// Whether this sensor is an rgb camera.
    pub fn is_rgb_camera(&self) -> bool {
        self.sensor_type == RGB_CAMERA_TYPE
    }
}

/// Ordered collection of sensor specs loaded from `sensors.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorManifest {
    pub sensors: IndexMap<String, SensorSpec>,
}

impl SensorManifest {
    /// Load a manifest file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read sensor manifest '{}'", path.display()))?;
        let manifest: Self = serde_json::from_str(&text)
            .with_context(|| format!("malformed sensor manifest '{}'", path.display()))?;
        Ok(manifest)
    }

    /// Iterate over rgb cameras in manifest order, excluding the top-down
    /// camera. The order is stable across calls.
    pub fn rgb_cameras(&self) -> impl Iterator<Item = (&str, &SensorSpec)> {
        self.sensors
            .iter()
            .filter(|(name, spec)| spec.is_rgb_camera() && name.as_str() != BEV_RGB_CAMERA)
            .map(|(name, spec)| (name.as_str(), spec))
    }
}
