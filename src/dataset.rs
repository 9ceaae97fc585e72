//! Dataset over recorded agent logs.
//!
//! The on-disk layout is one directory per agent under `agents/`, each
//! holding a `sensors.json` manifest and one directory per sensor stream
//! with `{tick}.png` frames. Sample indices enumerate (agent, tick) pairs
//! in row-major order.

use crate::{
    camera::{camera_info, CameraInfo},
    common::*,
    config::DatasetConfig,
    processor::{
        decode_depth, rasterize_topdown, rasterize_vehicle_mask, Augmenter, Normalize, Resample,
    },
    sensor::{SensorManifest, BEV_SEMANTIC_CAMERA, DEPTH_SUFFIX, SEMANTIC_SUFFIX},
};
use getset::{CopyGetters, Getters};

/// Subdirectory of the dataset root holding the agent logs.
pub const AGENTS_DIR: &str = "agents";
/// Manifest file name within each agent directory.
pub const MANIFEST_FILE: &str = "sensors.json";

/// One assembled training sample.
///
/// All per-sensor tensors are stacked along a leading sensor axis and share
/// index alignment: element `i` across all of them refers to the same camera.
#[derive(Debug, TensorLike)]
pub struct Sample {
    /// Normalized rgb images, `[S, 3, final_h, final_w]`.
    pub images: Tensor,
    /// World-frame camera rotations, `[S, 3, 3]`.
    pub rotations: Tensor,
    /// Camera mounting translations, `[S, 3]`.
    pub translations: Tensor,
    /// Pinhole intrinsic matrices, `[S, 3, 3]`.
    pub intrinsics: Tensor,
    /// Augmentation homography rotations, `[S, 3, 3]`. The third row and
    /// column are the identity's: the augmentation acts on image pixels only.
    pub post_rotations: Tensor,
    /// Augmentation homography translations, `[S, 3]`.
    pub post_translations: Tensor,
    /// Binary vehicle masks of the augmented camera views, `[S, 1, final_h, final_w]`.
    pub vehicle_masks: Tensor,
    /// Relative depth maps of the augmented camera views, `[S, 1, final_h, final_w]`.
    pub depths: Tensor,
    /// Top-down occupancy ground truth, `[3, 200, 200]`: vehicle, road, empty.
    pub occupancy: Tensor,
}

/// Dataset of CARLA driving logs.
///
/// Construction scans the directory tree once; every `get` call re-reads the
/// tick's files and allocates fresh tensors, so a dataset shared across
/// worker threads needs no locking.
#[derive(Debug, Getters, CopyGetters)]
pub struct CarlaDataset {
    #[getset(get = "pub")]
    config: DatasetConfig,
    #[getset(get = "pub")]
    manifest: SensorManifest,
    data_dir: PathBuf,
    augmenter: Augmenter,
    normalize: Normalize,
    #[getset(get_copy = "pub")]
    num_agents: usize,
    #[getset(get_copy = "pub")]
    ticks_per_agent: usize,
}

impl CarlaDataset {
    /// Open a dataset root.
    ///
    /// Loads the sensor manifest of agent 0 (all agents share one sensor
    /// rig), counts the recorded ticks of the first rgb camera, and checks
    /// that every agent recorded the same number of ticks.
    pub fn new(data_dir: impl AsRef<Path>, config: DatasetConfig) -> Result<Self> {
        config.validate()?;
        let data_dir = data_dir.as_ref().to_owned();
        let agents_dir = data_dir.join(AGENTS_DIR);

        let mut agent_ids: Vec<usize> = fs::read_dir(&agents_dir)
            .with_context(|| format!("failed to list '{}'", agents_dir.display()))?
            .map(|entry| -> Result<_> {
                let name = entry?.file_name();
                let id = name.to_string_lossy().parse().with_context(|| {
                    format!(
                        "unexpected entry '{}' in '{}'",
                        name.to_string_lossy(),
                        agents_dir.display()
                    )
                })?;
                Ok(id)
            })
            .try_collect()?;
        agent_ids.sort_unstable();
        ensure!(
            !agent_ids.is_empty(),
            "no agents found under '{}'",
            agents_dir.display()
        );
        ensure!(
            agent_ids.iter().copied().eq(0..agent_ids.len()),
            "agent directories under '{}' must be numbered contiguously from 0",
            agents_dir.display()
        );
        let num_agents = agent_ids.len();

        let manifest = SensorManifest::load(agents_dir.join("0").join(MANIFEST_FILE))?;
        let (reference_camera, _) = manifest
            .rgb_cameras()
            .next()
            .context("manifest contains no usable rgb cameras")?;

        // every agent is assumed to record the same number of ticks; check
        // the reference camera's file count instead of failing at indexing
        let tick_counts: Vec<usize> = (0..num_agents)
            .map(|agent| count_ticks(&agents_dir.join(agent.to_string()), reference_camera))
            .try_collect()?;
        let ticks_per_agent = tick_counts[0];
        ensure!(
            ticks_per_agent > 0,
            "reference camera '{}' of agent 0 has no recorded ticks",
            reference_camera
        );
        for (agent, &count) in tick_counts.iter().enumerate() {
            ensure!(
                count == ticks_per_agent,
                "tick count mismatch: agent 0 recorded {} ticks but agent {} recorded {}",
                ticks_per_agent,
                agent,
                count
            );
        }

        info!(
            "opened dataset at '{}': {} agents, {} ticks each, {} cameras",
            data_dir.display(),
            num_agents,
            ticks_per_agent,
            manifest.rgb_cameras().count()
        );

        Ok(Self {
            augmenter: Augmenter::new(&config),
            normalize: Normalize::default(),
            config,
            manifest,
            data_dir,
            num_agents,
            ticks_per_agent,
        })
    }

    /// Total number of samples, agents x ticks.
    pub fn len(&self) -> usize {
        self.num_agents * self.ticks_per_agent
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Assemble the sample at `index` with a fresh entropy-seeded RNG.
    pub fn get(&self, index: usize) -> Result<Sample> {
        let mut rng = StdRng::from_entropy();
        self.get_with_rng(index, &mut rng)
    }

    /// Assemble the sample at `index`, drawing augmentation parameters from
    /// the given RNG.
    pub fn get_with_rng(&self, index: usize, rng: &mut impl Rng) -> Result<Sample> {
        ensure!(
            index < self.len(),
            "sample index {} out of range for dataset of length {}",
            index,
            self.len()
        );
        let agent = index / self.ticks_per_agent;
        let tick = index % self.ticks_per_agent;
        let agent_dir = self.data_dir.join(AGENTS_DIR).join(agent.to_string());
        let tick_file = format!("{}.png", tick);

        let occupancy = {
            let path = agent_dir.join(BEV_SEMANTIC_CAMERA).join(&tick_file);
            let image = load_image(&path)?;
            let (channels, _, _) = image
                .size3()
                .with_context(|| format!("unexpected image layout in '{}'", path.display()))?;
            ensure!(
                channels == 3,
                "expect a 3-channel semantic image in '{}', but get {} channels",
                path.display(),
                channels
            );
            rasterize_topdown(&image)
        };

        let mut images = Vec::new();
        let mut rotations = Vec::new();
        let mut translations = Vec::new();
        let mut intrinsics = Vec::new();
        let mut post_rotations = Vec::new();
        let mut post_translations = Vec::new();
        let mut vehicle_masks = Vec::new();
        let mut depths = Vec::new();

        for (name, spec) in self.manifest.rgb_cameras() {
            let rgb = self.load_camera_image(&agent_dir.join(name).join(&tick_file))?;
            let semantic = self.load_camera_image(
                &agent_dir
                    .join(format!("{}{}", name, SEMANTIC_SUFFIX))
                    .join(&tick_file),
            )?;
            let depth = self.load_camera_image(
                &agent_dir
                    .join(format!("{}{}", name, DEPTH_SUFFIX))
                    .join(&tick_file),
            )?;

            let CameraInfo {
                rotation,
                translation,
                intrinsics: intrinsic,
            } = camera_info(spec);

            // one augmentation per sensor, shared by all three image
            // variants; only the rgb call's homography is kept
            let params = self.augmenter.sample(rng);
            let (semantic, _, _) = self.augmenter.transform_image(
                &semantic,
                &Tensor::eye(2, FLOAT_CPU),
                &Tensor::zeros(&[2], FLOAT_CPU),
                &params,
                Resample::Nearest,
            )?;
            let (depth, _, _) = self.augmenter.transform_image(
                &depth,
                &Tensor::eye(2, FLOAT_CPU),
                &Tensor::zeros(&[2], FLOAT_CPU),
                &params,
                Resample::Nearest,
            )?;
            let (rgb, post_rot, post_tran) = self.augmenter.transform_image(
                &rgb,
                &Tensor::eye(2, FLOAT_CPU),
                &Tensor::zeros(&[2], FLOAT_CPU),
                &params,
                Resample::Bilinear,
            )?;

            // embed the 2D homography, leaving the third axis untouched
            let post_rot = {
                let out = Tensor::eye(3, FLOAT_CPU);
                let mut block = out.i((0..2, 0..2));
                let _ = block.copy_(&post_rot);
                out
            };
            let post_tran = {
                let out = Tensor::zeros(&[3], FLOAT_CPU);
                let mut head = out.i(0..2);
                let _ = head.copy_(&post_tran);
                out
            };

            images.push(self.normalize.forward(&rgb));
            rotations.push(rotation);
            translations.push(translation);
            intrinsics.push(intrinsic);
            post_rotations.push(post_rot);
            post_translations.push(post_tran);
            vehicle_masks.push(rasterize_vehicle_mask(&semantic));
            depths.push(decode_depth(&depth));
        }

        Ok(Sample {
            images: Tensor::stack(&images, 0),
            rotations: Tensor::stack(&rotations, 0),
            translations: Tensor::stack(&translations, 0),
            intrinsics: Tensor::stack(&intrinsics, 0),
            post_rotations: Tensor::stack(&post_rotations, 0),
            post_translations: Tensor::stack(&post_translations, 0),
            vehicle_masks: Tensor::stack(&vehicle_masks, 0),
            depths: Tensor::stack(&depths, 0),
            occupancy,
        })
    }

    /// Iterate over all samples in index order.
    pub fn iter(&self) -> impl Iterator<Item = Result<Sample>> + '_ {
        (0..self.len()).map(move |index| self.get(index))
    }

    /// Load one camera image and check its shape against the configuration.
    fn load_camera_image(&self, path: &Path) -> Result<Tensor> {
        let image = load_image(path)?;
        let shape = image
            .size3()
            .with_context(|| format!("unexpected image layout in '{}'", path.display()))?;
        let expect = (3, self.config.image_height, self.config.image_width);
        ensure!(
            shape == expect,
            "image size does not match in '{}': expect {:?}, but get {:?}",
            path.display(),
            expect,
            shape
        );
        Ok(image)
    }
}

fn load_image(path: &Path) -> Result<Tensor> {
    vision::image::load(path)
        .with_context(|| format!("failed to load image file '{}'", path.display()))
}

fn count_ticks(agent_dir: &Path, camera: &str) -> Result<usize> {
    let pattern = agent_dir.join(camera).join("*.png");
    let pattern = pattern
        .to_str()
        .with_context(|| format!("non-utf8 path '{}'", pattern.display()))?;
    let count = glob::glob(pattern)?.filter_map(|path| path.ok()).count();
    Ok(count)
}
