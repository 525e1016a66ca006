use std::{fs::File, io::BufReader, path::Path};

use serde_derive::{Deserialize, Serialize};

use crate::{
    camera::CameraIntrinsics,
    colormap::DepthColorizer,
    error::Result,
    histogram::HistogramParams,
    image::DepthConvention,
    viz::{OrbitParams, RenderParams},
};

/// Where the point cloud takes its colors from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointColorSource {
    /// The color camera frame.
    #[default]
    Camera,
    /// The equalized false color depth image.
    Equalized,
}

/// Everything that is set once for a depth stream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub histogram: HistogramParams,
    pub convention: DepthConvention,
    pub intrinsics: CameraIntrinsics,
    pub orbit: OrbitParams,
    pub render: RenderParams,
    pub colorizer: DepthColorizer,
    pub point_colors: PointColorSource,
}

impl PipelineConfig {
    /// Reads a JSON configuration, missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: PipelineConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.histogram.validate()?;
        self.convention.validate()?;
        self.intrinsics.validate()?;
        self.orbit.validate()?;
        self.render.validate()
    }
}
