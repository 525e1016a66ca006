use std::sync::Arc;

use image::RgbaImage;
use ndarray::Array3;
use tracing::{debug, info, warn};

use crate::{
    config::{PipelineConfig, PointColorSource},
    error::{Error, Result},
    histogram::{EqualizationTable, HistogramEqualizer},
    image::{ColorFrame, DepthFrame},
    range::{extract_range, DepthRange},
    viz::{FrameOutcome, PointCloudRenderer, PointRenderer, SoftwareBackend},
};

/// Where the range used for a frame came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RangeSource {
    /// Extracted from the frame itself.
    Frame,
    /// The frame had no valid sample, the previous frame's range and table were reused.
    Previous,
    /// No valid sample so far, the identity table was used.
    Identity,
}

/// Result of one pass of the pipeline.
#[derive(Debug)]
pub struct FrameReport {
    pub range: Option<DepthRange>,
    pub range_source: RangeSource,
    pub table: EqualizationTable,
    pub false_color: RgbaImage,
    pub outcome: FrameOutcome,
}

/// The per frame analyze, map and render loop.
///
/// Owned by the thread that receives frames. The renderer is shared so the
/// input thread can send camera commands through [`FramePipeline::renderer`].
pub struct FramePipeline<R> {
    config: PipelineConfig,
    equalizer: HistogramEqualizer,
    renderer: Arc<R>,
    last: Option<(DepthRange, EqualizationTable)>,
}

impl FramePipeline<PointCloudRenderer<SoftwareBackend>> {
    /// Pipeline drawing with the [`SoftwareBackend`].
    pub fn with_software_backend(config: PipelineConfig) -> Result<Self> {
        let renderer = PointCloudRenderer::new(
            SoftwareBackend::new(&config.render)?,
            config.intrinsics.clone(),
            config.convention,
            config.orbit,
            config.render,
        )?;
        Self::new(config, Arc::new(renderer))
    }
}

impl<R: PointRenderer> FramePipeline<R> {
    pub fn new(config: PipelineConfig, renderer: Arc<R>) -> Result<Self> {
        config.validate()?;
        info!(histogram = ?config.histogram, "Creating depth frame pipeline");
        Ok(Self {
            equalizer: HistogramEqualizer::new(config.histogram)?,
            config,
            renderer,
            last: None,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn renderer(&self) -> Arc<R> {
        self.renderer.clone()
    }

    /// Range and table of `depth`, falling back to the previous accepted
    /// frame or to the identity table when it has no valid sample.
    pub fn analyze(
        &self,
        depth: &DepthFrame,
    ) -> Result<(Option<DepthRange>, RangeSource, EqualizationTable)> {
        let convention = &self.config.convention;
        match extract_range(depth, convention) {
            Ok(range) => {
                let table = self.equalizer.equalize(depth, Some(&range), convention);
                debug!(min = range.min, max = range.max, "Frame depth range");
                Ok((Some(range), RangeSource::Frame, table))
            }
            Err(Error::EmptyRange) => match &self.last {
                Some((range, table)) => {
                    warn!("Frame has no valid depth, reusing the previous range");
                    Ok((Some(*range), RangeSource::Previous, table.clone()))
                }
                None => {
                    warn!("Frame has no valid depth, using the identity table");
                    let params = self.config.histogram;
                    Ok((
                        None,
                        RangeSource::Identity,
                        EqualizationTable::identity(params.size, params.colors),
                    ))
                }
            },
            Err(err) => Err(err),
        }
    }

    /// Runs one depth/color pair through the whole pipeline.
    pub fn process(&mut self, depth: &DepthFrame, color: &ColorFrame) -> Result<FrameReport> {
        let (range, range_source, table) = self.analyze(depth)?;
        let false_color = self.config.colorizer.colorize(
            depth,
            &table,
            range.as_ref(),
            &self.config.convention,
        )?;

        let outcome = match self.config.point_colors {
            PointColorSource::Camera => self.renderer.submit_frame(depth, color)?,
            PointColorSource::Equalized => self
                .renderer
                .submit_frame(depth, &rgba_to_color_frame(&false_color))?,
        };

        // Only frames the renderer accepted become the fallback.
        if let (Some(range), RangeSource::Frame) = (range, range_source) {
            self.last = Some((range, table.clone()));
        }

        Ok(FrameReport {
            range,
            range_source,
            table,
            false_color,
            outcome,
        })
    }
}

/// Drops the alpha channel of an RGBA image.
pub fn rgba_to_color_frame(image: &RgbaImage) -> ColorFrame {
    let (width, height) = image.dimensions();
    ColorFrame {
        color: Array3::from_shape_fn((height as usize, width as usize, 3), |(row, col, c)| {
            image.get_pixel(col as u32, row as u32)[c]
        }),
    }
}
