use ndarray::{parallel::prelude::*, Axis};
use serde_derive::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Error, Result},
    image::{DepthConvention, DepthFrame},
    range::DepthRange,
};

/// Histogram equalization parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistogramParams {
    /// Number of histogram bins between the frame's min and max depth.
    pub size: usize,
    /// Number of output color levels, the table spans `[0, colors - 1]`.
    pub colors: usize,
    /// How many adjacent bins are merged into one before equalizing.
    /// Higher is coarser; it never changes the output span.
    pub binning_factor: usize,
}

impl Default for HistogramParams {
    fn default() -> Self {
        Self {
            size: 1024,
            colors: 256,
            binning_factor: 1,
        }
    }
}

impl HistogramParams {
    pub fn new(size: usize, colors: usize, binning_factor: usize) -> Self {
        Self {
            size,
            colors,
            binning_factor,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::invalid_parameter("histogram size must be at least 1"));
        }
        if self.colors < 2 {
            return Err(Error::invalid_parameter("histogram colors must be at least 2"));
        }
        if self.binning_factor == 0 {
            return Err(Error::invalid_parameter("binning factor must be at least 1"));
        }
        Ok(())
    }
}

/// Bin of `value` when `range` is split into `size` bins. Values at
/// `range.max` fall into the last bin.
#[inline]
pub fn bin_index(value: f32, range: &DepthRange, size: usize) -> usize {
    let t = (value - range.min) / range.extent();
    ((t * size as f32) as usize).min(size - 1)
}

/// Depth sample counts of a single frame.
///
/// Samples are counted per group of `binning_factor` adjacent bins, so a
/// higher factor keeps fewer counters.
#[derive(Clone, Debug)]
pub struct Histogram {
    counts: Vec<u32>,
    range: DepthRange,
    size: usize,
    binning_factor: usize,
}

impl Histogram {
    /// Counts the valid samples of `frame` whose metric depth lies inside
    /// `range`.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of bins between `range.min` and `range.max`.
    /// * `binning_factor` - Adjacent bins counted together, clamped into
    ///   `[1, size]`. The histogram has `ceil(size / binning_factor)` groups.
    ///
    /// # Returns
    ///
    /// * [`Error::DegenerateRange`] if `range` has no extent.
    pub fn compute(
        frame: &DepthFrame,
        range: &DepthRange,
        size: usize,
        binning_factor: usize,
        convention: &DepthConvention,
    ) -> Result<Self> {
        if size == 0 {
            return Err(Error::invalid_parameter("histogram size must be at least 1"));
        }
        if range.is_degenerate() {
            return Err(Error::DegenerateRange);
        }

        let binning_factor = binning_factor.clamp(1, size);
        let groups = (size + binning_factor - 1) / binning_factor;
        let counts = frame
            .depth
            .axis_iter(Axis(0))
            .into_par_iter()
            .fold(
                || vec![0u32; groups],
                |mut counts, row| {
                    row.iter()
                        .filter_map(|&value| convention.to_metric(value))
                        .filter(|&depth| range.contains(depth))
                        .for_each(|depth| {
                            counts[bin_index(depth, range, size) / binning_factor] += 1
                        });
                    counts
                },
            )
            .reduce(
                || vec![0u32; groups],
                |mut lhs, rhs| {
                    lhs.iter_mut().zip(rhs).for_each(|(l, r)| *l += r);
                    lhs
                },
            );

        Ok(Self {
            counts,
            range: *range,
            size,
            binning_factor,
        })
    }

    /// Counts per group of bins.
    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn range(&self) -> &DepthRange {
        &self.range
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of bins, the length of the equalized table.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn binning_factor(&self) -> usize {
        self.binning_factor
    }

    /// Number of counted samples.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Classic histogram equalization: each output level receives about the
    /// same number of samples.
    ///
    /// # Returns
    ///
    /// * One output level per bin, non-decreasing, every bin of a group
    ///   sharing the group's level. When every sample falls in the same
    ///   group there is nothing to equalize and the identity table is
    ///   returned.
    pub fn equalize(&self, colors: usize) -> EqualizationTable {
        let mut accum = 0u64;
        let cdf: Vec<u64> = self
            .counts
            .iter()
            .map(|&count| {
                accum += count as u64;
                accum
            })
            .collect();
        let total = accum;
        let cdf_min = cdf.iter().copied().find(|&c| c > 0).unwrap_or(0);

        if total == cdf_min {
            return EqualizationTable::identity(self.size, colors);
        }

        let top = colors.saturating_sub(1) as f64;
        let denom = (total - cdf_min) as f64;
        let values = (0..self.size)
            .map(|bin| {
                let c = cdf[bin / self.binning_factor];
                (top * c.saturating_sub(cdf_min) as f64 / denom) as f32
            })
            .collect();

        EqualizationTable { values, colors }
    }
}

/// Depth bin to display level lookup table.
#[derive(Clone, Debug, PartialEq)]
pub struct EqualizationTable {
    values: Vec<f32>,
    colors: usize,
}

impl EqualizationTable {
    /// The linear ramp `[0, colors - 1]` over `size` bins.
    pub fn identity(size: usize, colors: usize) -> Self {
        let top = colors.saturating_sub(1) as f32;
        let values = match size {
            0 => Vec::new(),
            1 => vec![0.0],
            _ => (0..size)
                .map(|bin| top * bin as f32 / (size - 1) as f32)
                .collect(),
        };
        Self { values, colors }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn colors(&self) -> usize {
        self.colors
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_monotonic(&self) -> bool {
        self.values.windows(2).all(|pair| pair[0] <= pair[1])
    }

    /// Output level of the metric `depth` given the range the table was built for.
    /// Values outside the range clamp to its ends.
    #[inline]
    pub fn level(&self, depth: f32, range: &DepthRange) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        if range.is_degenerate() {
            return self.values[0];
        }
        let depth = depth.clamp(range.min, range.max);
        self.values[bin_index(depth, range, self.values.len())]
    }

    /// Same as [`EqualizationTable::level`] but normalized into `[0, 1]`.
    #[inline]
    pub fn normalized(&self, depth: f32, range: &DepthRange) -> f32 {
        self.level(depth, range) / (self.colors.max(2) - 1) as f32
    }
}

/// Builds per frame equalization tables. Holds no state between frames.
#[derive(Clone, Debug, Default)]
pub struct HistogramEqualizer {
    pub params: HistogramParams,
}

impl HistogramEqualizer {
    pub fn new(params: HistogramParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Equalization table for `frame`.
    ///
    /// # Arguments
    ///
    /// * `frame` - The depth frame.
    /// * `range` - The frame range, `None` when the range extraction found
    ///   no valid sample.
    /// * `convention` - Which samples are valid.
    ///
    /// # Returns
    ///
    /// * The equalized table, or the identity table on an empty or
    ///   degenerate range.
    pub fn equalize(
        &self,
        frame: &DepthFrame,
        range: Option<&DepthRange>,
        convention: &DepthConvention,
    ) -> EqualizationTable {
        let HistogramParams {
            size,
            colors,
            binning_factor,
        } = self.params;

        let range = match range {
            Some(range) if !range.is_degenerate() => range,
            _ => {
                debug!(?range, "No usable range, using identity table");
                return EqualizationTable::identity(size, colors);
            }
        };

        match Histogram::compute(frame, range, size, binning_factor, convention) {
            Ok(histogram) => histogram.equalize(colors),
            Err(_) => EqualizationTable::identity(size, colors),
        }
    }
}
