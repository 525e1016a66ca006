use ndarray::{parallel::prelude::*, ArrayView1, Axis};
use serde_derive::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    image::{DepthConvention, DepthFrame},
};

/// Valid depth extent of a frame. Always `min <= max`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepthRange {
    pub min: f32,
    pub max: f32,
}

impl DepthRange {
    pub fn new(min: f32, max: f32) -> Result<Self> {
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(Error::invalid_parameter(format!(
                "invalid depth range [{}, {}]",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Range of a single value.
    pub fn point(value: f32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    pub fn extent(&self) -> f32 {
        self.max - self.min
    }

    pub fn is_degenerate(&self) -> bool {
        self.extent() <= 0.0
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Element-wise union, used to merge partial scans.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

fn row_range(row: ArrayView1<f32>, convention: &DepthConvention) -> Option<DepthRange> {
    row.iter()
        .filter_map(|&value| convention.to_metric(value))
        .fold(None, |range: Option<DepthRange>, value| match range {
            None => Some(DepthRange::point(value)),
            Some(range) => Some(range.union(&DepthRange::point(value))),
        })
}

fn merge(lhs: Option<DepthRange>, rhs: Option<DepthRange>) -> Option<DepthRange> {
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => Some(lhs.union(&rhs)),
        (range, None) | (None, range) => range,
    }
}

/// Scans a depth frame for the minimum and maximum valid samples, in metric
/// depth (disparity samples are inverted first).
///
/// Every call scans the whole frame; rows are reduced in parallel and the
/// partial ranges merged.
///
/// # Arguments
///
/// * `frame` - The depth frame.
/// * `convention` - Which samples are valid.
///
/// # Returns
///
/// * The range, or [`Error::EmptyRange`] when no sample is valid.
pub fn extract_range(frame: &DepthFrame, convention: &DepthConvention) -> Result<DepthRange> {
    frame
        .depth
        .axis_iter(Axis(0))
        .into_par_iter()
        .map(|row| row_range(row, convention))
        .reduce(|| None, merge)
        .ok_or(Error::EmptyRange)
}

/// Sequential version of [`extract_range`], for small frames or
/// callers that already run inside a parallel context.
pub fn extract_range_seq(frame: &DepthFrame, convention: &DepthConvention) -> Result<DepthRange> {
    frame
        .depth
        .axis_iter(Axis(0))
        .map(|row| row_range(row, convention))
        .fold(None, merge)
        .ok_or(Error::EmptyRange)
}
