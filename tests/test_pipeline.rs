use depthcloud::{
    camera::CameraIntrinsics,
    config::PipelineConfig,
    histogram::{EqualizationTable, Histogram, HistogramEqualizer, HistogramParams},
    pipeline::{FramePipeline, RangeSource},
    range::{extract_range, DepthRange},
    viz::{FrameOutcome, PointRenderer, RenderParams},
    ColorFrame, DepthConvention, DepthFrame,
};
use ndarray::Array2;

fn config_4x4() -> PipelineConfig {
    let mut intrinsics = CameraIntrinsics::from_simple_intrinsic(4.0, 4.0, 1.5, 1.5);
    intrinsics.size(4, 4);
    PipelineConfig {
        histogram: HistogramParams::new(8, 256, 1),
        intrinsics,
        render: RenderParams {
            width: 64,
            height: 64,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn ramp_frame_end_to_end() {
    let depth = DepthFrame::from_vec(4, 4, (1..=16).map(|v| v as f32).collect()).unwrap();
    let convention = DepthConvention::default();

    let range = extract_range(&depth, &convention).unwrap();
    assert_eq!(range, DepthRange { min: 1.0, max: 16.0 });

    let histogram = Histogram::compute(&depth, &range, 8, 1, &convention).unwrap();
    assert_eq!(histogram.counts().iter().sum::<u32>(), 16);

    let table = HistogramEqualizer::new(HistogramParams::new(8, 256, 1))
        .unwrap()
        .equalize(&depth, Some(&range), &convention);
    assert!(table.is_monotonic());
    assert_eq!(table.values().first(), Some(&0.0));
    assert_eq!(table.values().last(), Some(&255.0));

    let mut pipeline = FramePipeline::with_software_backend(config_4x4()).unwrap();
    let report = pipeline
        .process(&depth, &ColorFrame::uniform(4, 4, [255, 255, 255]))
        .unwrap();
    assert_eq!(report.range, Some(range));
    assert_eq!(report.table, table);
    assert_eq!(report.false_color.dimensions(), (4, 4));
    match report.outcome {
        FrameOutcome::Rendered(rendered) => {
            assert_eq!(rendered.num_points, 16);
            assert!(rendered
                .image
                .rgba
                .chunks(4)
                .any(|p| p == [255, 255, 255, 255]));
        }
        FrameOutcome::Dropped => panic!("single producer frame dropped"),
    }
}

#[test]
fn all_nan_frame_end_to_end() {
    let depth = DepthFrame::new(Array2::from_elem((4, 4), f32::NAN));
    let convention = DepthConvention::default();

    assert!(matches!(
        extract_range(&depth, &convention),
        Err(depthcloud::error::Error::EmptyRange)
    ));

    let table = HistogramEqualizer::new(HistogramParams::new(8, 256, 1))
        .unwrap()
        .equalize(&depth, None, &convention);
    assert_eq!(table, EqualizationTable::identity(8, 256));
    assert!(table.values().iter().all(|v| v.is_finite()));

    let mut pipeline = FramePipeline::with_software_backend(config_4x4()).unwrap();
    let report = pipeline
        .process(&depth, &ColorFrame::uniform(4, 4, [9, 9, 9]))
        .unwrap();
    assert_eq!(report.range_source, RangeSource::Identity);
    assert_eq!(report.table, table);
}

#[test]
fn orbit_then_redraw_changes_view() {
    let mut pipeline = FramePipeline::with_software_backend(config_4x4()).unwrap();
    let depth = DepthFrame::new(Array2::from_elem((4, 4), 1.5));
    pipeline
        .process(&depth, &ColorFrame::uniform(4, 4, [200, 0, 0]))
        .unwrap();

    let renderer = pipeline.renderer();
    let front = renderer.render().unwrap();

    renderer.yaw(std::f32::consts::PI);
    let back = renderer.render().unwrap();
    // The plane lies past the center, so it stays in view after turning around.
    assert!(back.rgba.chunks(4).any(|p| p == [200, 0, 0, 255]));

    renderer.yaw(-std::f32::consts::PI);
    assert_eq!(renderer.render().unwrap(), front);

    renderer.move_toward_center(0.5);
    renderer.reset_view();
    assert_eq!(renderer.render().unwrap(), front);
}
