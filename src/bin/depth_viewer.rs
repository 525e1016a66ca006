use std::path::PathBuf;

use clap::Parser;
use depthcloud::{
    config::PipelineConfig,
    pipeline::FramePipeline,
    viz::{FrameOutcome, PointRenderer},
    ColorFrame, DepthFrame,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
struct CommandLine {
    /// 16 bits depth image, 0 marks missing samples.
    depth: PathBuf,
    /// Color image registered with the depth image.
    #[clap(short, long)]
    color: Option<PathBuf>,
    /// JSON pipeline configuration.
    #[clap(long)]
    config: Option<PathBuf>,
    /// Depth image units in meters.
    #[clap(long, default_value = "0.001")]
    depth_scale: f32,
    /// Where the false color and point cloud images are written.
    #[clap(short, long, default_value = ".")]
    output: PathBuf,
    #[clap(long, default_value = "0.0", allow_hyphen_values = true)]
    yaw: f32,
    #[clap(long, default_value = "0.0", allow_hyphen_values = true)]
    pitch: f32,
    #[clap(long, default_value = "0.0", allow_hyphen_values = true)]
    roll: f32,
    /// Fraction of the distance to move toward the center.
    #[clap(long, default_value = "0.0", allow_hyphen_values = true)]
    zoom: f32,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CommandLine::parse();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    let depth = DepthFrame::from_luma16(&image::open(&args.depth)?.into_luma16(), args.depth_scale);
    let color = match &args.color {
        Some(path) => ColorFrame::from_rgb_image(image::open(path)?.into_rgb8()),
        None => ColorFrame::uniform(depth.width(), depth.height(), [255, 255, 255]),
    };

    let mut pipeline = FramePipeline::with_software_backend(config)?;
    let renderer = pipeline.renderer();

    let report = pipeline.process(&depth, &color)?;
    info!(range = ?report.range, source = ?report.range_source, "Processed frame");
    report
        .false_color
        .save(args.output.join("false_color.png"))?;

    renderer.yaw(args.yaw);
    renderer.pitch(args.pitch);
    renderer.roll(args.roll);
    renderer.move_toward_center(args.zoom);

    if let FrameOutcome::Rendered(rendered) = report.outcome {
        info!(points = rendered.num_points, "Point cloud uploaded");
    }
    renderer
        .render()?
        .to_image()
        .save(args.output.join("point_cloud.png"))?;

    Ok(())
}
