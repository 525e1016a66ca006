use criterion::{criterion_group, criterion_main, Criterion};
use depthcloud::{
    camera::CameraIntrinsics,
    viz::{
        reproject, OrbitParams, PointCloudRenderer, PointRenderer, RenderParams, SoftwareBackend,
    },
    ColorFrame, DepthConvention, DepthFrame, RgbdFrame,
};
use ndarray::Array2;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn render_benchmark(c: &mut Criterion) {
    let depth = {
        let mut rng = StdRng::seed_from_u64(5);
        DepthFrame::new(Array2::from_shape_fn((480, 640), |_| rng.gen_range(0.5..4.0)))
    };
    let color = ColorFrame::uniform(640, 480, [128, 200, 64]);
    let intrinsics = CameraIntrinsics::default();
    let convention = DepthConvention::default();
    let params = RenderParams::default();

    c.bench_function("reprojection", |b| {
        let alignment = RgbdFrame::new(depth.clone(), color.clone())
            .alignment()
            .unwrap();
        b.iter(|| reproject(&depth, &color, &intrinsics, &alignment, &convention));
    });

    let renderer = PointCloudRenderer::new(
        SoftwareBackend::new(&params).unwrap(),
        intrinsics.clone(),
        convention,
        OrbitParams::default(),
        params,
    )
    .unwrap();
    c.bench_function("submit frame", |b| {
        b.iter(|| renderer.submit_frame(&depth, &color).unwrap());
    });
    c.bench_function("redraw", |b| {
        renderer.yaw(0.1);
        b.iter(|| renderer.render().unwrap());
    });
}

criterion_group!(benches, render_benchmark);
criterion_main!(benches);
