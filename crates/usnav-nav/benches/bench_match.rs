use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{rngs::StdRng, Rng, SeedableRng};

use usnav_nav::{
    library::{Frame, FrameLibrary},
    matcher::{best_match, match_frames},
};
use usnav_pose::{
    glam::{DMat3, DVec3, EulerRot},
    Pose,
};

fn random_pose(rng: &mut StdRng) -> Pose {
    let rotation = DMat3::from_euler(
        EulerRot::XYZ,
        rng.random_range(-3.0..3.0),
        rng.random_range(-3.0..3.0),
        rng.random_range(-3.0..3.0),
    );
    let origin = DVec3::new(
        rng.random_range(-200.0..200.0),
        rng.random_range(-200.0..200.0),
        rng.random_range(-200.0..200.0),
    );
    Pose::from_rotation_translation(rotation, origin)
}

fn bench_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("MatchFrames");
    let mut rng = StdRng::seed_from_u64(42);

    for num_frames in [100, 500, 2000].iter() {
        group.throughput(criterion::Throughput::Elements(*num_frames as u64));

        let frames = (0..*num_frames)
            .map(|index| Frame {
                index,
                pose: random_pose(&mut rng),
                valid: index % 10 != 0,
                source_image_path: String::new(),
            })
            .collect();
        let library = FrameLibrary::from_frames(640, 480, frames);
        let pointer = random_pose(&mut rng);

        group.bench_with_input(
            BenchmarkId::new("match_frames", num_frames),
            &(&pointer, &library),
            |b, i| b.iter(|| match_frames(black_box(i.0), black_box(i.1))),
        );

        group.bench_with_input(
            BenchmarkId::new("best_match", num_frames),
            &(&pointer, &library),
            |b, i| b.iter(|| best_match(black_box(i.0), black_box(i.1))),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_match);
criterion_main!(benches);
