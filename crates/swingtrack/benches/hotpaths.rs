use std::f64::consts::PI;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use swingtrack::config::{default_bob_range, default_pivot_range};
use swingtrack::extrema::{find_local_maxima, ExtremaExtractor, PeakOptions};
use swingtrack::period::{estimate_period, PeriodConfig};
use swingtrack::{extract_markers, AngleSeries, ExtractConfig};

/// Full HD frame with a noisy background, a red bob and a green pivot.
fn make_frame_fixture(w: u32, h: u32, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = RgbImage::from_fn(w, h, |_, _| {
        let g: u8 = rng.gen_range(20..90);
        Rgb([g, g, g])
    });
    let disks = [
        ([w as i64 / 2 + 120, h as i64 * 3 / 4], 40i64, Rgb([230u8, 20, 30])),
        ([w as i64 / 2, h as i64 / 8], 25i64, Rgb([30u8, 220, 40])),
    ];
    for (center, r, color) in disks {
        for y in (center[1] - r).max(0)..(center[1] + r).min(h as i64) {
            for x in (center[0] - r).max(0)..(center[0] + r).min(w as i64) {
                let (dx, dy) = (x - center[0], y - center[1]);
                if dx * dx + dy * dy <= r * r {
                    img.put_pixel(x as u32, y as u32, color);
                }
            }
        }
    }
    img
}

/// Damped swing sampled at `fps` with small angle noise.
fn make_series_fixture(fps: f64, seconds: f64, seed: u64) -> AngleSeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut series = AngleSeries::new();
    for i in 0..(fps * seconds) as usize {
        let t = i as f64 / fps;
        let a = 0.4 * (-t / 40.0).exp() * (2.0 * PI * t / 1.8).cos() + rng.gen_range(-0.003..0.003);
        series.push(t, a);
    }
    series
}

fn bench_extract(c: &mut Criterion) {
    let frame = make_frame_fixture(1920, 1080, 7);
    let scaled = ExtractConfig::new(Some([0.35, 0.35]), &default_bob_range(), &default_pivot_range());
    let native = ExtractConfig::new(None, &default_bob_range(), &default_pivot_range());

    c.bench_function("extract_markers_1920x1080_scaled", |b| {
        b.iter(|| {
            let markers = extract_markers(black_box(&frame), black_box(&scaled));
            black_box(markers.angle())
        })
    });

    c.bench_function("extract_markers_1920x1080_native", |b| {
        b.iter(|| {
            let markers = extract_markers(black_box(&frame), black_box(&native));
            black_box(markers.angle())
        })
    });
}

fn bench_extrema(c: &mut Criterion) {
    let series = make_series_fixture(30.0, 120.0, 11);
    let angles = series.angles();
    let extractor = ExtremaExtractor::default();
    let options = PeakOptions {
        min_distance: Some(10),
        min_prominence: Some(0.01),
        ..PeakOptions::default()
    };

    c.bench_function("find_local_maxima_3600_filtered", |b| {
        b.iter(|| black_box(find_local_maxima(black_box(&angles), black_box(&options)).len()))
    });

    c.bench_function("extrema_and_period_3600", |b| {
        b.iter(|| {
            let extrema = extractor.extract(black_box(&series));
            black_box(estimate_period(&extrema, &PeriodConfig::default()).ok())
        })
    });
}

criterion_group!(hotpaths, bench_extract, bench_extrema);
criterion_main!(hotpaths);
