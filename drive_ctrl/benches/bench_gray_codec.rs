//! # Gray Codec Benchmark

use std::sync::Arc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use drive_lib::{gray::GrayCodec, position::PositionEncoder};

fn gray_codec_benchmark(c: &mut Criterion) {
    let codec = Arc::new(GrayCodec::new(13).unwrap());
    let encoder = PositionEncoder::new(codec.clone());

    // One status line per position, as served by the card
    let lines: Vec<String> = (0..codec.positions() as u32)
        .map(|o| encoder.status_line(o).unwrap())
        .collect();

    c.bench_function("GrayCodec::new(13)", |b| {
        b.iter(|| GrayCodec::new(black_box(13)).unwrap())
    });

    c.bench_function("GrayCodec::decode_word", |b| {
        b.iter(|| {
            for word in 0..codec.positions() as u32 {
                black_box(codec.decode_word(black_box(word)).unwrap());
            }
        })
    });

    c.bench_function("PositionEncoder::read", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(encoder.read(black_box(line), 12.5).unwrap());
            }
        })
    });
}

criterion_group!(benches, gray_codec_benchmark);
criterion_main!(benches);
