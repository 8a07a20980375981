//! Performance benchmarks for the DSP module
//!
//! Run with: cargo bench -p otic_dsp

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use otic_dsp::{EqBand, Equalizer, ToneGenerator, EQ_BANDS};

const SAMPLE_RATE: f64 = 44100.0;

fn benchmark_eq_processing(c: &mut Criterion) {
    let mut group = c.benchmark_group("equalizer");

    // Small power-of-two blocks, as used by the graph
    let block_sizes = [32, 64, 128, 256, 512];

    for size in block_sizes {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("cascade_mono_{}_frames", size), |b| {
            let mut eq = Equalizer::new(1);
            eq.set_coefficients(&EQ_BANDS.map(|band| band.coefficients(6.0, SAMPLE_RATE)));
            let mut buffer: Vec<f32> = (0..size).map(|i| (i as f32 * 0.001).sin()).collect();

            b.iter(|| {
                eq.process_interleaved(black_box(&mut buffer));
            });
        });

        group.bench_function(format!("tone_{}_frames", size), |b| {
            let mut tone = ToneGenerator::new(SAMPLE_RATE);
            tone.set_level_db(-20.0);
            let mut buffer = vec![0.0_f32; size];

            b.iter(|| {
                tone.process(black_box(&mut buffer), 1);
            });
        });
    }

    group.finish();
}

fn benchmark_coefficient_update(c: &mut Criterion) {
    c.bench_function("peaking_coefficients_all_bands", |b| {
        let mut gain = -20.0_f32;

        b.iter(|| {
            // Simulate dragging a slider across the range
            let coeffs =
                EQ_BANDS.map(|band: EqBand| band.coefficients(black_box(gain), SAMPLE_RATE));
            gain = if gain >= 30.0 { -20.0 } else { gain + 0.5 };
            black_box(coeffs)
        });
    });
}

criterion_group!(benches, benchmark_eq_processing, benchmark_coefficient_update);

criterion_main!(benches);
