//! Criterion benchmarks for whole-world saves.
//!
//! - `save`: encode a populated world to bytes.
//! - `load`: decode it again, including materializing the embedded map.

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use skirmish_persist::GameVariant;
use skirmish_world::test_utils::{SaveFixture, populate};

const UNITS: [usize; 2] = [200, 2_000];

fn bench_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("save");
    group.sample_size(30);

    for units in UNITS {
        let fixture = SaveFixture::new(GameVariant::ZeroHour);
        let mut world = fixture.world();
        populate(&mut world, units);

        group.bench_function(format!("{units}_objects"), |b| {
            b.iter(|| {
                fixture.save_game.write_to_bytes(&mut world).unwrap();
            });
        });
    }

    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");
    group.sample_size(30);

    for units in UNITS {
        let fixture = SaveFixture::new(GameVariant::ZeroHour);
        let mut world = fixture.world();
        populate(&mut world, units);
        let bytes = fixture.save_game.write_to_bytes(&mut world).unwrap();

        group.bench_function(format!("{units}_objects"), |b| {
            b.iter_batched(
                || (bytes.clone(), fixture.session()),
                |(bytes, mut session)| {
                    fixture.save_game.read_from_bytes(bytes, &mut session).unwrap();
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_save, bench_load);
criterion_main!(benches);
