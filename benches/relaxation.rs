use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::Vector3;

use rustrelax::atom::{Atom, Element};
use rustrelax::builder::{fcc111, fix_bottom_layers};
use rustrelax::calculator::harmonic::HarmonicWell;
use rustrelax::calculator::lennard_jones::LennardJones;
use rustrelax::configuration::AtomicConfiguration;
use rustrelax::driver;
use rustrelax::optimization::RelaxParams;
use rustrelax::trajectory::TrajectoryRecorder;

fn bench_harmonic_relaxation(c: &mut Criterion) {
    let calculator = HarmonicWell::new(1.0);

    c.bench_function("harmonic_relaxation", |b| {
        b.iter(|| {
            let config = AtomicConfiguration::new(vec![
                Atom::new(Element::Hydrogen, Vector3::new(0.7, -0.3, 0.4)),
                Atom::new(Element::Hydrogen, Vector3::new(-0.5, 0.6, 0.1)),
            ]);
            let params = RelaxParams::new(1e-6, 100).unwrap();
            let mut recorder = TrajectoryRecorder::in_memory();
            let result = driver::relax(&calculator, config, params, None, &mut recorder);
            let _ = black_box(result);
        })
    });
}

fn bench_slab_relaxation(c: &mut Criterion) {
    let calculator = LennardJones::new();

    c.bench_function("slab_relaxation", |b| {
        b.iter(|| {
            let mut slab = fcc111(Element::Copper, Some(1.5), (3, 3, 4), 6.0).unwrap();
            fix_bottom_layers(&mut slab, 2, 4).unwrap();
            let params = RelaxParams::new(0.0, 20).unwrap();
            let mut recorder = TrajectoryRecorder::in_memory();
            let result = driver::relax(&calculator, slab, params, None, &mut recorder);
            let _ = black_box(result);
        })
    });
}

criterion_group!(relaxation_benches, bench_harmonic_relaxation, bench_slab_relaxation);
criterion_main!(relaxation_benches);
