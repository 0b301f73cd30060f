//! Step throughput benchmarks

use chipsim::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// `stages` copies of a one-bit full adder chained through their carries
fn ripple_adder(stages: u32) -> (ChipLibrary, ChipDescription) {
    let full_adder = ChipDescription::new("FULL ADDER")
        .with_input(0, "a")
        .with_input(1, "b")
        .with_input(2, "cin")
        .with_output(3, "sum")
        .with_output(4, "cout")
        .with_sub_chip("XOR", 0)
        .with_sub_chip("XOR", 1)
        .with_sub_chip("AND", 2)
        .with_sub_chip("AND", 3)
        .with_sub_chip("OR", 4)
        .with_connection(PinAddress::parent_input(0), PinAddress::child_input(0, 0))
        .with_connection(PinAddress::parent_input(1), PinAddress::child_input(0, 1))
        .with_connection(PinAddress::child_output(0, 2), PinAddress::child_input(1, 0))
        .with_connection(PinAddress::parent_input(2), PinAddress::child_input(1, 1))
        .with_connection(PinAddress::parent_input(0), PinAddress::child_input(2, 0))
        .with_connection(PinAddress::parent_input(1), PinAddress::child_input(2, 1))
        .with_connection(PinAddress::child_output(0, 2), PinAddress::child_input(3, 0))
        .with_connection(PinAddress::parent_input(2), PinAddress::child_input(3, 1))
        .with_connection(PinAddress::child_output(2, 2), PinAddress::child_input(4, 0))
        .with_connection(PinAddress::child_output(3, 2), PinAddress::child_input(4, 1))
        .with_connection(PinAddress::child_output(1, 2), PinAddress::parent_output(3))
        .with_connection(PinAddress::child_output(4, 2), PinAddress::parent_output(4));

    // Inputs: a0..an, b0..bn; outputs: s0..sn
    let mut adder = ChipDescription::new("ADDER");
    for i in 0..stages {
        adder = adder.with_input(i, format!("a{}", i));
    }
    for i in 0..stages {
        adder = adder.with_input(stages + i, format!("b{}", i));
    }
    for i in 0..stages {
        let out = 2 * stages + i;
        adder = adder
            .with_output(out, format!("s{}", i))
            .with_sub_chip("FULL ADDER", i)
            .with_connection(PinAddress::parent_input(i), PinAddress::child_input(i, 0))
            .with_connection(PinAddress::parent_input(stages + i), PinAddress::child_input(i, 1))
            .with_connection(PinAddress::child_output(i, 3), PinAddress::parent_output(out));
        if i > 0 {
            adder = adder.with_connection(
                PinAddress::child_output(i - 1, 4),
                PinAddress::child_input(i, 2),
            );
        }
    }

    let library = ChipLibrary::new()
        .with(full_adder)
        .expect("FULL ADDER is not a primitive name");
    (library, adder)
}

fn benchmark_ripple_adder(c: &mut Criterion) {
    let mut group = c.benchmark_group("ripple_adder_step");

    for stages in [4u32, 16, 64] {
        let (library, adder) = ripple_adder(stages);
        let mut sim = Simulator::from_description(library, &adder, SimulationConfig::default())
            .expect("adder builds");
        let inputs: Vec<PinState> = (0..2 * stages)
            .map(|i| PinState::from_bool(i % 3 == 0))
            .collect();

        group.throughput(Throughput::Elements(u64::from(stages) * 5));
        group.bench_with_input(BenchmarkId::from_parameter(stages), &inputs, |b, inputs| {
            let mut frame = 0u64;
            b.iter(|| {
                frame += 1;
                sim.step(black_box(inputs), SimTime::new(0.0, frame))
                    .expect("input vector matches");
                black_box(sim.outputs())
            });
        });
    }

    group.finish();
}

fn benchmark_feedback_ring(c: &mut Criterion) {
    let mut ring = ChipDescription::new("RING").with_output(0, "y");
    let length = 101u32;
    for i in 0..length {
        ring = ring.with_sub_chip("NOT", i).with_connection(
            PinAddress::child_output(i, 1),
            PinAddress::child_input((i + 1) % length, 0),
        );
    }
    ring = ring.with_connection(PinAddress::child_output(0, 1), PinAddress::parent_output(0));
    let mut sim =
        Simulator::from_description(ChipLibrary::new(), &ring, SimulationConfig::default())
            .expect("ring builds");

    c.bench_function("ring_oscillator_101", |b| {
        b.iter(|| {
            sim.step(&[], SimTime::default()).expect("no inputs");
            black_box(sim.outputs())
        });
    });
}

criterion_group!(benches, benchmark_ripple_adder, benchmark_feedback_ring);
criterion_main!(benches);
