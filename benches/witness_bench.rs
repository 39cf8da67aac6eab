//! Benchmarks for field arithmetic and witness evaluation

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::Rng;

use witness_calc::{
    Circuit, CircuitBuilder, FieldElement, Relation, Template, TemplateId, TemplateRegistry,
    WitnessCalculator,
};

fn rand_fe(rng: &mut impl Rng) -> FieldElement {
    FieldElement::from_raw([
        rng.gen(),
        rng.gen(),
        rng.gen(),
        rng.gen::<u64>() & 0x0fff_ffff_ffff_ffff,
    ])
}

fn bench_field_mul(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let a = rand_fe(&mut rng);
    let b = rand_fe(&mut rng);
    c.bench_function("field_mul", |bench| {
        bench.iter(|| black_box(a) * black_box(b))
    });
}

fn bench_field_inverse(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let a = rand_fe(&mut rng);
    c.bench_function("field_inverse", |bench| {
        bench.iter(|| black_box(a).inverse())
    });
}

fn chain_circuit(registry: &TemplateRegistry, id: TemplateId, len: usize) -> Circuit {
    let mut builder = CircuitBuilder::new(registry);
    let mut prev = builder.instantiate(id).unwrap();
    for _ in 1..len {
        let next = builder.instantiate(id).unwrap();
        builder.connect(prev, "out", next, "in").unwrap();
        prev = next;
    }
    builder.build().unwrap()
}

fn bench_pass_through_chain(c: &mut Criterion) {
    let mut registry = TemplateRegistry::new();
    let id = registry.register(
        Template::builder("Forward")
            .input("in")
            .output("out")
            .relation(Relation::PassThrough)
            .build()
            .unwrap(),
    );
    let circuit = chain_circuit(&registry, id, 64);

    c.bench_function("pass_through_chain_64", |bench| {
        bench.iter_batched(
            || {
                let mut calc = WitnessCalculator::new(&registry, &circuit);
                calc.set_input("in", FieldElement::from_u64(5)).unwrap();
                calc
            },
            |mut calc| calc.compute().unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(
    benches,
    bench_field_mul,
    bench_field_inverse,
    bench_pass_through_chain
);
criterion_main!(benches);
