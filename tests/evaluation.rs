//! End-to-end witness computation scenarios

use witness_calc::{
    CircuitBuilder, ComponentFn, ComponentIndex, Expr, FieldElement, InputMap, InstanceState,
    Relation, SignalKey, Template, TemplateId, TemplateRegistry, WitnessCalculator, WitnessError,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn position_check_registry() -> (TemplateRegistry, TemplateId) {
    let mut registry = TemplateRegistry::new();
    let id = registry.register(
        Template::builder("PositionCheck")
            .public_input("position")
            .output("isValid")
            .relation(Relation::PassThrough)
            .build()
            .unwrap(),
    );
    (registry, id)
}

fn forward_registry() -> (TemplateRegistry, TemplateId) {
    let mut registry = TemplateRegistry::new();
    let id = registry.register(
        Template::builder("Forward")
            .input("in")
            .output("out")
            .build()
            .unwrap(),
    );
    (registry, id)
}

#[test]
fn pass_through_forwards_the_input() {
    init_tracing();
    let (registry, id) = position_check_registry();
    let mut builder = CircuitBuilder::new(&registry);
    let main = builder.instantiate(id).unwrap();
    let circuit = builder.build().unwrap();

    let mut calc = WitnessCalculator::new(&registry, &circuit);
    calc.set_input("position", FieldElement::from_u64(5)).unwrap();
    calc.compute().unwrap();

    assert_eq!(
        calc.signal(main, "isValid").unwrap(),
        vec![FieldElement::from_u64(5)]
    );
    assert_eq!(calc.state(main).unwrap(), InstanceState::Done);

    let witness = calc.into_witness().unwrap();
    assert_eq!(witness.len(), 2);
    // both the public input and the output are exposed
    assert_eq!(
        witness.public_values(),
        vec![FieldElement::from_u64(5), FieldElement::from_u64(5)]
    );
}

#[test]
fn pass_through_at_the_field_maximum() {
    let (registry, id) = position_check_registry();
    let mut builder = CircuitBuilder::new(&registry);
    let main = builder.instantiate(id).unwrap();
    let circuit = builder.build().unwrap();

    let max = FieldElement::from_decimal(
        "21888242871839275222246405745257275088548364400416034343698204186575808495616",
    )
    .unwrap();

    let mut calc = WitnessCalculator::new(&registry, &circuit);
    calc.set_input("position", max).unwrap();
    calc.compute().unwrap();

    // p - 1 passes through without wraparound
    assert_eq!(calc.signal(main, "isValid").unwrap(), vec![max]);
}

#[test]
fn undeclared_signal_resolution_is_fatal() {
    let (registry, id) = position_check_registry();
    let mut builder = CircuitBuilder::new(&registry);
    let main = builder.instantiate(id).unwrap();
    let circuit = builder.build().unwrap();

    let mut calc = WitnessCalculator::new(&registry, &circuit);
    assert!(matches!(
        calc.signal(main, "undeclared"),
        Err(WitnessError::UnknownSignal { .. })
    ));
    assert!(matches!(
        calc.set_input("undeclared", FieldElement::ONE),
        Err(WitnessError::UnknownSignal { .. })
    ));
    assert!(matches!(
        calc.signal_offset(main, SignalKey::from_name("undeclared")),
        Err(WitnessError::UnknownSignal { .. })
    ));
    // no witness is produced for the run
    assert!(matches!(
        calc.into_witness(),
        Err(WitnessError::Incomplete(_))
    ));
}

#[test]
fn chain_evaluates_sources_before_readers() {
    init_tracing();
    let (registry, id) = forward_registry();
    let mut builder = CircuitBuilder::new(&registry);
    let a = builder.instantiate(id).unwrap();
    let b = builder.instantiate(id).unwrap();
    let c = builder.instantiate(id).unwrap();
    builder.connect(a, "out", b, "in").unwrap();
    builder.connect(b, "out", c, "in").unwrap();
    let circuit = builder.build().unwrap();

    assert_eq!(circuit.evaluation_order(), &[a, b, c]);

    let mut calc = WitnessCalculator::new(&registry, &circuit);
    calc.set_input_for(a, "in", &[FieldElement::from_u64(77)])
        .unwrap();
    calc.compute().unwrap();

    for idx in [a, b, c] {
        assert_eq!(calc.state(idx).unwrap(), InstanceState::Done);
        assert_eq!(
            calc.signal(idx, "out").unwrap(),
            vec![FieldElement::from_u64(77)]
        );
    }
}

#[cfg(debug_assertions)]
#[test]
fn out_of_order_evaluation_is_diagnosed() {
    let (registry, id) = forward_registry();
    let mut builder = CircuitBuilder::new(&registry);
    let a = builder.instantiate(id).unwrap();
    let b = builder.instantiate(id).unwrap();
    builder.connect(a, "out", b, "in").unwrap();
    let circuit = builder.build().unwrap();

    let mut calc = WitnessCalculator::new(&registry, &circuit);
    calc.set_input_for(a, "in", &[FieldElement::ONE]).unwrap();

    // evaluating the reader before its source reads an unwritten slot
    assert!(matches!(
        calc.evaluate(b),
        Err(WitnessError::UnwrittenRead { .. })
    ));
}

#[test]
fn instances_are_evaluated_exactly_once() {
    let (registry, id) = position_check_registry();
    let mut builder = CircuitBuilder::new(&registry);
    let main = builder.instantiate(id).unwrap();
    let circuit = builder.build().unwrap();

    let mut calc = WitnessCalculator::new(&registry, &circuit);
    calc.set_input("position", FieldElement::ONE).unwrap();
    calc.compute().unwrap();

    // Done is terminal; re-entering evaluation is a protocol violation
    assert!(matches!(
        calc.evaluate(main),
        Err(WitnessError::AlreadyEvaluated(_))
    ));
    // and so is a second completion signal
    assert!(matches!(
        calc.finished(main),
        Err(WitnessError::DoubleCompletion(_))
    ));
}

#[test]
fn expression_template_with_intermediate() {
    let mut registry = TemplateRegistry::new();
    // t = a * b; sum = a + b; scaled = t + t
    let id = registry.register(
        Template::builder("SumScale")
            .input("a")
            .input("b")
            .output("sum")
            .output("scaled")
            .intermediate("t")
            .relation(Relation::Expressions {
                intermediates: vec![Expr::input(0).mul(Expr::input(1))],
                outputs: vec![
                    Expr::input(0).add(Expr::input(1)),
                    Expr::intermediate(0).add(Expr::intermediate(0)),
                ],
            })
            .build()
            .unwrap(),
    );
    let mut builder = CircuitBuilder::new(&registry);
    let main = builder.instantiate(id).unwrap();
    let circuit = builder.build().unwrap();

    let mut calc = WitnessCalculator::new(&registry, &circuit);
    calc.set_input("a", FieldElement::from_u64(6)).unwrap();
    calc.set_input("b", FieldElement::from_u64(7)).unwrap();
    calc.compute().unwrap();

    assert_eq!(
        calc.signal(main, "sum").unwrap(),
        vec![FieldElement::from_u64(13)]
    );
    assert_eq!(
        calc.signal(main, "scaled").unwrap(),
        vec![FieldElement::from_u64(84)]
    );
    // the intermediate is part of the witness
    assert_eq!(
        calc.signal(main, "t").unwrap(),
        vec![FieldElement::from_u64(42)]
    );
}

#[test]
fn array_signals_read_and_write_contiguously() {
    let mut registry = TemplateRegistry::new();
    let id = registry.register(
        Template::builder("Window")
            .input_array("coords", 2)
            .output_array("bounds", 2)
            .build()
            .unwrap(),
    );
    let mut builder = CircuitBuilder::new(&registry);
    let main = builder.instantiate(id).unwrap();
    let circuit = builder.build().unwrap();

    let mut calc = WitnessCalculator::new(&registry, &circuit);
    calc.set_input_array(
        "coords",
        &[FieldElement::from_u64(3), FieldElement::from_u64(4)],
    )
    .unwrap();
    calc.compute().unwrap();

    assert_eq!(
        calc.signal(main, "bounds").unwrap(),
        vec![FieldElement::from_u64(3), FieldElement::from_u64(4)]
    );
}

/// Generated-style component function driving the host protocol directly
struct Doubler;

impl ComponentFn for Doubler {
    fn evaluate(
        &self,
        host: &mut WitnessCalculator<'_>,
        idx: ComponentIndex,
    ) -> Result<(), WitnessError> {
        let in_offset = host.signal_offset(idx, SignalKey::from_name("in"))?;
        let out_offset = host.signal_offset(idx, SignalKey::from_name("out"))?;
        let values = host.read_signals(idx, idx, in_offset, 1)?;
        let doubled = values[0] + values[0];
        host.write_signals(idx, idx, out_offset, &[doubled])?;
        host.finished(idx)
    }
}

#[test]
fn custom_component_follows_the_protocol() {
    init_tracing();
    let mut registry = TemplateRegistry::new();
    let id = registry.register(
        Template::builder("Doubler")
            .input("in")
            .output("out")
            .relation(Relation::Custom(std::sync::Arc::new(Doubler)))
            .build()
            .unwrap(),
    );
    let mut builder = CircuitBuilder::new(&registry);
    let main = builder.instantiate(id).unwrap();
    let circuit = builder.build().unwrap();

    let mut calc = WitnessCalculator::new(&registry, &circuit);
    calc.set_input("in", FieldElement::from_u64(5)).unwrap();
    calc.compute().unwrap();

    assert_eq!(
        calc.signal(main, "out").unwrap(),
        vec![FieldElement::from_u64(10)]
    );
}

/// Component function that forgets the completion signal
struct Silent;

impl ComponentFn for Silent {
    fn evaluate(
        &self,
        host: &mut WitnessCalculator<'_>,
        idx: ComponentIndex,
    ) -> Result<(), WitnessError> {
        let in_offset = host.signal_offset(idx, SignalKey::from_name("in"))?;
        let out_offset = host.signal_offset(idx, SignalKey::from_name("out"))?;
        let values = host.read_signals(idx, idx, in_offset, 1)?;
        host.write_signals(idx, idx, out_offset, &values)
    }
}

#[test]
fn missing_completion_signal_is_fatal() {
    let mut registry = TemplateRegistry::new();
    let id = registry.register(
        Template::builder("Silent")
            .input("in")
            .output("out")
            .relation(Relation::Custom(std::sync::Arc::new(Silent)))
            .build()
            .unwrap(),
    );
    let mut builder = CircuitBuilder::new(&registry);
    builder.instantiate(id).unwrap();
    let circuit = builder.build().unwrap();

    let mut calc = WitnessCalculator::new(&registry, &circuit);
    calc.set_input("in", FieldElement::ONE).unwrap();
    assert!(matches!(
        calc.compute(),
        Err(WitnessError::MissingCompletion(_))
    ));
}

#[cfg(debug_assertions)]
/// Component function that writes its output twice
struct Chatty;

#[cfg(debug_assertions)]
impl ComponentFn for Chatty {
    fn evaluate(
        &self,
        host: &mut WitnessCalculator<'_>,
        idx: ComponentIndex,
    ) -> Result<(), WitnessError> {
        let out_offset = host.signal_offset(idx, SignalKey::from_name("out"))?;
        host.write_signals(idx, idx, out_offset, &[FieldElement::ONE])?;
        host.write_signals(idx, idx, out_offset, &[FieldElement::ONE])?;
        host.finished(idx)
    }
}

#[cfg(debug_assertions)]
#[test]
fn double_write_is_diagnosed() {
    let mut registry = TemplateRegistry::new();
    let id = registry.register(
        Template::builder("Chatty")
            .output("out")
            .relation(Relation::Custom(std::sync::Arc::new(Chatty)))
            .build()
            .unwrap(),
    );
    let mut builder = CircuitBuilder::new(&registry);
    builder.instantiate(id).unwrap();
    let circuit = builder.build().unwrap();

    let mut calc = WitnessCalculator::new(&registry, &circuit);
    assert!(matches!(
        calc.compute(),
        Err(WitnessError::DoubleWrite { .. })
    ));
}

#[test]
fn json_inputs_drive_a_computation() {
    let (registry, id) = position_check_registry();
    let mut builder = CircuitBuilder::new(&registry);
    let main = builder.instantiate(id).unwrap();
    let circuit = builder.build().unwrap();

    let inputs = InputMap::from_json_str(r#"{"position": "41"}"#).unwrap();
    let mut calc = WitnessCalculator::new(&registry, &circuit);
    calc.set_inputs(&inputs).unwrap();
    calc.compute().unwrap();

    assert_eq!(
        calc.signal(main, "isValid").unwrap(),
        vec![FieldElement::from_u64(41)]
    );
}

#[test]
fn fan_out_allows_many_readers_of_one_output() {
    let (registry, id) = forward_registry();
    let mut builder = CircuitBuilder::new(&registry);
    let src = builder.instantiate(id).unwrap();
    let left = builder.instantiate(id).unwrap();
    let right = builder.instantiate(id).unwrap();
    builder.connect(src, "out", left, "in").unwrap();
    builder.connect(src, "out", right, "in").unwrap();
    let circuit = builder.build().unwrap();

    let mut calc = WitnessCalculator::new(&registry, &circuit);
    calc.set_input_for(src, "in", &[FieldElement::from_u64(9)])
        .unwrap();
    calc.compute().unwrap();

    assert_eq!(
        calc.signal(left, "out").unwrap(),
        vec![FieldElement::from_u64(9)]
    );
    assert_eq!(
        calc.signal(right, "out").unwrap(),
        vec![FieldElement::from_u64(9)]
    );

    let witness = calc.into_witness().unwrap();
    // three instances, two slots each
    assert_eq!(witness.len(), 6);
}
