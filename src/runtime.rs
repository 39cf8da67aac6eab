//! Witness evaluation runtime
//!
//! The host side of the component evaluator contract: shared signal storage
//! addressed by (instance, offset), offset resolution by hashed name key,
//! bulk reads and writes, and the exactly-once completion protocol. One
//! `compute` call runs a single evaluation pass over the circuit in
//! dependency order; every instance is evaluated exactly once and never
//! retried.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::circuit::{Circuit, ComponentIndex};
use crate::error::WitnessError;
use crate::field::FieldElement;
use crate::inputs::InputMap;
use crate::relation::Relation;
use crate::signal::{SignalKey, Visibility};
use crate::template::{Template, TemplateRegistry};
use crate::witness::Witness;

use fnv::FnvHashSet;

/// Evaluation state of one component instance. Transitions are
/// `Pending -> Evaluating -> Done`; `Done` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceState {
    Pending,
    Evaluating,
    Done,
}

/// Hand-written evaluator for one template, as emitted by a circuit
/// compiler.
///
/// Implementations must follow the component protocol: resolve offsets
/// through the host, read inputs, write every output of the instance, then
/// signal completion exactly once. The host verifies the completion
/// discipline after the call.
pub trait ComponentFn: Send + Sync {
    fn evaluate(
        &self,
        host: &mut WitnessCalculator<'_>,
        idx: ComponentIndex,
    ) -> Result<(), WitnessError>;
}

/// Shared slot storage for every instance frame.
///
/// Write-once enforcement is an explicit bitmap check in debug builds and
/// elided in release builds.
struct SignalArena {
    slots: Vec<FieldElement>,
    #[cfg(debug_assertions)]
    written: Vec<bool>,
}

impl SignalArena {
    fn new(len: usize) -> Self {
        Self {
            slots: vec![FieldElement::ZERO; len],
            #[cfg(debug_assertions)]
            written: vec![false; len],
        }
    }

    /// Returns `false` on a repeated write (debug builds only)
    fn set(&mut self, slot: usize, value: FieldElement) -> bool {
        #[cfg(debug_assertions)]
        {
            if self.written[slot] {
                return false;
            }
            self.written[slot] = true;
        }
        self.slots[slot] = value;
        true
    }

    /// Returns `None` for a slot that was never written (debug builds only)
    fn get(&self, slot: usize) -> Option<FieldElement> {
        #[cfg(debug_assertions)]
        if !self.written[slot] {
            return None;
        }
        Some(self.slots[slot])
    }

    fn into_values(self) -> Vec<FieldElement> {
        self.slots
    }
}

/// Witness calculator for one circuit run.
///
/// Owns the signal arena and the per-instance state machine, and implements
/// the host interface consumed by component evaluators: `signal_offset`,
/// `read_signals`, `write_signals`, `finished`.
pub struct WitnessCalculator<'a> {
    registry: &'a TemplateRegistry,
    circuit: &'a Circuit,
    arena: SignalArena,
    states: Vec<InstanceState>,
    provided: FnvHashSet<(usize, u64)>,
}

impl<'a> WitnessCalculator<'a> {
    pub fn new(registry: &'a TemplateRegistry, circuit: &'a Circuit) -> Self {
        Self {
            registry,
            circuit,
            arena: SignalArena::new(circuit.total_slots()),
            states: vec![InstanceState::Pending; circuit.len()],
            provided: FnvHashSet::default(),
        }
    }

    pub fn state(&self, idx: ComponentIndex) -> Result<InstanceState, WitnessError> {
        self.states
            .get(idx.index())
            .copied()
            .ok_or(WitnessError::UnknownComponent(idx.index()))
    }

    fn template(&self, idx: ComponentIndex) -> Result<&'a Template, WitnessError> {
        let registry = self.registry;
        registry.get(self.circuit.template_of(idx)?)
    }

    /// Resolve a signal key to its offset within the instance's frame.
    ///
    /// Pure lookup with no side effect; an unknown key indicates a
    /// compiler/runtime mismatch and is fatal for the run.
    pub fn signal_offset(
        &self,
        instance: ComponentIndex,
        key: SignalKey,
    ) -> Result<usize, WitnessError> {
        self.template(instance)?.resolve_offset(key)
    }

    /// Bulk read of `count` contiguous slots from `source`'s frame.
    ///
    /// `reader` identifies the evaluating instance; reads are
    /// cross-component when an input is forwarded from another instance.
    pub fn read_signals(
        &self,
        source: ComponentIndex,
        reader: ComponentIndex,
        offset: usize,
        count: usize,
    ) -> Result<Vec<FieldElement>, WitnessError> {
        let frame = self.circuit.frame(source)?;
        if offset + count > frame.len {
            return Err(WitnessError::OutOfBounds {
                instance: source.index(),
                offset,
                count,
            });
        }
        trace!(
            source = source.index(),
            reader = reader.index(),
            offset,
            count,
            "read signals"
        );
        let mut values = Vec::with_capacity(count);
        for i in 0..count {
            let value =
                self.arena
                    .get(frame.base + offset + i)
                    .ok_or(WitnessError::UnwrittenRead {
                        instance: source.index(),
                        offset: offset + i,
                    })?;
            values.push(value);
        }
        Ok(values)
    }

    /// Write contiguous slots into `target`'s frame.
    ///
    /// Each slot may be written exactly once per run; violations are
    /// detected in debug builds.
    pub fn write_signals(
        &mut self,
        writer: ComponentIndex,
        target: ComponentIndex,
        offset: usize,
        values: &[FieldElement],
    ) -> Result<(), WitnessError> {
        let frame = self.circuit.frame(target)?;
        if offset + values.len() > frame.len {
            return Err(WitnessError::OutOfBounds {
                instance: target.index(),
                offset,
                count: values.len(),
            });
        }
        trace!(
            writer = writer.index(),
            target = target.index(),
            offset,
            count = values.len(),
            "write signals"
        );
        for (i, value) in values.iter().enumerate() {
            if !self.arena.set(frame.base + offset + i, *value) {
                return Err(WitnessError::DoubleWrite {
                    instance: target.index(),
                    offset: offset + i,
                });
            }
        }
        Ok(())
    }

    /// Mark an instance fully evaluated. Must be called exactly once per
    /// instance, after all of its outputs are written.
    pub fn finished(&mut self, instance: ComponentIndex) -> Result<(), WitnessError> {
        let state = self.state(instance)?;
        match state {
            InstanceState::Evaluating => {
                self.states[instance.index()] = InstanceState::Done;
                trace!(component = instance.index(), "component done");
                Ok(())
            }
            InstanceState::Done => Err(WitnessError::DoubleCompletion(instance.index())),
            InstanceState::Pending => Err(WitnessError::NotEvaluating(instance.index())),
        }
    }

    /// Supply an external value for an unwired input of the main instance
    pub fn set_input(&mut self, name: &str, value: FieldElement) -> Result<(), WitnessError> {
        self.set_input_for(self.circuit.main(), name, &[value])
    }

    /// Supply external values for an unwired array input of the main
    /// instance
    pub fn set_input_array(
        &mut self,
        name: &str,
        values: &[FieldElement],
    ) -> Result<(), WitnessError> {
        self.set_input_for(self.circuit.main(), name, values)
    }

    /// Supply an external value for an unwired input of any instance
    pub fn set_input_for(
        &mut self,
        instance: ComponentIndex,
        name: &str,
        values: &[FieldElement],
    ) -> Result<(), WitnessError> {
        let template = self.template(instance)?;
        let key = SignalKey::from_name(name);
        let decl = template
            .signal(key)
            .ok_or_else(|| WitnessError::UnknownSignal {
                template: template.name().to_string(),
                key: key.as_u64(),
            })?;
        if decl.direction() != crate::signal::Direction::Input
            || self.circuit.wire(instance, key).is_some()
        {
            return Err(WitnessError::NotAnExternalInput {
                instance: instance.index(),
                name: name.to_string(),
            });
        }
        if values.len() != decl.width() {
            return Err(WitnessError::InputWidthMismatch {
                instance: instance.index(),
                name: name.to_string(),
                expected: decl.width(),
                got: values.len(),
            });
        }
        if !self.provided.insert((instance.index(), key.as_u64())) {
            return Err(WitnessError::DoubleWrite {
                instance: instance.index(),
                offset: decl.offset(),
            });
        }
        self.write_signals(instance, instance, decl.offset(), values)
    }

    /// Apply a whole input map to the main instance
    pub fn set_inputs(&mut self, inputs: &InputMap) -> Result<(), WitnessError> {
        for (name, values) in inputs.iter() {
            self.set_input_for(self.circuit.main(), name, values)?;
        }
        Ok(())
    }

    fn ensure_inputs(&self) -> Result<(), WitnessError> {
        for required in self.circuit.required_inputs() {
            if !self
                .provided
                .contains(&(required.instance.index(), required.key.as_u64()))
            {
                return Err(WitnessError::MissingInput {
                    instance: required.instance.index(),
                    name: required.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Run the full evaluation pass in dependency order.
    ///
    /// Every unwired input must have been supplied first. Each instance is
    /// evaluated exactly once; any detected inconsistency aborts the run
    /// with no partial witness.
    pub fn compute(&mut self) -> Result<(), WitnessError> {
        self.ensure_inputs()?;
        debug!(
            components = self.circuit.len(),
            slots = self.circuit.total_slots(),
            "starting witness computation"
        );
        let order = self.circuit.evaluation_order();
        for &idx in order {
            self.evaluate(idx)?;
        }
        debug!("witness computation complete");
        Ok(())
    }

    /// Evaluate one instance through the component protocol.
    ///
    /// The caller is responsible for input readiness; `compute` guarantees
    /// it by following the topological order.
    pub fn evaluate(&mut self, idx: ComponentIndex) -> Result<(), WitnessError> {
        match self.state(idx)? {
            InstanceState::Pending => {}
            _ => return Err(WitnessError::AlreadyEvaluated(idx.index())),
        }
        self.states[idx.index()] = InstanceState::Evaluating;

        let template = self.template(idx)?;
        trace!(
            component = idx.index(),
            template = %template.name(),
            "evaluating component"
        );
        if let Relation::Custom(f) = template.relation() {
            let f = Arc::clone(f);
            f.evaluate(self, idx)?;
        } else {
            self.run_relation(idx, template)?;
        }

        // The completion signal is part of the contract, also for custom
        // component functions.
        if self.state(idx)? != InstanceState::Done {
            return Err(WitnessError::MissingCompletion(idx.index()));
        }
        Ok(())
    }

    /// Generic evaluator driver: resolve offsets, read inputs, compute,
    /// write results, signal completion.
    fn run_relation(
        &mut self,
        idx: ComponentIndex,
        template: &Template,
    ) -> Result<(), WitnessError> {
        let circuit = self.circuit;

        let mut inputs = Vec::with_capacity(template.input_width());
        for decl in template.inputs() {
            let offset = self.signal_offset(idx, decl.key())?;
            let values = match circuit.wire(idx, decl.key()) {
                Some(wire) => {
                    let values =
                        self.read_signals(wire.source, idx, wire.source_offset, wire.width)?;
                    // Materialize the forwarded value in this instance's own
                    // frame; this is the slot's single write.
                    self.write_signals(idx, idx, offset, &values)?;
                    values
                }
                None => self.read_signals(idx, idx, offset, decl.width())?,
            };
            inputs.extend(values);
        }

        let (intermediates, outputs) = template.relation().compute(&inputs);

        let mut cursor = 0;
        for decl in template.intermediates() {
            let offset = self.signal_offset(idx, decl.key())?;
            self.write_signals(idx, idx, offset, &intermediates[cursor..cursor + decl.width()])?;
            cursor += decl.width();
        }
        let mut cursor = 0;
        for decl in template.outputs() {
            let offset = self.signal_offset(idx, decl.key())?;
            self.write_signals(idx, idx, offset, &outputs[cursor..cursor + decl.width()])?;
            cursor += decl.width();
        }

        self.finished(idx)
    }

    /// Read a signal of an instance by declared name.
    ///
    /// Resolution of an undeclared name is the same fatal error as an
    /// unknown key in generated code.
    pub fn signal(
        &self,
        instance: ComponentIndex,
        name: &str,
    ) -> Result<Vec<FieldElement>, WitnessError> {
        let template = self.template(instance)?;
        let key = SignalKey::from_name(name);
        let decl = template
            .signal(key)
            .ok_or_else(|| WitnessError::UnknownSignal {
                template: template.name().to_string(),
                key: key.as_u64(),
            })?;
        self.read_signals(instance, instance, decl.offset(), decl.width())
    }

    /// Extract the completed witness. Fails unless every instance is `Done`.
    pub fn into_witness(self) -> Result<Witness, WitnessError> {
        if let Some(idx) = self
            .states
            .iter()
            .position(|&s| s != InstanceState::Done)
        {
            return Err(WitnessError::Incomplete(idx));
        }

        // Public values are the public-visibility signals of the main
        // instance, in frame order.
        let main = self.circuit.main();
        let template = self.template(main)?;
        let frame = self.circuit.frame(main)?;
        let mut public = Vec::new();
        for decl in template.signals() {
            if decl.visibility() == Visibility::Public {
                public.extend((0..decl.width()).map(|i| frame.base + decl.offset() + i));
            }
        }

        Ok(Witness::new(self.arena.into_values(), public))
    }
}
