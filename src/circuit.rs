//! Circuit assembly: component instances, wiring, evaluation order
//!
//! A circuit instantiates templates into component instances, each owning a
//! contiguous frame of slots in the shared arena, and wires source outputs
//! to destination inputs. Wiring is validated at build time (existence,
//! direction, width, single driver per input) and the build derives the
//! topological evaluation order that guarantees write-before-read across
//! instances.

use std::collections::VecDeque;

use fnv::{FnvHashMap, FnvHashSet};
use serde::Serialize;

use crate::error::WitnessError;
use crate::signal::{Direction, SignalKey};
use crate::template::{TemplateId, TemplateRegistry};

/// Index of a component instance in the host's component table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct ComponentIndex(pub(crate) usize);

impl ComponentIndex {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One instance's slice of the shared arena
#[derive(Clone, Copy, Debug)]
pub(crate) struct Frame {
    pub base: usize,
    pub len: usize,
}

/// Resolved source of a forwarded input
#[derive(Clone, Copy, Debug)]
pub(crate) struct WireSource {
    pub source: ComponentIndex,
    pub source_offset: usize,
    pub width: usize,
}

/// An unwired input that must be supplied by the host before evaluation
#[derive(Clone, Debug)]
pub(crate) struct RequiredInput {
    pub instance: ComponentIndex,
    pub key: SignalKey,
    pub name: String,
}

struct Connection {
    src: ComponentIndex,
    src_offset: usize,
    dst: ComponentIndex,
    dst_key: SignalKey,
    width: usize,
}

/// A validated circuit ready for witness computation
#[derive(Debug)]
pub struct Circuit {
    instances: Vec<TemplateId>,
    frames: Vec<Frame>,
    wires: FnvHashMap<(usize, u64), WireSource>,
    required_inputs: Vec<RequiredInput>,
    order: Vec<ComponentIndex>,
    main: ComponentIndex,
    total_slots: usize,
}

impl Circuit {
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Total slot count across all instance frames
    pub fn total_slots(&self) -> usize {
        self.total_slots
    }

    /// The instance that receives external inputs by bare signal name
    pub fn main(&self) -> ComponentIndex {
        self.main
    }

    /// Instances in dependency order: every source precedes its readers
    pub fn evaluation_order(&self) -> &[ComponentIndex] {
        &self.order
    }

    pub fn template_of(&self, idx: ComponentIndex) -> Result<TemplateId, WitnessError> {
        self.instances
            .get(idx.0)
            .copied()
            .ok_or(WitnessError::UnknownComponent(idx.0))
    }

    pub(crate) fn frame(&self, idx: ComponentIndex) -> Result<Frame, WitnessError> {
        self.frames
            .get(idx.0)
            .copied()
            .ok_or(WitnessError::UnknownComponent(idx.0))
    }

    pub(crate) fn wire(&self, dst: ComponentIndex, key: SignalKey) -> Option<WireSource> {
        self.wires.get(&(dst.0, key.as_u64())).copied()
    }

    pub(crate) fn required_inputs(&self) -> &[RequiredInput] {
        &self.required_inputs
    }
}

/// Builder assembling and validating a circuit against a registry
pub struct CircuitBuilder<'r> {
    registry: &'r TemplateRegistry,
    instances: Vec<TemplateId>,
    connections: Vec<Connection>,
    wired: FnvHashSet<(usize, u64)>,
    main: Option<ComponentIndex>,
}

impl<'r> CircuitBuilder<'r> {
    pub fn new(registry: &'r TemplateRegistry) -> Self {
        Self {
            registry,
            instances: Vec::new(),
            connections: Vec::new(),
            wired: FnvHashSet::default(),
            main: None,
        }
    }

    /// Add one activation of a template
    pub fn instantiate(&mut self, template: TemplateId) -> Result<ComponentIndex, WitnessError> {
        self.registry.get(template)?;
        let idx = ComponentIndex(self.instances.len());
        self.instances.push(template);
        Ok(idx)
    }

    /// Forward an output of `src` into an input of `dst`
    pub fn connect(
        &mut self,
        src: ComponentIndex,
        src_signal: &str,
        dst: ComponentIndex,
        dst_signal: &str,
    ) -> Result<(), WitnessError> {
        let src_template = self.registry.get(self.template_at(src)?)?;
        let dst_template = self.registry.get(self.template_at(dst)?)?;

        let src_decl = src_template.signal_by_name(src_signal).ok_or_else(|| {
            WitnessError::UnknownSignal {
                template: src_template.name().to_string(),
                key: SignalKey::from_name(src_signal).as_u64(),
            }
        })?;
        let dst_decl = dst_template.signal_by_name(dst_signal).ok_or_else(|| {
            WitnessError::UnknownSignal {
                template: dst_template.name().to_string(),
                key: SignalKey::from_name(dst_signal).as_u64(),
            }
        })?;

        if src_decl.direction() != Direction::Output {
            return Err(WitnessError::InvalidWiring(format!(
                "`{src_signal}` of component {} is not an output",
                src.0
            )));
        }
        if dst_decl.direction() != Direction::Input {
            return Err(WitnessError::InvalidWiring(format!(
                "`{dst_signal}` of component {} is not an input",
                dst.0
            )));
        }
        if src_decl.width() != dst_decl.width() {
            return Err(WitnessError::InvalidWiring(format!(
                "width mismatch: `{src_signal}` has {}, `{dst_signal}` has {}",
                src_decl.width(),
                dst_decl.width()
            )));
        }
        if !self.wired.insert((dst.0, dst_decl.key().as_u64())) {
            return Err(WitnessError::InvalidWiring(format!(
                "input `{dst_signal}` of component {} already has a driver",
                dst.0
            )));
        }

        self.connections.push(Connection {
            src,
            src_offset: src_decl.offset(),
            dst,
            dst_key: dst_decl.key(),
            width: dst_decl.width(),
        });
        Ok(())
    }

    /// Designate the instance that receives external inputs by bare name.
    /// Defaults to the first instance.
    pub fn set_main(&mut self, idx: ComponentIndex) -> Result<(), WitnessError> {
        self.template_at(idx)?;
        self.main = Some(idx);
        Ok(())
    }

    fn template_at(&self, idx: ComponentIndex) -> Result<TemplateId, WitnessError> {
        self.instances
            .get(idx.0)
            .copied()
            .ok_or(WitnessError::UnknownComponent(idx.0))
    }

    pub fn build(self) -> Result<Circuit, WitnessError> {
        if self.instances.is_empty() {
            return Err(WitnessError::InvalidWiring(
                "circuit has no component instances".into(),
            ));
        }

        let mut frames = Vec::with_capacity(self.instances.len());
        let mut total_slots = 0;
        for &template in &self.instances {
            let len = self.registry.get(template)?.frame_len();
            frames.push(Frame {
                base: total_slots,
                len,
            });
            total_slots += len;
        }

        let mut wires = FnvHashMap::default();
        for conn in &self.connections {
            wires.insert(
                (conn.dst.0, conn.dst_key.as_u64()),
                WireSource {
                    source: conn.src,
                    source_offset: conn.src_offset,
                    width: conn.width,
                },
            );
        }

        // Inputs with no driver must come from the host
        let mut required_inputs = Vec::new();
        for (i, &template) in self.instances.iter().enumerate() {
            let template = self.registry.get(template)?;
            for decl in template.inputs() {
                if !wires.contains_key(&(i, decl.key().as_u64())) {
                    required_inputs.push(RequiredInput {
                        instance: ComponentIndex(i),
                        key: decl.key(),
                        name: decl.name().to_string(),
                    });
                }
            }
        }

        // Kahn's algorithm over instance-level forwarding edges
        let n = self.instances.len();
        let mut indegree = vec![0usize; n];
        let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n];
        for conn in &self.connections {
            edges[conn.src.0].push(conn.dst.0);
            indegree[conn.dst.0] += 1;
        }
        let mut queue: VecDeque<usize> =
            (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(i) = queue.pop_front() {
            order.push(ComponentIndex(i));
            for &next in &edges[i] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }
        if order.len() != n {
            let stuck = indegree
                .iter()
                .position(|&d| d > 0)
                .unwrap_or(0);
            return Err(WitnessError::DependencyCycle(stuck));
        }

        Ok(Circuit {
            instances: self.instances,
            frames,
            wires,
            required_inputs,
            order,
            main: self.main.unwrap_or(ComponentIndex(0)),
            total_slots,
        })
    }
}
