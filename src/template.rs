//! Component templates and the evaluator registry
//!
//! A template declares the signals of one reusable circuit component and the
//! relation among them. Frame offsets are assigned in declaration order and
//! name keys are derived at build time. The registry is the dispatch table:
//! it maps template identity to the evaluator capability for that template,
//! is built once during setup, and is never mutated afterwards.

use fnv::FnvHashMap;
use serde::Serialize;

use crate::error::WitnessError;
use crate::relation::Relation;
use crate::signal::{Direction, SignalDecl, SignalKey, Visibility};

/// Identity of a template within a registry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TemplateId(pub(crate) usize);

impl TemplateId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A reusable circuit component definition
#[derive(Debug)]
pub struct Template {
    name: String,
    signals: Vec<SignalDecl>,
    by_key: FnvHashMap<SignalKey, usize>,
    relation: Relation,
    frame_len: usize,
    input_width: usize,
    output_width: usize,
    intermediate_width: usize,
}

impl Template {
    pub fn builder(name: impl Into<String>) -> TemplateBuilder {
        TemplateBuilder {
            name: name.into(),
            signals: Vec::new(),
            relation: Relation::PassThrough,
            frame_len: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total number of slots in one instance frame
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    pub fn signals(&self) -> &[SignalDecl] {
        &self.signals
    }

    pub fn relation(&self) -> &Relation {
        &self.relation
    }

    pub fn signal(&self, key: SignalKey) -> Option<&SignalDecl> {
        self.by_key.get(&key).map(|&i| &self.signals[i])
    }

    pub fn signal_by_name(&self, name: &str) -> Option<&SignalDecl> {
        self.signal(SignalKey::from_name(name))
    }

    /// Resolve a signal key to its frame offset.
    ///
    /// An unknown key means the compiled component and the template
    /// disagree; that is fatal for the run.
    pub fn resolve_offset(&self, key: SignalKey) -> Result<usize, WitnessError> {
        self.signal(key)
            .map(SignalDecl::offset)
            .ok_or_else(|| WitnessError::UnknownSignal {
                template: self.name.clone(),
                key: key.as_u64(),
            })
    }

    pub fn inputs(&self) -> impl Iterator<Item = &SignalDecl> {
        self.signals
            .iter()
            .filter(|s| s.direction() == Direction::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &SignalDecl> {
        self.signals
            .iter()
            .filter(|s| s.direction() == Direction::Output)
    }

    pub fn intermediates(&self) -> impl Iterator<Item = &SignalDecl> {
        self.signals
            .iter()
            .filter(|s| s.direction() == Direction::Intermediate)
    }

    /// Total input slots, flattened across signal widths
    pub fn input_width(&self) -> usize {
        self.input_width
    }

    pub fn output_width(&self) -> usize {
        self.output_width
    }

    pub fn intermediate_width(&self) -> usize {
        self.intermediate_width
    }
}

/// Builder validating a template definition
#[derive(Debug)]
pub struct TemplateBuilder {
    name: String,
    signals: Vec<SignalDecl>,
    relation: Relation,
    frame_len: usize,
}

impl TemplateBuilder {
    fn declare(
        mut self,
        name: &str,
        direction: Direction,
        visibility: Visibility,
        width: usize,
    ) -> Self {
        let decl = SignalDecl {
            name: name.to_string(),
            key: SignalKey::from_name(name),
            direction,
            visibility,
            offset: self.frame_len,
            width,
        };
        self.frame_len += width;
        self.signals.push(decl);
        self
    }

    /// Declare a private input signal of width 1
    pub fn input(self, name: &str) -> Self {
        self.declare(name, Direction::Input, Visibility::Private, 1)
    }

    /// Declare a private input signal spanning `width` contiguous slots
    pub fn input_array(self, name: &str, width: usize) -> Self {
        self.declare(name, Direction::Input, Visibility::Private, width)
    }

    /// Declare an input signal exposed in the public interface
    pub fn public_input(self, name: &str) -> Self {
        self.declare(name, Direction::Input, Visibility::Public, 1)
    }

    /// Declare an output signal of width 1; outputs are public
    pub fn output(self, name: &str) -> Self {
        self.declare(name, Direction::Output, Visibility::Public, 1)
    }

    /// Declare an output signal spanning `width` contiguous slots
    pub fn output_array(self, name: &str, width: usize) -> Self {
        self.declare(name, Direction::Output, Visibility::Public, width)
    }

    /// Declare an intermediate signal of width 1
    pub fn intermediate(self, name: &str) -> Self {
        self.declare(name, Direction::Intermediate, Visibility::Private, 1)
    }

    /// Set the relation; defaults to pass-through
    pub fn relation(mut self, relation: Relation) -> Self {
        self.relation = relation;
        self
    }

    pub fn build(self) -> Result<Template, WitnessError> {
        let mut by_key = FnvHashMap::default();
        let mut input_width = 0;
        let mut output_width = 0;
        let mut intermediate_width = 0;

        for (i, decl) in self.signals.iter().enumerate() {
            if decl.width() == 0 {
                return Err(WitnessError::InvalidTemplate {
                    template: self.name.clone(),
                    detail: format!("signal `{}` has zero width", decl.name()),
                });
            }
            if let Some(&prev) = by_key.get(&decl.key()) {
                let prev: &SignalDecl = &self.signals[prev];
                if prev.name() == decl.name() {
                    return Err(WitnessError::DuplicateSignal {
                        template: self.name.clone(),
                        name: decl.name().to_string(),
                    });
                }
                // Hash collisions are assumed negligible but must not pass silently
                return Err(WitnessError::InvalidTemplate {
                    template: self.name.clone(),
                    detail: format!(
                        "signal name key collision between `{}` and `{}`",
                        prev.name(),
                        decl.name()
                    ),
                });
            }
            by_key.insert(decl.key(), i);
            match decl.direction() {
                Direction::Input => input_width += decl.width(),
                Direction::Output => output_width += decl.width(),
                Direction::Intermediate => intermediate_width += decl.width(),
            }
        }

        match &self.relation {
            Relation::PassThrough => {
                if input_width != output_width {
                    return Err(WitnessError::InvalidTemplate {
                        template: self.name.clone(),
                        detail: format!(
                            "pass-through requires equal input and output widths, got {input_width} and {output_width}"
                        ),
                    });
                }
            }
            Relation::Expressions {
                intermediates,
                outputs,
            } => {
                if intermediates.len() != intermediate_width {
                    return Err(WitnessError::InvalidTemplate {
                        template: self.name.clone(),
                        detail: format!(
                            "{} intermediate expressions for {intermediate_width} intermediate slots",
                            intermediates.len()
                        ),
                    });
                }
                if outputs.len() != output_width {
                    return Err(WitnessError::InvalidTemplate {
                        template: self.name.clone(),
                        detail: format!(
                            "{} output expressions for {output_width} output slots",
                            outputs.len()
                        ),
                    });
                }
                for (i, expr) in intermediates.iter().enumerate() {
                    if !expr.refs_in_bounds(input_width, i) {
                        return Err(WitnessError::InvalidTemplate {
                            template: self.name.clone(),
                            detail: format!("intermediate expression {i} references a later slot"),
                        });
                    }
                }
                for (i, expr) in outputs.iter().enumerate() {
                    if !expr.refs_in_bounds(input_width, intermediate_width) {
                        return Err(WitnessError::InvalidTemplate {
                            template: self.name.clone(),
                            detail: format!("output expression {i} references an unknown slot"),
                        });
                    }
                }
            }
            Relation::Custom(_) => {}
        }

        Ok(Template {
            name: self.name,
            signals: self.signals,
            by_key,
            relation: self.relation,
            frame_len: self.frame_len,
            input_width,
            output_width,
            intermediate_width,
        })
    }
}

/// Dispatch table mapping template identity to its evaluator.
///
/// Built once during setup; lookups only afterwards.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: Vec<Template>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, template: Template) -> TemplateId {
        let id = TemplateId(self.templates.len());
        self.templates.push(template);
        id
    }

    pub fn get(&self, id: TemplateId) -> Result<&Template, WitnessError> {
        self.templates
            .get(id.0)
            .ok_or(WitnessError::UnknownTemplate(id.0))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
