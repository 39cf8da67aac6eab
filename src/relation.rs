//! Pure compute relations
//!
//! A relation is the declared function from a template's input slots to its
//! intermediate and output slots. It is pure and total: arithmetic never
//! fails because the field is closed under every operation used here.

use std::fmt;
use std::sync::Arc;

use crate::field::FieldElement;
use crate::runtime::ComponentFn;

/// Arithmetic expression over a component's input and intermediate slots
#[derive(Clone, Debug)]
pub enum Expr {
    /// Value of the n-th input slot, flattened across input signals
    Input(usize),
    /// Value of the n-th intermediate slot, which must be computed earlier
    Intermediate(usize),
    Constant(FieldElement),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
}

impl Expr {
    pub fn input(slot: usize) -> Self {
        Expr::Input(slot)
    }

    pub fn intermediate(slot: usize) -> Self {
        Expr::Intermediate(slot)
    }

    pub fn constant(value: FieldElement) -> Self {
        Expr::Constant(value)
    }

    pub fn add(self, rhs: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(rhs))
    }

    pub fn sub(self, rhs: Expr) -> Self {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }

    pub fn mul(self, rhs: Expr) -> Self {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }

    pub fn neg(self) -> Self {
        Expr::Neg(Box::new(self))
    }

    /// Slot indices must have been validated at template build time
    pub(crate) fn eval(
        &self,
        inputs: &[FieldElement],
        intermediates: &[FieldElement],
    ) -> FieldElement {
        match self {
            Expr::Input(slot) => inputs[*slot],
            Expr::Intermediate(slot) => intermediates[*slot],
            Expr::Constant(value) => *value,
            Expr::Add(a, b) => a.eval(inputs, intermediates) + b.eval(inputs, intermediates),
            Expr::Sub(a, b) => a.eval(inputs, intermediates) - b.eval(inputs, intermediates),
            Expr::Mul(a, b) => a.eval(inputs, intermediates) * b.eval(inputs, intermediates),
            Expr::Neg(a) => -a.eval(inputs, intermediates),
        }
    }

    /// Check that every slot reference resolves within the given widths.
    ///
    /// `intermediate_limit` is the number of intermediate slots already
    /// computed at the point this expression runs.
    pub(crate) fn refs_in_bounds(&self, input_width: usize, intermediate_limit: usize) -> bool {
        match self {
            Expr::Input(slot) => *slot < input_width,
            Expr::Intermediate(slot) => *slot < intermediate_limit,
            Expr::Constant(_) => true,
            Expr::Add(a, b) | Expr::Sub(a, b) | Expr::Mul(a, b) => {
                a.refs_in_bounds(input_width, intermediate_limit)
                    && b.refs_in_bounds(input_width, intermediate_limit)
            }
            Expr::Neg(a) => a.refs_in_bounds(input_width, intermediate_limit),
        }
    }
}

/// The declared relation of a component template
#[derive(Clone)]
pub enum Relation {
    /// Copy the input slots to the output slots, pairwise
    PassThrough,
    /// One expression per intermediate slot, then one per output slot.
    /// Intermediates are computed in order and may reference earlier ones.
    Expressions {
        intermediates: Vec<Expr>,
        outputs: Vec<Expr>,
    },
    /// Hand-written component function that drives the host accessor
    /// protocol directly, as generated circuit code does
    Custom(Arc<dyn ComponentFn>),
}

impl Relation {
    /// The pure compute step: input slots to (intermediate, output) slots
    pub(crate) fn compute(
        &self,
        inputs: &[FieldElement],
    ) -> (Vec<FieldElement>, Vec<FieldElement>) {
        match self {
            Relation::PassThrough => (Vec::new(), inputs.to_vec()),
            Relation::Expressions {
                intermediates,
                outputs,
            } => {
                let mut scratch = Vec::with_capacity(intermediates.len());
                for expr in intermediates {
                    let value = expr.eval(inputs, &scratch);
                    scratch.push(value);
                }
                let computed = outputs.iter().map(|e| e.eval(inputs, &scratch)).collect();
                (scratch, computed)
            }
            Relation::Custom(_) => {
                unreachable!("custom relations drive the host protocol directly")
            }
        }
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::PassThrough => f.write_str("PassThrough"),
            Relation::Expressions {
                intermediates,
                outputs,
            } => f
                .debug_struct("Expressions")
                .field("intermediates", intermediates)
                .field("outputs", outputs)
                .finish(),
            Relation::Custom(_) => f.write_str("Custom"),
        }
    }
}
