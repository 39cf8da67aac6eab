//! Witness calculator for compiled circuit components
//!
//! Executes a graph of component evaluators to derive every signal's value
//! (the witness) of a circuit instance from its public/private inputs, over
//! the BN254 scalar field.
//!
//! # Architecture
//!
//! - Field model: canonical 4x64-bit limb arithmetic modulo the BN254
//!   scalar prime, with Montgomery-reduced multiplication
//! - Templates: declared signals (hashed name keys, directions, widths)
//!   plus a pure relation, dispatched through a registry built at startup
//! - Host runtime: one shared signal arena addressed by (instance, offset),
//!   offset resolution by key, single-writer slots, and a single
//!   evaluation pass in dependency order

pub mod circuit;
pub mod error;
pub mod field;
pub mod inputs;
pub mod relation;
pub mod runtime;
pub mod signal;
pub mod template;
pub mod witness;

pub use circuit::{Circuit, CircuitBuilder, ComponentIndex};
pub use error::WitnessError;
pub use field::FieldElement;
pub use inputs::InputMap;
pub use relation::{Expr, Relation};
pub use runtime::{ComponentFn, InstanceState, WitnessCalculator};
pub use signal::{Direction, SignalDecl, SignalKey, Visibility};
pub use template::{Template, TemplateBuilder, TemplateId, TemplateRegistry};
pub use witness::Witness;

/// The field type used throughout the calculator (BN254 scalar field)
pub type F = FieldElement;

/// BN254 scalar field modulus, decimal
pub const SCALAR_MODULUS: &str =
    "21888242871839275222246405745257275088548364400416034343698204186575808495617";
