//! Error taxonomy for witness computation
//!
//! Every detected inconsistency is fatal for the run: there are no retries
//! and no partial witnesses. Definition errors (bad literals, unknown or
//! duplicate signals, invalid wiring) are detected at build time or on first
//! access; the remaining variants are host-protocol violations.

use thiserror::Error;

/// Errors raised while building templates and circuits or computing a witness
#[derive(Debug, Error)]
pub enum WitnessError {
    /// Literal value is a valid integer but not a canonical field element
    #[error("field literal out of range for the BN254 scalar field: {0}")]
    LiteralOutOfRange(String),

    /// Literal value could not be parsed at all
    #[error("malformed field literal: {0}")]
    MalformedLiteral(String),

    /// A 32-byte encoding decoded to a value >= the field modulus
    #[error("non-canonical field element encoding")]
    NonCanonicalBytes,

    /// Signal key is not declared by the instance's template
    #[error("unknown signal key {key:#018x} in template `{template}`")]
    UnknownSignal { template: String, key: u64 },

    /// Two declarations in one template share a name
    #[error("duplicate signal `{name}` in template `{template}`")]
    DuplicateSignal { template: String, name: String },

    /// Template declarations and relation do not agree
    #[error("invalid template `{template}`: {detail}")]
    InvalidTemplate { template: String, detail: String },

    /// Template id is not present in the registry
    #[error("unknown template id {0}")]
    UnknownTemplate(usize),

    /// Component index is not present in the circuit
    #[error("unknown component index {0}")]
    UnknownComponent(usize),

    /// A connection between instances failed validation
    #[error("invalid wiring: {0}")]
    InvalidWiring(String),

    /// The instance dependency graph is not acyclic
    #[error("dependency cycle through component {0}")]
    DependencyCycle(usize),

    /// An unwired input signal was never supplied by the host
    #[error("missing external input `{name}` for component {instance}")]
    MissingInput { instance: usize, name: String },

    /// External value supplied for a signal that is not an unwired input
    #[error("signal `{name}` of component {instance} cannot take an external input")]
    NotAnExternalInput { instance: usize, name: String },

    /// External value width does not match the signal declaration
    #[error("input `{name}` of component {instance} expects {expected} values, got {got}")]
    InputWidthMismatch {
        instance: usize,
        name: String,
        expected: usize,
        got: usize,
    },

    /// An instance left the `Pending` state more than once
    #[error("component {0} was already evaluated")]
    AlreadyEvaluated(usize),

    /// Completion was signaled by an instance that is not evaluating
    #[error("completion signaled for component {0} outside evaluation")]
    NotEvaluating(usize),

    /// Completion was signaled twice for one instance
    #[error("completion signaled twice for component {0}")]
    DoubleCompletion(usize),

    /// A component function returned without signaling completion
    #[error("component {0} returned without signaling completion")]
    MissingCompletion(usize),

    /// A read or write fell outside the instance's signal frame
    #[error("signal access out of frame bounds: component {instance}, offset {offset}, count {count}")]
    OutOfBounds {
        instance: usize,
        offset: usize,
        count: usize,
    },

    /// Single-assignment violation (debug builds only)
    #[error("signal slot written twice: component {instance}, offset {offset}")]
    DoubleWrite { instance: usize, offset: usize },

    /// Write-before-read violation (debug builds only)
    #[error("read of unwritten signal slot: component {instance}, offset {offset}")]
    UnwrittenRead { instance: usize, offset: usize },

    /// Witness was requested before every instance reached `Done`
    #[error("witness incomplete: component {0} is not done")]
    Incomplete(usize),
}
