//! Signal identity and declarations
//!
//! Signals are identified by a 64-bit FNV-1a hash of their declared name.
//! The circuit compiler embeds the same hash in generated component code, so
//! offset resolution stays an O(1) key lookup without carrying names at
//! runtime. Keys are derived once, when a template is built.

use std::hash::Hasher;

use fnv::FnvHasher;
use serde::Serialize;

/// Stable identifier derived from a signal's declared name
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SignalKey(u64);

impl SignalKey {
    /// Hash a declared signal name (FNV-1a 64)
    pub fn from_name(name: &str) -> Self {
        let mut hasher = FnvHasher::default();
        hasher.write(name.as_bytes());
        Self(hasher.finish())
    }

    /// Wrap a precomputed key, as embedded in generated component code
    pub const fn from_raw(key: u64) -> Self {
        Self(key)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Direction of a signal within its component template
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Direction {
    Input,
    Output,
    Intermediate,
}

/// Whether a signal value is exposed outside the witness.
///
/// Visibility affects only which values the host publishes; evaluation is
/// identical for public and private signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Visibility {
    Public,
    Private,
}

/// A named slot, or contiguous run of slots, in a component's signal frame
#[derive(Clone, Debug, Serialize)]
pub struct SignalDecl {
    pub(crate) name: String,
    pub(crate) key: SignalKey,
    pub(crate) direction: Direction,
    pub(crate) visibility: Visibility,
    pub(crate) offset: usize,
    pub(crate) width: usize,
}

impl SignalDecl {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> SignalKey {
        self.key
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Position of the first slot within the instance's frame
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of contiguous slots
    pub fn width(&self) -> usize {
        self.width
    }
}
