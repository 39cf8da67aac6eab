//! Completed witness for one circuit run
//!
//! The witness is the full assignment of field values to every signal slot
//! of every instance. The public subset is what the host exposes outside the
//! witness; evaluation does not distinguish public from private signals.

use serde::Serialize;

use crate::field::FieldElement;

/// The complete signal assignment produced by one evaluation pass
#[derive(Clone, Debug, Serialize)]
pub struct Witness {
    values: Vec<FieldElement>,
    public: Vec<usize>,
}

impl Witness {
    pub(crate) fn new(values: Vec<FieldElement>, public: Vec<usize>) -> Self {
        Self { values, public }
    }

    /// Every slot value, in (instance, offset) frame order
    pub fn values(&self) -> &[FieldElement] {
        &self.values
    }

    pub fn value(&self, slot: usize) -> Option<&FieldElement> {
        self.values.get(slot)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flat slot indices of the public signals, in frame order
    pub fn public_slots(&self) -> &[usize] {
        &self.public
    }

    /// Values of the public signals, in frame order
    pub fn public_values(&self) -> Vec<FieldElement> {
        self.public.iter().map(|&slot| self.values[slot]).collect()
    }
}
