use crate::dispatch_error::DispatchError;
use crate::message::WorkResult;

/// Output accumulator indexed by work id
///
/// Allocated up front with one unset slot per expected id. Every slot is written
/// exactly once; a second write for the same id is a protocol violation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultStore {
    slots: Vec<Option<f64>>,
    filled: usize,
}

impl ResultStore {
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size],
            filled: 0,
        }
    }

    /// Record a result, rejecting ids outside the store and repeated ids
    pub fn record(&mut self, result: WorkResult) -> Result<(), DispatchError> {
        let capacity = self.slots.len();
        let slot = self
            .slots
            .get_mut(result.id)
            .ok_or(DispatchError::IdOutOfRange {
                id: result.id,
                capacity,
            })?;
        if slot.is_some() {
            return Err(DispatchError::DuplicateResult { id: result.id });
        }
        *slot = Some(result.value);
        self.filled += 1;
        Ok(())
    }

    pub fn contains(&self, id: usize) -> bool {
        matches!(self.slots.get(id), Some(Some(_)))
    }

    pub fn get(&self, id: usize) -> Option<f64> {
        self.slots.get(id).copied().flatten()
    }

    /// Number of slots written so far
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn is_complete(&self) -> bool {
        self.filled == self.slots.len()
    }

    /// Consume the store into a dense vector, failing if any slot is unset
    pub fn into_values(self) -> Result<Vec<f64>, DispatchError> {
        let missing = self.slots.len() - self.filled;
        if missing > 0 {
            return Err(DispatchError::IncompleteResults { missing });
        }
        Ok(self.slots.into_iter().flatten().collect())
    }
}
