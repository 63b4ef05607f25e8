use crate::error::{ValidationError, ValidatorError};

/// Where the validator stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkingState {
    /// Not run to completion (never started, or stopped).
    Incomplete,
    Working,
    Invalid,
    Valid,
}

impl WorkingState {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Valid | Self::Invalid)
    }
}

/// Working state plus the fraction of the document processed so far.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorkingStatus {
    pub state: WorkingState,
    pub fraction: f64,
}

/// Emitted by the validator and drained with
/// [`crate::Validator::take_notifications`], in emission order.
#[derive(Clone, Debug, PartialEq)]
pub enum ValidatorNotification {
    StateUpdate(WorkingStatus),
    Error(ValidationError),
    /// Errors at index `at` and later have been discarded.
    ResetErrors { at: usize },
    InternalError(ValidatorError),
}
