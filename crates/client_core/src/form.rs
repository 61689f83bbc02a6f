//! Editable form backed by the static student-stress schema.

use shared::{
    domain::{FieldEntry, FormState, RawInput},
    error::{UnknownField, ValidationError},
    protocol::PredictionRequest,
};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormController {
    state: FormState,
}

impl FormController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    /// Coerces `raw` by the field's declared kind and stores it. Text that
    /// does not coerce is kept as an invalid entry and reported by
    /// [`FormController::build_request`].
    pub fn set_field(
        &mut self,
        name: &str,
        raw: impl Into<RawInput>,
    ) -> Result<&FormState, UnknownField> {
        let entry = self.state.apply(name, raw.into())?;
        if let FieldEntry::Invalid { raw, expected } = entry {
            debug!(field = name, %raw, expected, "form input did not coerce");
        }
        Ok(&self.state)
    }

    pub fn build_request(&self) -> Result<PredictionRequest, ValidationError> {
        PredictionRequest::try_from(&self.state)
    }

    pub fn reset(&mut self) -> &FormState {
        self.state.reset();
        &self.state
    }
}
