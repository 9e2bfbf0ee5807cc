//! Screen models
//!
//! [`FormController`] backs the information screen: it owns the input models,
//! keeps them bound to the store, and gates the continue button.
//! [`ProfileSummary`] is the read-only view shown once the form is complete.

use serde::{Deserialize, Serialize};

use crate::binder::{Binding, InputBinder};
use crate::bmi::BmiCategory;
use crate::input::{Selector, TextField, GENDER_OPTIONS};
use crate::store::UserStore;
use crate::types::{UserField, UserInformation, UserState};
use crate::validation::{validate_length, validate_not_empty, ValidationError, ValidationResult};

/// Longest text accepted in a single form field (characters, after trimming)
pub const MAX_FIELD_LENGTH: usize = 50;

/// Selector index for a stored gender value (`Male` = 0, `Female` = 1)
pub fn gender_index(gender: &str) -> Option<usize> {
    GENDER_OPTIONS.iter().position(|option| *option == gender)
}

/// Values used to populate the inputs when the screen appears
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefill {
    pub user_information: UserInformation,
    pub gender_index: Option<usize>,
}

/// Input models for the information screen
#[derive(Debug, Clone)]
pub struct FormInputs {
    pub first_name: TextField,
    pub last_name: TextField,
    pub weight: TextField,
    pub height: TextField,
    pub gender: Selector,
}

impl Default for FormInputs {
    fn default() -> Self {
        Self {
            first_name: TextField::new(),
            last_name: TextField::new(),
            weight: TextField::new(),
            height: TextField::new(),
            gender: Selector::gender(),
        }
    }
}

impl FormInputs {
    pub fn text_field(&self, field: UserField) -> Option<&TextField> {
        match field {
            UserField::FirstName => Some(&self.first_name),
            UserField::LastName => Some(&self.last_name),
            UserField::Weight => Some(&self.weight),
            UserField::Height => Some(&self.height),
            UserField::Gender => None,
        }
    }
}

/// Information screen controller.
///
/// Text inputs reach the store after the binder's quiet interval; the gender
/// selector is forwarded immediately. Dropping the controller tears down
/// every binding.
pub struct FormController {
    store: UserStore,
    inputs: FormInputs,
    bindings: Vec<Binding>,
}

impl std::fmt::Debug for FormController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormController")
            .field("inputs", &self.inputs)
            .field("bindings", &self.bindings.len())
            .finish()
    }
}

impl FormController {
    /// Create the controller with fresh inputs
    pub fn new(store: &UserStore, binder: &InputBinder) -> Self {
        Self::with_inputs(store, binder, FormInputs::default())
    }

    /// Create the controller over existing input models
    pub fn with_inputs(store: &UserStore, binder: &InputBinder, inputs: FormInputs) -> Self {
        let mut bindings = Vec::with_capacity(UserField::ALL.len());
        for field in UserField::ALL {
            if let Some(text) = inputs.text_field(field) {
                bindings.push(binder.bind_field(text, store, field));
            }
        }
        bindings.push(binder.bind_field(&inputs.gender, store, UserField::Gender));

        Self {
            store: store.clone(),
            inputs,
            bindings,
        }
    }

    pub fn inputs(&self) -> &FormInputs {
        &self.inputs
    }

    /// Populate the inputs from the current record without emitting edits
    pub fn prefill(&self) -> Prefill {
        let snapshot = self.store.snapshot();
        let info = snapshot.user_information().clone();

        for field in UserField::ALL {
            if let Some(text) = self.inputs.text_field(field) {
                text.set_text(info.field(field));
            }
        }
        let gender_index = gender_index(&info.gender);
        self.inputs.gender.set_selected(gender_index);

        Prefill {
            user_information: info,
            gender_index,
        }
    }

    /// Whether the continue button is enabled
    pub fn can_continue(&self) -> bool {
        self.store.snapshot().is_valid()
    }

    /// Inline message per failing field, in validation order.
    ///
    /// Blank fields report their requirement. Text fields longer than
    /// [`MAX_FIELD_LENGTH`] report the limit; that check is advisory and does
    /// not affect [`can_continue`](Self::can_continue).
    pub fn field_errors(&self) -> Vec<(UserField, String)> {
        let snapshot = self.store.snapshot();
        let info = snapshot.user_information();
        UserField::ALL
            .into_iter()
            .filter_map(|field| {
                let message = field_error(field, info.field(field))?;
                Some((field, message))
            })
            .collect()
    }

    /// Forward any pending edits, then check the record.
    ///
    /// The error carries the first validation message.
    pub fn submit(&self) -> Result<UserInformation, ValidationError> {
        for binding in &self.bindings {
            binding.flush();
        }
        let snapshot = self.store.snapshot();
        snapshot.user_information().validate()?;
        Ok(snapshot.user_information().clone())
    }
}

fn field_error(field: UserField, text: &str) -> Option<String> {
    let required = ValidationError::MissingField(field).to_string();
    let mut result = validate_not_empty(text, &required);
    if result.is_valid() && field.is_text() {
        let too_long = format!(
            "{} must be at most {} characters",
            field.label(),
            MAX_FIELD_LENGTH
        );
        result = validate_length(text.trim(), 1, MAX_FIELD_LENGTH, &too_long);
    }
    match result {
        ValidationResult::Valid => None,
        ValidationResult::Invalid(message) => Some(message),
    }
}

/// Read-only summary of a completed profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub full_name: String,
    pub weight: String,
    pub height: String,
    pub gender: String,
    pub bmi_value: String,
    pub bmi_category: BmiCategory,
}

impl ProfileSummary {
    pub fn from_state(state: &UserState) -> Self {
        let info = state.user_information();
        Self {
            full_name: info.full_name(),
            weight: format!("{} kg", info.weight),
            height: format!("{} cm", info.height),
            gender: info.gender.clone(),
            bmi_value: info.bmi_value(),
            bmi_category: info.bmi_category(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::PersistenceAdapter;
    use crate::scheduler::ManualScheduler;
    use crate::storage::MemoryKeyValueStore;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
    }

    fn setup() -> (UserStore, Rc<ManualScheduler>, InputBinder) {
        let store = UserStore::new(PersistenceAdapter::new(MemoryKeyValueStore::new()));
        let scheduler = Rc::new(ManualScheduler::new(t0()));
        let binder = InputBinder::new(scheduler.clone(), Duration::milliseconds(300));
        (store, scheduler, binder)
    }

    #[test]
    fn test_gender_index() {
        assert_eq!(gender_index("Male"), Some(0));
        assert_eq!(gender_index("Female"), Some(1));
        assert_eq!(gender_index(""), None);
    }

    #[test]
    fn test_prefill_populates_inputs_silently() {
        let (store, scheduler, binder) = setup();
        store.replace_all(UserInformation::new("Jane", "Roe", "60", "165", "Female"));
        let form = FormController::new(&store, &binder);

        let prefill = form.prefill();
        assert_eq!(prefill.gender_index, Some(1));
        assert_eq!(prefill.user_information.first_name, "Jane");
        assert_eq!(form.inputs().weight.text(), "60");
        assert_eq!(form.inputs().gender.selected_value(), Some("Female"));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_typing_then_submit() {
        let (store, scheduler, binder) = setup();
        let form = FormController::new(&store, &binder);
        let inputs = form.inputs();

        inputs.first_name.input_at("John", t0());
        inputs.last_name.input_at("Doe", t0());
        inputs.weight.input_at("70", t0());
        inputs.gender.select_at(0, t0());
        scheduler.advance_by(Duration::milliseconds(300));

        assert!(!form.can_continue());
        assert_eq!(
            form.field_errors(),
            vec![(UserField::Height, "Height is required".to_string())]
        );
        assert_eq!(
            form.submit().unwrap_err().to_string(),
            "Height is required"
        );

        // Submit flushes an edit still inside the quiet interval
        inputs.height.input_at("175", t0() + Duration::milliseconds(400));
        let info = form.submit().unwrap();
        assert_eq!(info, UserInformation::new("John", "Doe", "70", "175", "Male"));
        assert!(form.can_continue());
    }

    #[test]
    fn test_empty_form_reports_every_field() {
        let (store, _, binder) = setup();
        let form = FormController::new(&store, &binder);
        let errors = form.field_errors();
        assert_eq!(errors.len(), 5);
        assert_eq!(errors[0].1, "First name is required");
        assert_eq!(
            form.submit(),
            Err(ValidationError::MissingField(UserField::FirstName))
        );
    }

    #[test]
    fn test_field_errors_bound_text_length() {
        let (store, _, binder) = setup();
        store.replace_all(UserInformation::new(
            "x".repeat(MAX_FIELD_LENGTH + 1),
            format!("  {}  ", "y".repeat(MAX_FIELD_LENGTH)),
            "70",
            "175",
            "Male",
        ));
        let form = FormController::new(&store, &binder);

        assert_eq!(
            form.field_errors(),
            vec![(
                UserField::FirstName,
                "First name must be at most 50 characters".to_string()
            )]
        );
        assert!(form.can_continue());
    }

    #[test]
    fn test_drop_detaches_inputs() {
        let (store, _, binder) = setup();
        let inputs = FormInputs::default();
        {
            let _form = FormController::with_inputs(&store, &binder, inputs.clone());
            assert_eq!(inputs.first_name.listener_count(), 1);
        }
        assert_eq!(inputs.first_name.listener_count(), 0);
        inputs.gender.select_at(1, t0());
        assert_eq!(store.snapshot().user_information().gender, "");
    }

    #[test]
    fn test_profile_summary() {
        let state =
            UserState::from_information(UserInformation::new("John", "Doe", "70", "175", "Male"));
        let summary = ProfileSummary::from_state(&state);
        assert_eq!(
            summary,
            ProfileSummary {
                full_name: "John Doe".to_string(),
                weight: "70 kg".to_string(),
                height: "175 cm".to_string(),
                gender: "Male".to_string(),
                bmi_value: "22.9".to_string(),
                bmi_category: BmiCategory::Normal,
            }
        );
    }
}
