//! User actions and the reducer
//!
//! Every change to the onboarding state is expressed as a [`UserAction`] and
//! applied by [`reduce`], a pure function from the current state to the next
//! one. The reducer never touches the record a subscriber may be holding; it
//! always builds a fresh copy.

use serde::{Deserialize, Serialize};

use crate::error::OnboardError;
use crate::types::{UserField, UserInformation, UserState};

/// Command accepted by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserAction {
    /// Replace one base field
    UpdateField { field: UserField, value: String },
    /// Replace the whole record
    ReplaceAll { user_information: UserInformation },
    /// Reset to the empty record and erase persisted data
    Clear,
    /// Re-derive validity for the current record
    Revalidate,
}

/// What the store must do with persisted data after applying an action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceEffect {
    Save,
    Erase,
}

impl UserAction {
    pub fn update(field: UserField, value: impl Into<String>) -> Self {
        UserAction::UpdateField {
            field,
            value: value.into(),
        }
    }

    pub fn replace_all(user_information: UserInformation) -> Self {
        UserAction::ReplaceAll { user_information }
    }

    /// Parse an action from its JSON form, e.g.
    /// `{"type":"update_field","field":"firstName","value":"Ann"}`
    pub fn from_json(json: &str) -> Result<Self, OnboardError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn persistence_effect(&self) -> PersistenceEffect {
        match self {
            UserAction::Clear => PersistenceEffect::Erase,
            _ => PersistenceEffect::Save,
        }
    }
}

/// Apply an action to a state, producing the next state
pub fn reduce(state: &UserState, action: &UserAction) -> UserState {
    let next = match action {
        UserAction::UpdateField { field, value } => {
            state.user_information().with_field(*field, value.as_str())
        }
        UserAction::ReplaceAll { user_information } => user_information.clone(),
        UserAction::Clear => UserInformation::default(),
        UserAction::Revalidate => state.user_information().clone(),
    };
    UserState::from_information(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_update_field_is_cumulative() {
        let state = UserState::default();
        let state = reduce(&state, &UserAction::update(UserField::FirstName, "A"));
        let state = reduce(&state, &UserAction::update(UserField::LastName, "B"));

        assert_eq!(state.user_information().first_name, "A");
        assert_eq!(state.user_information().last_name, "B");
        assert_eq!(state.validation_message(), Some("Weight is required"));
    }

    #[test]
    fn test_reduce_does_not_touch_previous_state() {
        let before = UserState::from_information(UserInformation::new("A", "B", "70", "175", "Male"));
        let after = reduce(&before, &UserAction::update(UserField::Gender, ""));

        assert!(before.is_valid());
        assert!(!after.is_valid());
        assert_eq!(before.user_information().gender, "Male");
    }

    #[test]
    fn test_replace_and_clear() {
        let info = UserInformation::new("Jane", "Smith", "65", "165", "Female");
        let state = reduce(&UserState::default(), &UserAction::replace_all(info.clone()));
        assert_eq!(state.user_information(), &info);
        assert!(state.is_valid());

        let cleared = reduce(&state, &UserAction::Clear);
        assert_eq!(cleared, UserState::default());
    }

    #[test]
    fn test_revalidate_keeps_record() {
        let info = UserInformation::new("Jane", "", "65", "165", "Female");
        let state = UserState::from_information(info.clone());
        let next = reduce(&state, &UserAction::Revalidate);
        assert_eq!(next.user_information(), &info);
        assert_eq!(next.validation_message(), Some("Last name is required"));
    }

    #[test]
    fn test_persistence_effect() {
        assert_eq!(UserAction::Clear.persistence_effect(), PersistenceEffect::Erase);
        assert_eq!(UserAction::Revalidate.persistence_effect(), PersistenceEffect::Save);
        assert_eq!(
            UserAction::update(UserField::Weight, "70").persistence_effect(),
            PersistenceEffect::Save
        );
    }

    #[test]
    fn test_action_from_json() {
        let action =
            UserAction::from_json(r#"{"type":"update_field","field":"firstName","value":"Ann"}"#)
                .unwrap();
        assert_eq!(action, UserAction::update(UserField::FirstName, "Ann"));

        assert_eq!(UserAction::from_json(r#"{"type":"clear"}"#).unwrap(), UserAction::Clear);

        let replace = UserAction::from_json(
            r#"{"type":"replace_all","user_information":{"firstName":"A","lastName":"B","weight":"1","height":"2","gender":"Male"}}"#,
        )
        .unwrap();
        assert!(matches!(replace, UserAction::ReplaceAll { .. }));

        assert!(UserAction::from_json(r#"{"type":"explode"}"#).is_err());
    }
}
