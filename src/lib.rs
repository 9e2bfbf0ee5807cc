//! Synheart Onboard - On-device state core for the profile onboarding flow
//!
//! Onboard holds the user's profile record, derives BMI and validity from it,
//! persists it across launches, and broadcasts every change to observers:
//! input edit → debounced binding → action → reducer → persist → notify.
//!
//! ## Modules
//!
//! - **Domain**: `UserInformation`, BMI derivation and field validation
//! - **Persistence**: key-value storage and the record codec
//! - **Store**: single source of truth with ordered, cancellable subscriptions
//! - **Binder**: debounced forwarding of raw input events into the store
//! - **Screens**: the information form controller and profile summary

pub mod action;
pub mod binder;
pub mod bmi;
pub mod config;
pub mod error;
pub mod form;
pub mod input;
pub mod persistence;
pub mod scheduler;
pub mod storage;
pub mod store;
pub mod types;
pub mod validation;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use action::{reduce, UserAction};
pub use binder::{BinderState, Binding, Debouncer, InputBinder};
pub use bmi::BmiCategory;
pub use config::StoreConfig;
pub use error::{OnboardError, PersistenceError};
pub use form::{FormController, FormInputs, Prefill, ProfileSummary};
pub use input::{InputEvent, InputSource, Selector, TextField};
pub use persistence::PersistenceAdapter;
pub use scheduler::{ManualScheduler, Scheduler};
pub use storage::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use store::{Snapshot, Subscription, UserStore};
pub use types::{StateSnapshot, UserField, UserInformation, UserState};
pub use validation::ValidationError;

/// Onboard library version
pub const ONBOARD_VERSION: &str = env!("CARGO_PKG_VERSION");
