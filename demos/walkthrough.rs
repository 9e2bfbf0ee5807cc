//! Walk through the onboarding flow against a temporary storage directory

use std::rc::Rc;

use chrono::Duration;
use synheart_onboard::{
    FileKeyValueStore, FormController, InputBinder, ManualScheduler, ProfileSummary,
    StoreConfig, UserStore,
};

fn main() {
    let dir = std::env::temp_dir().join("synheart-onboard-walkthrough");
    let config = StoreConfig::default();

    let store = UserStore::with_config(FileKeyValueStore::new(&dir), &config);
    let _updates = store.subscribe(|state| {
        println!(
            "state: valid={} message={:?}",
            state.is_valid(),
            state.validation_message()
        );
    });

    let scheduler = Rc::new(ManualScheduler::default());
    let binder = InputBinder::from_config(scheduler.clone(), &config);
    let form = FormController::new(&store, &binder);
    form.prefill();

    let start = chrono::Utc::now();
    let inputs = form.inputs();
    for (i, prefix) in ["J", "Jo", "Joh", "John"].iter().enumerate() {
        inputs.first_name.input_at(*prefix, start + Duration::milliseconds(i as i64 * 80));
    }
    inputs.last_name.input_at("Doe", start);
    inputs.weight.input_at("70", start);
    inputs.height.input_at("175", start);
    inputs.gender.select_at(0, start);
    scheduler.advance_to(start + Duration::seconds(1));

    match form.submit() {
        Ok(_) => {
            let summary = ProfileSummary::from_state(&store.snapshot());
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{json}"),
                Err(e) => eprintln!("Error: {e:?}"),
            }
        }
        Err(e) => eprintln!("Error: {e}"),
    }

    store.clear();
    println!("saved data after clear: {}", store.has_saved_data());
}
