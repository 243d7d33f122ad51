pub mod controller;
pub mod intent;

pub use controller::WorkflowController;
pub use intent::{Intent, IntentKind, IntentOutcome};
