pub mod gateway;
pub mod grouping;
pub mod insights;
pub mod rest_timer;
pub mod steps;

pub use gateway::{DeleteOutcome, GatewayError, JournalGateway};
pub use rest_timer::{Notification, RestTimer};
pub use steps::{DisabledStepSource, HttpStepSource, StepCountSource};
