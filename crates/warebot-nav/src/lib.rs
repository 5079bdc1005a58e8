//! Reactive navigation for the warebot pipeline: angular potential-field
//! steering plus the pick-and-place task sequencer.

mod field;
mod steering;
mod task;

pub use field::AngularField;
pub use steering::{SteeringController, SteeringParams, VelocityCommand};
pub use task::{
    schedule_pick_list, PickRequest, TaskAction, TaskOutput, TaskParams, TaskState,
    TaskStateMachine,
};
