//! Facade crate for the `warebot-*` workspace.
//!
//! This crate provides:
//! - stable re-exports of the perception and navigation crates
//! - the hardware seams ([`interface::FrameSource`], [`interface::Actuator`])
//! - the three-loop runtime that wires camera, pipeline and task machine
//!   together ([`runtime::Runtime`])
//!
//! ## Quickstart
//!
//! ```no_run
//! use warebot::nav::{schedule_pick_list, PickRequest, SteeringParams, TaskParams, TaskStateMachine};
//! use warebot::runtime::{Runtime, RuntimeParams};
//! use warebot::vision::{PerceptionPipeline, VisionParams};
//! use warebot::core::CalibrationData;
//! # use warebot::interface::{Actuator, FrameSource};
//! # fn camera() -> impl FrameSource + Send { struct S; impl FrameSource for S { fn capture(&mut self) -> Option<warebot::core::Frame> { None } } S }
//! # fn base() -> impl Actuator + Send { struct A; impl Actuator for A { fn drive(&mut self, _: f64, _: f64) {} fn lift(&mut self, _: u8) {} fn grip_open(&mut self) {} fn grip_close(&mut self) {} } A }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let calib = CalibrationData::load_dir("calibration")?;
//! let pipeline = PerceptionPipeline::new(calib, VisionParams::default());
//! let picks = schedule_pick_list(vec![PickRequest { shelf: 2, bay: 1, height: 0 }]);
//! let machine = TaskStateMachine::new(TaskParams::default(), SteeringParams::default(), picks);
//!
//! let runtime = Runtime::new(RuntimeParams::default());
//! runtime.run(camera(), base(), &pipeline, machine);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `warebot::core`: frames, masks, contours, homography, calibration files.
//! - `warebot::vision`: segmentation, classification, range/bearing
//!   estimation and the per-cycle detection registry.
//! - `warebot::nav`: angular potential fields, steering and the
//!   pick-and-place task state machine.
//! - `warebot::imageio` (feature `image`): frame loading from image files.

pub use warebot_core as core;
pub use warebot_nav as nav;
pub use warebot_vision as vision;

pub use warebot_nav::{TaskState, VelocityCommand};
pub use warebot_vision::{DetectionRegistry, PerceptionPipeline, RangeBearing};

pub mod interface;
pub mod runtime;

#[cfg(feature = "image")]
pub mod imageio;
