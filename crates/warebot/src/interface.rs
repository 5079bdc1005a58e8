//! Hardware seams of the runtime.
//!
//! The runtime is written against these two traits so the same loops drive a
//! real camera and motor base, a simulator, or the fakes used in tests.

use warebot_core::Frame;

/// Supplier of camera frames.
///
/// `capture` may block for the sensor's exposure time; the capture loop calls
/// it from its own thread. Returning `None` means no frame is available right
/// now, not end of stream.
pub trait FrameSource {
    fn capture(&mut self) -> Option<Frame>;
}

/// Sink for velocity and manipulator commands.
///
/// Implementations must accept every call without blocking the task loop for
/// longer than one poll interval.
pub trait Actuator {
    /// Set the drive velocities: forward in m/s, rotational in rad/s with
    /// positive turning toward positive bearings.
    fn drive(&mut self, forward: f64, rotational: f64);

    /// Move the lift to a discrete height level.
    fn lift(&mut self, level: u8);

    fn grip_open(&mut self);

    fn grip_close(&mut self);
}
