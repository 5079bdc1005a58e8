//! Three-loop runtime: capture, processing and task threads.
//!
//! The loops share exactly two pieces of state, each behind its own mutex:
//! a single-slot frame buffer (latest frame wins, unprocessed frames are
//! simply overwritten) and the registry snapshot published whole by the
//! processing loop. The task loop never blocks on perception; it steps the
//! state machine against whatever snapshot is current.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use warebot_core::Frame;
use warebot_nav::{TaskAction, TaskStateMachine};
use warebot_vision::{DetectionRegistry, PerceptionPipeline};

use crate::interface::{Actuator, FrameSource};

#[derive(Clone, Copy, Debug)]
pub struct RuntimeParams {
    /// Pause between capture attempts.
    pub capture_period: Duration,
    /// Fixed task-loop poll interval.
    pub task_period: Duration,
    /// Processing-loop sleep when no new frame is waiting.
    pub idle_sleep: Duration,
}

impl Default for RuntimeParams {
    fn default() -> Self {
        Self {
            capture_period: Duration::from_millis(33),
            task_period: Duration::from_millis(100),
            idle_sleep: Duration::from_millis(5),
        }
    }
}

/// Owns the stop flag and runs the three loops to completion.
pub struct Runtime {
    params: RuntimeParams,
    stop: Arc<AtomicBool>,
}

impl Runtime {
    pub fn new(params: RuntimeParams) -> Self {
        Self {
            params,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag that terminates all three loops when set. Hand this to a
    /// signal handler or a test harness.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run until the stop flag is raised. Returns the moved-in collaborators
    /// so callers can inspect them afterwards.
    pub fn run<S, A>(
        &self,
        source: S,
        actuator: A,
        pipeline: &PerceptionPipeline,
        machine: TaskStateMachine,
    ) -> (S, A, TaskStateMachine)
    where
        S: FrameSource + Send,
        A: Actuator + Send,
    {
        let stop = &self.stop;
        let params = self.params;
        let frame_slot: Mutex<Option<Frame>> = Mutex::new(None);
        let registry: Mutex<DetectionRegistry> = Mutex::new(DetectionRegistry::new());

        thread::scope(|s| {
            let capture = s.spawn(|| {
                let mut source = source;
                while !stop.load(Ordering::Relaxed) {
                    if let Some(frame) = source.capture() {
                        *frame_slot.lock().unwrap() = Some(frame);
                    }
                    thread::sleep(params.capture_period);
                }
                source
            });

            let processing = s.spawn(|| {
                while !stop.load(Ordering::Relaxed) {
                    let frame = frame_slot.lock().unwrap().take();
                    match frame {
                        Some(frame) => {
                            let snapshot = pipeline.process(&frame);
                            *registry.lock().unwrap() = snapshot;
                        }
                        None => thread::sleep(params.idle_sleep),
                    }
                }
            });

            let task = s.spawn(|| {
                let mut actuator = actuator;
                let mut machine = machine;
                while !stop.load(Ordering::Relaxed) {
                    let snapshot = registry.lock().unwrap().clone();
                    let out = machine.step(&snapshot);
                    for action in &out.actions {
                        match action {
                            TaskAction::Lift(level) => actuator.lift(*level),
                            TaskAction::GripOpen => actuator.grip_open(),
                            TaskAction::GripClose => actuator.grip_close(),
                        }
                    }
                    actuator.drive(out.velocity.forward, out.velocity.rotational);
                    thread::sleep(params.task_period);
                }
                // leave the base stationary on shutdown
                actuator.drive(0.0, 0.0);
                (actuator, machine)
            });

            let source = capture.join().expect("capture loop panicked");
            processing.join().expect("processing loop panicked");
            let (actuator, machine) = task.join().expect("task loop panicked");
            log::info!("runtime stopped");
            (source, actuator, machine)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use warebot_core::{CalibrationData, Category, ColorProfile};
    use warebot_nav::{PickRequest, SteeringParams, TaskParams};
    use warebot_vision::VisionParams;

    struct CountingSource {
        frames: Arc<AtomicUsize>,
    }

    impl FrameSource for CountingSource {
        fn capture(&mut self) -> Option<Frame> {
            self.frames.fetch_add(1, Ordering::Relaxed);
            Some(Frame::filled(32, 24, [0, 0, 0]))
        }
    }

    #[derive(Default)]
    struct RecordingActuator {
        drive_calls: Vec<(f64, f64)>,
    }

    impl Actuator for RecordingActuator {
        fn drive(&mut self, forward: f64, rotational: f64) {
            self.drive_calls.push((forward, rotational));
        }
        fn lift(&mut self, _level: u8) {}
        fn grip_open(&mut self) {}
        fn grip_close(&mut self) {}
    }

    fn test_pipeline() -> PerceptionPipeline {
        let mut colors = HashMap::new();
        colors.insert(
            Category::Item,
            ColorProfile {
                lower: [50, 100, 100],
                upper: [70, 255, 255],
            },
        );
        PerceptionPipeline::new(
            CalibrationData::new(colors, None, 1500.0),
            VisionParams::default(),
        )
    }

    #[test]
    fn loops_run_and_stop_on_flag() {
        let params = RuntimeParams {
            capture_period: Duration::from_millis(1),
            task_period: Duration::from_millis(1),
            idle_sleep: Duration::from_millis(1),
        };
        let runtime = Runtime::new(params);
        let stop = runtime.stop_handle();

        let frames = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            frames: Arc::clone(&frames),
        };
        let machine = TaskStateMachine::new(
            TaskParams::default(),
            SteeringParams::default(),
            vec![PickRequest {
                shelf: 0,
                bay: 0,
                height: 0,
            }],
        );
        let pipeline = test_pipeline();

        let watcher_frames = Arc::clone(&frames);
        let watcher_stop = Arc::clone(&stop);
        let watcher = thread::spawn(move || {
            while watcher_frames.load(Ordering::Relaxed) < 5 {
                thread::sleep(Duration::from_millis(1));
            }
            watcher_stop.store(true, Ordering::Relaxed);
        });

        let (_, actuator, machine) =
            runtime.run(source, RecordingActuator::default(), &pipeline, machine);
        watcher.join().unwrap();

        assert!(frames.load(Ordering::Relaxed) >= 5);
        // task loop issued commands and parked the base on shutdown
        assert!(!actuator.drive_calls.is_empty());
        assert_eq!(*actuator.drive_calls.last().unwrap(), (0.0, 0.0));
        // empty scene: still searching for the shelf
        assert_ne!(machine.state(), warebot_nav::TaskState::MoveToShelf);
    }
}
