//! End-to-end checks: calibration files on disk -> pipeline -> registry ->
//! JSON export, and a full pick cycle through the task machine.

use std::collections::HashMap;

use nalgebra::Matrix3;

use warebot::core::{
    save_color_thresholds, save_focal_length, save_homography, CalibrationData, Category,
    ColorProfile, Frame, GroundHomography,
};
use warebot::nav::{
    schedule_pick_list, PickRequest, SteeringParams, TaskAction, TaskParams, TaskState,
    TaskStateMachine,
};
use warebot::vision::{DetectionRegistry, PerceptionPipeline, RangeBearing, RegistryRecord, VisionParams};

fn write_calibration_dir(dir: &std::path::Path, with_homography: bool) {
    let mut colors = HashMap::new();
    colors.insert(
        Category::Item,
        ColorProfile {
            lower: [50, 100, 100],
            upper: [70, 255, 255],
        },
    );
    colors.insert(
        Category::Obstacle,
        ColorProfile {
            lower: [0, 100, 100],
            upper: [10, 255, 255],
        },
    );
    save_color_thresholds(dir.join("color_thresholds.csv"), &colors).unwrap();
    save_focal_length(dir.join("focal_length.csv"), "camera", 1500.0).unwrap();
    if with_homography {
        // 100 px per metre on the ground plane
        let h = GroundHomography::new(Matrix3::new(
            0.01, 0.0, 0.0, //
            0.0, 0.01, 0.0, //
            0.0, 0.0, 1.0,
        ));
        save_homography(dir.join("homography.csv"), &h).unwrap();
    }
}

fn scene_frame() -> Frame {
    let mut frame = Frame::filled(320, 240, [0, 0, 0]);
    // green item block, 40 px wide
    for y in 100..140 {
        for x in 140..180 {
            frame.set_rgb(x, y, [0, 255, 0]);
        }
    }
    // red obstacle block on the floor
    for y in 180..230 {
        for x in 40..110 {
            frame.set_rgb(x, y, [255, 0, 0]);
        }
    }
    frame
}

fn test_params() -> VisionParams {
    let mut params = VisionParams::default();
    params.preprocess.blur_kernel = 0;
    params
}

#[test]
fn calibration_dir_to_registry_json() {
    let dir = tempfile::tempdir().unwrap();
    write_calibration_dir(dir.path(), true);

    let calib = CalibrationData::load_dir(dir.path()).unwrap();
    let pipeline = PerceptionPipeline::new(calib, test_params());
    let registry = pipeline.process(&scene_frame());

    // pinhole range: 0.05 m * 1500 px / 40 px
    let item = registry.items[0].expect("item registered");
    assert!((item.range - 1.875).abs() < 0.1, "item range {}", item.range);
    assert_eq!(registry.obstacles.len(), 1);

    let out = dir.path().join("registry.json");
    registry.to_record().write_json(&out).unwrap();
    let back = RegistryRecord::load_json(&out).unwrap();
    assert_eq!(back, registry.to_record());
}

#[test]
fn missing_homography_file_disables_ground_ranging() {
    let dir = tempfile::tempdir().unwrap();
    write_calibration_dir(dir.path(), false);

    let calib = CalibrationData::load_dir(dir.path()).unwrap();
    assert!(calib.homography.is_none());

    let pipeline = PerceptionPipeline::new(calib, test_params());
    let registry = pipeline.process(&scene_frame());
    // pinhole items survive, ground-model obstacles do not
    assert!(registry.items[0].is_some());
    assert!(registry.obstacles.is_empty());
}

#[test]
fn full_pick_cycle_walks_every_state() {
    let picks = schedule_pick_list(vec![PickRequest {
        shelf: 0,
        bay: 3,
        height: 1,
    }]);
    let params = TaskParams::default();
    let mut sm = TaskStateMachine::new(params, SteeringParams::default(), picks);

    let empty = DetectionRegistry::new();
    sm.step(&empty);
    assert_eq!(sm.state(), TaskState::SearchForShelf);

    let mut reg = DetectionRegistry::new();
    reg.shelves[0] = Some(warebot::vision::ShelfCorner {
        side: warebot::vision::ShelfSide::Left,
        measure: RangeBearing::new(1.0, 2.0),
    });
    sm.step(&reg);
    assert_eq!(sm.state(), TaskState::MoveToShelf);

    reg.shelves[0] = Some(warebot::vision::ShelfCorner {
        side: warebot::vision::ShelfSide::Left,
        measure: RangeBearing::new(0.1, 0.0),
    });
    sm.step(&reg);
    assert_eq!(sm.state(), TaskState::SearchForRow);

    // row marker 1 covers shelves 0 and 1
    reg.row_markers[0] = Some(RangeBearing::new(1.0, 0.0));
    sm.step(&reg);
    assert_eq!(sm.state(), TaskState::MoveToRow);

    // bay 3 stops at the deepest position
    reg.row_markers[0] = Some(RangeBearing::new(0.15, 0.0));
    sm.step(&reg);
    assert_eq!(sm.state(), TaskState::SearchForItem);

    reg.push_item(RangeBearing::new(0.15, 0.5));
    sm.step(&reg);
    assert_eq!(sm.state(), TaskState::CollectItem);

    let out = sm.step(&reg);
    assert_eq!(out.actions, vec![TaskAction::Lift(1), TaskAction::GripClose]);
    assert_eq!(sm.state(), TaskState::RotateToExit);

    for _ in 0..params.exit_rotate_steps {
        sm.step(&reg);
    }
    assert_eq!(sm.state(), TaskState::MoveToExit);
    for _ in 0..params.exit_advance_steps {
        sm.step(&reg);
    }
    assert_eq!(sm.state(), TaskState::SearchForPackingBay);

    reg.set_packing_bay(RangeBearing::new(1.0, -3.0));
    sm.step(&reg);
    assert_eq!(sm.state(), TaskState::MoveToPackingBay);

    reg.packing_bay = Some(RangeBearing::new(0.3, 0.0));
    sm.step(&reg);
    assert_eq!(sm.state(), TaskState::DropItem);

    let out = sm.step(&reg);
    assert_eq!(out.actions, vec![TaskAction::Lift(0), TaskAction::GripOpen]);
    assert_eq!(sm.state(), TaskState::ExitPackingBay);

    for _ in 0..params.exit_rotate_steps {
        sm.step(&reg);
    }
    // single pick: the machine idles once the list is exhausted
    assert_eq!(sm.state(), TaskState::Init);
    assert!(sm.current_pick().is_none());
}
