//! Pick-and-place task sequencing.
//!
//! The machine is stepped at a fixed poll interval with the latest registry
//! snapshot and emits one velocity command (plus occasional lift/grip actions)
//! per step. Every transition is a pure function of registry contents and
//! internal counters: no randomness, no wall-clock timers. The only
//! time-flavoured mechanism is the rotate-step cap that flips the search
//! direction when a landmark refuses to appear.

use serde::{Deserialize, Serialize};

use warebot_vision::{DetectionRegistry, RangeBearing};

use crate::steering::{SteeringController, SteeringParams, VelocityCommand};

/// One entry of the externally supplied pick list.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PickRequest {
    /// Shelf-corner slot index, 0..=5.
    pub shelf: usize,
    /// Bay position along the row, 0..=3.
    pub bay: usize,
    /// Lift height level.
    pub height: u8,
}

/// Scheduling policy for the pick list: group by target height (ascending),
/// schedule the minimum shelf of each height group first, then the remainder
/// of the group by shelf index descending. This is a traversal-friendly
/// ordering, not a spatial plan.
pub fn schedule_pick_list(picks: Vec<PickRequest>) -> Vec<PickRequest> {
    use std::collections::BTreeMap;

    let mut by_height: BTreeMap<u8, Vec<PickRequest>> = BTreeMap::new();
    for p in picks {
        by_height.entry(p.height).or_default().push(p);
    }

    let mut out = Vec::new();
    for (_, mut group) in by_height {
        let min_idx = group
            .iter()
            .enumerate()
            .min_by_key(|(_, p)| p.shelf)
            .map(|(i, _)| i)
            .expect("non-empty group");
        let first = group.swap_remove(min_idx);
        group.sort_by(|a, b| b.shelf.cmp(&a.shelf));
        out.push(first);
        out.extend(group);
    }
    out
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TaskState {
    Init,
    SearchForShelf,
    MoveToShelf,
    SearchForRow,
    MoveToRow,
    SearchForItem,
    CollectItem,
    RotateToExit,
    MoveToExit,
    SearchForPackingBay,
    MoveToPackingBay,
    DropItem,
    ExitPackingBay,
}

/// Discrete actuation request emitted alongside the velocity command.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum TaskAction {
    Lift(u8),
    GripOpen,
    GripClose,
}

/// One step's worth of output for the actuation interface.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskOutput {
    pub velocity: VelocityCommand,
    pub actions: Vec<TaskAction>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TaskParams {
    /// In-place rotation rate for SEARCH states, rad/s.
    pub search_rotation_rad_s: f64,
    /// Shelf approach distance, metres.
    pub shelf_approach_m: f64,
    /// Row-approach distance per bay position; index = bay.
    pub bay_positions_m: [f64; 4],
    /// Packing-bay approach distance, metres.
    pub packing_bay_approach_m: f64,
    /// Item collection gate: bearing magnitude, radians.
    pub item_bearing_gate_rad: f64,
    /// Item collection gate: range, metres.
    pub item_range_gate_m: f64,
    /// Steps of fruitless searching before the rotate direction flips.
    pub search_step_cap: u32,
    /// Rotate steps for the half-turn out of a shelf row or packing bay.
    pub exit_rotate_steps: u32,
    /// Forward steps taken when leaving a row before searching for the bay.
    pub exit_advance_steps: u32,
}

impl Default for TaskParams {
    fn default() -> Self {
        Self {
            search_rotation_rad_s: 0.3,
            shelf_approach_m: 0.15,
            bay_positions_m: [0.95, 0.70, 0.45, 0.20],
            packing_bay_approach_m: 0.4,
            item_bearing_gate_rad: 0.05,
            item_range_gate_m: 0.20,
            search_step_cap: 600,
            exit_rotate_steps: 50,
            exit_advance_steps: 30,
        }
    }
}

/// The task sequencer; the only pipeline entity with multi-cycle state.
pub struct TaskStateMachine {
    params: TaskParams,
    steering: SteeringController,
    state: TaskState,
    picks: Vec<PickRequest>,
    pick_index: usize,
    step_count: u32,
    rotate_dir: f64,
    last_velocity: VelocityCommand,
}

impl TaskStateMachine {
    /// Build the machine around an already ordered pick list; use
    /// [`schedule_pick_list`] to order a raw one.
    pub fn new(
        params: TaskParams,
        steering_params: SteeringParams,
        picks: Vec<PickRequest>,
    ) -> Self {
        Self {
            params,
            steering: SteeringController::new(steering_params),
            state: TaskState::Init,
            picks,
            pick_index: 0,
            step_count: 0,
            rotate_dir: 1.0,
            last_velocity: VelocityCommand::STOP,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn current_pick(&self) -> Option<&PickRequest> {
        self.picks.get(self.pick_index)
    }

    pub fn last_velocity(&self) -> VelocityCommand {
        self.last_velocity
    }

    /// Even sub-target slot for the current pick's shelf: odd shelf `n`
    /// approaches via corner slot `n - 1`.
    fn shelf_subtarget(&self) -> usize {
        self.current_pick().map(|p| p.shelf & !1).unwrap_or(0)
    }

    fn target_row(&self) -> usize {
        // two shelves per row
        self.current_pick().map(|p| p.shelf / 2).unwrap_or(0)
    }

    fn transition(&mut self, next: TaskState) {
        log::info!("task: {:?} -> {:?}", self.state, next);
        self.state = next;
        self.step_count = 0;
    }

    fn search_velocity(&mut self) -> VelocityCommand {
        self.step_count += 1;
        if self.step_count > self.params.search_step_cap {
            // stuck: sweep the other way
            self.rotate_dir = -self.rotate_dir;
            self.step_count = 0;
            log::warn!("task: search cap hit in {:?}, reversing sweep", self.state);
        }
        VelocityCommand::rotate(self.rotate_dir * self.params.search_rotation_rad_s)
    }

    /// Advance to the next pick after a completed drop.
    fn advance_pick(&mut self) {
        self.pick_index += 1;
        // alternate the initial sweep side between picks
        self.rotate_dir = if self.pick_index % 2 == 0 { 1.0 } else { -1.0 };
    }

    /// Run one state-machine step against the latest registry snapshot.
    pub fn step(&mut self, registry: &DetectionRegistry) -> TaskOutput {
        let mut actions = Vec::new();
        let velocity = match self.state {
            TaskState::Init => {
                if self.current_pick().is_some() {
                    self.transition(TaskState::SearchForShelf);
                }
                VelocityCommand::STOP
            }

            TaskState::SearchForShelf => {
                if registry.shelves[self.shelf_subtarget()].is_some() {
                    self.transition(TaskState::MoveToShelf);
                    VelocityCommand::STOP
                } else {
                    self.search_velocity()
                }
            }

            TaskState::MoveToShelf => match registry.shelves[self.shelf_subtarget()] {
                Some(corner) => {
                    if corner.measure.range < self.params.shelf_approach_m {
                        self.transition(TaskState::SearchForRow);
                        VelocityCommand::STOP
                    } else {
                        self.steering.steer(corner.measure, &registry.obstacles)
                    }
                }
                None => {
                    self.transition(TaskState::SearchForShelf);
                    VelocityCommand::STOP
                }
            },

            TaskState::SearchForRow => {
                if registry.row_markers[self.target_row()].is_some() {
                    self.transition(TaskState::MoveToRow);
                    VelocityCommand::STOP
                } else {
                    self.search_velocity()
                }
            }

            TaskState::MoveToRow => match registry.row_markers[self.target_row()] {
                Some(marker) => {
                    let bay = self.current_pick().map(|p| p.bay).unwrap_or(0);
                    let stop_at = self.params.bay_positions_m[bay.min(3)];
                    if marker.range < stop_at {
                        self.transition(TaskState::SearchForItem);
                        VelocityCommand::STOP
                    } else {
                        self.steering.steer(marker, &registry.obstacles)
                    }
                }
                None => {
                    self.transition(TaskState::SearchForRow);
                    VelocityCommand::STOP
                }
            },

            TaskState::SearchForItem => {
                let reachable = registry.items.iter().flatten().find(|item| {
                    item.bearing_rad().abs() <= self.params.item_bearing_gate_rad
                        && item.range < self.params.item_range_gate_m
                });
                if reachable.is_some() {
                    self.transition(TaskState::CollectItem);
                    VelocityCommand::STOP
                } else {
                    self.search_velocity()
                }
            }

            TaskState::CollectItem => {
                let height = self.current_pick().map(|p| p.height).unwrap_or(0);
                actions.push(TaskAction::Lift(height));
                actions.push(TaskAction::GripClose);
                self.transition(TaskState::RotateToExit);
                VelocityCommand::STOP
            }

            TaskState::RotateToExit => {
                self.step_count += 1;
                if self.step_count >= self.params.exit_rotate_steps {
                    self.transition(TaskState::MoveToExit);
                    VelocityCommand::STOP
                } else {
                    VelocityCommand::rotate(self.rotate_dir * self.params.search_rotation_rad_s)
                }
            }

            TaskState::MoveToExit => {
                self.step_count += 1;
                if self.step_count >= self.params.exit_advance_steps {
                    self.transition(TaskState::SearchForPackingBay);
                    VelocityCommand::STOP
                } else {
                    // head out of the row; the field still bends around
                    // anything in the way
                    let ahead = RangeBearing::new(1.0, 0.0);
                    self.steering.steer(ahead, &registry.obstacles)
                }
            }

            TaskState::SearchForPackingBay => {
                if registry.packing_bay.is_some() {
                    self.transition(TaskState::MoveToPackingBay);
                    VelocityCommand::STOP
                } else {
                    self.search_velocity()
                }
            }

            TaskState::MoveToPackingBay => match registry.packing_bay {
                Some(bay) => {
                    if bay.range < self.params.packing_bay_approach_m {
                        self.transition(TaskState::DropItem);
                        VelocityCommand::STOP
                    } else {
                        self.steering.steer(bay, &registry.obstacles)
                    }
                }
                None => {
                    self.transition(TaskState::SearchForPackingBay);
                    VelocityCommand::STOP
                }
            },

            TaskState::DropItem => {
                actions.push(TaskAction::Lift(0));
                actions.push(TaskAction::GripOpen);
                self.transition(TaskState::ExitPackingBay);
                VelocityCommand::STOP
            }

            TaskState::ExitPackingBay => {
                self.step_count += 1;
                if self.step_count >= self.params.exit_rotate_steps {
                    self.advance_pick();
                    if self.current_pick().is_some() {
                        self.transition(TaskState::SearchForShelf);
                    } else {
                        log::info!("task: pick list exhausted");
                        self.transition(TaskState::Init);
                    }
                    VelocityCommand::STOP
                } else {
                    VelocityCommand::rotate(self.rotate_dir * self.params.search_rotation_rad_s)
                }
            }
        };

        self.last_velocity = velocity;
        TaskOutput { velocity, actions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warebot_vision::{ShelfCorner, ShelfSide};

    fn machine(picks: Vec<PickRequest>) -> TaskStateMachine {
        TaskStateMachine::new(
            TaskParams::default(),
            SteeringParams::default(),
            schedule_pick_list(picks),
        )
    }

    fn shelf_at(range: f64, bearing: f64) -> ShelfCorner {
        ShelfCorner {
            side: ShelfSide::Left,
            measure: RangeBearing::new(range, bearing),
        }
    }

    fn pick(shelf: usize, bay: usize, height: u8) -> PickRequest {
        PickRequest { shelf, bay, height }
    }

    #[test]
    fn schedule_groups_by_height_min_shelf_first_rest_descending() {
        let picks = vec![
            pick(3, 0, 1),
            pick(0, 1, 0),
            pick(5, 2, 0),
            pick(2, 3, 0),
            pick(1, 0, 1),
        ];
        let ordered = schedule_pick_list(picks);
        let shelves: Vec<(usize, u8)> = ordered.iter().map(|p| (p.shelf, p.height)).collect();
        // height 0: min shelf 0 first, then 5, 2 descending;
        // height 1: min shelf 1 first, then 3
        assert_eq!(shelves, vec![(0, 0), (5, 0), (2, 0), (1, 1), (3, 1)]);
    }

    #[test]
    fn odd_shelf_targets_even_subtarget_slot() {
        let mut sm = machine(vec![pick(3, 0, 0)]);
        let empty = DetectionRegistry::new();
        sm.step(&empty); // Init -> SearchForShelf
        assert_eq!(sm.state(), TaskState::SearchForShelf);

        // shelf slot 3 visible does nothing; slot 2 is the subtarget
        let mut reg = DetectionRegistry::new();
        reg.shelves[3] = Some(shelf_at(1.0, 5.0));
        sm.step(&reg);
        assert_eq!(sm.state(), TaskState::SearchForShelf);

        reg.shelves[2] = Some(shelf_at(1.0, 5.0));
        sm.step(&reg);
        assert_eq!(sm.state(), TaskState::MoveToShelf);
    }

    #[test]
    fn shelf_approach_threshold_advances_to_row_search() {
        let mut sm = machine(vec![pick(2, 0, 0)]);
        sm.step(&DetectionRegistry::new());

        let mut reg = DetectionRegistry::new();
        reg.shelves[2] = Some(shelf_at(1.0, 0.0));
        sm.step(&reg); // -> MoveToShelf
        let out = sm.step(&reg);
        assert_eq!(sm.state(), TaskState::MoveToShelf);
        assert!(out.velocity.forward > 0.0);

        reg.shelves[2] = Some(shelf_at(0.1, 0.0));
        sm.step(&reg);
        assert_eq!(sm.state(), TaskState::SearchForRow);
    }

    #[test]
    fn lost_shelf_returns_to_search() {
        let mut sm = machine(vec![pick(0, 0, 0)]);
        sm.step(&DetectionRegistry::new());
        let mut reg = DetectionRegistry::new();
        reg.shelves[0] = Some(shelf_at(1.0, 0.0));
        sm.step(&reg); // -> MoveToShelf
        sm.step(&DetectionRegistry::new());
        assert_eq!(sm.state(), TaskState::SearchForShelf);
    }

    #[test]
    fn item_gate_requires_centered_close_item() {
        let mut sm = machine(vec![pick(0, 0, 1)]);
        sm.state = TaskState::SearchForItem;

        // close but off-centre: keep searching
        let mut reg = DetectionRegistry::new();
        reg.push_item(RangeBearing::new(0.15, 10.0));
        let out = sm.step(&reg);
        assert_eq!(sm.state(), TaskState::SearchForItem);
        assert_eq!(out.velocity.forward, 0.0);
        assert!(out.velocity.rotational != 0.0);

        // centred and close: collect
        let mut reg = DetectionRegistry::new();
        reg.push_item(RangeBearing::new(0.15, 1.0)); // ~0.017 rad
        sm.step(&reg);
        assert_eq!(sm.state(), TaskState::CollectItem);

        let out = sm.step(&reg);
        assert_eq!(
            out.actions,
            vec![TaskAction::Lift(1), TaskAction::GripClose]
        );
        assert_eq!(sm.state(), TaskState::RotateToExit);
    }

    #[test]
    fn drop_cycle_advances_to_next_pick() {
        let mut sm = machine(vec![pick(0, 0, 0), pick(2, 1, 0)]);
        sm.state = TaskState::MoveToPackingBay;

        let mut reg = DetectionRegistry::new();
        reg.set_packing_bay(RangeBearing::new(0.3, 0.0));
        sm.step(&reg);
        assert_eq!(sm.state(), TaskState::DropItem);

        let out = sm.step(&reg);
        assert_eq!(out.actions, vec![TaskAction::Lift(0), TaskAction::GripOpen]);
        assert_eq!(sm.state(), TaskState::ExitPackingBay);

        for _ in 0..TaskParams::default().exit_rotate_steps {
            sm.step(&reg);
        }
        assert_eq!(sm.state(), TaskState::SearchForShelf);
        assert_eq!(sm.current_pick(), Some(&pick(2, 1, 0)));
    }

    #[test]
    fn identical_registry_sequences_yield_identical_traces() {
        let registries: Vec<DetectionRegistry> = (0..40)
            .map(|i| {
                let mut reg = DetectionRegistry::new();
                if i > 5 {
                    reg.shelves[0] = Some(shelf_at(1.5 - 0.05 * i as f64, 3.0));
                }
                if i % 3 == 0 {
                    reg.push_obstacle(RangeBearing::new(0.5, -8.0));
                }
                reg
            })
            .collect();

        let run = |mut sm: TaskStateMachine| {
            let mut trace = Vec::new();
            for reg in &registries {
                let out = sm.step(reg);
                trace.push((sm.state(), out.velocity));
            }
            trace
        };

        let a = run(machine(vec![pick(0, 0, 0)]));
        let b = run(machine(vec![pick(0, 0, 0)]));
        assert_eq!(a, b);
    }

    #[test]
    fn search_cap_reverses_sweep_direction() {
        let params = TaskParams {
            search_step_cap: 3,
            ..TaskParams::default()
        };
        let mut sm = TaskStateMachine::new(
            params,
            SteeringParams::default(),
            vec![pick(0, 0, 0)],
        );
        let empty = DetectionRegistry::new();
        sm.step(&empty); // Init -> SearchForShelf

        let first = sm.step(&empty).velocity.rotational;
        for _ in 0..4 {
            sm.step(&empty);
        }
        let later = sm.step(&empty).velocity.rotational;
        assert_eq!(first.signum(), -later.signum());
    }
}
