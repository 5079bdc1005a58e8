//! Fixed-capacity per-cycle snapshot of everything the pipeline detected.
//!
//! The registry is rebuilt from scratch each processing cycle and published
//! whole; nothing is merged with the previous cycle. Slots fill in discovery
//! order and writes beyond capacity are dropped.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::detection::{RangeBearing, ShelfCorner};

pub const ITEM_SLOTS: usize = 6;
pub const SHELF_SLOTS: usize = 6;
pub const ROW_MARKER_SLOTS: usize = 3;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionRegistry {
    pub items: [Option<RangeBearing>; ITEM_SLOTS],
    pub shelves: [Option<ShelfCorner>; SHELF_SLOTS],
    pub row_markers: [Option<RangeBearing>; ROW_MARKER_SLOTS],
    pub obstacles: Vec<RangeBearing>,
    pub packing_bay: Option<RangeBearing>,
}

impl DetectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fill the next free item slot; returns false once all slots are taken.
    pub fn push_item(&mut self, rb: RangeBearing) -> bool {
        push_slot(&mut self.items, rb)
    }

    /// Fill the next free shelf-corner slot.
    pub fn push_shelf_corner(&mut self, corner: ShelfCorner) -> bool {
        push_slot(&mut self.shelves, corner)
    }

    /// Record a row marker by 1-based identity; the first sighting wins.
    pub fn set_row_marker(&mut self, row: u8, rb: RangeBearing) -> bool {
        let Some(slot) = self.row_markers.get_mut(row as usize - 1) else {
            return false;
        };
        if slot.is_none() {
            *slot = Some(rb);
            true
        } else {
            false
        }
    }

    pub fn push_obstacle(&mut self, rb: RangeBearing) {
        self.obstacles.push(rb);
    }

    /// Record the packing bay; the first sighting wins.
    pub fn set_packing_bay(&mut self, rb: RangeBearing) -> bool {
        if self.packing_bay.is_none() {
            self.packing_bay = Some(rb);
            true
        } else {
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.iter().all(Option::is_none)
            && self.shelves.iter().all(Option::is_none)
            && self.row_markers.iter().all(Option::is_none)
            && self.obstacles.is_empty()
            && self.packing_bay.is_none()
    }

    /// Flatten into the wire/publish record of the external interface.
    pub fn to_record(&self) -> RegistryRecord {
        RegistryRecord {
            items: self.items.map(|s| s.map(|rb| rb.as_pair())),
            shelves: self.shelves.map(|s| s.map(|c| c.measure.as_pair())),
            row_markers: self.row_markers.map(|s| s.map(|rb| rb.as_pair())),
            obstacles: if self.obstacles.is_empty() {
                None
            } else {
                Some(self.obstacles.iter().map(|rb| rb.as_pair()).collect())
            },
            packing_bay: self.packing_bay.map(|rb| rb.as_pair()),
        }
    }
}

fn push_slot<T>(slots: &mut [Option<T>], value: T) -> bool {
    for slot in slots.iter_mut() {
        if slot.is_none() {
            *slot = Some(value);
            return true;
        }
    }
    false
}

#[derive(thiserror::Error, Debug)]
pub enum RegistryIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Publish format: every entry is null or a `[distance, bearing]` pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub items: [Option<[f64; 2]>; ITEM_SLOTS],
    pub shelves: [Option<[f64; 2]>; SHELF_SLOTS],
    pub row_markers: [Option<[f64; 2]>; ROW_MARKER_SLOTS],
    pub obstacles: Option<Vec<[f64; 2]>>,
    pub packing_bay: Option<[f64; 2]>,
}

impl RegistryRecord {
    /// Write this record to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), RegistryIoError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a record from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, RegistryIoError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::ShelfSide;

    #[test]
    fn slots_never_exceed_capacity() {
        let mut reg = DetectionRegistry::new();
        for i in 0..10 {
            reg.push_item(RangeBearing::new(1.0 + i as f64, 0.0));
        }
        assert_eq!(reg.items.iter().filter(|s| s.is_some()).count(), ITEM_SLOTS);
        // first six kept, in discovery order
        assert_eq!(reg.items[0].unwrap().range, 1.0);
        assert_eq!(reg.items[5].unwrap().range, 6.0);

        for _ in 0..10 {
            reg.push_shelf_corner(ShelfCorner {
                side: ShelfSide::Left,
                measure: RangeBearing::new(2.0, 5.0),
            });
        }
        assert_eq!(
            reg.shelves.iter().filter(|s| s.is_some()).count(),
            SHELF_SLOTS
        );
    }

    #[test]
    fn row_marker_first_sighting_wins() {
        let mut reg = DetectionRegistry::new();
        assert!(reg.set_row_marker(2, RangeBearing::new(1.5, 3.0)));
        assert!(!reg.set_row_marker(2, RangeBearing::new(9.9, 9.9)));
        assert_eq!(reg.row_markers[1].unwrap().range, 1.5);
        assert!(reg.row_markers[0].is_none());
        // out-of-range identity is dropped
        assert!(!reg.set_row_marker(4, RangeBearing::new(1.0, 0.0)));
    }

    #[test]
    fn record_round_trips_as_json() {
        let mut reg = DetectionRegistry::new();
        reg.push_item(RangeBearing::new(0.5, -3.0));
        reg.push_obstacle(RangeBearing::new(0.4, 10.0));
        reg.set_packing_bay(RangeBearing::new(1.2, 0.0));

        let record = reg.to_record();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        record.write_json(&path).unwrap();
        let back = RegistryRecord::load_json(&path).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.items[0], Some([0.5, -3.0]));
        assert_eq!(back.obstacles.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn empty_registry_serializes_nulls() {
        let record = DetectionRegistry::new().to_record();
        assert!(record.obstacles.is_none());
        assert!(record.packing_bay.is_none());
        assert!(record.items.iter().all(Option::is_none));
    }
}
