//! Grid topology: rank ↔ position and the four orthogonal neighbours.
//!
//! Workers are laid out row-major on a `rows × cols` grid with no
//! wraparound. The aggregator is not part of the grid; it always holds the
//! rank just past the last worker.
//!
//! ```text
//!        col 0   col 1   col 2
//! row 0 [  0  ] [  1  ] [  2  ]
//! row 1 [  3  ] [  4  ] [  5  ]      aggregator = 6
//! ```

use crate::error::ConfigError;
use gridwatch_env::NodeId;
use serde::{Deserialize, Serialize};

/// Neighbour directions, in the fixed slot order used everywhere
/// (exchange buffers, corroboration scan, wire layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All directions in slot order.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];
    
    /// Slot index of this direction.
    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }
    
    /// The direction pointing back at us from the neighbour.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
    
    /// (row, col) step.
    fn offset(self) -> (i64, i64) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        write!(f, "{}", name)
    }
}

/// Coordinates of a worker in the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPosition {
    pub row: u32,
    pub col: u32,
}

impl GridPosition {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for GridPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.row, self.col)
    }
}

/// A present neighbour: its identity and where it sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor {
    pub id: NodeId,
    pub position: GridPosition,
}

/// The up-to-four neighbours of one worker, indexed by [`Direction`].
///
/// Absent slots only occur at edges and corners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeighborSet {
    slots: [Option<Neighbor>; 4],
}

impl NeighborSet {
    /// A set with every slot absent.
    pub fn empty() -> Self {
        Self::default()
    }
    
    /// The neighbour in `direction`, if any.
    pub fn get(&self, direction: Direction) -> Option<Neighbor> {
        self.slots[direction.index()]
    }
    
    /// Present neighbours in slot order.
    pub fn present(&self) -> impl Iterator<Item = (Direction, Neighbor)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |dir| self.get(dir).map(|n| (dir, n)))
    }
    
    /// Number of present neighbours.
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// A validated `rows × cols` worker grid plus one aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridTopology {
    rows: u32,
    cols: u32,
}

impl GridTopology {
    /// Builds a topology from externally supplied dimensions.
    ///
    /// Dimensions are taken as signed values so that non-positive input can
    /// be reported rather than wrapped.
    pub fn new(rows: i64, cols: i64) -> Result<Self, ConfigError> {
        if rows < 1 || cols < 1 {
            return Err(ConfigError::NonPositiveDimensions { rows, cols });
        }
        // Every rank, including the aggregator, must fit an i32 on the wire.
        let participants = rows.checked_mul(cols).and_then(|n| n.checked_add(1));
        match participants {
            Some(n) if n <= i64::from(i32::MAX) => {}
            _ => return Err(ConfigError::GridTooLarge { rows, cols }),
        }
        Ok(Self {
            rows: u32::try_from(rows).map_err(|_| ConfigError::GridTooLarge { rows, cols })?,
            cols: u32::try_from(cols).map_err(|_| ConfigError::GridTooLarge { rows, cols })?,
        })
    }
    
    /// Builds a topology and checks it against the total participant count.
    ///
    /// The check happens before the topology is handed out, so a mismatched
    /// run never gets as far as constructing nodes.
    pub fn for_participants(rows: i64, cols: i64, participants: usize) -> Result<Self, ConfigError> {
        let topology = Self::new(rows, cols)?;
        topology.validate_participants(participants)?;
        Ok(topology)
    }
    
    /// Fails unless `participants == rows * cols + 1`.
    pub fn validate_participants(&self, participants: usize) -> Result<(), ConfigError> {
        let expected = self.participant_count();
        if participants != expected {
            return Err(ConfigError::ParticipantMismatch {
                expected,
                actual: participants,
            });
        }
        Ok(())
    }
    
    pub fn rows(&self) -> u32 {
        self.rows
    }
    
    pub fn cols(&self) -> u32 {
        self.cols
    }
    
    /// Number of grid (worker) nodes.
    pub fn worker_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
    
    /// Workers plus the aggregator.
    pub fn participant_count(&self) -> usize {
        self.worker_count() + 1
    }
    
    /// The aggregator always takes the last rank.
    pub fn aggregator_id(&self) -> NodeId {
        NodeId(self.rows * self.cols)
    }
    
    /// Iterates over all worker ids in rank order.
    pub fn workers(&self) -> impl Iterator<Item = NodeId> {
        (0..self.rows * self.cols).map(NodeId)
    }
    
    /// True if the position lies inside the grid.
    pub fn contains(&self, position: GridPosition) -> bool {
        position.row < self.rows && position.col < self.cols
    }
    
    /// Row-major position of a worker; `None` for the aggregator or out-of-range ids.
    pub fn position_of(&self, id: NodeId) -> Option<GridPosition> {
        if id.0 >= self.rows * self.cols {
            return None;
        }
        Some(GridPosition::new(id.0 / self.cols, id.0 % self.cols))
    }
    
    /// Rank of the worker at `position`.
    pub fn rank_of(&self, position: GridPosition) -> Option<NodeId> {
        if !self.contains(position) {
            return None;
        }
        Some(NodeId(position.row * self.cols + position.col))
    }
    
    /// The neighbour of `id` in `direction`, or `None` past a boundary.
    pub fn neighbor(&self, id: NodeId, direction: Direction) -> Option<Neighbor> {
        let position = self.position_of(id)?;
        let (dr, dc) = direction.offset();
        let row = i64::from(position.row) + dr;
        let col = i64::from(position.col) + dc;
        
        if row < 0 || col < 0 || row >= i64::from(self.rows) || col >= i64::from(self.cols) {
            return None;
        }
        
        let position = GridPosition::new(u32::try_from(row).ok()?, u32::try_from(col).ok()?);
        let id = self.rank_of(position)?;
        Some(Neighbor { id, position })
    }
    
    /// All four neighbour slots of `id`. Non-workers get an empty set.
    pub fn neighbors(&self, id: NodeId) -> NeighborSet {
        let mut set = NeighborSet::empty();
        for direction in Direction::ALL {
            set.slots[direction.index()] = self.neighbor(id, direction);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    
    #[test]
    fn test_position_is_row_major() {
        let topology = GridTopology::new(3, 4).unwrap();
        assert_eq!(topology.position_of(NodeId(0)), Some(GridPosition::new(0, 0)));
        assert_eq!(topology.position_of(NodeId(5)), Some(GridPosition::new(1, 1)));
        assert_eq!(topology.position_of(NodeId(11)), Some(GridPosition::new(2, 3)));
        
        // Aggregator is not on the grid
        assert_eq!(topology.aggregator_id(), NodeId(12));
        assert_eq!(topology.position_of(NodeId(12)), None);
    }
    
    #[test]
    fn test_neighbors_of_interior_node() {
        let topology = GridTopology::new(3, 3).unwrap();
        let set = topology.neighbors(NodeId(4));
        
        assert_eq!(set.count(), 4);
        assert_eq!(set.get(Direction::Up).map(|n| n.id), Some(NodeId(1)));
        assert_eq!(set.get(Direction::Down).map(|n| n.id), Some(NodeId(7)));
        assert_eq!(set.get(Direction::Left).map(|n| n.id), Some(NodeId(3)));
        assert_eq!(set.get(Direction::Right).map(|n| n.id), Some(NodeId(5)));
    }
    
    #[test]
    fn test_corner_has_no_wraparound() {
        let topology = GridTopology::new(3, 3).unwrap();
        let set = topology.neighbors(NodeId(0));
        
        assert_eq!(set.get(Direction::Up), None);
        assert_eq!(set.get(Direction::Left), None);
        assert_eq!(set.get(Direction::Down).map(|n| n.position), Some(GridPosition::new(1, 0)));
        assert_eq!(set.get(Direction::Right).map(|n| n.position), Some(GridPosition::new(0, 1)));
    }
    
    #[test]
    fn test_single_row_grid() {
        let topology = GridTopology::new(1, 3).unwrap();
        assert_eq!(topology.neighbors(NodeId(0)).count(), 1);
        assert_eq!(topology.neighbors(NodeId(1)).count(), 2);
        
        let single = GridTopology::new(1, 1).unwrap();
        assert_eq!(single.neighbors(NodeId(0)).count(), 0);
    }
    
    #[test]
    fn test_rejects_non_positive_dimensions() {
        assert_eq!(
            GridTopology::new(0, 3),
            Err(ConfigError::NonPositiveDimensions { rows: 0, cols: 3 })
        );
        assert!(GridTopology::new(2, -1).is_err());
    }
    
    #[test]
    fn test_rejects_participant_mismatch() {
        let result = GridTopology::for_participants(2, 2, 4);
        assert_eq!(
            result,
            Err(ConfigError::ParticipantMismatch { expected: 5, actual: 4 })
        );
        assert!(GridTopology::for_participants(2, 2, 5).is_ok());
    }
    
    #[test]
    fn test_rejects_grid_beyond_rank_space() {
        assert!(matches!(
            GridTopology::new(100_000, 100_000),
            Err(ConfigError::GridTooLarge { .. })
        ));
    }
    
    proptest! {
        #[test]
        fn prop_neighbor_counts_match_grid_shape(rows in 2i64..12, cols in 2i64..12) {
            let topology = GridTopology::new(rows, cols).unwrap();
            for id in topology.workers() {
                let pos = topology.position_of(id).unwrap();
                let on_row_edge = pos.row == 0 || pos.row == topology.rows() - 1;
                let on_col_edge = pos.col == 0 || pos.col == topology.cols() - 1;
                let expected = match (on_row_edge, on_col_edge) {
                    (true, true) => 2,
                    (true, false) | (false, true) => 3,
                    (false, false) => 4,
                };
                prop_assert_eq!(topology.neighbors(id).count(), expected);
            }
        }
        
        #[test]
        fn prop_neighbors_are_adjacent_and_symmetric(rows in 1i64..10, cols in 1i64..10) {
            let topology = GridTopology::new(rows, cols).unwrap();
            for id in topology.workers() {
                let pos = topology.position_of(id).unwrap();
                for (dir, n) in topology.neighbors(id).present() {
                    prop_assert_ne!(n.id, id);
                    let distance = pos.row.abs_diff(n.position.row) + pos.col.abs_diff(n.position.col);
                    prop_assert_eq!(distance, 1);
                    let back = topology.neighbor(n.id, dir.opposite()).map(|b| b.id);
                    prop_assert_eq!(back, Some(id));
                }
            }
        }
        
        #[test]
        fn prop_rank_position_roundtrip(rows in 1i64..20, cols in 1i64..20) {
            let topology = GridTopology::new(rows, cols).unwrap();
            for id in topology.workers() {
                let pos = topology.position_of(id).unwrap();
                prop_assert_eq!(topology.rank_of(pos), Some(id));
            }
        }
    }
}
