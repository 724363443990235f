//! Toroidal grid geometry.
//!
//! Cells handed to the board are always wrapped into `[0, height) x [0, width)`.
//! Geometric reasoning across the wrap boundary uses *unwrapped* cells: the
//! same representation without the modulus, so straight-line deltas stay
//! meaningful.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A grid coordinate, ordered row-major.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
}

impl Cell {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn offset(self, row_delta: i32, col_delta: i32) -> Self {
        Self::new(self.row + row_delta, self.col + col_delta)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Board dimensions, fixed for a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub height: i32,
    pub width: i32,
}

impl Size {
    pub const fn new(height: i32, width: i32) -> Self {
        Self { height, width }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Move {
    North,
    East,
    South,
    West,
    Stay,
}

impl Move {
    /// Stable iteration order used for distributions and sampling.
    pub const ALL: [Move; 5] = [Move::North, Move::East, Move::South, Move::West, Move::Stay];
    pub const CARDINAL: [Move; 4] = [Move::North, Move::East, Move::South, Move::West];

    pub fn index(self) -> usize {
        match self {
            Move::North => 0,
            Move::East => 1,
            Move::South => 2,
            Move::West => 3,
            Move::Stay => 4,
        }
    }

    pub fn inverse(self) -> Self {
        match self {
            Move::North => Move::South,
            Move::East => Move::West,
            Move::South => Move::North,
            Move::West => Move::East,
            Move::Stay => Move::Stay,
        }
    }

    /// Unit displacement as `(row, col)`.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Move::North => (-1, 0),
            Move::East => (0, 1),
            Move::South => (1, 0),
            Move::West => (0, -1),
            Move::Stay => (0, 0),
        }
    }

    pub fn letter(self) -> char {
        match self {
            Move::North => 'N',
            Move::East => 'E',
            Move::South => 'S',
            Move::West => 'W',
            Move::Stay => '=',
        }
    }

    /// The single step that takes wrapped cell `from` to wrapped cell `to`.
    pub fn between(from: Cell, to: Cell, size: Size) -> Option<Move> {
        let from = wrap(from, size);
        let to = wrap(to, size);
        if from == to {
            return Some(Move::Stay);
        }
        Move::CARDINAL
            .into_iter()
            .find(|mv| wrap(displace(*mv, from), size) == to)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

pub fn wrap(loc: Cell, size: Size) -> Cell {
    Cell::new(loc.row.rem_euclid(size.height), loc.col.rem_euclid(size.width))
}

pub fn displace(mv: Move, loc: Cell) -> Cell {
    let (row_delta, col_delta) = mv.delta();
    loc.offset(row_delta, col_delta)
}

/// Plain Euclidean squared distance; callers unwrap first when needed.
///
/// Inputs come from boards no larger than
/// [`colony_proto::MAX_BOARD_DIMENSION`] per side, so the result fits.
pub fn squared_distance(a: Cell, b: Cell) -> u32 {
    let dr = (a.row - b.row).unsigned_abs();
    let dc = (a.col - b.col).unsigned_abs();
    dr * dr + dc * dc
}

/// The image of `target` closest to `origin`, with its squared distance.
///
/// Images are `target` shifted by `-1`, `0` or `+1` board lengths on each
/// axis, which covers the plain, edge and corner crossings. Ties resolve to
/// the smaller cell so results are deterministic.
pub fn nearest_unwrapped(origin: Cell, size: Size, target: Cell) -> (u32, Cell) {
    let mut best: Option<(u32, Cell)> = None;
    for row_shift in [-size.height, 0, size.height] {
        for col_shift in [-size.width, 0, size.width] {
            let image = target.offset(row_shift, col_shift);
            let candidate = (squared_distance(origin, image), image);
            best = Some(match best {
                Some(current) if current <= candidate => current,
                _ => candidate,
            });
        }
    }
    best.unwrap_or((squared_distance(origin, target), target))
}

/// The two cardinal moves that best approach `target` from `origin`.
pub fn primary_axis_moves(origin: Cell, target: Cell) -> [Move; 2] {
    axis_moves_for_delta(
        i64::from(target.row) - i64::from(origin.row),
        i64::from(target.col) - i64::from(origin.col),
    )
}

/// [`primary_axis_moves`] for a raw delta.
///
/// The axis with the larger absolute delta goes first; equal magnitudes put
/// the column axis first. An aligned axis (zero delta) borrows the other
/// axis's move for both slots.
pub fn axis_moves_for_delta(row_delta: i64, col_delta: i64) -> [Move; 2] {
    let row_move = if row_delta < 0 { Move::North } else { Move::South };
    let col_move = if col_delta < 0 { Move::West } else { Move::East };
    match (row_delta == 0, col_delta == 0) {
        (true, true) => [Move::Stay, Move::Stay],
        (true, false) => [col_move, col_move],
        (false, true) => [row_move, row_move],
        (false, false) if row_delta.abs() > col_delta.abs() => [row_move, col_move],
        (false, false) => [col_move, row_move],
    }
}

pub fn neighbors4(loc: Cell) -> [Cell; 4] {
    Move::CARDINAL.map(|mv| displace(mv, loc))
}

pub fn neighbors8(loc: Cell) -> [Cell; 8] {
    [
        loc.offset(-1, -1),
        loc.offset(-1, 0),
        loc.offset(-1, 1),
        loc.offset(0, -1),
        loc.offset(0, 1),
        loc.offset(1, -1),
        loc.offset(1, 0),
        loc.offset(1, 1),
    ]
}

/// Unwrapped cells whose squared distance to `center` is at most `radius²`.
pub fn cells_within_radius(radius: i32, center: Cell) -> impl Iterator<Item = Cell> {
    let radius = radius.max(0);
    let radius2 = (radius * radius) as u32;
    (-radius..=radius).flat_map(move |row_delta| {
        (-radius..=radius).filter_map(move |col_delta| {
            let cell = center.offset(row_delta, col_delta);
            (squared_distance(center, cell) <= radius2).then_some(cell)
        })
    })
}

/// Per-turn memo for [`nearest_unwrapped`].
#[derive(Debug, Clone)]
pub struct NearestImageCache {
    size: Size,
    entries: HashMap<(Cell, Cell), (u32, Cell), ahash::RandomState>,
    hits: u64,
}

impl NearestImageCache {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            entries: HashMap::default(),
            hits: 0,
        }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn nearest(&mut self, origin: Cell, target: Cell) -> (u32, Cell) {
        let key = (origin, target);
        if let Some(found) = self.entries.get(&key) {
            self.hits += 1;
            return *found;
        }
        let found = nearest_unwrapped(origin, self.size, target);
        self.entries.insert(key, found);
        found
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_reduces_negative_and_overflowing_coordinates() {
        let size = Size::new(10, 12);
        assert_eq!(wrap(Cell::new(-1, -1), size), Cell::new(9, 11));
        assert_eq!(wrap(Cell::new(10, 12), size), Cell::new(0, 0));
        assert_eq!(wrap(Cell::new(-21, 25), size), Cell::new(9, 1));
    }

    #[test]
    fn moves_invert_and_displace() {
        for mv in Move::ALL {
            let origin = Cell::new(4, 4);
            assert_eq!(displace(mv.inverse(), displace(mv, origin)), origin);
            assert_eq!(mv.inverse().inverse(), mv);
        }
        assert_eq!(displace(Move::North, Cell::new(0, 0)), Cell::new(-1, 0));
        assert_eq!(displace(Move::Stay, Cell::new(3, 2)), Cell::new(3, 2));
    }

    #[test]
    fn between_infers_wrapped_steps() {
        let size = Size::new(10, 10);
        assert_eq!(
            Move::between(Cell::new(0, 0), Cell::new(9, 0), size),
            Some(Move::North)
        );
        assert_eq!(
            Move::between(Cell::new(4, 9), Cell::new(4, 0), size),
            Some(Move::East)
        );
        assert_eq!(
            Move::between(Cell::new(4, 4), Cell::new(4, 4), size),
            Some(Move::Stay)
        );
        assert_eq!(Move::between(Cell::new(4, 4), Cell::new(6, 4), size), None);
    }

    #[test]
    fn nearest_image_never_exceeds_naive_distance_and_is_symmetric() {
        let size = Size::new(7, 9);
        let cells: Vec<Cell> = (0..size.height)
            .flat_map(|row| (0..size.width).map(move |col| Cell::new(row, col)))
            .collect();
        for &a in &cells {
            for &b in &cells {
                let (forward, image) = nearest_unwrapped(a, size, b);
                let (backward, _) = nearest_unwrapped(b, size, a);
                assert!(forward <= squared_distance(a, b));
                assert_eq!(forward, backward, "asymmetric for {a} and {b}");
                assert_eq!(wrap(image, size), b);
            }
        }
    }

    #[test]
    fn nearest_image_crosses_corners() {
        let size = Size::new(10, 10);
        assert_eq!(
            nearest_unwrapped(Cell::new(0, 0), size, Cell::new(9, 9)),
            (2, Cell::new(-1, -1))
        );
        assert_eq!(
            nearest_unwrapped(Cell::new(0, 0), size, Cell::new(0, 8)),
            (4, Cell::new(0, -2))
        );
    }

    #[test]
    fn nearest_image_on_the_largest_board_fits() {
        let side = colony_proto::MAX_BOARD_DIMENSION as i32;
        let size = Size::new(side, side);
        let far = Cell::new(side - 1, side - 1);
        assert_eq!(nearest_unwrapped(Cell::new(0, 0), size, far), (2, Cell::new(-1, -1)));
        // the widest delta any image search evaluates
        let widest = squared_distance(Cell::new(0, 0), Cell::new(2 * side - 1, 2 * side - 1));
        assert_eq!(u64::from(widest), 2 * (2 * side as u64 - 1).pow(2));
    }

    #[test]
    fn primary_axis_moves_prefer_larger_delta() {
        let origin = Cell::new(5, 5);
        assert_eq!(
            primary_axis_moves(origin, Cell::new(1, 6)),
            [Move::North, Move::East]
        );
        assert_eq!(
            primary_axis_moves(origin, Cell::new(6, 1)),
            [Move::West, Move::South]
        );
        // equal magnitudes lead with the column axis
        assert_eq!(
            primary_axis_moves(origin, Cell::new(7, 7)),
            [Move::East, Move::South]
        );
    }

    #[test]
    fn primary_axis_moves_handle_aligned_axes() {
        let origin = Cell::new(0, 0);
        assert_eq!(
            primary_axis_moves(origin, Cell::new(0, 2)),
            [Move::East, Move::East]
        );
        assert_eq!(
            primary_axis_moves(origin, Cell::new(-3, 0)),
            [Move::North, Move::North]
        );
        assert_eq!(primary_axis_moves(origin, origin), [Move::Stay, Move::Stay]);
    }

    #[test]
    fn neighbor_sets_have_expected_shape() {
        let center = Cell::new(2, 2);
        let four = neighbors4(center);
        assert!(four.iter().all(|n| squared_distance(center, *n) == 1));
        let eight = neighbors8(center);
        assert!(eight.iter().all(|n| squared_distance(center, *n) <= 2));
        assert!(!eight.contains(&center));
    }

    #[test]
    fn cells_within_radius_matches_disc() {
        let center = Cell::new(0, 0);
        let cells: Vec<Cell> = cells_within_radius(1, center).collect();
        assert_eq!(cells.len(), 5);
        let cells: Vec<Cell> = cells_within_radius(2, center).collect();
        assert_eq!(cells.len(), 13);
        assert!(cells_within_radius(3, center).all(|c| squared_distance(center, c) <= 9));
    }

    #[test]
    fn image_cache_memoizes_lookups() {
        let mut cache = NearestImageCache::new(Size::new(10, 10));
        let first = cache.nearest(Cell::new(0, 0), Cell::new(9, 9));
        let second = cache.nearest(Cell::new(0, 0), Cell::new(9, 9));
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.hits(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
