use std::fmt;

use serde::Serialize;

use crate::geometry::Move;

/// Non-negative weight per move, indexed in [`Move::ALL`] order.
///
/// Expert output need not sum to one; whatever mass is missing means the
/// expert has no preference for that share.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MoveDistribution([f64; 5]);

impl MoveDistribution {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn certain(mv: Move) -> Self {
        Self::empty().with(mv, 1.0)
    }

    /// Equal weight on each listed move, summing to one.
    pub fn uniform(moves: &[Move]) -> Self {
        let mut dist = Self::empty();
        if moves.is_empty() {
            return dist;
        }
        let share = 1.0 / moves.len() as f64;
        for mv in moves {
            dist.add(*mv, share);
        }
        dist
    }

    /// `primary` share on the first move and the rest on the second, the
    /// usual shape for a two-axis approach.
    pub fn split(moves: [Move; 2], primary: f64) -> Self {
        let mut dist = Self::empty();
        dist.add(moves[0], primary);
        dist.add(moves[1], 1.0 - primary);
        dist
    }

    pub fn with(mut self, mv: Move, weight: f64) -> Self {
        self.set(mv, weight);
        self
    }

    pub fn get(&self, mv: Move) -> f64 {
        self.0[mv.index()]
    }

    pub fn set(&mut self, mv: Move, weight: f64) {
        self.0[mv.index()] = weight;
    }

    pub fn add(&mut self, mv: Move, weight: f64) {
        self.0[mv.index()] += weight;
    }

    pub fn mass(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|weight| *weight == 0.0)
    }

    /// Every weight finite and non-negative.
    pub fn is_well_formed(&self) -> bool {
        self.0.iter().all(|weight| weight.is_finite() && *weight >= 0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Move, f64)> + '_ {
        Move::ALL.into_iter().map(|mv| (mv, self.get(mv)))
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self(self.0.map(|weight| weight * factor))
    }
}

impl fmt::Display for MoveDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (mv, weight) in self.iter().filter(|(_, weight)| *weight > 0.0) {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}:{:.3}", mv.letter(), weight)?;
            first = false;
        }
        Ok(())
    }
}

/// Bit set of expert indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ExpertSet(u64);

impl ExpertSet {
    pub const CAPACITY: usize = 64;

    pub fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, index: usize) {
        assert!(index < Self::CAPACITY, "expert index {index} out of range");
        self.0 |= 1 << index;
    }

    pub fn contains(&self, index: usize) -> bool {
        index < Self::CAPACITY && self.0 & (1 << index) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..Self::CAPACITY).filter(|index| self.contains(*index))
    }
}

/// Trust-weighted blend of the experts' opinions about one entity, plus
/// which experts backed each move.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct BlendedDistribution {
    pub weights: MoveDistribution,
    pub blame: [ExpertSet; 5],
}

impl BlendedDistribution {
    pub fn contribute(&mut self, expert: usize, faith: f64, opinion: &MoveDistribution) {
        for (mv, weight) in opinion.iter() {
            let share = faith * weight;
            if share > 0.0 {
                self.weights.add(mv, share);
                self.blame[mv.index()].insert(expert);
            }
        }
    }

    pub fn blame(&self, mv: Move) -> ExpertSet {
        self.blame[mv.index()]
    }

    pub fn mass(&self) -> f64 {
        self.weights.mass()
    }

    /// Pick a move by cumulative weight for a draw in `[0, 1)`.
    ///
    /// The draw is scaled by the total mass, so a partial blend still samples
    /// in proportion. No mass at all picks `Stay`.
    pub fn sample(&self, unit_draw: f64) -> Move {
        let mass = self.mass();
        if mass <= 0.0 {
            return Move::Stay;
        }
        let draw = unit_draw * mass;
        let mut running = 0.0;
        let mut last_positive = Move::Stay;
        for (mv, weight) in self.weights.iter() {
            if weight <= 0.0 {
                continue;
            }
            running += weight;
            last_positive = mv;
            if running > draw {
                return mv;
            }
        }
        last_positive
    }

    /// `first`, then every other move with positive weight by descending
    /// weight, then `Stay`.
    pub fn preferences(&self, first: Move) -> Vec<Move> {
        let mut rest: Vec<(Move, f64)> = self
            .weights
            .iter()
            .filter(|(mv, weight)| *mv != first && *weight > 0.0)
            .collect();
        rest.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut moves = Vec::with_capacity(rest.len() + 2);
        moves.push(first);
        moves.extend(rest.into_iter().map(|(mv, _)| mv));
        if !moves.contains(&Move::Stay) {
            moves.push(Move::Stay);
        }
        moves
    }
}
