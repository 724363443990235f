//! Per-turn spatial perception for experts.
//!
//! Answers "what of category X lies within the view radius of this cell" and
//! "is there a water-free straight path between these cells". Every answer is
//! cached until the next [`SpatialDigest::refresh`], so experts asking the
//! same question about the same ant pay for it once.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::rc::Rc;

use serde::Serialize;

use crate::geometry::{
    displace, neighbors4, primary_axis_moves, squared_distance, Cell, NearestImageCache,
};
use crate::world::{Category, WorldSnapshot};

type FastMap<K, V> = HashMap<K, V, ahash::RandomState>;

/// A category entry as seen from one observer: the nearest unwrapped image
/// of the entry and its squared distance. Orders by distance, then cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Goal {
    pub distance2: u32,
    pub cell: Cell,
}

/// Cache counters for the current turn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DigestStats {
    pub digest_queries: u64,
    pub digest_hits: u64,
    pub ray_queries: u64,
    pub ray_hits: u64,
    pub reachable_queries: u64,
    pub reachable_hits: u64,
}

#[derive(Debug)]
pub struct SpatialDigest {
    world: WorldSnapshot,
    radius: i32,
    radius2: u32,
    ray_step_limit: usize,
    views: RefCell<FastMap<(Category, Cell), Rc<[Goal]>>>,
    reachable_views: RefCell<FastMap<(Category, Cell), Rc<[Goal]>>>,
    rays: RefCell<FastMap<(Cell, (i32, i32)), bool>>,
    reachable: RefCell<FastMap<Cell, Rc<BTreeSet<Cell>>>>,
    images: RefCell<NearestImageCache>,
    stats: RefCell<DigestStats>,
}

impl SpatialDigest {
    /// `radius` is the linear view radius; `ray_step_limit` overrides the
    /// default bound of `2 * radius + 2` steps.
    pub fn new(world: WorldSnapshot, radius: i32, ray_step_limit: Option<usize>) -> Self {
        let radius = radius.max(0);
        let images = NearestImageCache::new(world.size());
        Self {
            world,
            radius,
            radius2: (radius * radius) as u32,
            ray_step_limit: ray_step_limit.unwrap_or(2 * radius as usize + 2),
            views: RefCell::default(),
            reachable_views: RefCell::default(),
            rays: RefCell::default(),
            reachable: RefCell::default(),
            images: RefCell::new(images),
            stats: RefCell::default(),
        }
    }

    /// Swap in a new turn's world and drop every cached answer.
    pub fn refresh(&mut self, world: WorldSnapshot) {
        if world.size() != self.world.size() {
            *self.images.get_mut() = NearestImageCache::new(world.size());
        } else {
            self.images.get_mut().clear();
        }
        self.world = world;
        self.clear_caches();
    }

    /// Drop cached answers but keep the current world.
    pub fn clear_caches(&mut self) {
        self.views.get_mut().clear();
        self.reachable_views.get_mut().clear();
        self.rays.get_mut().clear();
        self.reachable.get_mut().clear();
        self.images.get_mut().clear();
        *self.stats.get_mut() = DigestStats::default();
    }

    pub fn world(&self) -> &WorldSnapshot {
        &self.world
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn radius2(&self) -> u32 {
        self.radius2
    }

    pub fn stats(&self) -> DigestStats {
        *self.stats.borrow()
    }

    pub fn nearest(&self, origin: Cell, target: Cell) -> (u32, Cell) {
        let origin = self.world.wrap(origin);
        self.images.borrow_mut().nearest(origin, self.world.wrap(target))
    }

    /// Entries of `category` within the view radius of `observer`, nearest
    /// first. Our own ant at the observer cell is not reported.
    pub fn digest(&self, category: Category, observer: Cell) -> Rc<[Goal]> {
        let observer = self.world.wrap(observer);
        let key = (category, observer);
        self.stats.borrow_mut().digest_queries += 1;
        if let Some(view) = self.views.borrow().get(&key) {
            self.stats.borrow_mut().digest_hits += 1;
            return Rc::clone(view);
        }

        let mut images = self.images.borrow_mut();
        let mut goals: Vec<Goal> = self
            .world
            .cells(category)
            .filter(|cell| !(category == Category::MyAnt && *cell == observer))
            .filter_map(|cell| {
                let (distance2, image) = images.nearest(observer, cell);
                (distance2 <= self.radius2).then_some(Goal {
                    distance2,
                    cell: image,
                })
            })
            .collect();
        drop(images);
        goals.sort_unstable();

        let view: Rc<[Goal]> = goals.into();
        self.views.borrow_mut().insert(key, Rc::clone(&view));
        view
    }

    /// Unwrapped non-water cells connected to `observer` without leaving the
    /// view radius.
    pub fn reachable(&self, observer: Cell) -> Rc<BTreeSet<Cell>> {
        let observer = self.world.wrap(observer);
        self.stats.borrow_mut().reachable_queries += 1;
        if let Some(found) = self.reachable.borrow().get(&observer) {
            self.stats.borrow_mut().reachable_hits += 1;
            return Rc::clone(found);
        }

        let mut seen = BTreeSet::from([observer]);
        let mut fringe = VecDeque::from([observer]);
        while let Some(cell) = fringe.pop_front() {
            for next in neighbors4(cell) {
                if squared_distance(observer, next) > self.radius2
                    || self.world.is_water(next)
                    || !seen.insert(next)
                {
                    continue;
                }
                fringe.push_back(next);
            }
        }

        let found = Rc::new(seen);
        self.reachable
            .borrow_mut()
            .insert(observer, Rc::clone(&found));
        found
    }

    /// [`Self::digest`] restricted to cells [`Self::reachable`] from `observer`.
    pub fn reachable_digest(&self, category: Category, observer: Cell) -> Rc<[Goal]> {
        let observer = self.world.wrap(observer);
        let key = (category, observer);
        if let Some(view) = self.reachable_views.borrow().get(&key) {
            return Rc::clone(view);
        }
        let reachable = self.reachable(observer);
        let view: Rc<[Goal]> = self
            .digest(category, observer)
            .iter()
            .filter(|goal| reachable.contains(&goal.cell))
            .copied()
            .collect();
        self.reachable_views
            .borrow_mut()
            .insert(key, Rc::clone(&view));
        view
    }

    /// Whether greedy two-axis stepping from `origin` reaches `target` (or its
    /// nearest image) without touching water.
    ///
    /// Targets beyond the view radius are rejected outright, as is a walk
    /// that runs out of steps.
    pub fn ray(&self, origin: Cell, target: Cell) -> bool {
        let origin = self.world.wrap(origin);
        let (distance2, target) = self.nearest(origin, target);
        self.stats.borrow_mut().ray_queries += 1;
        if distance2 > self.radius2 {
            return false;
        }
        let key = (origin, delta(origin, target));
        if let Some(clear) = self.rays.borrow().get(&key) {
            self.stats.borrow_mut().ray_hits += 1;
            return *clear;
        }

        let mut path = vec![origin];
        let mut current = origin;
        let mut outcome = None;
        for _ in 0..self.ray_step_limit {
            if current == target {
                outcome = Some(true);
                break;
            }
            let [step, _] = primary_axis_moves(current, target);
            current = displace(step, current);
            if self.world.is_water(current) {
                outcome = Some(false);
                break;
            }
            path.push(current);
        }
        if outcome.is_none() && current == target {
            outcome = Some(true);
        }

        let mut rays = self.rays.borrow_mut();
        match outcome {
            Some(clear) => {
                // every suffix of a finished walk is the same walk from a later start
                for cell in path {
                    rays.insert((self.world.wrap(cell), delta(cell, target)), clear);
                }
                clear
            }
            None => {
                rays.insert(key, false);
                false
            }
        }
    }
}

fn delta(from: Cell, to: Cell) -> (i32, i32) {
    (to.row - from.row, to.col - from.col)
}
