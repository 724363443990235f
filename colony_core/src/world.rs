//! Per-turn world state: raw sensor facts and the categorised snapshot the
//! digest and experts read from.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{wrap, Cell, Size};

/// Stable identity of one of our ants. Assigned at birth, never reused.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub cell: Cell,
    pub previous: Cell,
}

/// The seven layers a snapshot is split into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Water,
    Food,
    EnemyHill,
    EnemyAnt,
    MyHill,
    MyAnt,
    MyDead,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Water,
        Category::Food,
        Category::EnemyHill,
        Category::EnemyAnt,
        Category::MyHill,
        Category::MyAnt,
        Category::MyDead,
    ];
}

/// Everything the server reported during one turn, before reconciliation.
/// Owner `0` is this agent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SensorReport {
    pub water: Vec<Cell>,
    pub food: Vec<Cell>,
    pub hills: Vec<(Cell, u32)>,
    pub ants: Vec<(Cell, u32)>,
    pub dead: Vec<(Cell, u32)>,
}

impl SensorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_water(mut self, cell: Cell) -> Self {
        self.water.push(cell);
        self
    }

    pub fn with_food(mut self, cell: Cell) -> Self {
        self.food.push(cell);
        self
    }

    pub fn with_hill(mut self, cell: Cell, owner: u32) -> Self {
        self.hills.push((cell, owner));
        self
    }

    pub fn with_ant(mut self, cell: Cell, owner: u32) -> Self {
        self.ants.push((cell, owner));
        self
    }

    pub fn with_dead(mut self, cell: Cell, owner: u32) -> Self {
        self.dead.push((cell, owner));
        self
    }

    pub fn my_ants(&self) -> Vec<Cell> {
        owned_by(&self.ants, colony_proto::MY_OWNER)
    }

    pub fn my_dead(&self) -> Vec<Cell> {
        owned_by(&self.dead, colony_proto::MY_OWNER)
    }
}

fn owned_by(facts: &[(Cell, u32)], owner: u32) -> Vec<Cell> {
    facts
        .iter()
        .filter(|(_, fact_owner)| *fact_owner == owner)
        .map(|(cell, _)| *cell)
        .collect()
}

/// Wrapped, categorised view of the board for a single turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldSnapshot {
    size: Size,
    water: BTreeSet<Cell>,
    food: BTreeSet<Cell>,
    enemy_hills: BTreeMap<Cell, u32>,
    enemy_ants: BTreeMap<Cell, u32>,
    my_hills: BTreeSet<Cell>,
    my_ants: BTreeMap<Cell, Entity>,
    my_dead: BTreeMap<Cell, Entity>,
}

impl WorldSnapshot {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            water: BTreeSet::new(),
            food: BTreeSet::new(),
            enemy_hills: BTreeMap::new(),
            enemy_ants: BTreeMap::new(),
            my_hills: BTreeSet::new(),
            my_ants: BTreeMap::new(),
            my_dead: BTreeMap::new(),
        }
    }

    /// Build the snapshot for a turn from its report plus reconciled ants.
    ///
    /// Our own ants and dead come from reconciliation rather than the report,
    /// since only the reconciler knows their identities.
    pub fn from_report(
        size: Size,
        water: &BTreeSet<Cell>,
        report: &SensorReport,
        ants: impl IntoIterator<Item = Entity>,
        dead: impl IntoIterator<Item = Entity>,
    ) -> Self {
        let mut world = Self::new(size);
        for cell in water {
            world.insert_water(*cell);
        }
        for cell in &report.food {
            world.insert_food(*cell);
        }
        for (cell, owner) in &report.hills {
            if *owner == colony_proto::MY_OWNER {
                world.insert_my_hill(*cell);
            } else {
                world.insert_enemy_hill(*cell, *owner);
            }
        }
        for (cell, owner) in &report.ants {
            if *owner != colony_proto::MY_OWNER {
                world.insert_enemy_ant(*cell, *owner);
            }
        }
        for entity in ants {
            world.insert_my_ant(entity);
        }
        for entity in dead {
            world.insert_my_dead(entity);
        }
        world
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn wrap(&self, cell: Cell) -> Cell {
        wrap(cell, self.size)
    }

    pub fn insert_water(&mut self, cell: Cell) {
        self.water.insert(self.wrap(cell));
    }

    pub fn insert_food(&mut self, cell: Cell) {
        self.food.insert(self.wrap(cell));
    }

    pub fn insert_enemy_hill(&mut self, cell: Cell, owner: u32) {
        self.enemy_hills.insert(self.wrap(cell), owner);
    }

    pub fn insert_enemy_ant(&mut self, cell: Cell, owner: u32) {
        self.enemy_ants.insert(self.wrap(cell), owner);
    }

    pub fn insert_my_hill(&mut self, cell: Cell) {
        self.my_hills.insert(self.wrap(cell));
    }

    pub fn insert_my_ant(&mut self, mut entity: Entity) {
        entity.cell = self.wrap(entity.cell);
        entity.previous = self.wrap(entity.previous);
        self.my_ants.insert(entity.cell, entity);
    }

    pub fn insert_my_dead(&mut self, mut entity: Entity) {
        entity.cell = self.wrap(entity.cell);
        self.my_dead.insert(entity.cell, entity);
    }

    pub fn water(&self) -> &BTreeSet<Cell> {
        &self.water
    }

    pub fn food(&self) -> &BTreeSet<Cell> {
        &self.food
    }

    pub fn enemy_hills(&self) -> &BTreeMap<Cell, u32> {
        &self.enemy_hills
    }

    pub fn enemy_ants(&self) -> &BTreeMap<Cell, u32> {
        &self.enemy_ants
    }

    pub fn my_hills(&self) -> &BTreeSet<Cell> {
        &self.my_hills
    }

    pub fn my_ants(&self) -> &BTreeMap<Cell, Entity> {
        &self.my_ants
    }

    pub fn my_dead(&self) -> &BTreeMap<Cell, Entity> {
        &self.my_dead
    }

    /// Living entities in row-major order of their current cell.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.my_ants.values()
    }

    pub fn entity_at(&self, cell: Cell) -> Option<&Entity> {
        self.my_ants.get(&self.wrap(cell))
    }

    pub fn is_water(&self, cell: Cell) -> bool {
        self.water.contains(&self.wrap(cell))
    }

    pub fn is_food(&self, cell: Cell) -> bool {
        self.food.contains(&self.wrap(cell))
    }

    pub fn contains(&self, category: Category, cell: Cell) -> bool {
        let cell = self.wrap(cell);
        match category {
            Category::Water => self.water.contains(&cell),
            Category::Food => self.food.contains(&cell),
            Category::EnemyHill => self.enemy_hills.contains_key(&cell),
            Category::EnemyAnt => self.enemy_ants.contains_key(&cell),
            Category::MyHill => self.my_hills.contains(&cell),
            Category::MyAnt => self.my_ants.contains_key(&cell),
            Category::MyDead => self.my_dead.contains_key(&cell),
        }
    }

    /// Wrapped cells of one layer in row-major order.
    pub fn cells(&self, category: Category) -> Box<dyn Iterator<Item = Cell> + '_> {
        match category {
            Category::Water => Box::new(self.water.iter().copied()),
            Category::Food => Box::new(self.food.iter().copied()),
            Category::EnemyHill => Box::new(self.enemy_hills.keys().copied()),
            Category::EnemyAnt => Box::new(self.enemy_ants.keys().copied()),
            Category::MyHill => Box::new(self.my_hills.iter().copied()),
            Category::MyAnt => Box::new(self.my_ants.keys().copied()),
            Category::MyDead => Box::new(self.my_dead.keys().copied()),
        }
    }

    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Water => self.water.len(),
            Category::Food => self.food.len(),
            Category::EnemyHill => self.enemy_hills.len(),
            Category::EnemyAnt => self.enemy_ants.len(),
            Category::MyHill => self.my_hills.len(),
            Category::MyAnt => self.my_ants.len(),
            Category::MyDead => self.my_dead.len(),
        }
    }
}
