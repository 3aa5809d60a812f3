use crate::{CellIndex, Observer, Shape, SymbolId, cells::Grid};
use rand::{
  RngCore, SeedableRng,
  seq::{IndexedRandom, IteratorRandom},
};
use rand_chacha::ChaCha20Rng;

fn seeded(seed: Option<u64>) -> (ChaCha20Rng, u64) {
  let seed = seed.unwrap_or_else(|| rand::rng().next_u64());
  (ChaCha20Rng::seed_from_u64(seed), seed)
}

/// Uniform draw from the lowest entropy bucket, `None` once nothing is left open
fn lowest_entropy_pick(grid: &Grid, rng: &mut ChaCha20Rng) -> Option<CellIndex> {
  grid.lowest_entropy_indexes()?.iter().choose(rng).copied()
}

/// Picks among the lowest entropy cells, then among their symbols, uniformly
#[derive(Debug)]
pub struct RandomObserver {
  seed: u64,
  rng: ChaCha20Rng,
}

impl Default for RandomObserver {
  fn default() -> Self {
    Self::new(None)
  }
}

impl Clone for RandomObserver {
  fn clone(&self) -> Self {
    Self {
      seed: self.seed,
      rng: self.rng.clone(),
    }
  }
}

impl RandomObserver {
  pub fn new(seed: Option<u64>) -> Self {
    let (rng, seed) = seeded(seed);
    Self { seed, rng }
  }

  pub fn seed(&self) -> u64 {
    self.seed
  }
}

impl Observer for RandomObserver {
  #[profiling::function]
  fn select(&mut self, grid: &Grid) -> Option<CellIndex> {
    lowest_entropy_pick(grid, &mut self.rng)
  }

  #[profiling::function]
  fn pick(&mut self, index: CellIndex, grid: &Grid) -> Option<SymbolId> {
    grid
      .at(index)?
      .domain
      .iter()
      .choose(&mut self.rng)
      .copied()
  }
}

/// Like [`RandomObserver`], but symbols are drawn in proportion to their [`Shape`] weight
#[derive(Debug)]
pub struct WeightedObserver<Sh: Shape> {
  seed: u64,
  rng: ChaCha20Rng,
  shape: Sh,
}

impl<Sh: Shape + Default> Default for WeightedObserver<Sh> {
  fn default() -> Self {
    Self::new(None, Sh::default())
  }
}

impl<Sh: Shape + Clone> Clone for WeightedObserver<Sh> {
  fn clone(&self) -> Self {
    Self {
      seed: self.seed,
      rng: self.rng.clone(),
      shape: self.shape.clone(),
    }
  }
}

impl<Sh: Shape> WeightedObserver<Sh> {
  pub fn new(seed: Option<u64>, shape: Sh) -> Self {
    let (rng, seed) = seeded(seed);
    Self { seed, rng, shape }
  }

  pub fn seed(&self) -> u64 {
    self.seed
  }

  pub fn shape(&self) -> &Sh {
    &self.shape
  }
}

impl<Sh: Shape> Observer for WeightedObserver<Sh> {
  #[profiling::function]
  fn select(&mut self, grid: &Grid) -> Option<CellIndex> {
    lowest_entropy_pick(grid, &mut self.rng)
  }

  #[profiling::function]
  fn pick(&mut self, index: CellIndex, grid: &Grid) -> Option<SymbolId> {
    let candidates = grid.at(index)?.domain.iter().copied().collect::<Vec<_>>();

    match candidates.choose_weighted(&mut self.rng, |symbol| {
      self.shape.weight(*symbol, index, grid)
    }) {
      Ok(symbol) => Some(*symbol),
      // all weights zero, fall back to a uniform draw
      Err(_) => candidates.choose(&mut self.rng).copied(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::{RandomObserver, WeightedObserver};
  use crate::{CellIndex, Observer, Shape, Size, SymbolId, cells::Grid};
  use maplit::hashmap;
  use std::collections::HashMap;

  #[derive(Debug, Clone)]
  struct Table(HashMap<SymbolId, f64>);

  impl Shape for Table {
    fn weight(&self, symbol: SymbolId, _index: CellIndex, _grid: &Grid) -> f64 {
      self.0.get(&symbol).copied().unwrap_or_default()
    }
  }

  #[test]
  fn seeds_are_kept() {
    assert_eq!(RandomObserver::new(Some(42)).seed(), 42);

    let a = RandomObserver::new(None);
    let b = a.clone();
    assert_eq!(a.seed(), b.seed());
  }

  #[test]
  fn selection_stays_in_the_lowest_bucket() {
    let mut grid = Grid::new(Size::new(3, 3), 4);
    let narrowed = [2, 5, 7];
    for index in narrowed {
      grid.constrain(index, &[0, 1].map(SymbolId::new).into());
    }

    let mut observer = RandomObserver::new(Some(3));
    for _ in 0..20 {
      let index = observer.select(&grid).unwrap();
      assert!(narrowed.contains(&index));
    }
  }

  #[test]
  fn nothing_to_select_once_resolved() {
    let mut grid = Grid::new(Size::new(1, 2), 2);
    grid.assign(0, SymbolId::new(0));
    grid.assign(1, SymbolId::new(1));

    assert_eq!(RandomObserver::new(Some(1)).select(&grid), None);
    assert_eq!(
      WeightedObserver::new(Some(1), Table(HashMap::new())).select(&grid),
      None
    );
  }

  #[test]
  fn observers_select_alike_under_one_seed() {
    let mut grid = Grid::new(Size::new(4, 4), 3);
    for index in [1, 6, 9, 14] {
      grid.constrain(index, &[0, 2].map(SymbolId::new).into());
    }

    let mut random = RandomObserver::new(Some(17));
    let mut weighted = WeightedObserver::new(Some(17), Table(HashMap::new()));
    for _ in 0..10 {
      assert_eq!(random.select(&grid), weighted.select(&grid));
    }
  }

  #[test]
  fn picks_come_from_the_domain() {
    let mut grid = Grid::new(Size::new(1, 1), 5);
    grid.constrain(0, &[1, 3].map(SymbolId::new).into());

    let mut observer = RandomObserver::new(Some(8));
    for _ in 0..20 {
      let symbol = observer.pick(0, &grid).unwrap();
      assert!(symbol == SymbolId::new(1) || symbol == SymbolId::new(3));
    }

    grid.constrain(0, &Default::default());
    assert_eq!(observer.pick(0, &grid), None);
  }

  #[test]
  fn zero_weights_are_never_picked() {
    let grid = Grid::new(Size::new(1, 1), 3);
    let shape = Table(hashmap! {
      SymbolId::new(0) => 0.0,
      SymbolId::new(1) => 1.0,
      SymbolId::new(2) => 0.0,
    });

    let mut observer = WeightedObserver::new(Some(21), shape);
    for _ in 0..50 {
      assert_eq!(observer.pick(0, &grid), Some(SymbolId::new(1)));
    }
  }

  #[test]
  fn all_zero_weights_still_pick() {
    let grid = Grid::new(Size::new(1, 1), 3);
    let mut observer = WeightedObserver::new(Some(21), Table(HashMap::new()));

    assert!(observer.pick(0, &grid).is_some());
  }
}
