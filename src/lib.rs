pub(crate) mod cells;
pub(crate) mod err;
#[cfg(feature = "profiling")]
pub mod perf;
pub mod prebuilt;
pub(crate) mod propagator;
pub(crate) mod rules;
pub(crate) mod state;
pub(crate) mod util;

use derive_more::derive::{Deref, DerefMut};
use derive_new::new;
pub use strum;

use std::{fmt::Debug, hash::Hash};
use strum_macros::{EnumCount, EnumIter, VariantArray};

pub mod prelude {
  pub use super::{
    CellIndex, Direction, Observer, Shape, Symbol, SymbolId,
    cells::{Cell, Grid},
    collapse, collapse_with_retries,
    err::{ConfigError, Error, InvalidOperation},
    prebuilt,
    propagator::{Propagation, Propagator},
    rules::{AbstractRules, Legend, Rule, RuleBuilder, Rules},
    state::{Config, Outcome, Solver, SolverBuilder, Status, Step, initialize},
    util::{IPos, Size, UPos},
  };
}

pub use prelude::*;

pub type CellIndex = usize;

/// Dense id of a symbol, assigned by the [`Legend`] in sorted symbol order
#[derive(new, Deref, DerefMut, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SymbolId(usize);

/// Anything that can label a tile
pub trait Symbol: Debug + Eq + Hash + Ord + Clone {}

impl<T> Symbol for T where T: Debug + Eq + Hash + Ord + Clone {}

/// The four grid axes, `Up` and `Down` move across rows, `Left` and `Right` across columns
#[derive(
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  EnumCount,
  EnumIter,
  VariantArray,
  strum_macros::Display,
  Clone,
  Copy,
  Debug,
)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
  Up,
  Down,
  Left,
  Right,
}

impl Direction {
  pub fn opposite(self) -> Self {
    match self {
      Self::Up => Self::Down,
      Self::Down => Self::Up,
      Self::Left => Self::Right,
      Self::Right => Self::Left,
    }
  }

  /// `[row, column]` step taken when moving one cell this way
  pub fn offset(self) -> [isize; 2] {
    match self {
      Self::Up => [-1, 0],
      Self::Down => [1, 0],
      Self::Left => [0, -1],
      Self::Right => [0, 1],
    }
  }

  pub(crate) fn index(self) -> usize {
    self as usize
  }
}

/// Runs the solver to its [`Outcome`]
pub fn collapse<S, O>(solver: &mut Solver<S, O>) -> Result<Outcome, Error<S>>
where
  S: Symbol,
  O: Observer,
{
  solver.solve()
}

/// Builds and solves fresh solvers until one succeeds or `attempts` run out.
///
/// `build` receives the attempt number, typically to derive a new seed from it.
/// The last solver is returned either way so its status and grid can be inspected.
pub fn collapse_with_retries<S, O, F>(attempts: usize, mut build: F) -> Result<Solver<S, O>, Error<S>>
where
  S: Symbol,
  O: Observer,
  F: FnMut(usize) -> Result<Solver<S, O>, Error<S>>,
{
  let mut attempt = 0;
  let mut solver = build(attempt)?;

  loop {
    let outcome = solver.solve()?;

    if outcome == Outcome::Succeeded || attempt + 1 >= attempts {
      return Ok(solver);
    }

    tracing::debug!(attempt, ?outcome, "solve attempt failed, retrying");

    attempt += 1;
    solver = build(attempt)?;
  }
}

/// Chooses which cell collapses next and into what
pub trait Observer: Debug {
  /// The next cell to collapse, `None` once no cell has more than one candidate
  fn select(&mut self, grid: &Grid) -> Option<CellIndex>;

  /// A symbol out of the cell's current domain, `None` if the domain is empty
  fn pick(&mut self, index: CellIndex, grid: &Grid) -> Option<SymbolId>;
}

/// Relative likelihood of a symbol being picked for a cell
pub trait Shape: Debug {
  fn weight(&self, symbol: SymbolId, index: CellIndex, grid: &Grid) -> f64;
}

#[cfg(test)]
mod tests {
  use crate::{
    prebuilt::{
      observers::{RandomObserver, WeightedObserver},
      shapes::WeightedShape,
    },
    prelude::*,
  };
  use maplit::hashmap;

  const SEED: u64 = 123;

  #[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Clone)]
  enum Tiles {
    TileA,
    TileB,
    TileC,
  }

  fn anything_goes() -> Rules<Tiles> {
    RuleBuilder::default()
      .with_rule(
        Tiles::TileA,
        Rule::splat([Tiles::TileA, Tiles::TileB, Tiles::TileC]),
      )
      .with_rule(
        Tiles::TileB,
        Rule::splat([Tiles::TileA, Tiles::TileB, Tiles::TileC]),
      )
      .with_rule(
        Tiles::TileC,
        Rule::splat([Tiles::TileA, Tiles::TileB, Tiles::TileC]),
      )
      .build()
      .unwrap()
  }

  #[test]
  fn same_seed_produces_same_gen() {
    let rules = anything_goes();

    let weights = hashmap! {
      Tiles::TileA => 3.0,
      Tiles::TileB => 2.0,
    };

    let shape = WeightedShape::from_symbols(weights, &rules).unwrap();

    let a_builder = SolverBuilder::new(
      [5, 5],
      WeightedObserver::new(Some(SEED), shape.clone()),
      rules.clone(),
    );
    let b_builder = SolverBuilder::new([5, 5], WeightedObserver::new(Some(SEED), shape), rules);

    let mut a = a_builder.build().unwrap();
    let mut b = b_builder.build().unwrap();

    assert_eq!(crate::collapse(&mut a).unwrap(), Outcome::Succeeded);
    assert_eq!(crate::collapse(&mut b).unwrap(), Outcome::Succeeded);

    assert_eq!(a.data(), b.data());
  }

  #[test]
  fn retries_stop_at_the_first_success() {
    let rules = anything_goes();
    let mut attempts = 0;

    let solver = crate::collapse_with_retries(5, |attempt| {
      attempts += 1;
      SolverBuilder::new(
        [3, 3],
        RandomObserver::new(Some(SEED + attempt as u64)),
        rules.clone(),
      )
      .build()
    })
    .unwrap();

    assert_eq!(attempts, 1);
    assert_eq!(solver.status(), Status::Succeeded);
  }

  #[test]
  fn retries_give_up_after_the_last_attempt() {
    // nothing may sit next to anything, so any grid wider than one cell fails
    let rules = RuleBuilder::default()
      .with_rule(Tiles::TileA, Rule::<Tiles>::splat([]))
      .with_rule(Tiles::TileB, Rule::<Tiles>::splat([]))
      .build()
      .unwrap();
    let mut attempts = 0;

    let solver = crate::collapse_with_retries(3, |attempt| {
      attempts += 1;
      SolverBuilder::new(
        [1, 2],
        RandomObserver::new(Some(SEED + attempt as u64)),
        rules.clone(),
      )
      .build()
    })
    .unwrap();

    assert_eq!(attempts, 3);
    assert_eq!(solver.status(), Status::Contradicted);
  }
}
