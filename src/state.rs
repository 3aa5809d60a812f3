use crate::{
  CellIndex, Observer, Symbol, SymbolId,
  cells::Grid,
  err::{ConfigError, Error, InvalidOperation},
  prebuilt::{observers::WeightedObserver, shapes::WeightedShape},
  propagator::Propagator,
  rules::{RuleBuilder, Rules},
  util::{Size, UPos},
};
use itertools::Itertools;
use ordermap::OrderMap;
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Where a solve currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
  Running,
  Succeeded,
  Contradicted,
}

impl Status {
  pub fn is_terminal(self) -> bool {
    self != Self::Running
  }
}

/// One externally observable unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<S> {
  /// A cell shrank but still has several candidates, carries its new domain
  Progress(UPos, BTreeSet<S>),
  Collapsed(UPos, S),
  Contradiction(UPos),
  Done,
}

/// How a batch solve ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Outcome {
  Succeeded,
  /// The first cell whose domain ran out
  Contradicted(UPos),
  /// The step ceiling was reached before the grid resolved
  Stalled { steps: usize },
}

/// Knobs for [`initialize`]
#[derive(Debug, Clone)]
pub struct Config<S: Symbol> {
  pub seed: Option<u64>,
  pub weights: Option<HashMap<S, f64>>,
  pub max_steps: Option<usize>,
}

impl<S: Symbol> Default for Config<S> {
  fn default() -> Self {
    Self {
      seed: None,
      weights: None,
      max_steps: None,
    }
  }
}

impl<S: Symbol> Config<S> {
  pub fn with_seed(mut self, seed: u64) -> Self {
    self.seed = Some(seed);
    self
  }

  pub fn with_weights(mut self, weights: impl Into<HashMap<S, f64>>) -> Self {
    self.weights = Some(weights.into());
    self
  }

  pub fn with_max_steps(mut self, max_steps: usize) -> Self {
    self.max_steps = Some(max_steps);
    self
  }
}

/// Validates the whole input in one go and hands back a weighted, seeded solver
pub fn initialize<S: Symbol>(
  rows: usize,
  cols: usize,
  alphabet: impl IntoIterator<Item = S>,
  relation: impl Into<RuleBuilder<S>>,
  config: Config<S>,
) -> Result<Solver<S, WeightedObserver<WeightedShape>>, Error<S>> {
  let relation: RuleBuilder<S> = relation.into();
  let rules = relation.with_alphabet(alphabet).build()?;
  let shape = WeightedShape::from_symbols(config.weights.unwrap_or_default(), &rules)?;

  let mut builder = SolverBuilder::new(
    Size::new(rows, cols),
    WeightedObserver::new(config.seed, shape),
    rules,
  );

  if let Some(max_steps) = config.max_steps {
    builder.with_max_steps(max_steps);
  }

  builder.build()
}

pub struct SolverBuilder<S: Symbol, O: Observer> {
  size: Size,
  observer: O,
  rules: Rules<S>,
  seeds: OrderMap<UPos, S>,
  max_steps: Option<usize>,
}

impl<S: Symbol, O: Observer> SolverBuilder<S, O> {
  pub fn new(size: impl Into<Size>, observer: O, rules: Rules<S>) -> Self {
    Self {
      size: size.into(),
      observer,
      rules,
      seeds: OrderMap::new(),
      max_steps: None,
    }
  }

  /// Pre-seeds a cell, a later insert at the same position replaces the earlier one
  pub fn insert(&mut self, pos: impl Into<UPos>, symbol: S) -> &mut Self {
    self.seeds.insert(pos.into(), symbol);
    self
  }

  pub fn with_max_steps(&mut self, max_steps: usize) -> &mut Self {
    self.max_steps = Some(max_steps);
    self
  }

  pub fn size(&self) -> &Size {
    &self.size
  }

  #[profiling::function]
  pub fn build(self) -> Result<Solver<S, O>, Error<S>> {
    if self.size.is_empty() {
      return Err(
        ConfigError::EmptyGrid {
          rows: self.size.rows(),
          cols: self.size.cols(),
        }
        .into(),
      );
    }

    if !self.rules.is_symmetric() {
      tracing::debug!(
        asymmetries = ?self.rules.asymmetries(),
        "building a solver over an asymmetric relation"
      );
    }

    let mut solver = Solver {
      grid: Grid::new(self.size, self.rules.len()),
      rules: self.rules,
      observer: self.observer,
      propagator: Propagator::default(),
      status: Status::Running,
      steps: 0,
      max_steps: self.max_steps,
      pending: VecDeque::new(),
      contradictions: Vec::new(),
    };

    for (position, symbol) in self.seeds {
      let Some(index) = solver.grid.index_of(position) else {
        return Err(
          ConfigError::SeedOutOfBounds {
            position,
            size: self.size,
          }
          .into(),
        );
      };

      let Some(id) = solver.rules.legend().symbol_id(&symbol) else {
        return Err(ConfigError::UndeclaredSymbol { symbol }.into());
      };

      if !solver.grid.assign(index, id) {
        return Err(ConfigError::InconsistentSeed { position }.into());
      }

      let propagation =
        solver
          .propagator
          .propagate(&mut solver.grid, solver.rules.abstract_rules(), index);

      if let Some(at) = propagation.contradiction {
        return Err(
          ConfigError::InconsistentSeed {
            position: solver.grid.position_of(at).unwrap_or(position),
          }
          .into(),
        );
      }
    }

    if solver.rules.len() == 1 {
      // every cell starts collapsed, so no cycle would ever check the relation
      for index in 0..solver.grid.list.len() {
        let propagation =
          solver
            .propagator
            .propagate(&mut solver.grid, solver.rules.abstract_rules(), index);

        if let Some(at) = propagation.contradiction {
          let step = solver.contradict(at);
          solver.pending.push_back(step);
          break;
        }
      }
    }

    Ok(solver)
  }
}

impl<S: Symbol, O: Observer + Clone> Clone for SolverBuilder<S, O> {
  fn clone(&self) -> Self {
    Self {
      size: self.size,
      observer: self.observer.clone(),
      rules: self.rules.clone(),
      seeds: self.seeds.clone(),
      max_steps: self.max_steps,
    }
  }
}

/// Owns one solve attempt, its grid, propagator and observer
#[derive(Debug)]
pub struct Solver<S: Symbol, O: Observer> {
  grid: Grid,
  rules: Rules<S>,
  observer: O,
  propagator: Propagator,
  status: Status,
  steps: usize,
  max_steps: Option<usize>,
  pending: VecDeque<Step<S>>,
  contradictions: Vec<UPos>,
}

impl<S: Symbol, O: Observer> Solver<S, O> {
  /// Returns the next event, running a full select, collapse and propagate cycle
  /// whenever the events of the previous one have all been handed out
  #[profiling::function]
  pub fn step(&mut self) -> Result<Step<S>, Error<S>> {
    if let Some(step) = self.pending.pop_front() {
      return Ok(step);
    }

    self.ensure_running()?;

    let events = match self.observer.select(&self.grid) {
      Some(index) => self.cycle(index, None),
      None => vec![self.succeed()],
    };

    self.pending.extend(events);

    Ok(self.pending.pop_front().unwrap_or(Step::Done))
  }

  /// Collapses the cell at `pos` with the observer's pick.
  /// Events still queued from earlier cycles come first in the returned list
  pub fn observe(&mut self, pos: impl Into<UPos>) -> Result<Vec<Step<S>>, Error<S>> {
    self.ensure_running()?;
    let index = self.locate(pos.into())?;

    let mut events = self.pending.drain(..).collect::<Vec<_>>();
    events.extend(self.cycle(index, None));

    Ok(events)
  }

  /// Forces the cell at `pos` to `symbol`, a symbol it no longer admits contradicts there
  pub fn collapse_to(&mut self, pos: impl Into<UPos>, symbol: S) -> Result<Vec<Step<S>>, Error<S>> {
    self.ensure_running()?;
    let index = self.locate(pos.into())?;
    let id = self
      .rules
      .legend()
      .symbol_id(&symbol)
      .ok_or(InvalidOperation::UnknownSymbol { symbol })?;

    let mut events = self.pending.drain(..).collect::<Vec<_>>();
    events.extend(self.cycle(index, Some(id)));

    Ok(events)
  }

  /// Steps until the solve ends or the step ceiling is hit.
  /// A finished solver just reports how it ended
  #[profiling::function]
  pub fn solve(&mut self) -> Result<Outcome, Error<S>> {
    while self.status == Status::Running {
      let ceiling = self.max_steps.is_some_and(|max| self.steps >= max);
      if ceiling && self.pending.is_empty() && !self.grid.is_resolved() {
        return Ok(Outcome::Stalled { steps: self.steps });
      }

      self.step()?;
    }

    self.pending.clear();

    Ok(match self.status {
      Status::Succeeded => Outcome::Succeeded,
      Status::Contradicted => {
        Outcome::Contradicted(self.contradictions.first().copied().unwrap_or_default())
      }
      Status::Running => Outcome::Stalled { steps: self.steps },
    })
  }

  pub fn domain_of(&self, row: usize, col: usize) -> Result<BTreeSet<S>, Error<S>> {
    let position = UPos::new(row, col);
    self
      .grid
      .domain_of(position)
      .map(|domain| self.rules.legend().symbols_of(domain))
      .ok_or_else(|| self.out_of_bounds(position))
  }

  /// The symbol of a collapsed cell, `None` while it is unresolved or contradicted
  pub fn value_of(&self, row: usize, col: usize) -> Result<Option<S>, Error<S>> {
    let position = UPos::new(row, col);
    self
      .grid
      .at_pos(position)
      .map(|cell| self.symbol_of(cell.selected_symbol()))
      .ok_or_else(|| self.out_of_bounds(position))
  }

  /// Every cell's value in row-major order
  pub fn data(&self) -> Vec<Option<S>> {
    self
      .grid
      .list
      .iter()
      .map(|cell| self.symbol_of(cell.selected_symbol()))
      .collect()
  }

  pub fn status(&self) -> Status {
    self.status
  }

  pub fn contradictions(&self) -> &[UPos] {
    &self.contradictions
  }

  pub fn grid(&self) -> &Grid {
    &self.grid
  }

  pub fn size(&self) -> &Size {
    &self.grid.size
  }

  pub fn rules(&self) -> &Rules<S> {
    &self.rules
  }

  pub fn observer(&self) -> &O {
    &self.observer
  }

  /// Number of collapse cycles run so far
  pub fn steps(&self) -> usize {
    self.steps
  }

  #[profiling::function]
  fn cycle(&mut self, index: CellIndex, forced: Option<SymbolId>) -> Vec<Step<S>> {
    self.steps += 1;

    let symbol = forced.or_else(|| self.observer.pick(index, &self.grid));

    tracing::trace!(
      step = self.steps,
      position = ?self.grid.position_of(index),
      ?symbol,
      "collapsing"
    );

    let committed = symbol.is_some_and(|symbol| self.grid.assign(index, symbol));
    if !committed {
      return vec![self.contradict(index)];
    }

    let mut events = Vec::from_iter(self.report(index));

    let propagation =
      self
        .propagator
        .propagate(&mut self.grid, self.rules.abstract_rules(), index);

    events.extend(
      propagation
        .changed
        .iter()
        .copied()
        .filter(|changed| *changed != index)
        .unique()
        .filter_map(|changed| self.report(changed)),
    );

    // success is declared by the next `step`, forced collapses may still follow
    if let Some(at) = propagation.contradiction {
      events.push(self.contradict(at));
    }

    events
  }

  /// Describes a cell's current domain, contradicted cells are reported separately
  fn report(&self, index: CellIndex) -> Option<Step<S>> {
    let cell = self.grid.at(index)?;

    match cell.entropy() {
      0 => None,
      1 => self
        .symbol_of(cell.selected_symbol())
        .map(|symbol| Step::Collapsed(cell.position, symbol)),
      _ => Some(Step::Progress(
        cell.position,
        self.rules.legend().symbols_of(&cell.domain),
      )),
    }
  }

  fn contradict(&mut self, index: CellIndex) -> Step<S> {
    let position = self.grid.position_of(index).unwrap_or_default();

    tracing::debug!(%position, steps = self.steps, "solve contradicted");

    self.status = Status::Contradicted;
    self.contradictions.push(position);

    Step::Contradiction(position)
  }

  fn succeed(&mut self) -> Step<S> {
    tracing::trace!(steps = self.steps, "solve succeeded");
    self.status = Status::Succeeded;
    Step::Done
  }

  fn symbol_of(&self, id: Option<SymbolId>) -> Option<S> {
    id.and_then(|id| self.rules.legend().symbol(id)).cloned()
  }

  fn locate(&self, position: UPos) -> Result<CellIndex, Error<S>> {
    self
      .grid
      .index_of(position)
      .ok_or_else(|| self.out_of_bounds(position))
  }

  fn out_of_bounds(&self, position: UPos) -> Error<S> {
    InvalidOperation::OutOfBounds {
      position,
      size: self.grid.size,
    }
    .into()
  }

  fn ensure_running(&self) -> Result<(), Error<S>> {
    if self.status.is_terminal() {
      return Err(
        InvalidOperation::Finished {
          status: self.status,
        }
        .into(),
      );
    }

    Ok(())
  }
}
