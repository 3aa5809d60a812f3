use crate::{CellIndex, Direction, SymbolId, cells::Grid, rules::AbstractRules};
use derive_more::derive::{Deref, DerefMut};
use std::collections::{BTreeSet, HashMap};
use strum::{EnumCount, IntoEnumIterator};

/// What a single propagation did to the grid
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Propagation {
  /// Every effective shrink, in the order it happened. A cell appears once per shrink
  pub changed: Vec<CellIndex>,
  /// The cell whose domain ran out, propagation stops at the first one
  pub contradiction: Option<CellIndex>,
}

impl Propagation {
  pub fn is_contradiction(&self) -> bool {
    self.contradiction.is_some()
  }
}

/// Pushes domain changes outward until nothing else shrinks
#[derive(Debug, Default)]
pub struct Propagator {
  stack: Vec<CellIndex>,
  cache: UnionCache,
}

impl Propagator {
  /// Propagates the consequences of `origin`'s domain to the rest of the grid.
  ///
  /// Domains that were narrowed before a contradiction stay narrowed.
  #[profiling::function]
  pub fn propagate(
    &mut self,
    grid: &mut Grid,
    rules: &AbstractRules,
    origin: CellIndex,
  ) -> Propagation {
    let mut propagation = Propagation::default();

    self.stack.clear();
    self.stack.reserve(Direction::COUNT);
    self.stack.push(origin);

    while let Some(cell_index) = self.stack.pop() {
      let Some(cell) = grid.at(cell_index) else {
        continue;
      };

      if cell.contradicted() {
        propagation.contradiction = Some(cell_index);
        return propagation;
      }

      for direction in Direction::iter() {
        let Some(neighbor_index) = grid.neighbor(cell_index, direction) else {
          continue;
        };

        let Some(domain) = grid.at(cell_index).map(|cell| &cell.domain) else {
          continue;
        };
        let allowed = self.cache.union(rules, domain, direction);

        // collapsed cells are never narrowed, only checked
        if grid
          .at(neighbor_index)
          .and_then(|neighbor| neighbor.selected_symbol())
          .is_some_and(|symbol| allowed.contains(&symbol))
        {
          continue;
        }

        if grid.constrain(neighbor_index, allowed) {
          propagation.changed.push(neighbor_index);

          if grid
            .at(neighbor_index)
            .is_some_and(|neighbor| neighbor.contradicted())
          {
            propagation.contradiction = Some(neighbor_index);
            return propagation;
          }

          // if reduced, then push this neighbor onto the stack to propagate its changes to its neighbors
          self.stack.push(neighbor_index);
        }
      }
    }

    propagation
  }
}

type InnerUnionCache = HashMap<BTreeSet<SymbolId>, HashMap<Direction, BTreeSet<SymbolId>>>;

/// Memoised `AbstractRules::union` results keyed by domain then direction
#[derive(Default, Debug, Deref, DerefMut)]
struct UnionCache(InnerUnionCache);

impl UnionCache {
  #[profiling::function]
  fn union(
    &mut self,
    rules: &AbstractRules,
    domain: &BTreeSet<SymbolId>,
    direction: Direction,
  ) -> &BTreeSet<SymbolId> {
    let cached = self
      .get(domain)
      .is_some_and(|by_direction| by_direction.contains_key(&direction));

    if !cached {
      let union = rules.union(domain, direction);
      self
        .entry(domain.clone())
        .or_default()
        .insert(direction, union);
    }

    &self[domain][&direction]
  }
}

#[cfg(test)]
mod tests {
  use super::Propagator;
  use crate::{Direction, Rule, RuleBuilder, Rules, SymbolId, UPos, cells::Grid};
  use maplit::btreeset;

  #[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Clone)]
  enum Tiles {
    A,
    B,
  }

  fn id(rules: &Rules<Tiles>, tile: Tiles) -> SymbolId {
    rules.legend().symbol_id(&tile).unwrap()
  }

  /// `A` only admits `only_right` to its right, everything else admits anything
  fn right_of_a(only_right: Tiles) -> Rules<Tiles> {
    RuleBuilder::default()
      .with_rule(
        Tiles::A,
        Rule::from_fn(|dir| match dir {
          Direction::Right => vec![only_right.clone()],
          _ => vec![Tiles::A, Tiles::B],
        }),
      )
      .with_rule(Tiles::B, Rule::splat([Tiles::A, Tiles::B]))
      .build()
      .unwrap()
  }

  #[test]
  fn collapse_forces_the_neighbor() {
    let rules = right_of_a(Tiles::B);
    let mut grid = Grid::new(crate::Size::new(1, 2), rules.len());
    let mut propagator = Propagator::default();

    assert!(grid.assign(0, id(&rules, Tiles::A)));
    let propagation = propagator.propagate(&mut grid, rules.abstract_rules(), 0);

    assert!(!propagation.is_contradiction());
    assert_eq!(propagation.changed, vec![1]);
    assert_eq!(grid.list[1].domain, btreeset! { id(&rules, Tiles::B) });
    assert!(grid.is_resolved());
  }

  #[test]
  fn forcing_an_excluded_symbol_contradicts_at_that_cell() {
    let rules = right_of_a(Tiles::A);
    let mut grid = Grid::new(crate::Size::new(1, 2), rules.len());
    let mut propagator = Propagator::default();

    assert!(grid.assign(0, id(&rules, Tiles::A)));
    propagator.propagate(&mut grid, rules.abstract_rules(), 0);
    assert_eq!(grid.list[1].domain, btreeset! { id(&rules, Tiles::A) });

    assert!(!grid.assign(1, id(&rules, Tiles::B)));
    let propagation = propagator.propagate(&mut grid, rules.abstract_rules(), 1);

    assert_eq!(propagation.contradiction, Some(1));
    assert_eq!(
      grid.contradictions().map(|cell| cell.position).collect::<Vec<_>>(),
      vec![UPos::new(0, 1)]
    );
  }

  #[test]
  fn partial_domains_propagate() {
    // a chain where each symbol only tolerates itself or its successor to the right
    let rules = RuleBuilder::default()
      .with_rule(
        0,
        Rule::from_fn(|dir| match dir {
          Direction::Right => vec![0, 1],
          Direction::Left => vec![0],
          _ => vec![0, 1, 2, 3],
        }),
      )
      .with_rule(
        1,
        Rule::from_fn(|dir| match dir {
          Direction::Right => vec![1, 2],
          Direction::Left => vec![0, 1],
          _ => vec![0, 1, 2, 3],
        }),
      )
      .with_rule(
        2,
        Rule::from_fn(|dir| match dir {
          Direction::Right => vec![2, 3],
          Direction::Left => vec![1, 2],
          _ => vec![0, 1, 2, 3],
        }),
      )
      .with_rule(
        3,
        Rule::from_fn(|dir| match dir {
          Direction::Right => vec![3],
          Direction::Left => vec![2, 3],
          _ => vec![0, 1, 2, 3],
        }),
      )
      .build()
      .unwrap();

    let mut grid = Grid::new(crate::Size::new(1, 4), rules.len());
    let mut propagator = Propagator::default();

    // narrowing the first cell to {0, 1} without collapsing it still reaches the far end
    assert!(grid.constrain(0, &btreeset! { SymbolId::new(0), SymbolId::new(1) }));
    let propagation = propagator.propagate(&mut grid, rules.abstract_rules(), 0);

    assert!(!propagation.is_contradiction());
    assert_eq!(grid.list[1].domain.len(), 3);
    assert_eq!(grid.list[2].domain.len(), 4);
    assert_eq!(grid.list[3].domain.len(), 4);

    assert!(grid.assign(0, SymbolId::new(0)));
    propagator.propagate(&mut grid, rules.abstract_rules(), 0);

    assert_eq!(
      grid.list[1].domain,
      btreeset! { SymbolId::new(0), SymbolId::new(1) }
    );
    assert_eq!(
      grid.list[2].domain,
      btreeset! { SymbolId::new(0), SymbolId::new(1), SymbolId::new(2) }
    );
    assert_eq!(grid.list[3].domain.len(), 4);
  }

  #[test]
  fn shrink_events_are_bounded() {
    let rules = crate::prebuilt::pipes::relation().build().unwrap();
    let size = crate::Size::new(12, 12);
    let cells = size.len();
    let alphabet = rules.len();

    for origin in [0, 5, 77, cells - 1] {
      for symbol in 0..alphabet {
        let mut grid = Grid::new(size, alphabet);
        let mut propagator = Propagator::default();

        grid.assign(origin, SymbolId::new(symbol));
        let propagation = propagator.propagate(&mut grid, rules.abstract_rules(), origin);

        assert!(propagation.changed.len() <= cells * alphabet);
        for cell in &grid.list {
          assert!(cell.domain.len() <= alphabet);
        }
      }
    }
  }

  #[test]
  fn asymmetric_collapsed_neighbors_are_reported() {
    // A accepts anything to its left, but B refuses A to its right
    let rules = RuleBuilder::default()
      .with_rule(Tiles::A, Rule::splat([Tiles::A, Tiles::B]))
      .with_rule(
        Tiles::B,
        Rule::from_fn(|dir| match dir {
          Direction::Right => vec![Tiles::B],
          _ => vec![Tiles::A, Tiles::B],
        }),
      )
      .build()
      .unwrap();

    let mut grid = Grid::new(crate::Size::new(1, 2), rules.len());
    let mut propagator = Propagator::default();

    assert!(grid.assign(1, id(&rules, Tiles::A)));
    assert!(!propagator
      .propagate(&mut grid, rules.abstract_rules(), 1)
      .is_contradiction());

    assert!(grid.assign(0, id(&rules, Tiles::B)));
    let propagation = propagator.propagate(&mut grid, rules.abstract_rules(), 0);

    assert_eq!(propagation.contradiction, Some(1));
  }
}
