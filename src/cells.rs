use crate::{
  CellIndex, Direction, SymbolId,
  util::{IPos, Size, UPos},
};
use derive_more::derive::Deref;
use itertools::Itertools;
use ordermap::OrderSet;
use std::collections::BTreeSet;

/// Owns every cell domain of one solve attempt
#[derive(Debug, Clone)]
pub struct Grid {
  pub size: Size,
  pub list: Vec<Cell>,
  pub entropy_cache: EntropyCache,
}

impl Grid {
  /// A grid where every cell may still be any of `alphabet_len` symbols
  #[profiling::function]
  pub fn new(size: Size, alphabet_len: usize) -> Self {
    let all_possibilities = (0..alphabet_len)
      .map(SymbolId::new)
      .collect::<BTreeSet<_>>();
    let mut entropy_cache = EntropyCache::new(alphabet_len);

    let list = (0..size.rows())
      .cartesian_product(0..size.cols())
      .enumerate()
      .map(|(i, (row, col))| {
        entropy_cache.insert(alphabet_len, i);
        Cell::new(UPos::new(row, col), all_possibilities.clone())
      })
      .collect();

    Self {
      size,
      list,
      entropy_cache,
    }
  }

  pub fn at(&self, index: CellIndex) -> Option<&Cell> {
    self.list.get(index)
  }

  pub fn at_pos(&self, pos: UPos) -> Option<&Cell> {
    self.index_of(pos).and_then(|index| self.at(index))
  }

  pub fn index_of(&self, pos: UPos) -> Option<CellIndex> {
    (pos.row() < self.size.rows() && pos.col() < self.size.cols()).then(|| pos.index(self.size))
  }

  pub fn position_of(&self, index: CellIndex) -> Option<UPos> {
    self.at(index).map(|cell| cell.position)
  }

  /// The cell one step toward `direction`, `None` past the edge
  pub fn neighbor(&self, index: CellIndex, direction: Direction) -> Option<CellIndex> {
    (IPos::from(self.position_of(index)?) + direction)
      .within(self.size)
      .map(|pos| pos.index(self.size))
  }

  pub fn domain_of(&self, pos: UPos) -> Option<&BTreeSet<SymbolId>> {
    self.at_pos(pos).map(|cell| &cell.domain)
  }

  /// Intersects a domain with `allowed`, returning whether it shrank
  #[profiling::function]
  pub fn constrain(&mut self, index: CellIndex, allowed: &BTreeSet<SymbolId>) -> bool {
    let Some(cell) = self.list.get_mut(index) else {
      return false;
    };

    let starting_entropy = cell.entropy();
    cell.domain.retain(|symbol| allowed.contains(symbol));
    let new_entropy = cell.entropy();

    if starting_entropy == new_entropy {
      return false;
    }

    self
      .entropy_cache
      .set(starting_entropy, index, new_entropy);

    true
  }

  /// Collapses a cell onto `symbol`.
  /// When `symbol` is no longer a candidate the domain is emptied instead and false is returned
  pub fn assign(&mut self, index: CellIndex, symbol: SymbolId) -> bool {
    let Some(cell) = self.list.get_mut(index) else {
      return false;
    };

    let starting_entropy = cell.entropy();
    let possible = cell.domain.contains(&symbol);

    if possible {
      cell.collapse(symbol);
    } else {
      cell.domain.clear();
    }

    self
      .entropy_cache
      .set(starting_entropy, index, cell.entropy());

    possible
  }

  pub fn lowest_entropy_indexes(&self) -> Option<&OrderSet<CellIndex>> {
    self.entropy_cache.lowest()
  }

  /// Number of cells with more than one candidate left
  pub fn unresolved(&self) -> usize {
    self.entropy_cache.unresolved()
  }

  /// Every cell collapsed, answered from the entropy cache
  pub fn is_resolved(&self) -> bool {
    self.entropy_cache.iter().all(|level| level.is_empty())
  }

  pub fn contradictions(&self) -> impl Iterator<Item = &Cell> {
    self.list.iter().filter(|cell| cell.contradicted())
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
  pub domain: BTreeSet<SymbolId>,
  pub position: UPos,
}

impl Cell {
  fn new(position: UPos, domain: BTreeSet<SymbolId>) -> Self {
    Self { domain, position }
  }

  pub fn entropy(&self) -> usize {
    self.domain.len()
  }

  pub fn selected_symbol(&self) -> Option<SymbolId> {
    self
      .collapsed()
      .then(|| self.domain.first().cloned())
      .flatten()
  }

  pub fn collapse(&mut self, symbol: SymbolId) {
    self.domain = BTreeSet::from([symbol]);
  }

  pub fn collapsed(&self) -> bool {
    self.entropy() == 1
  }

  pub fn contradicted(&self) -> bool {
    self.entropy() == 0
  }
}

/// Cells bucketed by domain size. Collapsed cells are not tracked,
/// contradicted cells sit in bucket 0 and are never offered for selection
#[derive(Default, Debug, Clone, Deref)]
pub struct EntropyCache(Vec<OrderSet<CellIndex>>);

impl EntropyCache {
  fn new(max_entropy: usize) -> Self {
    Self(vec![OrderSet::new(); max_entropy.max(1) + 1])
  }

  #[profiling::function]
  pub fn lowest(&self) -> Option<&OrderSet<CellIndex>> {
    self.iter().skip(2).find(|level| !level.is_empty())
  }

  pub fn unresolved(&self) -> usize {
    self.iter().skip(2).map(|level| level.len()).sum()
  }

  pub fn contradicted(&self) -> usize {
    self.first().map_or(0, |level| level.len())
  }

  fn insert(&mut self, entropy: usize, index: CellIndex) {
    if entropy != 1
      && let Some(level) = self.0.get_mut(entropy)
    {
      level.insert(index);
    }
  }

  pub fn set(&mut self, starting_entropy: usize, index: CellIndex, new_entropy: usize) {
    if let Some(level) = self.0.get_mut(starting_entropy) {
      level.swap_remove(&index);
    }
    self.insert(new_entropy, index);
  }
}
