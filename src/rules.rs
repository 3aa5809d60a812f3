use crate::{Direction, Symbol, SymbolId, err::ConfigError};
use bimap::BiHashMap;
use derive_more::derive::{Deref, DerefMut, IntoIterator};
use itertools::Itertools;
use std::{
  collections::{BTreeSet, HashMap},
  iter::FromIterator,
};
use strum::{EnumCount, IntoEnumIterator, VariantArray};

/// Collects the compatibility relation before it is validated into [`Rules`]
#[derive(Debug, Deref, DerefMut)]
pub struct RuleBuilder<S: Symbol> {
  alphabet: Option<BTreeSet<S>>,
  #[deref]
  #[deref_mut]
  table: HashMap<S, Rule<S>>,
}

impl<S: Symbol> Default for RuleBuilder<S> {
  fn default() -> Self {
    Self {
      alphabet: None,
      table: Default::default(),
    }
  }
}

impl<S: Symbol> Clone for RuleBuilder<S> {
  fn clone(&self) -> Self {
    Self {
      alphabet: self.alphabet.clone(),
      table: self.table.clone(),
    }
  }
}

impl<S: Symbol> RuleBuilder<S> {
  /// Declares the alphabet explicitly, otherwise it is every symbol a rule is given for
  pub fn with_alphabet(mut self, alphabet: impl IntoIterator<Item = S>) -> Self {
    self.alphabet = Some(alphabet.into_iter().collect());
    self
  }

  pub fn add_rule(&mut self, symbol: S, rule: impl Into<Rule<S>>) -> &mut Self {
    self.table.insert(symbol, rule.into());
    self
  }

  pub fn with_rule(mut self, symbol: S, rule: impl Into<Rule<S>>) -> Self {
    self.add_rule(symbol, rule);
    self
  }

  pub fn build(self) -> Result<Rules<S>, ConfigError<S>> {
    let alphabet = self
      .alphabet
      .unwrap_or_else(|| self.table.keys().cloned().collect());

    if alphabet.is_empty() {
      return Err(ConfigError::EmptyAlphabet);
    }

    if let Some(symbol) = self
      .table
      .keys()
      .sorted()
      .find(|symbol| !alphabet.contains(*symbol))
    {
      return Err(ConfigError::UndeclaredSymbol {
        symbol: symbol.clone(),
      });
    }

    for symbol in &alphabet {
      for direction in Direction::iter() {
        let Some(allowed) = self
          .table
          .get(symbol)
          .and_then(|rule| rule.allowed(direction))
        else {
          return Err(ConfigError::MissingRule {
            symbol: symbol.clone(),
            direction,
          });
        };

        if let Some(undeclared) = allowed.iter().find(|s| !alphabet.contains(*s)) {
          return Err(ConfigError::UndeclaredSymbol {
            symbol: undeclared.clone(),
          });
        }
      }
    }

    let legend = Legend::from(&alphabet);
    let abstract_rules = AbstractRules::new(&self.table, &legend);

    Ok(Rules {
      table: self.table,
      legend,
      abstract_rules,
    })
  }
}

impl<S, IntoRule> From<HashMap<S, IntoRule>> for RuleBuilder<S>
where
  S: Symbol,
  IntoRule: Into<Rule<S>>,
{
  fn from(value: HashMap<S, IntoRule>) -> Self {
    Self {
      alphabet: None,
      table: value
        .into_iter()
        .map(|(k, v)| (k, v.into()))
        .collect::<HashMap<S, Rule<S>>>(),
    }
  }
}

impl<S: Symbol> FromIterator<(S, Rule<S>)> for RuleBuilder<S> {
  fn from_iter<I: IntoIterator<Item = (S, Rule<S>)>>(iter: I) -> Self {
    Self {
      alphabet: None,
      table: HashMap::from_iter(iter),
    }
  }
}

/// The validated compatibility relation over a fixed alphabet
#[derive(Debug, PartialEq, Eq)]
pub struct Rules<S: Symbol> {
  table: HashMap<S, Rule<S>>,
  legend: Legend<S>,
  abstract_rules: AbstractRules,
}

impl<S: Symbol> Clone for Rules<S> {
  fn clone(&self) -> Self {
    Self {
      table: self.table.clone(),
      legend: self.legend.clone(),
      abstract_rules: self.abstract_rules.clone(),
    }
  }
}

impl<S: Symbol> Rules<S> {
  /// Every symbol, in id order
  pub fn alphabet(&self) -> impl Iterator<Item = &S> {
    self.legend.symbols()
  }

  pub fn len(&self) -> usize {
    self.legend.len()
  }

  pub fn is_empty(&self) -> bool {
    self.legend.len() == 0
  }

  pub fn rule_for(&self, symbol: &S) -> Option<&Rule<S>> {
    self.table.get(symbol)
  }

  /// The symbols a cell lying to the `direction` of a cell holding `symbol` may take
  pub fn allowed(&self, symbol: &S, direction: Direction) -> Option<&BTreeSet<S>> {
    self.rule_for(symbol).and_then(|rule| rule.allowed(direction))
  }

  pub fn legend(&self) -> &Legend<S> {
    &self.legend
  }

  pub fn abstract_rules(&self) -> &AbstractRules {
    &self.abstract_rules
  }

  /// Every `(s, direction, t)` where `s` admits `t` toward `direction`
  /// but `t` does not admit `s` back toward the opposite direction
  pub fn asymmetries(&self) -> Vec<(S, Direction, S)> {
    self
      .alphabet()
      .cartesian_product(Direction::iter())
      .flat_map(|(s, direction)| {
        self
          .allowed(s, direction)
          .into_iter()
          .flatten()
          .filter(move |t| {
            !self
              .allowed(t, direction.opposite())
              .is_some_and(|back| back.contains(s))
          })
          .map(move |t| (s.clone(), direction, t.clone()))
      })
      .collect()
  }

  pub fn is_symmetric(&self) -> bool {
    self.asymmetries().is_empty()
  }
}

/// Allowed neighbor symbols for one symbol, per direction
#[derive(Debug, PartialEq, Eq, Deref, DerefMut, IntoIterator)]
pub struct Rule<S: Symbol> {
  table: HashMap<Direction, BTreeSet<S>>,
}

impl<S: Symbol> Default for Rule<S> {
  fn default() -> Self {
    Self {
      table: Default::default(),
    }
  }
}

impl<S: Symbol> Clone for Rule<S> {
  fn clone(&self) -> Self {
    Self {
      table: self.table.clone(),
    }
  }
}

impl<S: Symbol> Rule<S> {
  pub fn new(allowed: impl Into<HashMap<Direction, BTreeSet<S>>>) -> Self {
    Self {
      table: allowed.into(),
    }
  }

  /// The same allowed set in every direction
  pub fn splat(allowed: impl IntoIterator<Item = S>) -> Self {
    let allowed = BTreeSet::from_iter(allowed);
    Self::from_fn(|_| allowed.clone())
  }

  pub fn from_fn<IntoSet>(mut f: impl FnMut(Direction) -> IntoSet) -> Self
  where
    IntoSet: IntoIterator<Item = S>,
  {
    Self {
      table: Direction::iter()
        .map(|direction| (direction, f(direction).into_iter().collect()))
        .collect(),
    }
  }

  pub fn allowed(&self, direction: Direction) -> Option<&BTreeSet<S>> {
    self.table.get(&direction)
  }
}

impl<S: Symbol> From<HashMap<Direction, BTreeSet<S>>> for Rule<S> {
  fn from(table: HashMap<Direction, BTreeSet<S>>) -> Self {
    Self { table }
  }
}

impl<S: Symbol> FromIterator<(Direction, BTreeSet<S>)> for Rule<S> {
  fn from_iter<I: IntoIterator<Item = (Direction, BTreeSet<S>)>>(iter: I) -> Self {
    Self {
      table: HashMap::from_iter(iter),
    }
  }
}

/// Two-way mapping between user symbols and the dense ids the grid stores
#[derive(PartialEq, Eq, Debug)]
pub struct Legend<S: Symbol> {
  symbols: BiHashMap<SymbolId, S>,
}

impl<S: Symbol> Clone for Legend<S> {
  fn clone(&self) -> Self {
    Self {
      symbols: self.symbols.clone(),
    }
  }
}

impl<S: Symbol> Legend<S> {
  pub fn symbol_id(&self, symbol: &S) -> Option<SymbolId> {
    self.symbols.get_by_right(symbol).cloned()
  }

  pub fn symbol(&self, id: SymbolId) -> Option<&S> {
    self.symbols.get_by_left(&id)
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }

  pub fn ids(&self) -> impl Iterator<Item = SymbolId> {
    (0..self.symbols.len()).map(SymbolId::new)
  }

  pub fn symbols(&self) -> impl Iterator<Item = &S> {
    self.ids().filter_map(|id| self.symbol(id))
  }

  pub fn symbols_of<'a>(&'a self, ids: impl IntoIterator<Item = &'a SymbolId>) -> BTreeSet<S> {
    ids
      .into_iter()
      .filter_map(|id| self.symbol(*id))
      .cloned()
      .collect()
  }
}

impl<S: Symbol> From<&BTreeSet<S>> for Legend<S> {
  fn from(alphabet: &BTreeSet<S>) -> Self {
    Self {
      symbols: alphabet
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, s)| (SymbolId::new(i), s))
        .collect(),
    }
  }
}

/// The relation in id space, indexed by `SymbolId` then `Direction`
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct AbstractRules(Vec<[BTreeSet<SymbolId>; Direction::COUNT]>);

impl AbstractRules {
  fn new<S: Symbol>(table: &HashMap<S, Rule<S>>, legend: &Legend<S>) -> Self {
    Self(
      legend
        .symbols()
        .map(|symbol| {
          std::array::from_fn(|i| {
            table
              .get(symbol)
              .and_then(|rule| rule.allowed(Direction::VARIANTS[i]))
              .map(|allowed| {
                allowed
                  .iter()
                  .filter_map(|s| legend.symbol_id(s))
                  .collect()
              })
              .unwrap_or_default()
          })
        })
        .collect(),
    )
  }

  pub fn allowed(&self, symbol: SymbolId, direction: Direction) -> Option<&BTreeSet<SymbolId>> {
    self
      .0
      .get(*symbol)
      .map(|by_direction| &by_direction[direction.index()])
  }

  /// Everything a neighbor toward `direction` may hold given any of `domain`
  pub fn union<'a>(
    &self,
    domain: impl IntoIterator<Item = &'a SymbolId>,
    direction: Direction,
  ) -> BTreeSet<SymbolId> {
    domain
      .into_iter()
      .filter_map(|symbol| self.allowed(*symbol, direction))
      .flatten()
      .cloned()
      .collect()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}
