use crate::{CellIndex, Rules, Shape, Symbol, SymbolId, cells::Grid, err::ConfigError};
use derive_more::derive::{Deref, DerefMut};
use std::collections::HashMap;

/// Fixed per-symbol weights. Symbols without an entry weigh `1.0`
#[derive(Debug, Default, Clone, PartialEq, Deref, DerefMut)]
pub struct WeightedShape(HashMap<SymbolId, f64>);

impl WeightedShape {
  pub fn new(weights: impl Into<HashMap<SymbolId, f64>>) -> Self {
    Self(weights.into())
  }

  /// Translates a table keyed by symbol into id space, rejecting unknown symbols
  /// and weights that are not positive and finite
  pub fn from_symbols<S: Symbol>(
    weights: impl IntoIterator<Item = (S, f64)>,
    rules: &Rules<S>,
  ) -> Result<Self, ConfigError<S>> {
    weights
      .into_iter()
      .map(|(symbol, weight)| {
        if !weight.is_finite() || weight <= 0.0 {
          return Err(ConfigError::InvalidWeight { symbol, weight });
        }

        match rules.legend().symbol_id(&symbol) {
          Some(id) => Ok((id, weight)),
          None => Err(ConfigError::UndeclaredSymbol { symbol }),
        }
      })
      .collect::<Result<HashMap<_, _>, _>>()
      .map(Self)
  }
}

impl Shape for WeightedShape {
  fn weight(&self, symbol: SymbolId, _index: CellIndex, _grid: &Grid) -> f64 {
    self.get(&symbol).copied().unwrap_or(1.0)
  }
}
