use crate::{
  Direction,
  state::Status,
  util::{Size, UPos},
};

#[derive(Debug, thiserror::Error)]
pub enum Error<S> {
  #[error("Invalid configuration: {0}")]
  Config(ConfigError<S>),
  #[error("Invalid operation: {0}")]
  InvalidOperation(InvalidOperation<S>),
}

impl<S> From<ConfigError<S>> for Error<S> {
  fn from(value: ConfigError<S>) -> Self {
    Self::Config(value)
  }
}

impl<S> From<InvalidOperation<S>> for Error<S> {
  fn from(value: InvalidOperation<S>) -> Self {
    Self::InvalidOperation(value)
  }
}

/// Problems with the input handed to a solver, reported before any solving happens
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError<S> {
  #[error("Grid must have at least one row and one column, got {rows}x{cols}")]
  EmptyGrid { rows: usize, cols: usize },
  #[error("The alphabet has no symbols")]
  EmptyAlphabet,
  #[error("No allowed neighbors declared for {symbol:?} to the {direction}")]
  MissingRule { symbol: S, direction: Direction },
  #[error("Symbol {symbol:?} is used by the compatibility relation but is not part of the alphabet")]
  UndeclaredSymbol { symbol: S },
  #[error("Weight {weight} for {symbol:?} must be positive and finite")]
  InvalidWeight { symbol: S, weight: f64 },
  #[error("Pre-seeded position {position} lies outside of the {size} grid")]
  SeedOutOfBounds { position: UPos, size: Size },
  #[error("Pre-seeded cells contradict each other at {position}")]
  InconsistentSeed { position: UPos },
}

/// A request the solver cannot honor in its current state
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum InvalidOperation<S> {
  #[error("The solve has already {status}")]
  Finished { status: Status },
  #[error("Position {position} lies outside of the {size} grid")]
  OutOfBounds { position: UPos, size: Size },
  #[error("Symbol {symbol:?} is not part of the alphabet")]
  UnknownSymbol { symbol: S },
}
