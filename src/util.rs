use crate::Direction;
use derive_more::derive::{Deref, DerefMut};
use nalgebra::Vector2;
use std::{
  fmt::{self, Display},
  ops::Add,
};

/// Extent of a grid, stored as `[rows, columns]`
#[derive(Debug, Clone, Copy, Deref, DerefMut, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size(Vector2<usize>);

impl Size {
  pub fn new(rows: usize, cols: usize) -> Self {
    Self(Vector2::new(rows, cols))
  }

  pub fn rows(&self) -> usize {
    self.0[0]
  }

  pub fn cols(&self) -> usize {
    self.0[1]
  }

  pub fn len(&self) -> usize {
    self.0.iter().product()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn contains(&self, pos: &IPos) -> bool {
    pos
      .iter()
      .zip(self.iter())
      .all(|(p, s)| *p >= 0 && (*p as usize) < *s)
  }
}

impl From<(usize, usize)> for Size {
  fn from((rows, cols): (usize, usize)) -> Self {
    Self::new(rows, cols)
  }
}

impl From<[usize; 2]> for Size {
  fn from([rows, cols]: [usize; 2]) -> Self {
    Self::new(rows, cols)
  }
}

impl Display for Size {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}x{}", self.rows(), self.cols())
  }
}

/// A cell coordinate, `[row, column]`
#[derive(Debug, Clone, Copy, Deref, DerefMut, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UPos(pub Vector2<usize>);

impl Default for UPos {
  fn default() -> Self {
    Self(Vector2::zeros())
  }
}

impl UPos {
  pub fn new(row: usize, col: usize) -> Self {
    Self(Vector2::new(row, col))
  }

  pub fn row(&self) -> usize {
    self.0[0]
  }

  pub fn col(&self) -> usize {
    self.0[1]
  }

  /// Row-major index of this position, the caller ensures it lies within `size`
  pub fn index(&self, size: Size) -> usize {
    self.row() * size.cols() + self.col()
  }

  /// Inverse of [`UPos::index`], `None` when `index` lies past the end of `size`
  pub fn from_index(index: usize, size: Size) -> Option<Self> {
    (index < size.len()).then(|| Self::new(index / size.cols(), index % size.cols()))
  }
}

impl From<(usize, usize)> for UPos {
  fn from((row, col): (usize, usize)) -> Self {
    Self::new(row, col)
  }
}

impl From<[usize; 2]> for UPos {
  fn from([row, col]: [usize; 2]) -> Self {
    Self::new(row, col)
  }
}

impl Display for UPos {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({}, {})", self.row(), self.col())
  }
}

/// Signed coordinate used while stepping off the edge of the grid
#[derive(Debug, Clone, Copy, Deref, DerefMut, PartialEq, Eq)]
pub struct IPos(pub Vector2<isize>);

impl Default for IPos {
  fn default() -> Self {
    Self(Vector2::zeros())
  }
}

impl IPos {
  pub fn new(row: isize, col: isize) -> Self {
    Self(Vector2::new(row, col))
  }

  /// Converts back into a `UPos` if the position lies inside `size`
  pub fn within(&self, size: Size) -> Option<UPos> {
    size
      .contains(self)
      .then(|| UPos(self.map(|i| i as usize)))
  }
}

impl From<UPos> for IPos {
  fn from(value: UPos) -> Self {
    Self(value.map(|i| i as isize))
  }
}

impl Add<Direction> for IPos {
  type Output = Self;

  fn add(self, rhs: Direction) -> Self::Output {
    let [row, col] = rhs.offset();
    Self::new(self[0] + row, self[1] + col)
  }
}
