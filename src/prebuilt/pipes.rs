//! A five tile pipe set. Each pipe is named after the side its stub points to,
//! the three other sides are open and must meet an open side of the neighbor.

use crate::{Direction, Rule, RuleBuilder};
use maplit::btreeset;
use std::fmt::{self, Display};
use strum_macros::{EnumCount, EnumIter, VariantArray};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumCount, EnumIter, VariantArray,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Pipe {
  Up,
  Down,
  Left,
  Right,
  Empty,
}

impl Pipe {
  pub fn glyph(self) -> char {
    match self {
      Self::Up => '┴',
      Self::Down => '┬',
      Self::Left => '┤',
      Self::Right => '├',
      Self::Empty => ' ',
    }
  }
}

impl Display for Pipe {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.glyph())
  }
}

/// The neighbors each pipe accepts on every side
pub fn relation() -> RuleBuilder<Pipe> {
  use Direction as D;
  use Pipe::*;

  RuleBuilder::default()
    .with_rule(
      Up,
      Rule::from_fn(|dir| match dir {
        D::Up => btreeset! { Down, Left, Right },
        D::Down => btreeset! { Empty },
        D::Left => btreeset! { Up, Down, Right },
        D::Right => btreeset! { Up, Down, Left },
      }),
    )
    .with_rule(
      Down,
      Rule::from_fn(|dir| match dir {
        D::Up => btreeset! { Empty },
        D::Down => btreeset! { Up, Left, Right },
        D::Left => btreeset! { Up, Down, Right },
        D::Right => btreeset! { Up, Down, Left },
      }),
    )
    .with_rule(
      Left,
      Rule::from_fn(|dir| match dir {
        D::Up => btreeset! { Down, Left, Right },
        D::Down => btreeset! { Up, Left, Right },
        D::Left => btreeset! { Up, Down, Right },
        D::Right => btreeset! { Empty },
      }),
    )
    .with_rule(
      Right,
      Rule::from_fn(|dir| match dir {
        D::Up => btreeset! { Down, Left, Right },
        D::Down => btreeset! { Up, Left, Right },
        D::Left => btreeset! { Empty },
        D::Right => btreeset! { Up, Down, Left },
      }),
    )
    .with_rule(
      Empty,
      Rule::from_fn(|dir| match dir {
        D::Up => btreeset! { Up, Empty },
        D::Down => btreeset! { Down, Empty },
        D::Left => btreeset! { Left, Empty },
        D::Right => btreeset! { Right, Empty },
      }),
    )
}

#[cfg(test)]
mod tests {
  use super::{Pipe, relation};
  use crate::{Direction, Outcome, SolverBuilder, prebuilt::observers::RandomObserver};
  use strum::{EnumCount, IntoEnumIterator};

  #[test]
  fn every_pipe_is_ruled() {
    let rules = relation().build().unwrap();
    assert_eq!(rules.len(), Pipe::COUNT);
    assert!(rules.is_symmetric());
  }

  #[test]
  fn solved_pipes_connect() {
    let rules = relation().build().unwrap();

    let mut solver = crate::collapse_with_retries(50, |attempt| {
      SolverBuilder::new([7, 12], RandomObserver::new(Some(attempt as u64)), rules.clone()).build()
    })
    .unwrap();

    assert_eq!(solver.solve().unwrap(), Outcome::Succeeded);

    let data = solver.data();
    let size = *solver.size();
    for row in 0..size.rows() {
      for col in 0..size.cols() {
        let here = data[row * size.cols() + col].unwrap();
        for direction in Direction::iter() {
          let [dr, dc] = direction.offset();
          let (Some(r), Some(c)) = (row.checked_add_signed(dr), col.checked_add_signed(dc)) else {
            continue;
          };
          if r >= size.rows() || c >= size.cols() {
            continue;
          }

          let there = data[r * size.cols() + c].unwrap();
          assert!(rules.allowed(&here, direction).unwrap().contains(&there));
        }
      }
    }
  }

  #[test]
  fn glyphs_render() {
    let row = Pipe::iter().map(|pipe| pipe.to_string()).collect::<String>();
    assert_eq!(row, "┴┬┤├ ");
  }
}
