use maplit::hashmap;
use std::error::Error;
use wavegrid::{
  prebuilt::pipes::{self, Pipe},
  prelude::*,
};

const STEP_BY_STEP: bool = false;

const ROWS: usize = 7;
const COLS: usize = 12;

const ATTEMPTS: usize = 20;

fn main() -> Result<(), Box<dyn Error>> {
  #[cfg(feature = "profiling")]
  let _guards = wavegrid::perf::enable_tracing()?;

  let args = std::env::args().collect::<Vec<_>>();
  let seed: Option<u64> = args.get(1).map(|arg| arg.parse()).transpose()?;

  let config = |attempt: usize| {
    let config = Config::default().with_weights(hashmap! { Pipe::Empty => 2.0 });
    match seed {
      Some(seed) => config.with_seed(seed.wrapping_add(attempt as u64)),
      None => config,
    }
  };

  if STEP_BY_STEP {
    let solver = initialize(
      ROWS,
      COLS,
      [Pipe::Up, Pipe::Down, Pipe::Left, Pipe::Right, Pipe::Empty],
      pipes::relation(),
      config(0),
    )?;
    println!("Seed: {}", solver.observer().seed());
    step_by_step(solver)?;
    return Ok(());
  }

  let solver = wavegrid::collapse_with_retries(ATTEMPTS, |attempt| {
    initialize(
      ROWS,
      COLS,
      [Pipe::Up, Pipe::Down, Pipe::Left, Pipe::Right, Pipe::Empty],
      pipes::relation(),
      config(attempt),
    )
  })?;

  println!("Seed: {}", solver.observer().seed());

  match solver.status() {
    Status::Succeeded => print_grid(&solver),
    status => eprintln!(
      "Gave up after {ATTEMPTS} attempts, last one {status} at {:?}",
      solver.contradictions()
    ),
  }

  Ok(())
}

fn step_by_step<O: Observer>(mut solver: Solver<Pipe, O>) -> Result<(), Box<dyn Error>> {
  loop {
    match solver.step()? {
      Step::Collapsed(pos, pipe) => {
        println!("\n{pos} -> {pipe:?}");
        print_grid(&solver);
      }
      Step::Progress(pos, domain) => println!("{pos} narrowed to {domain:?}"),
      Step::Contradiction(pos) => {
        eprintln!("Contradiction at {pos}");
        break;
      }
      Step::Done => break,
    }
  }

  print_grid(&solver);

  Ok(())
}

fn print_grid<O: Observer>(solver: &Solver<Pipe, O>) {
  let data = solver.data();

  let output = itertools::join(
    data.chunks(COLS).map(|row| {
      row
        .iter()
        .map(|cell| cell.map(|pipe| pipe.glyph()).unwrap_or('?'))
        .collect::<String>()
    }),
    "\n",
  );

  println!("\n{output}\n");
}
