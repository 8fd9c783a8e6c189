use std::io::{self, BufRead, StdinLock, Stdout, Write};

use tracing::debug;

use crate::console::{Console, ConsoleError};
use crate::machine::Host;
use crate::randomizer::Randomizer;
use crate::Options;

/// The standard RSC environment: a [`Randomizer`] and a [`Console`].
#[derive(Debug)]
pub struct Runtime<R, W> {
    randomizer: Randomizer,
    seed: Option<u64>,
    console: Console<R, W>,
}

impl Runtime<StdinLock<'static>, Stdout> {
    pub fn stdio(options: &Options) -> Self {
        Self::new(io::stdin().lock(), io::stdout(), options)
    }
}

impl<R: BufRead, W: Write> Runtime<R, W> {
    pub fn new(reader: R, writer: W, options: &Options) -> Self {
        let randomizer = match options.seed {
            Some(seed) => Randomizer::from_seed(seed),
            None => Randomizer::new(),
        };
        Self {
            randomizer,
            seed: options.seed,
            console: Console::new(reader, writer, options.max_input_attempts),
        }
    }

    pub fn into_inner(self) -> (R, W) {
        self.console.into_inner()
    }
}

impl<R: BufRead, W: Write> Host for Runtime<R, W> {
    /// Reseed: from the fixed seed when one was configured, otherwise from
    /// the clock.
    fn init(&mut self) {
        match self.seed {
            Some(seed) => self.randomizer.reseed(seed),
            None => self.randomizer.init(),
        }
        debug!(fixed_seed = ?self.seed, "runtime initialised");
    }

    fn rand(&mut self) -> f64 {
        self.randomizer.gen()
    }

    fn input(&mut self) -> Result<f64, ConsoleError> {
        self.console.read_number()
    }

    fn output(&mut self, value: f64) -> Result<(), ConsoleError> {
        self.console.print_number(value)
    }
}
