use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::console::ConsoleError;
use crate::parser::{Op, Program};
use crate::Options;

/// What a running program can ask of its environment.
pub trait Host {
    fn init(&mut self);
    fn rand(&mut self) -> f64;
    fn input(&mut self) -> Result<f64, ConsoleError>;
    fn output(&mut self, value: f64) -> Result<(), ConsoleError>;
}

#[derive(Debug, Error)]
pub enum MachineError {
    #[error("line {from} branches to line {target}, past the last instruction")]
    BranchOutOfRange { from: usize, target: u32 },
    #[error("execution ran past the last instruction without reaching STP")]
    RanOffEnd,
    #[error("step limit of {0} reached")]
    StepLimit(u64),
    #[error(transparent)]
    Console(#[from] ConsoleError),
}

/// Accumulator machine executing one [`Program`].
///
/// Memory is sparse. A location read before it is written holds a random
/// value, drawn from the host on first access.
pub struct Machine<'p, H> {
    program: &'p Program,
    host: H,
    accumulator: f64,
    memory: HashMap<u32, f64>,
    max_steps: Option<u64>,
}

impl<'p, H: Host> Machine<'p, H> {
    pub fn new(program: &'p Program, host: H, options: &Options) -> Self {
        Self {
            program,
            host,
            accumulator: 0.0,
            memory: HashMap::new(),
            max_steps: options.max_steps,
        }
    }

    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    pub fn peek(&self, location: u32) -> Option<f64> {
        self.memory.get(&location).copied()
    }

    pub fn into_host(self) -> H {
        self.host
    }

    fn load(&mut self, location: u32) -> f64 {
        let host = &mut self.host;
        *self.memory.entry(location).or_insert_with(|| host.rand())
    }

    fn jump(&self, from: usize, target: u32) -> Result<usize, MachineError> {
        self.program
            .index_of_line(target as usize)
            .ok_or(MachineError::BranchOutOfRange { from, target })
    }

    /// Run from the first instruction until STP. Returns the number of
    /// instructions executed.
    pub fn run(&mut self) -> Result<u64, MachineError> {
        let program = self.program;
        let instructions = program.instructions();
        debug!(instructions = instructions.len(), "starting program");

        self.host.init();
        self.accumulator = self.host.rand();

        let mut pc = 0;
        let mut steps: u64 = 0;
        loop {
            let Some(instr) = instructions.get(pc) else {
                return Err(MachineError::RanOffEnd);
            };
            if let Some(max) = self.max_steps {
                if steps >= max {
                    warn!(max, line = instr.line, "step limit reached");
                    return Err(MachineError::StepLimit(max));
                }
            }
            steps += 1;
            trace!(line = instr.line, op = %instr.op, acc = self.accumulator, "step");

            pc += 1;
            match instr.op {
                Op::Lda(n) => self.accumulator = self.load(n),
                Op::Ldc(value) => self.accumulator = value,
                Op::Sta(n) => {
                    self.memory.insert(n, self.accumulator);
                }
                Op::Inp(n) => {
                    let value = self.host.input()?;
                    self.memory.insert(n, value);
                }
                Op::Out(n) => {
                    let value = self.load(n);
                    self.host.output(value)?;
                }
                Op::Adc(value) => self.accumulator += value,
                Op::Add(n) => {
                    let value = self.load(n);
                    self.accumulator += value;
                }
                Op::Sub(n) => {
                    let value = self.load(n);
                    self.accumulator -= value;
                }
                Op::Mul(n) => {
                    let value = self.load(n);
                    self.accumulator *= value;
                }
                Op::Div(n) => {
                    let value = self.load(n);
                    self.accumulator /= value;
                }
                Op::Bru(target) => pc = self.jump(instr.line, target)?,
                Op::Bpa(target) if self.accumulator > 0.0 => pc = self.jump(instr.line, target)?,
                Op::Bna(target) if self.accumulator < 0.0 => pc = self.jump(instr.line, target)?,
                Op::Bza(target) if self.accumulator == 0.0 => pc = self.jump(instr.line, target)?,
                Op::Bpa(_) | Op::Bna(_) | Op::Bza(_) => {}
                Op::Stp => {
                    debug!(steps, "program stopped");
                    return Ok(steps);
                }
            }
        }
    }
}

/// Run `program` to completion and hand the host back.
pub fn execute<H: Host>(program: &Program, host: H, options: &Options) -> Result<H, MachineError> {
    let mut machine = Machine::new(program, host, options);
    machine.run()?;
    Ok(machine.into_host())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::collections::VecDeque;

    /// Host with queued inputs, recorded outputs and a counting generator.
    #[derive(Debug, Default)]
    struct Scripted {
        inputs: VecDeque<f64>,
        outputs: Vec<f64>,
        next_rand: f64,
        inits: usize,
    }

    impl Scripted {
        fn with_inputs(inputs: &[f64]) -> Self {
            Self {
                inputs: inputs.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl Host for Scripted {
        fn init(&mut self) {
            self.inits += 1;
        }

        fn rand(&mut self) -> f64 {
            self.next_rand += 100.0;
            self.next_rand
        }

        fn input(&mut self) -> Result<f64, ConsoleError> {
            self.inputs.pop_front().ok_or(ConsoleError::Eof)
        }

        fn output(&mut self, value: f64) -> Result<(), ConsoleError> {
            self.outputs.push(value);
            Ok(())
        }
    }

    fn run(source: &str, host: Scripted) -> Result<Scripted, MachineError> {
        execute(&parse(source).unwrap(), host, &Options::default())
    }

    #[test]
    fn adds_two_inputs() {
        let host = run(
            "INP 10\nINP 11\nLDA 10\nADD 11\nSTA 12\nOUT 12\nSTP",
            Scripted::with_inputs(&[2.5, 4.0]),
        )
        .unwrap();
        assert_eq!(host.outputs, vec![6.5]);
        assert_eq!(host.inits, 1);
    }

    #[test]
    fn arithmetic() {
        let source = "\
LDC 3
STA 1
LDC 12
DIV 1
ADC 0.5
STA 2
MUL 1
SUB 2
STA 3
OUT 2
OUT 3
STP";
        let host = run(source, Scripted::default()).unwrap();
        assert_eq!(host.outputs, vec![4.5, 9.0]);
    }

    #[test]
    fn counts_down_with_a_backward_branch() {
        let source = "\
# count down from 3
LDC 3
STA 1
LDC 1
STA 2
OUT 1
LDA 1
SUB 2
STA 1
BPA 6
STP";
        let host = run(source, Scripted::default()).unwrap();
        assert_eq!(host.outputs, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn conditional_branches() {
        // sign of the input: 1, -1 or 0
        let source = "\
INP 1
LDA 1
BPA 7
BNA 10
LDC 0
BRU 11
LDC 1
BRU 11
# negative
LDC -1
STA 2
OUT 2
STP";
        for (input, expected) in [(5.0, 1.0), (-0.25, -1.0), (0.0, 0.0)] {
            let host = run(source, Scripted::with_inputs(&[input])).unwrap();
            assert_eq!(host.outputs, vec![expected], "input {input}");
        }
    }

    #[test]
    fn unwritten_memory_is_random() {
        let program = parse("OUT 4\nOUT 4\nLDA 5\nSTP").unwrap();
        let mut machine = Machine::new(&program, Scripted::default(), &Options::default());
        machine.run().unwrap();
        // first draw seeds the accumulator
        assert_eq!(machine.peek(4), Some(200.0));
        assert_eq!(machine.accumulator(), 300.0);
        assert_eq!(machine.into_host().outputs, vec![200.0, 200.0]);
    }

    #[test]
    fn out_leaves_accumulator_alone() {
        let program = parse("LDC 7\nOUT 1\nSTP").unwrap();
        let mut machine = Machine::new(&program, Scripted::default(), &Options::default());
        machine.run().unwrap();
        assert_eq!(machine.accumulator(), 7.0);
    }

    #[test]
    fn division_by_zero_is_not_an_error() {
        let host = run(
            "LDC 0\nSTA 1\nLDC 1\nDIV 1\nSTA 2\nOUT 2\nSTP",
            Scripted::default(),
        )
        .unwrap();
        assert_eq!(host.outputs, vec![f64::INFINITY]);
    }

    #[test]
    fn branch_past_the_end() {
        let err = run("BRU 9\nSTP", Scripted::default()).unwrap_err();
        assert!(matches!(
            err,
            MachineError::BranchOutOfRange { from: 1, target: 9 }
        ));
    }

    #[test]
    fn running_off_the_end() {
        let err = run("BRU 3\nSTP\nLDC 1", Scripted::default()).unwrap_err();
        assert!(matches!(err, MachineError::RanOffEnd));
    }

    #[test]
    fn step_limit() {
        let program = parse("BRU 1\nSTP").unwrap();
        let options = Options {
            max_steps: Some(50),
            ..Options::default()
        };
        let err = execute(&program, Scripted::default(), &options).unwrap_err();
        assert!(matches!(err, MachineError::StepLimit(50)));
    }

    #[test]
    fn host_errors_propagate() {
        let err = run("INP 1\nSTP", Scripted::default()).unwrap_err();
        assert!(matches!(err, MachineError::Console(ConsoleError::Eof)));
    }

    #[test]
    fn counts_steps() {
        let program = parse("LDC 1\nADC 1\nSTP").unwrap();
        let mut machine = Machine::new(&program, Scripted::default(), &Options::default());
        assert_eq!(machine.run().unwrap(), 3);
    }
}
