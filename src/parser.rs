use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use thiserror::Error;

/// A single RSC operation with its operand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    /// Load the value at a location into the accumulator.
    Lda(u32),
    /// Load a constant into the accumulator.
    Ldc(f64),
    /// Store the accumulator at a location.
    Sta(u32),
    /// Read a number from the console into a location.
    Inp(u32),
    /// Print the value at a location.
    Out(u32),
    /// Add a constant to the accumulator.
    Adc(f64),
    Add(u32),
    Sub(u32),
    Mul(u32),
    Div(u32),
    /// Jump to a source line.
    Bru(u32),
    /// Jump to a source line if the accumulator is positive.
    Bpa(u32),
    /// Jump to a source line if the accumulator is negative.
    Bna(u32),
    /// Jump to a source line if the accumulator is zero.
    Bza(u32),
    Stp,
}

impl Op {
    pub fn opcode(&self) -> &'static str {
        match self {
            Op::Lda(_) => "LDA",
            Op::Ldc(_) => "LDC",
            Op::Sta(_) => "STA",
            Op::Inp(_) => "INP",
            Op::Out(_) => "OUT",
            Op::Adc(_) => "ADC",
            Op::Add(_) => "ADD",
            Op::Sub(_) => "SUB",
            Op::Mul(_) => "MUL",
            Op::Div(_) => "DIV",
            Op::Bru(_) => "BRU",
            Op::Bpa(_) => "BPA",
            Op::Bna(_) => "BNA",
            Op::Bza(_) => "BZA",
            Op::Stp => "STP",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Ldc(value) | Op::Adc(value) => write!(f, "{} {}", self.opcode(), value),
            Op::Stp => f.write_str(self.opcode()),
            Op::Lda(n)
            | Op::Sta(n)
            | Op::Inp(n)
            | Op::Out(n)
            | Op::Add(n)
            | Op::Sub(n)
            | Op::Mul(n)
            | Op::Div(n)
            | Op::Bru(n)
            | Op::Bpa(n)
            | Op::Bna(n)
            | Op::Bza(n) => write!(f, "{} {}", self.opcode(), n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Instruction {
    pub op: Op,
    /// 1-based source line.
    pub line: usize,
}

/// Parsed instructions, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Index of the first instruction on or after `line`.
    pub fn index_of_line(&self, line: usize) -> Option<usize> {
        let index = self.instructions.partition_point(|instr| instr.line < line);
        (index < self.instructions.len()).then_some(index)
    }
}

impl FromStr for Program {
    type Err = Diagnostics;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        parse(source)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DiagnosticKind {
    #[error("Invalid opcode")]
    InvalidOpcode,
    #[error("Invalid operand, expected a number")]
    InvalidOperand,
    #[error("Missing operand")]
    MissingOperand,
    #[error("Only one operand expected")]
    TooManyOperands,
    #[error("Program must contain at least one STP instruction")]
    MissingStp,
}

/// A problem in the source, with a byte span into it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at line {line}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

impl Diagnostic {
    /// Render the offending line with some context and a marker under the span.
    pub fn annotate(&self, source: &str) -> String {
        let lines: Vec<&str> = source.split('\n').collect();
        let index = self.line.saturating_sub(1).min(lines.len().saturating_sub(1));
        let width = lines.len().to_string().len();
        let numbered = |i: usize| format!("{:>width$}. {}", i + 1, lines[i].trim_end());

        let before = (0..index)
            .rev()
            .filter(|&i| !lines[i].trim().is_empty())
            .take(2)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .map(numbered);
        let after = (index + 1..lines.len())
            .filter(|&i| !lines[i].trim().is_empty())
            .take(2)
            .map(numbered);

        let line_start: usize = lines[..index].iter().map(|line| line.len() + 1).sum();
        let column = self.start.saturating_sub(line_start);
        let marker = format!(
            "{}^{} {}",
            " ".repeat(width + 2 + column),
            "-".repeat(self.end.saturating_sub(self.start).saturating_sub(1)),
            self.kind
        );

        before
            .chain([numbered(index), marker])
            .chain(after)
            .join("\n")
    }
}

/// Every diagnostic found while parsing a source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} error(s) in program", .0.len())]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.0
    }

    pub fn annotate(&self, source: &str) -> String {
        self.0.iter().map(|diag| diag.annotate(source)).join("\n\n")
    }
}

enum Operand {
    None,
    Location,
    Number,
}

fn operand_kind(opcode: &str) -> Option<Operand> {
    match opcode {
        "STP" => Some(Operand::None),
        "LDC" | "ADC" => Some(Operand::Number),
        "LDA" | "STA" | "INP" | "OUT" | "ADD" | "SUB" | "MUL" | "DIV" | "BRU" | "BPA" | "BNA"
        | "BZA" => Some(Operand::Location),
        _ => None,
    }
}

fn location_op(opcode: &str, n: u32) -> Op {
    match opcode {
        "LDA" => Op::Lda(n),
        "STA" => Op::Sta(n),
        "INP" => Op::Inp(n),
        "OUT" => Op::Out(n),
        "ADD" => Op::Add(n),
        "SUB" => Op::Sub(n),
        "MUL" => Op::Mul(n),
        "DIV" => Op::Div(n),
        "BRU" => Op::Bru(n),
        "BPA" => Op::Bpa(n),
        "BNA" => Op::Bna(n),
        _ => Op::Bza(n),
    }
}

/// Whitespace separated tokens of `line` with their byte offsets.
fn tokens(line: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in line.char_indices() {
        match (c.is_whitespace(), start) {
            (false, None) => start = Some(i),
            (true, Some(s)) => {
                out.push((s, &line[s..i]));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        out.push((s, &line[s..]));
    }
    out
}

/// Parse RSC source into a [`Program`], collecting every diagnostic.
pub fn parse(source: &str) -> Result<Program, Diagnostics> {
    let mut instructions = Vec::new();
    let mut diagnostics = Vec::new();
    let mut found_stp = false;
    let mut line_start = 0;

    for (index, text) in source.split('\n').enumerate() {
        let line = index + 1;
        let offset = line_start;
        line_start += text.len() + 1;

        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let diag = |kind, start: usize, end: usize| Diagnostic {
            kind,
            line,
            start: offset + start,
            end: offset + end,
        };
        let line_end = text.trim_end().len();

        let tokens = tokens(text);
        let (opcode_at, opcode) = tokens[0];
        let operands = &tokens[1..];

        let Some(kind) = operand_kind(opcode) else {
            diagnostics.push(diag(
                DiagnosticKind::InvalidOpcode,
                opcode_at,
                opcode_at + opcode.len(),
            ));
            continue;
        };

        let allowed = match kind {
            Operand::None => 0,
            _ => 1,
        };
        if let Some(&(extra_at, _)) = operands.get(allowed) {
            diagnostics.push(diag(DiagnosticKind::TooManyOperands, extra_at, line_end));
        }

        let opcode_end = opcode_at + opcode.len();
        let op = match (kind, operands.first()) {
            (Operand::None, _) => {
                found_stp = true;
                Op::Stp
            }
            (_, None) => {
                diagnostics.push(diag(DiagnosticKind::MissingOperand, opcode_end, opcode_end));
                continue;
            }
            (Operand::Number, Some(&(at, token))) => match token.parse::<f64>() {
                Ok(value) if opcode == "LDC" => Op::Ldc(value),
                Ok(value) => Op::Adc(value),
                Err(_) => {
                    diagnostics.push(diag(DiagnosticKind::InvalidOperand, at, at + token.len()));
                    continue;
                }
            },
            (Operand::Location, Some(&(at, token))) => match token.parse::<u32>() {
                Ok(n) => location_op(opcode, n),
                Err(_) => {
                    diagnostics.push(diag(DiagnosticKind::InvalidOperand, at, at + token.len()));
                    continue;
                }
            },
        };

        instructions.push(Instruction { op, line });
    }

    if !found_stp {
        let last_line = source.split('\n').count();
        diagnostics.push(Diagnostic {
            kind: DiagnosticKind::MissingStp,
            line: last_line,
            start: source.len(),
            end: source.len(),
        });
    }

    if diagnostics.is_empty() {
        Ok(Program { instructions })
    } else {
        Err(Diagnostics(diagnostics))
    }
}
