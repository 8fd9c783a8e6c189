use std::io::{self, BufRead, Write};

use thiserror::Error;
use tracing::{debug, warn};

pub const PROMPT: &str = "Input: ";
pub const INVALID_ENTRY: &str = "Invalid entry, try again.";

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("console i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("input ended before a number was entered")]
    Eof,
    #[error("no valid number after {0} attempts")]
    TooManyAttempts(usize),
}

/// Prompt on `writer` until `reader` yields a number.
///
/// Input is read a whitespace-delimited token at a time, so whatever follows
/// a valid number stays buffered for the next call. An invalid token throws
/// away the rest of its line. Whitespace, blank lines included, is skipped
/// without prompting again. Retries forever unless `max_attempts` is set.
pub fn read_number<R: BufRead, W: Write>(
    reader: &mut R,
    writer: &mut W,
    max_attempts: Option<usize>,
) -> Result<f64, ConsoleError> {
    let mut attempts = 0;
    loop {
        write!(writer, "{PROMPT}")?;
        writer.flush()?;

        if !skip_whitespace(reader)? {
            return Err(ConsoleError::Eof);
        }
        let raw = read_token(reader)?;
        let token = String::from_utf8_lossy(&raw);

        match token.parse::<f64>() {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempts += 1;
                debug!(input = %token, attempt = attempts, error = %err, "rejected console input");
                discard_line(reader)?;
                writeln!(writer, "{INVALID_ENTRY}")?;
            }
        }

        if let Some(max) = max_attempts {
            if attempts >= max {
                warn!(attempts, "giving up on console input");
                return Err(ConsoleError::TooManyAttempts(attempts));
            }
        }
    }
}

/// Consume leading whitespace. Returns `false` at end of input.
fn skip_whitespace<R: BufRead>(reader: &mut R) -> io::Result<bool> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(false);
        }
        let blank = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
        let found = blank < buf.len();
        reader.consume(blank);
        if found {
            return Ok(true);
        }
    }
}

/// Consume bytes up to, not including, the next whitespace.
fn read_token<R: BufRead>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut token = Vec::new();
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(token);
        }
        let len = buf.iter().take_while(|b| !b.is_ascii_whitespace()).count();
        token.extend_from_slice(&buf[..len]);
        let ended = len < buf.len();
        reader.consume(len);
        if ended {
            return Ok(token);
        }
    }
}

fn discard_line<R: BufRead>(reader: &mut R) -> io::Result<()> {
    let mut rest = Vec::new();
    reader.read_until(b'\n', &mut rest)?;
    Ok(())
}

/// Write `value` with two decimals and a newline.
pub fn print_number<W: Write>(writer: &mut W, value: f64) -> Result<(), ConsoleError> {
    writeln!(writer, "{value:.2}")?;
    writer.flush()?;
    Ok(())
}

/// A reader/writer pair with the input policy attached.
#[derive(Debug)]
pub struct Console<R, W> {
    reader: R,
    writer: W,
    max_attempts: Option<usize>,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(reader: R, writer: W, max_attempts: Option<usize>) -> Self {
        Self {
            reader,
            writer,
            max_attempts,
        }
    }

    pub fn read_number(&mut self) -> Result<f64, ConsoleError> {
        read_number(&mut self.reader, &mut self.writer, self.max_attempts)
    }

    pub fn print_number(&mut self, value: f64) -> Result<(), ConsoleError> {
        print_number(&mut self.writer, value)
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}
