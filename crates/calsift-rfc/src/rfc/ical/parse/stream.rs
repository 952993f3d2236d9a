//! Incremental line reassembly over a byte stream (RFC 5545 §3.1).
//!
//! Bytes are pulled from the source one chunk at a time. Folded physical
//! lines are joined into logical lines before tokenizing, and both the total
//! byte count and the logical line length are bounded while reading.

use std::io::{ErrorKind, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use calsift_core::config::LimitsConfig;
use calsift_core::constants::{
    DEFAULT_MAX_COMPONENT_DEPTH, DEFAULT_MAX_LINE_LENGTH, DEFAULT_MAX_RESOURCE_SIZE,
};

use super::error::{ParseError, ParseErrorKind, ParseResult};

const CHUNK_SIZE: usize = 8 * 1024;
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Bounds applied while reading one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserLimits {
    /// Maximum number of bytes consumed from the stream.
    pub max_resource_size: u64,
    /// Maximum length of one unfolded content line, in octets.
    pub max_line_length: usize,
    /// Maximum BEGIN nesting, VCALENDAR counting as one.
    pub max_depth: usize,
}

impl ParserLimits {
    #[must_use]
    pub const fn new(max_resource_size: u64, max_line_length: usize) -> Self {
        Self {
            max_resource_size,
            max_line_length,
            max_depth: DEFAULT_MAX_COMPONENT_DEPTH,
        }
    }

    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// No size or line bound. Only for trusted in-memory input.
    ///
    /// Nesting stays bounded: the tree walks recurse per level.
    #[must_use]
    pub const fn unbounded() -> Self {
        Self::new(u64::MAX, usize::MAX)
    }
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RESOURCE_SIZE, DEFAULT_MAX_LINE_LENGTH)
    }
}

impl From<&LimitsConfig> for ParserLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self::new(config.max_resource_size, config.max_line_length)
            .with_max_depth(config.max_component_depth)
    }
}

/// One unfolded content line and the physical line it started on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    pub number: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    SawCr,
    SawLf,
    /// A full line terminator was read; the next byte decides whether the
    /// line continues.
    FoldCandidate,
}

/// Reassembles logical lines from a folded byte stream.
pub struct LineReader<R> {
    inner: R,
    limits: ParserLimits,
    abort: Option<Arc<AtomicBool>>,
    buf: Vec<u8>,
    pos: usize,
    filled: usize,
    consumed: u64,
    eof: bool,
    state: State,
    line: Vec<u8>,
    physical: usize,
    start_line: usize,
}

impl<R: Read> LineReader<R> {
    #[must_use]
    pub fn new(inner: R, limits: ParserLimits) -> Self {
        Self {
            inner,
            limits,
            abort: None,
            buf: vec![0; CHUNK_SIZE],
            pos: 0,
            filled: 0,
            consumed: 0,
            eof: false,
            state: State::Normal,
            line: Vec::new(),
            physical: 0,
            start_line: 1,
        }
    }

    /// Attaches a flag that stops reading once it is set.
    #[must_use]
    pub fn with_abort(mut self, abort: Arc<AtomicBool>) -> Self {
        self.abort = Some(abort);
        self
    }

    /// Total number of bytes pulled from the source so far.
    #[must_use]
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    /// Returns the next non-empty logical line, or `None` at end of stream.
    ///
    /// ## Errors
    /// Fails on read errors, cancellation, exceeded limits and invalid UTF-8.
    pub fn next_line(&mut self) -> ParseResult<Option<LogicalLine>> {
        loop {
            let Some(byte) = self.next_byte()? else {
                self.state = State::Normal;
                return self.take_line();
            };

            let emitted = match self.state {
                State::Normal => {
                    match byte {
                        b'\r' => self.begin_terminator(State::SawCr),
                        b'\n' => self.begin_terminator(State::SawLf),
                        _ => self.push(byte)?,
                    }
                    None
                }
                State::SawCr if byte == b'\n' => {
                    self.state = State::FoldCandidate;
                    None
                }
                State::SawLf if byte == b'\r' => {
                    self.state = State::FoldCandidate;
                    None
                }
                State::SawCr | State::SawLf | State::FoldCandidate => {
                    self.after_terminator(byte)?
                }
            };

            if emitted.is_some() {
                return Ok(emitted);
            }
        }
    }

    fn begin_terminator(&mut self, state: State) {
        self.physical += 1;
        self.state = state;
    }

    fn after_terminator(&mut self, byte: u8) -> ParseResult<Option<LogicalLine>> {
        match byte {
            b' ' | b'\t' => {
                self.state = State::Normal;
                Ok(None)
            }
            b'\r' | b'\n' => {
                let line = self.take_line()?;
                self.begin_terminator(if byte == b'\r' {
                    State::SawCr
                } else {
                    State::SawLf
                });
                Ok(line)
            }
            _ => {
                let line = self.take_line()?;
                self.state = State::Normal;
                self.push(byte)?;
                Ok(line)
            }
        }
    }

    fn push(&mut self, byte: u8) -> ParseResult<()> {
        if self.line.is_empty() {
            self.start_line = self.physical + 1;
        }
        if self.line.len() >= self.limits.max_line_length {
            return Err(ParseError::new(
                ParseErrorKind::LineTooLong,
                self.start_line,
                self.line.len() + 1,
            )
            .with_context(format!("limit is {} octets", self.limits.max_line_length)));
        }
        self.line.push(byte);
        Ok(())
    }

    fn take_line(&mut self) -> ParseResult<Option<LogicalLine>> {
        if self.line.is_empty() {
            return Ok(None);
        }
        let bytes = std::mem::take(&mut self.line);
        let text = String::from_utf8(bytes).map_err(|e| {
            ParseError::new(
                ParseErrorKind::InvalidUtf8,
                self.start_line,
                e.utf8_error().valid_up_to() + 1,
            )
        })?;
        tracing::trace!(line = self.start_line, len = text.len(), "Unfolded line");
        Ok(Some(LogicalLine {
            number: self.start_line,
            text,
        }))
    }

    fn next_byte(&mut self) -> ParseResult<Option<u8>> {
        if self.pos == self.filled && !self.fill()? {
            return Ok(None);
        }
        let byte = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(byte))
    }

    /// Reads the next chunk. Returns `false` at end of stream.
    fn fill(&mut self) -> ParseResult<bool> {
        if self.eof {
            return Ok(false);
        }
        if self
            .abort
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            tracing::debug!(consumed = self.consumed, "Read aborted");
            return Err(ParseError::new(
                ParseErrorKind::Aborted,
                self.physical + 1,
                1,
            ));
        }

        let n = loop {
            match self.inner.read(&mut self.buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    return Err(
                        ParseError::new(ParseErrorKind::Io, self.physical + 1, 1)
                            .with_context(e.to_string()),
                    );
                }
            }
        };
        if n == 0 {
            self.eof = true;
            return Ok(false);
        }

        let first_chunk = self.consumed == 0;
        self.consumed = self.consumed.saturating_add(n as u64);
        if self.consumed > self.limits.max_resource_size {
            tracing::debug!(
                consumed = self.consumed,
                max = self.limits.max_resource_size,
                "Resource size limit exceeded"
            );
            return Err(
                ParseError::new(ParseErrorKind::ResourceTooLarge, self.physical + 1, 1)
                    .with_context(format!("limit is {} bytes", self.limits.max_resource_size)),
            );
        }

        self.filled = n;
        self.pos = if first_chunk && self.buf[..n].starts_with(&UTF8_BOM) {
            UTF8_BOM.len()
        } else {
            0
        };
        Ok(true)
    }
}
