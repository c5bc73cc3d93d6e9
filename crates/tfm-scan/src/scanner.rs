use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::str;

use tfm_types::Metrics;
use tracing::trace;

use crate::error::{ScanError, ScanResult};

/// Returns `true` for the word separators `[ \t\n\x0B\x0C\r]`.
///
/// Other Unicode spaces (NO-BREAK SPACE, IDEOGRAPHIC SPACE, ...) are word
/// characters.
fn is_separator(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\u{0B}' | '\u{0C}' | '\r')
}

/// Returns `true` for characters that survive trimming at a line edge.
///
/// Every character up to and including U+0020 is trimmed, which covers the
/// separators and the remaining C0 controls.
fn is_visible(c: char) -> bool {
    c > ' '
}

/// Incremental line/word/character counter fed one `char` at a time.
///
/// Words are counted as if each line were trimmed of characters up to U+0020
/// and then split on runs of separators. A run made only of control
/// characters therefore counts as a word only when visible text precedes and
/// follows it on the same line.
#[derive(Debug, Default)]
struct LineCounter {
    lines: u64,
    words: u64,
    chars: u64,
    /// At least one character has been seen since the last terminator.
    line_open: bool,
    /// A visible character has been seen on the current line.
    seen_visible: bool,
    /// The previous character was part of a non-separator run.
    in_run: bool,
    /// The current run contains a visible character.
    run_visible: bool,
    /// Control-only runs between visible text, counted once more visible
    /// text appears on the line.
    held_runs: u64,
    /// The previous character was `\r`, so a following `\n` is absorbed.
    after_cr: bool,
}

impl LineCounter {
    fn push(&mut self, c: char) {
        match c {
            '\n' if self.after_cr => self.after_cr = false,
            '\n' | '\r' => {
                self.end_line();
                self.lines += 1;
                self.after_cr = c == '\r';
            }
            _ => {
                self.after_cr = false;
                self.line_open = true;
                self.chars += c.len_utf16() as u64;
                if is_separator(c) {
                    self.end_run();
                    return;
                }
                if !self.in_run {
                    self.in_run = true;
                    self.run_visible = false;
                }
                if is_visible(c) && !self.run_visible {
                    self.run_visible = true;
                    self.seen_visible = true;
                    self.words += self.held_runs;
                    self.held_runs = 0;
                }
            }
        }
    }

    fn end_run(&mut self) {
        if !self.in_run {
            return;
        }
        self.in_run = false;
        if self.run_visible {
            self.words += 1;
        } else if self.seen_visible {
            self.held_runs += 1;
        }
    }

    /// Close the current line. Held runs are trailing and get trimmed.
    fn end_line(&mut self) {
        self.end_run();
        self.held_runs = 0;
        self.seen_visible = false;
        self.line_open = false;
    }

    fn push_str(&mut self, s: &str) {
        for c in s.chars() {
            self.push(c);
        }
    }

    fn finish(mut self) -> Metrics {
        let open = self.line_open;
        self.end_line();
        Metrics::new(self.lines + u64::from(open), self.words, self.chars)
    }
}

/// A UTF-8 sequence that straddles a read-buffer boundary.
#[derive(Debug, Default)]
struct Pending {
    bytes: [u8; 4],
    len: usize,
    /// Width of the sequence, derived from its lead byte.
    width: usize,
    /// Absolute stream offset of the lead byte.
    offset: u64,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Expected width of a UTF-8 sequence from its lead byte.
fn sequence_width(lead: u8) -> usize {
    match lead {
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 1,
    }
}

/// Single-pass text scanner with bounded memory.
///
/// The scanner holds no state between calls; one value can scan any number
/// of streams.
#[derive(Clone, Copy, Debug)]
pub struct TextScanner {
    buffer_size: usize,
}

impl TextScanner {
    /// Default read buffer size (8 KiB).
    pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

    /// Create a scanner with the default buffer size.
    pub fn new() -> Self {
        Self {
            buffer_size: Self::DEFAULT_BUFFER_SIZE,
        }
    }

    /// Create a scanner reading through a buffer of `buffer_size` bytes.
    ///
    /// A size of zero is raised to one.
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    /// The configured read buffer size.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Scan `reader` to end-of-stream and return its metrics.
    ///
    /// Fails with [`ScanError::Decode`] on the first invalid or truncated
    /// UTF-8 sequence, and with [`ScanError::Io`] if the reader fails.
    pub fn scan<R: Read>(&self, reader: R) -> ScanResult<Metrics> {
        let mut reader = BufReader::with_capacity(self.buffer_size, reader);
        let mut counter = LineCounter::default();
        let mut pending = Pending::default();
        // Absolute offset of the start of the current chunk.
        let mut consumed: u64 = 0;

        loop {
            let chunk = match reader.fill_buf() {
                Ok(chunk) => chunk,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if chunk.is_empty() {
                break;
            }
            let len = chunk.len();
            let mut start = 0;

            if !pending.is_empty() {
                let wanted = pending.width - pending.len;
                let take = wanted.min(len);
                pending.bytes[pending.len..pending.len + take].copy_from_slice(&chunk[..take]);
                pending.len += take;
                start = take;

                if pending.len < pending.width {
                    reader.consume(len);
                    consumed += len as u64;
                    continue;
                }

                let decoded = str::from_utf8(&pending.bytes[..pending.width]).map_err(|_| {
                    ScanError::Decode {
                        offset: pending.offset,
                    }
                })?;
                counter.push_str(decoded);
                pending = Pending::default();
            }

            let rest = &chunk[start..];
            match str::from_utf8(rest) {
                Ok(text) => counter.push_str(text),
                Err(e) => {
                    let valid = e.valid_up_to();
                    let bad_offset = consumed + (start + valid) as u64;
                    let text = str::from_utf8(&rest[..valid])
                        .map_err(|_| ScanError::Decode { offset: bad_offset })?;
                    counter.push_str(text);

                    if e.error_len().is_some() {
                        return Err(ScanError::Decode { offset: bad_offset });
                    }

                    // Incomplete sequence at the end of the chunk.
                    let tail = &rest[valid..];
                    pending.bytes[..tail.len()].copy_from_slice(tail);
                    pending.len = tail.len();
                    pending.width = sequence_width(tail[0]);
                    pending.offset = bad_offset;
                }
            }

            reader.consume(len);
            consumed += len as u64;
        }

        if !pending.is_empty() {
            return Err(ScanError::Decode {
                offset: pending.offset,
            });
        }

        let metrics = counter.finish();
        trace!(bytes = consumed, %metrics, "scan complete");
        Ok(metrics)
    }

    /// Scan an in-memory byte slice.
    pub fn scan_bytes(&self, bytes: &[u8]) -> ScanResult<Metrics> {
        self.scan(bytes)
    }
}

impl Default for TextScanner {
    fn default() -> Self {
        Self::new()
    }
}
