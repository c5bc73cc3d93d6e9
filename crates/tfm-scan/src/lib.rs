//! Streaming text scanner.
//!
//! [`TextScanner`] consumes any [`std::io::Read`] once, front to back, and
//! produces [`tfm_types::Metrics`]. Memory use is bounded by the read buffer:
//! lines are never materialized, and UTF-8 sequences split across buffer
//! boundaries are carried over in a four-byte scratch area.
//!
//! # Definitions
//!
//! - A **line terminator** is `\n`, `\r`, or the pair `\r\n` (counted once).
//! - A **line** is the text between terminators. A final unterminated line
//!   counts only if it contains at least one character.
//! - A **character** is one UTF-16 code unit, so characters outside the
//!   Basic Multilingual Plane count twice. Terminators are not counted.
//! - A **word** is a token of the line after trimming every character up to
//!   U+0020 from both ends and splitting on runs of `[ \t\n\x0B\x0C\r]`.
//!   NO-BREAK SPACE and other non-ASCII spaces are word characters.

pub mod error;
pub mod scanner;

pub use error::{ScanError, ScanResult};
pub use scanner::TextScanner;
