//! Binding reader: terminal bytes → editing events.
//!
//! Pulls bytes from a [`TerminalProvider`] and walks the active [`KeyMap`]:
//!
//! * **Idle** — queue empty; block (up to the caller's idle deadline).
//! * **Accumulating** — a valid prefix matched; wait at most the escape
//!   timeout between bytes. A timeout or a dead-end resolves through the
//!   deepest `another_key` fallback on the path, re-queuing the unmatched
//!   tail.
//!
//! Macro targets push their bytes onto a LIFO consumed before further
//! terminal reads, which is what makes macro playback and search replay
//! feel immediate. Invalid UTF-8 becomes U+FFFD here and never interrupts
//! editing. Lookahead is bounded (default 8 bytes) by the deepest key-map
//! path in practice.

pub mod paste;

pub use paste::{FALLBACK_RESOLUTIONS, PASTE_BYTES, PASTE_END, PASTE_SESSIONS, PASTE_START};

use core_keymap::{KeyMap, Lookup, Operation, Target};
use core_terminal::{ReadOutcome, TerminalError, TerminalProvider};
use paste::log_paste_flush;
use smallvec::SmallVec;
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{trace, warn};

pub const DEFAULT_ESCAPE_TIMEOUT: Duration = Duration::from_millis(100);
pub const DEFAULT_LOOKAHEAD_MAX: usize = 8;

/// Reader knobs, fixed per read.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub escape_timeout: Duration,
    /// Burst threshold; `None` disables paste detection by timing.
    pub paste_timeout: Option<Duration>,
    pub bracketed_paste: bool,
    pub lookahead_max: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            escape_timeout: DEFAULT_ESCAPE_TIMEOUT,
            paste_timeout: None,
            bracketed_paste: true,
            lookahead_max: DEFAULT_LOOKAHEAD_MAX,
        }
    }
}

/// One resolved input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A bound operation with the raw sequence that produced it.
    Op(Operation, Vec<u8>),
    /// A named custom widget with the raw sequence that produced it.
    Widget(String, Vec<u8>),
    /// Self-insert of one scalar (invalid bytes arrive as U+FFFD).
    Insert(char),
    /// Atomic paste (bracketed wrapper or burst detection).
    Paste(String),
    /// Bytes bound to nothing and covered by no fallback.
    Unbound(Vec<u8>),
    /// The idle deadline elapsed; caller should check its flags.
    Idle,
    Eof,
    Interrupted,
}

#[derive(Debug)]
pub struct BindingReader {
    /// Pending bytes: re-queued tails and macro playback at the front,
    /// freshly read terminal bytes at the back.
    queue: VecDeque<u8>,
    config: ReaderConfig,
}

impl BindingReader {
    pub fn new(config: ReaderConfig) -> Self {
        Self {
            queue: VecDeque::new(),
            config,
        }
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Inject macro bytes, consumed before any further terminal read.
    pub fn push_macro(&mut self, bytes: &[u8]) {
        for &b in bytes.iter().rev() {
            self.queue.push_front(b);
        }
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    fn requeue(&mut self, bytes: &[u8]) {
        for &b in bytes.iter().rev() {
            self.queue.push_front(b);
        }
    }

    /// One byte from the queue or the terminal. `Ok(None)` means timeout.
    fn next_byte(
        &mut self,
        provider: &mut dyn TerminalProvider,
        timeout: Option<Duration>,
    ) -> Result<Option<u8>, ByteRead> {
        if let Some(b) = self.queue.pop_front() {
            return Ok(Some(b));
        }
        let mut buf = [0u8; 64];
        match provider.read(&mut buf, timeout).map_err(ByteRead::Error)? {
            ReadOutcome::Bytes(n) => {
                self.queue.extend(&buf[1..n]);
                Ok(Some(buf[0]))
            }
            ReadOutcome::TimedOut => Ok(None),
            ReadOutcome::Eof => Err(ByteRead::Eof),
            ReadOutcome::Interrupted => Err(ByteRead::Interrupted),
        }
    }

    /// Resolve the next event against `map`.
    ///
    /// `idle_timeout` bounds the initial wait only; once a prefix is being
    /// accumulated the escape timeout governs.
    pub fn next_event(
        &mut self,
        provider: &mut dyn TerminalProvider,
        map: &KeyMap,
        idle_timeout: Option<Duration>,
    ) -> Result<InputEvent, TerminalError> {
        loop {
            let mut seq: SmallVec<[u8; 8]> = SmallVec::new();
            let first = match self.next_byte(provider, idle_timeout) {
                Ok(Some(b)) => b,
                Ok(None) => return Ok(InputEvent::Idle),
                Err(ByteRead::Eof) => return Ok(InputEvent::Eof),
                Err(ByteRead::Interrupted) => return Ok(InputEvent::Interrupted),
                Err(ByteRead::Error(e)) => return Err(e),
            };
            seq.push(first);

            // Burst paste: if enabled and a run of plain bytes arrived
            // back-to-back, bypass key-map resolution until the stream
            // pauses.
            if self.config.paste_timeout.is_some()
                && first != 0x1b
                && first != 0xE0
                && self.queue.len() > 1
            {
                return Ok(self.drain_burst(provider, first));
            }

            loop {
                match map.lookup(&seq) {
                    Lookup::Final(target) => {
                        let target = target.clone();
                        match self.dispatch(provider, &seq, target)? {
                            Some(ev) => return Ok(ev),
                            None => break, // macro injected; start over
                        }
                    }
                    Lookup::Partial => {
                        if seq.len() >= self.config.lookahead_max {
                            match self.resolve_fallback(provider, map, &seq)? {
                                Some(ev) => return Ok(ev),
                                None => break,
                            }
                        }
                        match self.next_byte(provider, Some(self.config.escape_timeout)) {
                            Ok(Some(b)) => seq.push(b),
                            Ok(None) => {
                                // Escape timeout in Accumulating: treat as
                                // Missing.
                                match self.resolve_fallback(provider, map, &seq)? {
                                    Some(ev) => return Ok(ev),
                                    None => break,
                                }
                            }
                            Err(ByteRead::Eof) => {
                                match self.resolve_fallback(provider, map, &seq)? {
                                    Some(ev) => return Ok(ev),
                                    None => break,
                                }
                            }
                            Err(ByteRead::Interrupted) => return Ok(InputEvent::Interrupted),
                            Err(ByteRead::Error(e)) => return Err(e),
                        }
                    }
                    Lookup::Missing => match self.resolve_fallback(provider, map, &seq)? {
                        Some(ev) => return Ok(ev),
                        None => break,
                    },
                }
            }
        }
    }

    /// Apply the deepest `another_key` on the path; re-queue the tail.
    fn resolve_fallback(
        &mut self,
        provider: &mut dyn TerminalProvider,
        map: &KeyMap,
        seq: &[u8],
    ) -> Result<Option<InputEvent>, TerminalError> {
        FALLBACK_RESOLUTIONS.fetch_add(1, Ordering::Relaxed);
        match map.fallback(seq) {
            Some(fb) => {
                let target = fb.target.clone();
                let consumed = fb.consumed;
                self.requeue(&seq[consumed..]);
                trace!(
                    target: "input.reader",
                    consumed,
                    requeued = seq.len() - consumed,
                    "fallback resolution"
                );
                self.dispatch(provider, &seq[..consumed], target)
            }
            None => {
                // Nothing to fall back on: report the head byte unbound and
                // re-queue the rest so resolution can restart cleanly.
                self.requeue(&seq[1..]);
                warn!(target: "input.reader", byte = seq[0], "unbound byte");
                Ok(Some(InputEvent::Unbound(vec![seq[0]])))
            }
        }
    }

    /// Turn a resolved target into an event (`None` after macro injection).
    fn dispatch(
        &mut self,
        provider: &mut dyn TerminalProvider,
        seq: &[u8],
        target: Target,
    ) -> Result<Option<InputEvent>, TerminalError> {
        match target {
            Target::Macro(bytes) => {
                trace!(target: "input.reader", len = bytes.len(), "macro playback");
                self.push_macro(&bytes);
                Ok(None)
            }
            Target::Op(Operation::SelfInsert) => {
                let ch = self.assemble_scalar(provider, seq)?;
                Ok(Some(InputEvent::Insert(ch)))
            }
            Target::Op(Operation::BracketedPasteBegin) => {
                let content = self.drain_bracketed(provider)?;
                Ok(Some(InputEvent::Paste(content)))
            }
            Target::Op(op) => Ok(Some(InputEvent::Op(op, seq.to_vec()))),
            Target::Widget(name) => Ok(Some(InputEvent::Widget(name, seq.to_vec()))),
        }
    }

    /// Read one scalar bypassing key-map resolution (quoted-insert,
    /// vi replace-char). `None` when input ends or times out first.
    pub fn read_literal(
        &mut self,
        provider: &mut dyn TerminalProvider,
    ) -> Result<Option<char>, TerminalError> {
        match self.next_byte(provider, None) {
            Ok(Some(b)) => self.assemble_scalar(provider, &[b]).map(Some),
            Ok(None) | Err(ByteRead::Eof) | Err(ByteRead::Interrupted) => Ok(None),
            Err(ByteRead::Error(e)) => Err(e),
        }
    }

    /// Assemble one Unicode scalar starting from the bytes in `seq`.
    fn assemble_scalar(
        &mut self,
        provider: &mut dyn TerminalProvider,
        seq: &[u8],
    ) -> Result<char, TerminalError> {
        let lead = seq[0];
        let need = match lead {
            0x00..=0x7f => 1,
            0xc2..=0xdf => 2,
            0xe0..=0xef => 3,
            0xf0..=0xf4 => 4,
            _ => {
                // Stray continuation or invalid lead byte.
                self.requeue(&seq[1..]);
                return Ok(char::REPLACEMENT_CHARACTER);
            }
        };
        let mut bytes: SmallVec<[u8; 4]> = SmallVec::new();
        bytes.extend_from_slice(&seq[..seq.len().min(need)]);
        if seq.len() > need {
            self.requeue(&seq[need..]);
        }
        while bytes.len() < need {
            match self.next_byte(provider, Some(self.config.escape_timeout)) {
                Ok(Some(b)) if (0x80..0xc0).contains(&b) => bytes.push(b),
                Ok(Some(b)) => {
                    // Not a continuation byte: the scalar is broken.
                    self.queue.push_front(b);
                    return Ok(char::REPLACEMENT_CHARACTER);
                }
                Ok(None) | Err(ByteRead::Eof) => return Ok(char::REPLACEMENT_CHARACTER),
                Err(ByteRead::Interrupted) => return Ok(char::REPLACEMENT_CHARACTER),
                Err(ByteRead::Error(e)) => return Err(e),
            }
        }
        match std::str::from_utf8(&bytes) {
            Ok(s) => Ok(s.chars().next().unwrap_or(char::REPLACEMENT_CHARACTER)),
            Err(_) => Ok(char::REPLACEMENT_CHARACTER),
        }
    }

    /// Drain a bracketed paste body up to the close marker.
    fn drain_bracketed(
        &mut self,
        provider: &mut dyn TerminalProvider,
    ) -> Result<String, TerminalError> {
        PASTE_SESSIONS.fetch_add(1, Ordering::Relaxed);
        let mut body: Vec<u8> = Vec::new();
        loop {
            match self.next_byte(provider, Some(self.config.escape_timeout)) {
                Ok(Some(b)) => {
                    body.push(b);
                    if body.ends_with(PASTE_END) {
                        body.truncate(body.len() - PASTE_END.len());
                        break;
                    }
                }
                // A paste that never closes is committed as-is rather than
                // discarded.
                Ok(None) | Err(ByteRead::Eof) | Err(ByteRead::Interrupted) => break,
                Err(ByteRead::Error(e)) => return Err(e),
            }
        }
        PASTE_BYTES.fetch_add(body.len() as u64, Ordering::Relaxed);
        let content = normalize_newlines(&String::from_utf8_lossy(&body));
        log_paste_flush(&content);
        Ok(content)
    }

    /// Drain a burst of back-to-back bytes as one atomic insertion.
    fn drain_burst(&mut self, provider: &mut dyn TerminalProvider, first: u8) -> InputEvent {
        PASTE_SESSIONS.fetch_add(1, Ordering::Relaxed);
        let timeout = self.config.paste_timeout.unwrap_or(Duration::ZERO);
        let mut body: Vec<u8> = vec![first];
        loop {
            if let Some(b) = self.queue.pop_front() {
                body.push(b);
                continue;
            }
            let mut buf = [0u8; 64];
            match provider.read(&mut buf, Some(timeout)) {
                Ok(ReadOutcome::Bytes(n)) => body.extend_from_slice(&buf[..n]),
                // Pause, end, interrupt, or error: the burst is over.
                _ => break,
            }
        }
        PASTE_BYTES.fetch_add(body.len() as u64, Ordering::Relaxed);
        let content = normalize_newlines(&String::from_utf8_lossy(&body));
        log_paste_flush(&content);
        InputEvent::Paste(content)
    }
}

enum ByteRead {
    Eof,
    Interrupted,
    Error(TerminalError),
}

/// CR and CRLF inside pasted content become plain newlines.
fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newline_normalization() {
        assert_eq!(normalize_newlines("a\r\nb\rc\nd"), "a\nb\nc\nd");
    }

    #[test]
    fn macro_bytes_are_lifo() {
        let mut r = BindingReader::new(ReaderConfig::default());
        r.push_macro(b"ab");
        r.push_macro(b"cd");
        let drained: Vec<u8> = std::iter::from_fn(|| r.queue.pop_front()).collect();
        assert_eq!(drained, b"cdab");
    }
}
