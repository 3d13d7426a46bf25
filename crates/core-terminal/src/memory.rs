//! In-memory provider for driving the engine byte-by-byte in tests.
//!
//! Input is a script of bytes with optional `Gap` markers standing in for
//! the user pausing (a read that hits a gap reports a timeout). Output is
//! captured verbatim. Size, resize flags, and raised signals are all
//! programmable so the full read loop — including escape timeouts, resize
//! repaints, and suspend handling — is testable without a pty.

use crate::{
    caps::Capabilities, AttrRepr, Attributes, ProviderKind, ReadOutcome, Signal, TerminalError,
    TerminalProvider,
};
use std::collections::VecDeque;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptItem {
    Byte(u8),
    /// A pause in typing: the pending read deadline fires.
    Gap,
}

pub struct MemoryProvider {
    script: VecDeque<ScriptItem>,
    closed: bool,
    output: Vec<u8>,
    size: (u16, u16),
    caps: Capabilities,
    resized: bool,
    interrupted: bool,
    continued: bool,
    raised: Vec<Signal>,
    raw_depth: u32,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            closed: false,
            output: Vec::new(),
            size: (80, 24),
            caps: Capabilities::for_term(Some("xterm-256color")),
            resized: false,
            interrupted: false,
            continued: false,
            raised: Vec::new(),
            raw_depth: 0,
        }
    }

    pub fn with_caps(mut self, caps: Capabilities) -> Self {
        self.caps = caps;
        self
    }

    pub fn with_size(mut self, cols: u16, rows: u16) -> Self {
        self.size = (cols, rows);
        self
    }

    /// Queue input bytes, back-to-back.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.script.extend(bytes.iter().map(|&b| ScriptItem::Byte(b)));
    }

    pub fn feed_str(&mut self, s: &str) {
        self.feed(s.as_bytes());
    }

    /// Queue a typing pause: the next deadline read times out here.
    pub fn feed_gap(&mut self) {
        self.script.push_back(ScriptItem::Gap);
    }

    /// No more input after the script drains.
    pub fn close_input(&mut self) {
        self.closed = true;
    }

    /// Change the reported size and set the resize flag.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.size = (cols, rows);
        self.resized = true;
    }

    pub fn set_interrupt(&mut self) {
        self.interrupted = true;
    }

    pub fn set_continue(&mut self) {
        self.continued = true;
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    pub fn raised_signals(&self) -> &[Signal] {
        &self.raised
    }

    pub fn in_raw_mode(&self) -> bool {
        self.raw_depth > 0
    }
}

impl TerminalProvider for MemoryProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Memory
    }

    fn is_interactive(&self) -> bool {
        true
    }

    fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    fn attributes(&self) -> Result<Attributes, TerminalError> {
        Ok(Attributes(AttrRepr::None))
    }

    fn set_attributes(&mut self, _attrs: &Attributes) -> Result<(), TerminalError> {
        Ok(())
    }

    fn enter_raw(&mut self) -> Result<(), TerminalError> {
        self.raw_depth = 1;
        Ok(())
    }

    fn restore(&mut self) -> Result<(), TerminalError> {
        self.raw_depth = 0;
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        self.size
    }

    fn read(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<ReadOutcome, TerminalError> {
        if self.interrupted {
            return Ok(ReadOutcome::Interrupted);
        }
        match self.script.front() {
            Some(ScriptItem::Gap) => {
                self.script.pop_front();
                Ok(ReadOutcome::TimedOut)
            }
            Some(ScriptItem::Byte(_)) => {
                let mut n = 0;
                while n < buf.len() {
                    match self.script.front() {
                        Some(ScriptItem::Byte(b)) => {
                            buf[n] = *b;
                            n += 1;
                            self.script.pop_front();
                        }
                        _ => break,
                    }
                }
                Ok(ReadOutcome::Bytes(n))
            }
            None => {
                if self.closed {
                    Ok(ReadOutcome::Eof)
                } else if timeout.is_some() {
                    Ok(ReadOutcome::TimedOut)
                } else {
                    // A blocking read past the script would hang a test;
                    // treat script exhaustion as end of input.
                    Ok(ReadOutcome::Eof)
                }
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TerminalError> {
        self.output.extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TerminalError> {
        Ok(())
    }

    fn raise(&mut self, signal: Signal) -> Result<(), TerminalError> {
        self.raised.push(signal);
        if signal == Signal::Stop {
            // A stopped process resumes with SIGCONT; model that here so
            // suspend round-trips in tests.
            self.continued = true;
        }
        Ok(())
    }

    fn take_resize(&mut self) -> bool {
        std::mem::take(&mut self.resized)
    }

    fn take_interrupt(&mut self) -> bool {
        std::mem::take(&mut self.interrupted)
    }

    fn take_continue(&mut self) -> bool {
        std::mem::take(&mut self.continued)
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_bytes_round_trip() {
        let mut p = MemoryProvider::new();
        p.feed_str("ab");
        let mut buf = [0u8; 8];
        assert_eq!(p.read(&mut buf, None).unwrap(), ReadOutcome::Bytes(2));
        assert_eq!(&buf[..2], b"ab");
        assert_eq!(p.read(&mut buf, None).unwrap(), ReadOutcome::Eof);
    }

    #[test]
    fn gap_reports_timeout_once() {
        let mut p = MemoryProvider::new();
        p.feed_str("\x1b");
        p.feed_gap();
        p.feed_str("x");
        let mut buf = [0u8; 8];
        assert_eq!(p.read(&mut buf, None).unwrap(), ReadOutcome::Bytes(1));
        assert_eq!(
            p.read(&mut buf, Some(Duration::from_millis(100))).unwrap(),
            ReadOutcome::TimedOut
        );
        assert_eq!(p.read(&mut buf, None).unwrap(), ReadOutcome::Bytes(1));
        assert_eq!(buf[0], b'x');
    }

    #[test]
    fn resize_flag_is_one_shot() {
        let mut p = MemoryProvider::new();
        p.resize(40, 12);
        assert_eq!(p.size(), (40, 12));
        assert!(p.take_resize());
        assert!(!p.take_resize());
    }

    #[test]
    fn output_is_captured() {
        let mut p = MemoryProvider::new();
        p.write(b"> ").unwrap();
        assert_eq!(p.output_str(), "> ");
    }
}
