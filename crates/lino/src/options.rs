//! Session options.
//!
//! The enumerated set a read starts with. INPUTRC `set` directives use
//! exactly these names — one name per behavior, no aliases.

use core_keymap::EditingMode;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Initial key map (`emacs` or `vi-insert`).
    pub editing_mode: EditingMode,
    /// Echo input codepoints. Masked input forces this off.
    pub echo: bool,
    /// Ring the bell on failed operations.
    pub bell: bool,
    /// Suppress consecutive duplicate history adds.
    pub history_ignore_dups: bool,
    /// Suppress history adds for lines starting with a space.
    pub history_ignore_space: bool,
    /// Emit `#<epoch>` lines when saving history.
    pub history_timestamped: bool,
    /// Candidate count above which listing asks for confirmation.
    pub auto_print_threshold: usize,
    /// Case-insensitive completion prefix comparison.
    pub case_insensitive_completion: bool,
    /// Render group headers in completion listings.
    pub group_completions: bool,
    /// Allow completing when the cursor is inside a word.
    pub complete_in_word: bool,
    /// Idle gap resolving a partial key sequence, in milliseconds.
    pub escape_timeout_ms: u64,
    /// Burst threshold for paste detection; 0 disables it.
    pub paste_timeout_ms: u64,
    /// Honor the `ESC [ 200 ~ … ESC [ 201 ~` paste wrapper.
    pub bracketed_paste: bool,
    /// Clear the rendered frame on accept instead of leaving it on screen.
    pub erase_on_finish: bool,
    /// Commit an expansion-changed line without a second accept.
    pub expand_and_submit: bool,
    /// Continuation prompt for rows after the first.
    pub secondary_prompt: String,
    /// History size bound.
    pub history_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            editing_mode: EditingMode::Emacs,
            echo: true,
            bell: true,
            history_ignore_dups: false,
            history_ignore_space: false,
            history_timestamped: false,
            auto_print_threshold: 100,
            case_insensitive_completion: false,
            group_completions: true,
            complete_in_word: false,
            escape_timeout_ms: 100,
            paste_timeout_ms: 0,
            bracketed_paste: true,
            erase_on_finish: false,
            expand_and_submit: false,
            secondary_prompt: "> ".to_string(),
            history_size: core_history::DEFAULT_HISTORY_SIZE,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "on" | "1" => Some(true),
        "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl ReaderOptions {
    /// Apply one INPUTRC `set` directive; unknown names and bad values are
    /// logged and ignored.
    pub fn apply_variable(&mut self, name: &str, value: &str) {
        let mut bad_value = false;
        match name {
            "editing_mode" => match value {
                "emacs" => self.editing_mode = EditingMode::Emacs,
                "vi" => self.editing_mode = EditingMode::Vi,
                _ => bad_value = true,
            },
            "echo" => match parse_bool(value) {
                Some(v) => self.echo = v,
                None => bad_value = true,
            },
            "bell" => match parse_bool(value) {
                Some(v) => self.bell = v,
                None => bad_value = true,
            },
            "history_ignore_dups" => match parse_bool(value) {
                Some(v) => self.history_ignore_dups = v,
                None => bad_value = true,
            },
            "history_ignore_space" => match parse_bool(value) {
                Some(v) => self.history_ignore_space = v,
                None => bad_value = true,
            },
            "history_timestamped" => match parse_bool(value) {
                Some(v) => self.history_timestamped = v,
                None => bad_value = true,
            },
            "auto_print_threshold" => match value.parse() {
                Ok(v) => self.auto_print_threshold = v,
                Err(_) => bad_value = true,
            },
            "case_insensitive_completion" => match parse_bool(value) {
                Some(v) => self.case_insensitive_completion = v,
                None => bad_value = true,
            },
            "group_completions" => match parse_bool(value) {
                Some(v) => self.group_completions = v,
                None => bad_value = true,
            },
            "complete_in_word" => match parse_bool(value) {
                Some(v) => self.complete_in_word = v,
                None => bad_value = true,
            },
            "escape_timeout_ms" => match value.parse() {
                Ok(v) => self.escape_timeout_ms = v,
                Err(_) => bad_value = true,
            },
            "paste_timeout_ms" => match value.parse() {
                Ok(v) => self.paste_timeout_ms = v,
                Err(_) => bad_value = true,
            },
            "bracketed_paste" => match parse_bool(value) {
                Some(v) => self.bracketed_paste = v,
                None => bad_value = true,
            },
            "erase_on_finish" => match parse_bool(value) {
                Some(v) => self.erase_on_finish = v,
                None => bad_value = true,
            },
            "expand_and_submit" => match parse_bool(value) {
                Some(v) => self.expand_and_submit = v,
                None => bad_value = true,
            },
            "secondary_prompt" => self.secondary_prompt = value.to_string(),
            "history_size" => match value.parse() {
                Ok(v) => self.history_size = v,
                Err(_) => bad_value = true,
            },
            _ => {
                warn!(target: "reader.options", name, "unknown variable ignored");
            }
        }
        if bad_value {
            warn!(target: "reader.options", name, value, "bad variable value ignored");
        }
    }
}
