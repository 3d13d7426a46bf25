//! Built-in capability database keyed by `TERM`.
//!
//! A terminfo-equivalent table covering the terminal families the engine
//! meets in practice. Capability strings use the terminfo parameter
//! mini-language and are expanded through [`crate::params::expand`].
//! A missing capability is `None`; consumers degrade (the renderer falls
//! back to CR + clear-to-end rewrites when `cup` is absent).

use crate::params::expand;

/// Escape sequences and flags for one terminal type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub term: String,
    /// Cursor wraps at the right margin automatically (`am`).
    pub auto_right_margin: bool,
    /// Newline after a last-column write is swallowed (`xenl`).
    pub eat_newline_glitch: bool,
    /// 0 = monochrome, 8, 256.
    pub max_colors: u16,

    pub cursor_address: Option<&'static str>, // cup
    pub cursor_up: Option<&'static str>,      // cuu  (parameterized)
    pub cursor_down: Option<&'static str>,    // cud
    pub cursor_right: Option<&'static str>,   // cuf
    pub cursor_left: Option<&'static str>,    // cub
    pub carriage_return: &'static str,        // cr
    pub clr_eol: Option<&'static str>,        // el
    pub clr_eos: Option<&'static str>,        // ed
    pub clear_screen: Option<&'static str>,   // clear
    pub bell: &'static str,                   // bel
    pub set_foreground: Option<&'static str>, // setaf
    pub set_background: Option<&'static str>, // setab
    pub exit_attribute_mode: Option<&'static str>, // sgr0
    pub enter_bracketed_paste: Option<&'static str>,
    pub exit_bracketed_paste: Option<&'static str>,
}

impl Capabilities {
    /// Expand a parameterized capability with the given arguments.
    pub fn param(&self, cap: &'static str, args: &[i64]) -> String {
        expand(cap, args)
    }

    /// Absolute cursor address sequence for 0-based (row, col), if supported.
    pub fn cup(&self, row: u16, col: u16) -> Option<String> {
        self.cursor_address
            .map(|t| expand(t, &[i64::from(row), i64::from(col)]))
    }

    /// Relative move helpers; `None` when the direction is unsupported or n == 0.
    pub fn move_up(&self, n: u16) -> Option<String> {
        (n > 0).then(|| self.cursor_up.map(|t| expand(t, &[i64::from(n)])))?
    }

    pub fn move_down(&self, n: u16) -> Option<String> {
        (n > 0).then(|| self.cursor_down.map(|t| expand(t, &[i64::from(n)])))?
    }

    pub fn move_right(&self, n: u16) -> Option<String> {
        (n > 0).then(|| self.cursor_right.map(|t| expand(t, &[i64::from(n)])))?
    }

    pub fn move_left(&self, n: u16) -> Option<String> {
        (n > 0).then(|| self.cursor_left.map(|t| expand(t, &[i64::from(n)])))?
    }

    pub fn supports_color(&self) -> bool {
        self.max_colors > 0
    }

    /// The degraded capability set reported by dumb terminals.
    pub fn dumb() -> Self {
        Capabilities {
            term: "dumb".to_string(),
            auto_right_margin: false,
            eat_newline_glitch: false,
            max_colors: 0,
            cursor_address: None,
            cursor_up: None,
            cursor_down: None,
            cursor_right: None,
            cursor_left: None,
            carriage_return: "\r",
            clr_eol: None,
            clr_eos: None,
            clear_screen: None,
            bell: "\x07",
            set_foreground: None,
            set_background: None,
            exit_attribute_mode: None,
            enter_bracketed_paste: None,
            exit_bracketed_paste: None,
        }
    }

    fn ansi_base(term: &str, colors: u16) -> Self {
        Capabilities {
            term: term.to_string(),
            auto_right_margin: true,
            eat_newline_glitch: true,
            max_colors: colors,
            cursor_address: Some("\x1b[%i%p1%d;%p2%dH"),
            cursor_up: Some("\x1b[%p1%dA"),
            cursor_down: Some("\x1b[%p1%dB"),
            cursor_right: Some("\x1b[%p1%dC"),
            cursor_left: Some("\x1b[%p1%dD"),
            carriage_return: "\r",
            clr_eol: Some("\x1b[K"),
            clr_eos: Some("\x1b[J"),
            clear_screen: Some("\x1b[H\x1b[2J"),
            bell: "\x07",
            set_foreground: Some("\x1b[%?%p1%{8}%<%t3%p1%d%e38;5;%p1%d%;m"),
            set_background: Some("\x1b[%?%p1%{8}%<%t4%p1%d%e48;5;%p1%d%;m"),
            exit_attribute_mode: Some("\x1b[0m"),
            enter_bracketed_paste: Some("\x1b[?2004h"),
            exit_bracketed_paste: Some("\x1b[?2004l"),
        }
    }

    /// Look up the capability set for a `TERM` value (`None` → dumb).
    pub fn for_term(term: Option<&str>) -> Self {
        let Some(term) = term else {
            return Self::dumb();
        };
        let family = term.split(['-', '.']).next().unwrap_or(term);
        match family {
            "dumb" | "cons25" | "emacs" | "unknown" => Self::dumb(),
            "vt100" | "vt102" | "vt220" => {
                let mut c = Self::ansi_base(term, 0);
                // Real VT100s neither wrap predictably nor speak SGR color.
                c.eat_newline_glitch = true;
                c.set_foreground = None;
                c.set_background = None;
                c.enter_bracketed_paste = None;
                c.exit_bracketed_paste = None;
                c
            }
            "linux" => {
                let mut c = Self::ansi_base(term, 8);
                c.eat_newline_glitch = false;
                c
            }
            "screen" | "tmux" => Self::ansi_base(term, 256),
            "rxvt" | "konsole" | "alacritty" | "kitty" | "wezterm" | "foot" | "st" => {
                Self::ansi_base(term, 256)
            }
            "xterm" => {
                let colors = if term.contains("256") { 256 } else { 8 };
                Self::ansi_base(term, colors)
            }
            _ => Self::ansi_base(term, 8),
        }
    }
}
