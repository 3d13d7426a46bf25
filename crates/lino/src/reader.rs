//! The line reader: the top-level loop composing every other layer.
//!
//! `read_line` puts the terminal in raw mode, then cycles:
//! drain external prints → check signal flags → reconcile the display →
//! pull one event from the binding reader → dispatch. Mutating operations
//! record undo state, kills feed the ring, history navigation preserves the
//! in-progress line in the past-the-end slot, and ACCEPT_LINE runs event
//! expansion before committing. Attributes are restored on every exit path.

use crate::error::ReadError;
use crate::options::ReaderOptions;
use crate::printer::ExternalPrinter;
use crate::search::SearchState;
use crate::widgets::{WidgetCtx, WidgetOutcome, WidgetRegistry};
use core_buffer::{word, EditBuffer, KillDirection, KillRing, UndoEngine};
use core_complete::{
    candidate_rows, common_prefix, gather, parse_line, replacement_for, Candidate,
    CandidateProvider, ListingLayout, MenuState, WordUnderCursor,
};
use core_history::{expand_event, History};
use core_input::{BindingReader, InputEvent, ReaderConfig};
use core_keymap::{
    standard_registry, EditingMode, InputrcContext, KeymapRegistry, Operation, Target,
};
use core_render::{layout, Display, Frame, LayoutInput};
use core_style::{cell_width, tab_stop_after, AttrFlags, ColorMode, Style, StyledLine};
use core_terminal::{Signal, TerminalConfig, TerminalProvider};
use std::time::Duration;
use tracing::{debug, info, trace};

pub struct LineReader {
    provider: Box<dyn TerminalProvider>,
    registry: KeymapRegistry,
    current_map: String,
    options: ReaderOptions,
    widgets: WidgetRegistry,
    completers: Vec<Box<dyn CandidateProvider>>,
    history: History,
    kill_ring: KillRing,
    printer: ExternalPrinter,
    application: String,
}

impl LineReader {
    /// Open the best available terminal provider and build a reader.
    pub fn new(options: ReaderOptions) -> Result<Self, ReadError> {
        let provider = core_terminal::open(&TerminalConfig::default())?;
        let mut reader = Self::with_provider(provider, options);
        reader.load_user_inputrc();
        Ok(reader)
    }

    /// Build a reader over an explicit provider (tests, embedders).
    pub fn with_provider(provider: Box<dyn TerminalProvider>, options: ReaderOptions) -> Self {
        let mut history = History::with_max_size(options.history_size);
        history.set_ignore_dups(options.history_ignore_dups);
        let current_map = options.editing_mode.initial_map().to_string();
        Self {
            provider,
            registry: standard_registry(),
            current_map,
            options,
            widgets: WidgetRegistry::new(),
            completers: Vec::new(),
            history,
            kill_ring: KillRing::new(),
            printer: ExternalPrinter::new(),
            application: "lino".to_string(),
        }
    }

    pub fn set_application(&mut self, name: impl Into<String>) {
        self.application = name.into();
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ReaderOptions {
        &mut self.options
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn keymaps(&self) -> &KeymapRegistry {
        &self.registry
    }

    pub fn keymaps_mut(&mut self) -> &mut KeymapRegistry {
        &mut self.registry
    }

    /// Switch the active map (`emacs`, `vi-insert`, `vi-command`, custom).
    pub fn set_keymap(&mut self, name: &str) -> bool {
        if self.registry.contains(name) {
            self.current_map = name.to_string();
            true
        } else {
            false
        }
    }

    pub fn current_keymap(&self) -> &str {
        &self.current_map
    }

    pub fn add_completer(&mut self, completer: Box<dyn CandidateProvider>) {
        self.completers.push(completer);
    }

    /// Register a named widget callable from key bindings.
    pub fn register_widget<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&mut WidgetCtx<'_>) -> WidgetOutcome + Send + Sync + 'static,
    {
        self.widgets.register(name, f);
    }

    /// Bind a key sequence in the active map to a registered widget.
    pub fn bind_widget(&mut self, seq: &[u8], widget_name: &str) -> bool {
        if !self.widgets.contains(widget_name) {
            return false;
        }
        match self.registry.get_mut(&self.current_map) {
            Some(map) => {
                map.bind(seq, Target::Widget(widget_name.to_string()));
                true
            }
            None => false,
        }
    }

    /// Handle for printing above the prompt from other tasks.
    pub fn printer(&self) -> ExternalPrinter {
        self.printer.clone()
    }

    /// Downcast the provider (memory provider inspection in tests).
    pub fn provider_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.provider.as_any_mut().downcast_mut::<T>()
    }

    pub fn load_history(&mut self, path: &std::path::Path) -> Result<core_history::LoadOutcome, ReadError> {
        core_history::file::load(&mut self.history, path).map_err(Into::into)
    }

    pub fn save_history(&mut self, path: &std::path::Path) -> Result<(), ReadError> {
        core_history::file::save(&self.history, path, self.options.history_timestamped)
            .map_err(Into::into)
    }

    /// Apply INPUTRC text: `set` variables land in the options, bindings in
    /// the active map. Parse failures are skipped (logged by the parser).
    pub fn apply_inputrc(&mut self, src: &str) {
        let ctx = InputrcContext {
            editing_mode: self.options.editing_mode,
            application: self.application.clone(),
        };
        let outcome =
            core_keymap::apply_inputrc(src, &ctx, &mut self.registry, &self.current_map.clone());
        for (name, value) in &outcome.variables {
            self.options.apply_variable(name, value);
        }
        if self.options.editing_mode == EditingMode::Vi && self.current_map == "emacs" {
            self.current_map = "vi-insert".to_string();
        }
        if !outcome.errors.is_empty() {
            debug!(
                target: "reader.inputrc",
                skipped = outcome.errors.len(),
                "inputrc directives skipped"
            );
        }
    }

    fn load_user_inputrc(&mut self) {
        let path = std::env::var_os("INPUTRC")
            .map(std::path::PathBuf::from)
            .or_else(|| dirs::home_dir().map(|h| h.join(".inputrc")));
        if let Some(path) = path
            && let Ok(src) = std::fs::read_to_string(&path)
        {
            info!(target: "reader.inputrc", path = %path.display(), "loading inputrc");
            self.apply_inputrc(&src);
        }
    }

    /// Non-interactive event expansion (the typed-error surface of `!`).
    pub fn expand(&self, line: &str) -> Result<String, ReadError> {
        Ok(expand_event(line, &self.history)?.line)
    }

    // --- read entry points ----------------------------------------------

    pub fn read_line(&mut self, prompt: &str) -> Result<String, ReadError> {
        self.read_line_with(prompt, None, None)
    }

    /// Masked read: codepoints echo as `mask` (NUL hides input entirely).
    /// History and completion are disabled for the invocation.
    pub fn read_line_masked(&mut self, prompt: &str, mask: char) -> Result<String, ReadError> {
        self.read_line_with(prompt, Some(mask), None)
    }

    pub fn read_line_with(
        &mut self,
        prompt: &str,
        mask: Option<char>,
        initial: Option<&str>,
    ) -> Result<String, ReadError> {
        if !self.provider.is_interactive()
            || self.provider.capabilities().cursor_up.is_none()
        {
            return self.dumb_read_line(prompt);
        }

        self.provider.enter_raw()?;
        if self.options.bracketed_paste
            && let Some(seq) = self.provider.capabilities().enter_bracketed_paste
        {
            let _ = self.provider.write(seq.as_bytes());
        }

        let result = self.edit_loop(prompt, mask, initial);

        if let Some(seq) = self.provider.capabilities().exit_bracketed_paste {
            let _ = self.provider.write(seq.as_bytes());
            let _ = self.provider.flush();
        }
        let restore = self.provider.restore();
        match result {
            Ok(line) => {
                restore?;
                Ok(line)
            }
            Err(e) => {
                // The original failure wins over a restore failure.
                let _ = restore;
                Err(e)
            }
        }
    }

    /// Degraded path for dumb terminals and pipes: no raw mode, no repaint.
    fn dumb_read_line(&mut self, prompt: &str) -> Result<String, ReadError> {
        self.provider.write(prompt.as_bytes())?;
        self.provider.flush()?;
        let mut line = Vec::new();
        let mut buf = [0u8; 64];
        loop {
            match self.provider.read(&mut buf, None)? {
                core_terminal::ReadOutcome::Bytes(n) => {
                    for &b in &buf[..n] {
                        if b == b'\n' || b == b'\r' {
                            let text = String::from_utf8_lossy(&line).into_owned();
                            self.commit_history(&text, None);
                            return Ok(text);
                        }
                        line.push(b);
                    }
                }
                core_terminal::ReadOutcome::Eof => {
                    if line.is_empty() {
                        return Err(ReadError::Eof);
                    }
                    let text = String::from_utf8_lossy(&line).into_owned();
                    self.commit_history(&text, None);
                    return Ok(text);
                }
                core_terminal::ReadOutcome::Interrupted => return Err(ReadError::Interrupted),
                core_terminal::ReadOutcome::TimedOut => {}
            }
        }
    }

    fn commit_history(&mut self, text: &str, mask: Option<char>) {
        let suppress = mask.is_some()
            || text.is_empty()
            || (self.options.history_ignore_space && text.starts_with(' '));
        if suppress {
            self.history.reset_cursor();
        } else {
            self.history.add(text);
        }
    }

    fn edit_loop(
        &mut self,
        prompt: &str,
        mask: Option<char>,
        initial: Option<&str>,
    ) -> Result<String, ReadError> {
        let caps = self.provider.capabilities().clone();
        let color_mode = if std::env::var_os("NO_COLOR").is_some() || !caps.supports_color() {
            ColorMode::Plain
        } else {
            ColorMode::Ansi
        };
        let effective_mask = mask.or_else(|| (!self.options.echo).then_some('\0'));
        self.history.set_ignore_dups(self.options.history_ignore_dups);
        self.history.reset_cursor();

        let mut session = Session {
            registry: &self.registry,
            options: &self.options,
            widgets: &self.widgets,
            completers: &self.completers,
            printer: &self.printer,
            provider: self.provider.as_mut(),
            current_map: &mut self.current_map,
            history: &mut self.history,
            kill_ring: &mut self.kill_ring,
            display: Display::new(caps, color_mode),
            binding: BindingReader::new(ReaderConfig {
                escape_timeout: Duration::from_millis(self.options.escape_timeout_ms),
                paste_timeout: (self.options.paste_timeout_ms > 0)
                    .then(|| Duration::from_millis(self.options.paste_timeout_ms)),
                bracketed_paste: self.options.bracketed_paste,
                lookahead_max: core_input::DEFAULT_LOOKAHEAD_MAX,
            }),
            buffer: initial.map(EditBuffer::from_str).unwrap_or_default(),
            undo: UndoEngine::new(),
            mode: LoopMode::Edit,
            below: Vec::new(),
            tab_count: 0,
            stash: None,
            prompt: StyledLine::plain(prompt),
            secondary: StyledLine::plain(&self.options.secondary_prompt),
            mask: effective_mask,
            real_mask: mask.is_some(),
        };
        session.run()
    }
}

enum LoopMode {
    Edit,
    Search(SearchState),
    Menu(MenuSession),
    Confirm(Vec<Candidate>),
}

struct MenuSession {
    menu: MenuState,
    word: WordUnderCursor,
    /// Chars currently inserted for the highlighted candidate.
    inserted: usize,
}

enum Flow {
    Continue,
    Return(String),
}

struct Session<'a> {
    registry: &'a KeymapRegistry,
    options: &'a ReaderOptions,
    widgets: &'a WidgetRegistry,
    completers: &'a [Box<dyn CandidateProvider>],
    printer: &'a ExternalPrinter,
    provider: &'a mut dyn TerminalProvider,
    current_map: &'a mut String,
    history: &'a mut History,
    kill_ring: &'a mut KillRing,
    display: Display,
    binding: BindingReader,
    buffer: EditBuffer,
    undo: UndoEngine,
    mode: LoopMode,
    below: Vec<StyledLine>,
    tab_count: usize,
    stash: Option<String>,
    prompt: StyledLine,
    secondary: StyledLine,
    /// Echo substitution (`\0` hides); `None` echoes normally.
    mask: Option<char>,
    /// True when the caller asked for masking (disables history/completion).
    real_mask: bool,
}

impl Session<'_> {
    fn run(&mut self) -> Result<String, ReadError> {
        loop {
            for msg in self.printer.drain() {
                self.display.print_above(&msg, self.provider)?;
            }
            if self.provider.take_interrupt() {
                return Err(ReadError::Interrupted);
            }
            if self.provider.take_continue() {
                self.provider.enter_raw()?;
                self.display.invalidate();
            }
            if self.provider.take_resize() {
                trace!(target: "reader.loop", "resize flag consumed");
                self.display.invalidate();
            }

            self.render()?;

            let map = self
                .registry
                .get(self.current_map)
                .or_else(|| self.registry.get("emacs"))
                .ok_or_else(|| ReadError::ProviderUnavailable("no key map registered".into()))?;
            let ev = self.binding.next_event(self.provider, map, None)?;
            match self.handle_event(ev)? {
                Flow::Continue => {}
                Flow::Return(line) => return Ok(line),
            }
        }
    }

    // --- rendering ------------------------------------------------------

    fn render(&mut self) -> Result<(), ReadError> {
        let width = self.provider.size().0;
        let (content, cursor_cell) = self.build_content();
        let prompt = match &self.mode {
            LoopMode::Search(s) => StyledLine::plain(&s.prompt()),
            _ => self.prompt.clone(),
        };
        let frame: Frame = layout(&LayoutInput {
            prompt: &prompt,
            secondary_prompt: &self.secondary,
            content: &content,
            cursor_cell,
            below: &self.below,
            width,
        });
        self.display
            .reconcile(&frame, width, self.provider)
            .map_err(Into::into)
    }

    /// Buffer text as styled cells, with mask substitution and tab
    /// expansion, plus the cursor's cell index.
    fn build_content(&self) -> (StyledLine, usize) {
        let style = Style::default();
        match self.mask {
            Some('\0') => (StyledLine::new(), 0),
            Some(m) => {
                let mut line = StyledLine::new();
                for _ in 0..self.buffer.len() {
                    line.push(m, style);
                }
                (line, self.buffer.cursor())
            }
            None => {
                let mut line = StyledLine::new();
                let mut cursor_cell = None;
                let mut col = self.prompt.width();
                for (i, &ch) in self.buffer.chars().iter().enumerate() {
                    if i == self.buffer.cursor() {
                        cursor_cell = Some(line.len());
                    }
                    match ch {
                        '\t' => {
                            let stop = tab_stop_after(col);
                            while col < stop {
                                line.push(' ', style);
                                col += 1;
                            }
                        }
                        '\n' => {
                            line.push('\n', style);
                            col = self.secondary.width();
                        }
                        c => {
                            line.push(c, style);
                            col += cell_width(c);
                        }
                    }
                }
                let cursor = cursor_cell.unwrap_or(line.len());
                (line, cursor)
            }
        }
    }

    fn bell(&mut self) -> Result<(), ReadError> {
        if self.options.bell {
            self.display.bell(self.provider)?;
        }
        Ok(())
    }

    fn after_mutation(&mut self) {
        self.below.clear();
        self.tab_count = 0;
    }

    // --- event dispatch -------------------------------------------------

    fn handle_event(&mut self, ev: InputEvent) -> Result<Flow, ReadError> {
        match std::mem::replace(&mut self.mode, LoopMode::Edit) {
            LoopMode::Edit => self.handle_edit(ev),
            LoopMode::Search(s) => self.handle_search(s, ev),
            LoopMode::Menu(m) => self.handle_menu(m, ev),
            LoopMode::Confirm(c) => self.handle_confirm(c, ev),
        }
    }

    fn handle_edit(&mut self, ev: InputEvent) -> Result<Flow, ReadError> {
        match ev {
            InputEvent::Idle => Ok(Flow::Continue),
            InputEvent::Eof => {
                if self.buffer.is_empty() {
                    Err(ReadError::Eof)
                } else {
                    self.commit()
                }
            }
            InputEvent::Interrupted => Err(ReadError::Interrupted),
            InputEvent::Insert(c) => {
                self.insert_char(c);
                Ok(Flow::Continue)
            }
            InputEvent::Paste(text) => {
                self.undo.record_edit(&self.buffer);
                self.buffer.insert_str(&text);
                self.kill_ring.note_other_op();
                self.after_mutation();
                Ok(Flow::Continue)
            }
            InputEvent::Unbound(_) => {
                self.bell()?;
                Ok(Flow::Continue)
            }
            InputEvent::Widget(name, _) => self.run_widget(&name),
            InputEvent::Op(op, _) => self.handle_op(op),
        }
    }

    fn insert_char(&mut self, c: char) {
        self.undo.record_self_insert(&self.buffer);
        self.buffer.insert_char(c);
        self.kill_ring.note_other_op();
        self.after_mutation();
    }

    fn run_widget(&mut self, name: &str) -> Result<Flow, ReadError> {
        let Some(widget) = self.widgets.get(name) else {
            self.bell()?;
            return Ok(Flow::Continue);
        };
        self.undo.record_edit(&self.buffer);
        let outcome = widget(&mut WidgetCtx {
            buffer: &mut self.buffer,
            history: self.history,
        });
        self.after_mutation();
        match outcome {
            WidgetOutcome::Continue => Ok(Flow::Continue),
            WidgetOutcome::Beep => {
                self.bell()?;
                Ok(Flow::Continue)
            }
            WidgetOutcome::Accept => self.accept(),
        }
    }

    fn handle_op(&mut self, op: Operation) -> Result<Flow, ReadError> {
        use Operation::*;
        if !is_kill(op) && !matches!(op, Yank | YankPop) {
            self.kill_ring.note_other_op();
            self.buffer.clear_yank_state();
        }
        if !is_mutating(op) {
            self.undo.close_run();
        }
        match op {
            Noop | SelfInsert | BracketedPasteBegin => {}

            // motion
            BeginningOfLine => self.buffer.move_home(),
            EndOfLine => self.buffer.move_end(),
            ForwardChar => self.nav(|b| b.move_right())?,
            BackwardChar => self.nav(|b| b.move_left())?,
            ForwardWord => self.nav(|b| b.move_word_right())?,
            BackwardWord => self.nav(|b| b.move_word_left())?,
            ViFirstNonBlank => self.buffer.move_first_non_blank(),
            ViEndWord => self.nav(|b| b.move_word_end())?,

            // deletion
            BackwardDeleteChar => self.mutate(|b| b.delete_backward().is_some())?,
            DeleteChar => self.mutate(|b| b.delete_forward().is_some())?,
            DeleteCharOrEof => {
                if self.buffer.is_empty() {
                    return Err(ReadError::Eof);
                }
                self.mutate(|b| b.delete_forward().is_some())?;
            }

            // kills
            KillLine => self.kill(|b| b.kill_to_end(), KillDirection::Forward)?,
            BackwardKillLine => self.kill(|b| b.kill_to_start(), KillDirection::Backward)?,
            KillWholeLine => self.kill(|b| b.kill_whole_line(), KillDirection::Backward)?,
            KillWord => self.kill(|b| b.kill_word_forward(), KillDirection::Forward)?,
            BackwardKillWord => self.kill(|b| b.kill_word_backward(), KillDirection::Backward)?,

            // transforms
            TransposeChars => self.mutate(|b| b.transpose_chars())?,
            TransposeWords => self.mutate(|b| b.transpose_words())?,
            UpcaseWord => self.mutate(|b| b.upcase_word())?,
            DowncaseWord => self.mutate(|b| b.downcase_word())?,
            CapitalizeWord => self.mutate(|b| b.capitalize_word())?,

            // kill ring
            Yank => match self.kill_ring.current().map(str::to_string) {
                Some(text) => {
                    self.undo.record_edit(&self.buffer);
                    self.buffer.yank(&text);
                    self.after_mutation();
                }
                None => self.bell()?,
            },
            YankPop => {
                if self.buffer.yank_pending() && !self.kill_ring.is_empty() {
                    self.kill_ring.rotate();
                    let text = self
                        .kill_ring
                        .current()
                        .map(str::to_string)
                        .unwrap_or_default();
                    self.undo.record_edit(&self.buffer);
                    self.buffer.yank_pop(&text);
                    self.after_mutation();
                } else {
                    self.bell()?;
                }
            }

            Undo => {
                if self.undo.undo(&mut self.buffer) {
                    self.after_mutation();
                } else {
                    self.bell()?;
                }
            }

            // history
            PreviousHistory => self.history_recall(Recall::Prev)?,
            NextHistory => self.history_recall(Recall::Next)?,
            BeginningOfHistory => self.history_recall(Recall::First)?,
            EndOfHistory => self.history_recall(Recall::Last)?,
            ReverseSearchHistory => self.enter_search(true)?,
            ForwardSearchHistory => self.enter_search(false)?,

            // completion
            Complete => self.complete()?,
            MenuComplete => self.menu_complete()?,
            PossibleCompletions => self.list_completions()?,

            // control
            AcceptLine => return self.accept(),
            Interrupt => return Err(ReadError::Interrupted),
            Suspend => self.suspend()?,
            Abort => self.bell()?,
            ClearScreen => self.clear_screen()?,
            QuotedInsert => {
                if let Some(c) = self.binding.read_literal(self.provider)? {
                    self.insert_char(c);
                }
            }
            ToggleOvertype => self.buffer.toggle_overtype(),

            // keymap switching
            EmacsEditingMode => self.switch_map("emacs"),
            ViEditingMode | ViInsertMode => self.switch_map("vi-insert"),
            ViCommandMode => {
                // Vi leaves insert with the cursor one cell back.
                let _ = self.buffer.move_left();
                self.switch_map("vi-command");
            }

            // vi command-mode compounds
            ViInsertBol => {
                self.buffer.move_home();
                self.switch_map("vi-insert");
            }
            ViAppend => {
                let _ = self.buffer.move_right();
                self.switch_map("vi-insert");
            }
            ViAppendEol => {
                self.buffer.move_end();
                self.switch_map("vi-insert");
            }
            ViSubstChar => {
                self.mutate(|b| b.delete_forward().is_some())?;
                self.switch_map("vi-insert");
            }
            ViChangeLine => {
                self.kill(|b| b.kill_whole_line(), KillDirection::Backward)?;
                self.switch_map("vi-insert");
            }
            ViChangeWord => {
                self.kill(|b| b.kill_word_forward(), KillDirection::Forward)?;
                self.switch_map("vi-insert");
            }
            ViChangeWordBack => {
                self.kill(|b| b.kill_word_backward(), KillDirection::Backward)?;
                self.switch_map("vi-insert");
            }
            ViChangeToEol => {
                self.kill(|b| b.kill_to_end(), KillDirection::Forward)?;
                self.switch_map("vi-insert");
            }
            ViChangeCase => self.mutate(|b| b.toggle_case())?,
            ViReplaceChar => {
                if let Some(c) = self.binding.read_literal(self.provider)? {
                    if self.buffer.cursor() < self.buffer.len() {
                        self.undo.record_edit(&self.buffer);
                        self.buffer.delete_forward();
                        self.buffer.insert_char(c);
                        let _ = self.buffer.move_left();
                        self.after_mutation();
                    } else {
                        self.bell()?;
                    }
                }
            }
            ViYankLine => {
                self.kill_ring
                    .push(self.buffer.text(), KillDirection::Forward);
                self.kill_ring.note_other_op();
            }
            ViYankWord => {
                let end = word::next_word_end(self.buffer.chars(), self.buffer.cursor());
                let text: String = self.buffer.chars()[self.buffer.cursor()..end]
                    .iter()
                    .collect();
                if text.is_empty() {
                    self.bell()?;
                } else {
                    self.kill_ring.push(text, KillDirection::Forward);
                    self.kill_ring.note_other_op();
                }
            }
            ViYankToEol => {
                let text: String = self.buffer.chars()[self.buffer.cursor()..].iter().collect();
                if text.is_empty() {
                    self.bell()?;
                } else {
                    self.kill_ring.push(text, KillDirection::Forward);
                    self.kill_ring.note_other_op();
                }
            }
            ViPutAfter => match self.kill_ring.current().map(str::to_string) {
                Some(text) => {
                    self.undo.record_edit(&self.buffer);
                    let _ = self.buffer.move_right();
                    self.buffer.yank(&text);
                    self.after_mutation();
                }
                None => self.bell()?,
            },
            ViPutBefore => match self.kill_ring.current().map(str::to_string) {
                Some(text) => {
                    self.undo.record_edit(&self.buffer);
                    self.buffer.yank(&text);
                    self.after_mutation();
                }
                None => self.bell()?,
            },
        }
        Ok(Flow::Continue)
    }

    fn nav<F: FnOnce(&mut EditBuffer) -> bool>(&mut self, f: F) -> Result<(), ReadError> {
        if !f(&mut self.buffer) {
            self.bell()?;
        }
        Ok(())
    }

    fn mutate<F: FnOnce(&mut EditBuffer) -> bool>(&mut self, f: F) -> Result<(), ReadError> {
        self.undo.record_edit(&self.buffer);
        if f(&mut self.buffer) {
            self.after_mutation();
        } else {
            self.bell()?;
        }
        Ok(())
    }

    fn kill<F: FnOnce(&mut EditBuffer) -> Option<String>>(
        &mut self,
        f: F,
        direction: KillDirection,
    ) -> Result<(), ReadError> {
        self.undo.record_edit(&self.buffer);
        match f(&mut self.buffer) {
            Some(text) => {
                self.kill_ring.push(text, direction);
                self.after_mutation();
            }
            None => self.bell()?,
        }
        Ok(())
    }

    fn switch_map(&mut self, name: &str) {
        if self.registry.contains(name) {
            trace!(target: "reader.loop", map = name, "keymap switch");
            *self.current_map = name.to_string();
        }
    }

    // --- history --------------------------------------------------------

    fn history_recall(&mut self, recall: Recall) -> Result<(), ReadError> {
        if self.real_mask {
            return self.bell();
        }
        if self.history.at_end() {
            self.stash = Some(self.buffer.text());
        }
        let moved = match recall {
            Recall::Prev => self.history.move_prev(),
            Recall::Next => self.history.move_next(),
            Recall::First => self.history.move_first(),
            Recall::Last => {
                self.history.reset_cursor();
                true
            }
        };
        if !moved {
            return self.bell();
        }
        let text = match self.history.current() {
            Some(entry) => entry.text.clone(),
            None => self.stash.take().unwrap_or_default(),
        };
        self.undo.record_edit(&self.buffer);
        self.buffer.set_text(&text);
        self.after_mutation();
        Ok(())
    }

    fn enter_search(&mut self, backward: bool) -> Result<(), ReadError> {
        if self.real_mask {
            return self.bell();
        }
        self.mode = LoopMode::Search(SearchState::new(
            backward,
            self.buffer.text(),
            self.buffer.cursor(),
        ));
        Ok(())
    }

    fn handle_search(&mut self, mut s: SearchState, ev: InputEvent) -> Result<Flow, ReadError> {
        match ev {
            InputEvent::Insert(c) => {
                s.pattern.push(c);
                if s.extend(self.history) {
                    self.apply_search_match(&s);
                } else {
                    self.bell()?;
                }
                self.mode = LoopMode::Search(s);
                Ok(Flow::Continue)
            }
            InputEvent::Op(Operation::ReverseSearchHistory, _) => {
                if s.step(true, self.history) {
                    self.apply_search_match(&s);
                } else {
                    self.bell()?;
                }
                self.mode = LoopMode::Search(s);
                Ok(Flow::Continue)
            }
            InputEvent::Op(Operation::ForwardSearchHistory, _) => {
                if s.step(false, self.history) {
                    self.apply_search_match(&s);
                } else {
                    self.bell()?;
                }
                self.mode = LoopMode::Search(s);
                Ok(Flow::Continue)
            }
            InputEvent::Op(Operation::BackwardDeleteChar, _) => {
                s.pattern.pop();
                if s.rescan(self.history) {
                    self.apply_search_match(&s);
                }
                self.mode = LoopMode::Search(s);
                Ok(Flow::Continue)
            }
            InputEvent::Op(Operation::Abort, _) => {
                // Abort restores the pre-search line.
                self.undo.record_edit(&self.buffer);
                let (text, cursor) = s.saved;
                self.buffer.set_text(&text);
                self.buffer.set_cursor(cursor);
                self.after_mutation();
                Ok(Flow::Continue)
            }
            InputEvent::Op(Operation::AcceptLine, _) => {
                // Search exits, the matched buffer is retained and accepted.
                self.accept()
            }
            other => {
                // Any other key leaves search mode and applies normally.
                self.handle_edit(other)
            }
        }
    }

    fn apply_search_match(&mut self, s: &SearchState) {
        let Some(idx) = s.matched else { return };
        let Some(entry) = self.history.get(idx) else {
            return;
        };
        let text = entry.text.clone();
        let cursor = entry
            .text
            .find(&s.pattern)
            .map(|b| entry.text[..b].chars().count())
            .unwrap_or(0);
        self.history.set_cursor(idx);
        self.undo.record_edit(&self.buffer);
        self.buffer.set_text(&text);
        self.buffer.set_cursor(cursor);
        self.below.clear();
    }

    // --- completion -----------------------------------------------------

    fn gather_candidates(&self) -> (core_complete::ParsedLine, Vec<Candidate>) {
        let parsed = parse_line(&self.buffer.text(), self.buffer.cursor());
        let cands = gather(
            self.completers,
            &parsed,
            self.options.case_insensitive_completion,
        );
        (parsed, cands)
    }

    fn completion_blocked(&self) -> bool {
        if self.real_mask || self.mask.is_some() {
            return true;
        }
        if self.options.complete_in_word {
            return false;
        }
        let cursor = self.buffer.cursor();
        cursor < self.buffer.len() && word::is_word_char(self.buffer.chars()[cursor])
    }

    fn complete(&mut self) -> Result<(), ReadError> {
        if self.completion_blocked() {
            return self.bell();
        }
        // Consecutive TAB presses list; any other operation resets the run
        // through after_mutation.
        let prior_tabs = self.tab_count;
        let (parsed, cands) = self.gather_candidates();
        match cands.len() {
            0 => {
                self.tab_count = 0;
                self.bell()?;
            }
            1 => {
                self.insert_candidate(&parsed.word, &cands[0]);
                self.tab_count = 1;
            }
            _ => {
                let prefix = common_prefix(&cands, self.options.case_insensitive_completion);
                if prefix.chars().count() > parsed.word.value.chars().count() {
                    let partial = Candidate::new(prefix).partial();
                    self.insert_candidate(&parsed.word, &partial);
                    self.tab_count = 1;
                } else if prior_tabs >= 1 {
                    self.show_listing(cands)?;
                    self.tab_count = 1;
                } else {
                    self.tab_count = 1;
                    self.bell()?;
                }
            }
        }
        Ok(())
    }

    fn list_completions(&mut self) -> Result<(), ReadError> {
        if self.completion_blocked() {
            return self.bell();
        }
        let (_, cands) = self.gather_candidates();
        if cands.is_empty() {
            return self.bell();
        }
        self.show_listing(cands)
    }

    fn show_listing(&mut self, cands: Vec<Candidate>) -> Result<(), ReadError> {
        if cands.len() > self.options.auto_print_threshold {
            self.below = vec![StyledLine::plain(&format!(
                "Display all {} possibilities? (y or n)",
                cands.len()
            ))];
            self.mode = LoopMode::Confirm(cands);
            return Ok(());
        }
        self.below = candidate_rows(
            &cands,
            ListingLayout {
                width: self.provider.size().0 as usize,
                group_headers: self.options.group_completions,
            },
        );
        Ok(())
    }

    fn handle_confirm(&mut self, cands: Vec<Candidate>, ev: InputEvent) -> Result<Flow, ReadError> {
        match ev {
            InputEvent::Insert('y') | InputEvent::Insert('Y') => {
                self.below = candidate_rows(
                    &cands,
                    ListingLayout {
                        width: self.provider.size().0 as usize,
                        group_headers: self.options.group_completions,
                    },
                );
                Ok(Flow::Continue)
            }
            InputEvent::Insert('n') | InputEvent::Insert('N')
            | InputEvent::Op(Operation::Abort, _) => {
                self.below.clear();
                Ok(Flow::Continue)
            }
            InputEvent::Interrupted | InputEvent::Op(Operation::Interrupt, _) => {
                Err(ReadError::Interrupted)
            }
            InputEvent::Eof => Err(ReadError::Eof),
            _ => {
                self.bell()?;
                self.mode = LoopMode::Confirm(cands);
                Ok(Flow::Continue)
            }
        }
    }

    fn insert_candidate(&mut self, word: &WordUnderCursor, cand: &Candidate) {
        let (replacement, space) = replacement_for(word, cand);
        self.undo.record_edit(&self.buffer);
        self.replace_span(word.start, self.buffer.cursor(), &replacement, space);
        self.after_mutation();
    }

    /// Replace chars `[start, end)` with `text` (+ optional trailing space).
    fn replace_span(&mut self, start: usize, end: usize, text: &str, space: bool) {
        let chars = self.buffer.chars();
        let mut rebuilt: Vec<char> = chars[..start.min(chars.len())].to_vec();
        rebuilt.extend(text.chars());
        if space {
            rebuilt.push(' ');
        }
        let cursor = rebuilt.len();
        rebuilt.extend_from_slice(&chars[end.min(chars.len())..]);
        self.buffer.restore(rebuilt, cursor);
    }

    fn menu_complete(&mut self) -> Result<(), ReadError> {
        if self.completion_blocked() {
            return self.bell();
        }
        let (parsed, cands) = self.gather_candidates();
        let Some(menu) = MenuState::new(cands) else {
            return self.bell();
        };
        let value = menu.current().value.clone();
        self.undo.record_edit(&self.buffer);
        self.replace_span(parsed.word.start, self.buffer.cursor(), &value, false);
        let mut ms = MenuSession {
            menu,
            word: parsed.word,
            inserted: value.chars().count(),
        };
        self.update_menu_rows(&mut ms);
        self.tab_count = 0;
        self.mode = LoopMode::Menu(ms);
        Ok(())
    }

    fn update_menu_rows(&mut self, ms: &mut MenuSession) {
        let width = self.provider.size().0 as usize;
        let mut rows = Vec::new();
        let mut row = StyledLine::new();
        let mut col = 0usize;
        let normal = Style::default();
        let selected = Style::default().attr(AttrFlags::INVERSE);
        for (i, cand) in ms.menu.candidates().iter().enumerate() {
            let text = cand.display_text();
            let w = core_style::str_width(text) + 2;
            if col + w > width && col > 0 {
                rows.push(std::mem::take(&mut row));
                col = 0;
            }
            let style = if i == ms.menu.index() { selected } else { normal };
            row.push_str(text, style);
            row.push_str("  ", normal);
            col += w;
        }
        if !row.is_empty() {
            rows.push(row);
        }
        self.below = rows;
    }

    fn handle_menu(&mut self, mut ms: MenuSession, ev: InputEvent) -> Result<Flow, ReadError> {
        use Operation::*;
        match ev {
            InputEvent::Op(Complete | MenuComplete | ForwardChar | NextHistory, _) => {
                ms.menu.next();
                self.cycle_menu(&mut ms);
                self.mode = LoopMode::Menu(ms);
                Ok(Flow::Continue)
            }
            InputEvent::Op(BackwardChar | PreviousHistory, _) => {
                ms.menu.prev();
                self.cycle_menu(&mut ms);
                self.mode = LoopMode::Menu(ms);
                Ok(Flow::Continue)
            }
            InputEvent::Op(AcceptLine, _) | InputEvent::Op(Abort, _) => {
                // The menu closes; the highlighted value stays inserted.
                self.below.clear();
                Ok(Flow::Continue)
            }
            other => {
                self.below.clear();
                self.handle_edit(other)
            }
        }
    }

    fn cycle_menu(&mut self, ms: &mut MenuSession) {
        let value = ms.menu.current().value.clone();
        let start = ms.word.start;
        let end = start + ms.inserted;
        self.replace_span(start, end, &value, false);
        ms.inserted = value.chars().count();
        self.update_menu_rows(ms);
    }

    // --- accept / control ----------------------------------------------

    fn accept(&mut self) -> Result<Flow, ReadError> {
        self.undo.close_run();
        if !self.real_mask {
            match expand_event(&self.buffer.text(), self.history) {
                Ok(exp) if exp.changed => {
                    self.undo.record_edit(&self.buffer);
                    self.buffer.set_text(&exp.line);
                    self.after_mutation();
                    debug!(target: "reader.loop", "event expansion applied");
                    if !self.options.expand_and_submit {
                        // Re-echo and require a second accept to commit.
                        return Ok(Flow::Continue);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!(target: "reader.loop", error = %e, "event expansion failed");
                    self.bell()?;
                    return Ok(Flow::Continue);
                }
            }
        }
        self.commit()
    }

    fn commit(&mut self) -> Result<Flow, ReadError> {
        let text = self.buffer.text();
        let suppress = self.real_mask
            || text.is_empty()
            || (self.options.history_ignore_space && text.starts_with(' '));
        if suppress {
            self.history.reset_cursor();
        } else {
            self.history.add(&text);
        }
        self.below.clear();
        if self.options.erase_on_finish {
            self.display.clear_frame(self.provider)?;
        } else {
            self.display.finish(self.provider)?;
        }
        info!(target: "reader.loop", len = text.chars().count(), "line accepted");
        Ok(Flow::Return(text))
    }

    fn suspend(&mut self) -> Result<(), ReadError> {
        self.provider.restore()?;
        self.provider.raise(Signal::Stop)?;
        // Execution resumes here on SIGCONT.
        self.provider.enter_raw()?;
        self.display.invalidate();
        Ok(())
    }

    fn clear_screen(&mut self) -> Result<(), ReadError> {
        if let Some(seq) = self.display.caps().clear_screen.map(str::to_string) {
            self.provider.write(seq.as_bytes())?;
            self.provider.flush()?;
            self.display.reset_origin();
        } else {
            self.bell()?;
        }
        Ok(())
    }
}

enum Recall {
    Prev,
    Next,
    First,
    Last,
}

fn is_kill(op: Operation) -> bool {
    use Operation::*;
    matches!(
        op,
        KillLine
            | BackwardKillLine
            | KillWholeLine
            | KillWord
            | BackwardKillWord
            | ViChangeLine
            | ViChangeWord
            | ViChangeWordBack
            | ViChangeToEol
            | ViYankLine
            | ViYankWord
            | ViYankToEol
    )
}

fn is_mutating(op: Operation) -> bool {
    use Operation::*;
    matches!(
        op,
        SelfInsert
            | QuotedInsert
            | BackwardDeleteChar
            | DeleteChar
            | DeleteCharOrEof
            | KillLine
            | BackwardKillLine
            | KillWholeLine
            | KillWord
            | BackwardKillWord
            | TransposeChars
            | TransposeWords
            | UpcaseWord
            | DowncaseWord
            | CapitalizeWord
            | Yank
            | YankPop
            | ViSubstChar
            | ViChangeLine
            | ViChangeWord
            | ViChangeWordBack
            | ViChangeToEol
            | ViChangeCase
            | ViReplaceChar
            | ViPutAfter
            | ViPutBefore
    )
}
