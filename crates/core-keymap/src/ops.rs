//! The closed set of editing operations.
//!
//! Operations are values: key maps store them, INPUTRC refers to them by
//! their readline-style names, and the line reader dispatches on them. The
//! name table is the single source of truth for name↔tag resolution.

/// A named editing operation resolvable from a key binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    // Insertion
    SelfInsert,
    QuotedInsert,
    ToggleOvertype,

    // Motion
    BeginningOfLine,
    EndOfLine,
    ForwardChar,
    BackwardChar,
    ForwardWord,
    BackwardWord,

    // Deletion and kills
    BackwardDeleteChar,
    DeleteChar,
    DeleteCharOrEof,
    KillLine,
    BackwardKillLine,
    KillWholeLine,
    KillWord,
    BackwardKillWord,

    // Transforms
    TransposeChars,
    TransposeWords,
    UpcaseWord,
    DowncaseWord,
    CapitalizeWord,

    // Kill ring
    Yank,
    YankPop,

    // Undo
    Undo,

    // History
    PreviousHistory,
    NextHistory,
    BeginningOfHistory,
    EndOfHistory,
    ReverseSearchHistory,
    ForwardSearchHistory,

    // Completion
    Complete,
    MenuComplete,
    PossibleCompletions,

    // Control
    AcceptLine,
    Interrupt,
    Suspend,
    Abort,
    ClearScreen,
    BracketedPasteBegin,
    Noop,

    // Keymap switching
    EmacsEditingMode,
    ViEditingMode,
    ViCommandMode,
    ViInsertMode,

    // Vi command-mode specifics
    ViFirstNonBlank,
    ViEndWord,
    ViInsertBol,
    ViAppend,
    ViAppendEol,
    ViSubstChar,
    ViChangeLine,
    ViChangeWord,
    ViChangeWordBack,
    ViChangeToEol,
    ViChangeCase,
    ViReplaceChar,
    ViYankLine,
    ViYankWord,
    ViYankToEol,
    ViPutAfter,
    ViPutBefore,
}

/// name ↔ operation table in readline spelling.
pub const OPERATION_NAMES: &[(&str, Operation)] = &[
    ("self-insert", Operation::SelfInsert),
    ("quoted-insert", Operation::QuotedInsert),
    ("overwrite-mode", Operation::ToggleOvertype),
    ("beginning-of-line", Operation::BeginningOfLine),
    ("end-of-line", Operation::EndOfLine),
    ("forward-char", Operation::ForwardChar),
    ("backward-char", Operation::BackwardChar),
    ("forward-word", Operation::ForwardWord),
    ("backward-word", Operation::BackwardWord),
    ("backward-delete-char", Operation::BackwardDeleteChar),
    ("delete-char", Operation::DeleteChar),
    ("delete-char-or-eof", Operation::DeleteCharOrEof),
    ("kill-line", Operation::KillLine),
    ("unix-line-discard", Operation::BackwardKillLine),
    ("kill-whole-line", Operation::KillWholeLine),
    ("kill-word", Operation::KillWord),
    ("backward-kill-word", Operation::BackwardKillWord),
    ("transpose-chars", Operation::TransposeChars),
    ("transpose-words", Operation::TransposeWords),
    ("upcase-word", Operation::UpcaseWord),
    ("downcase-word", Operation::DowncaseWord),
    ("capitalize-word", Operation::CapitalizeWord),
    ("yank", Operation::Yank),
    ("yank-pop", Operation::YankPop),
    ("undo", Operation::Undo),
    ("previous-history", Operation::PreviousHistory),
    ("next-history", Operation::NextHistory),
    ("beginning-of-history", Operation::BeginningOfHistory),
    ("end-of-history", Operation::EndOfHistory),
    ("reverse-search-history", Operation::ReverseSearchHistory),
    ("forward-search-history", Operation::ForwardSearchHistory),
    ("complete", Operation::Complete),
    ("menu-complete", Operation::MenuComplete),
    ("possible-completions", Operation::PossibleCompletions),
    ("accept-line", Operation::AcceptLine),
    ("interrupt", Operation::Interrupt),
    ("suspend", Operation::Suspend),
    ("abort", Operation::Abort),
    ("clear-screen", Operation::ClearScreen),
    ("bracketed-paste-begin", Operation::BracketedPasteBegin),
    ("noop", Operation::Noop),
    ("emacs-editing-mode", Operation::EmacsEditingMode),
    ("vi-editing-mode", Operation::ViEditingMode),
    ("vi-movement-mode", Operation::ViCommandMode),
    ("vi-insertion-mode", Operation::ViInsertMode),
    ("vi-first-print", Operation::ViFirstNonBlank),
    ("vi-end-word", Operation::ViEndWord),
    ("vi-insert-beg", Operation::ViInsertBol),
    ("vi-append-mode", Operation::ViAppend),
    ("vi-append-eol", Operation::ViAppendEol),
    ("vi-subst", Operation::ViSubstChar),
    ("vi-change-line", Operation::ViChangeLine),
    ("vi-change-word", Operation::ViChangeWord),
    ("vi-change-word-back", Operation::ViChangeWordBack),
    ("vi-change-to-eol", Operation::ViChangeToEol),
    ("vi-change-case", Operation::ViChangeCase),
    ("vi-replace-char", Operation::ViReplaceChar),
    ("vi-yank-line", Operation::ViYankLine),
    ("vi-yank-word", Operation::ViYankWord),
    ("vi-yank-to-eol", Operation::ViYankToEol),
    ("vi-put-after", Operation::ViPutAfter),
    ("vi-put-before", Operation::ViPutBefore),
];

impl Operation {
    /// Resolve a readline-style name.
    pub fn by_name(name: &str) -> Option<Operation> {
        OPERATION_NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, op)| *op)
    }

    pub fn name(&self) -> &'static str {
        OPERATION_NAMES
            .iter()
            .find(|(_, op)| op == self)
            .map(|(n, _)| *n)
            .unwrap_or("unknown")
    }
}
