//! Byte-sequence key maps.
//!
//! A [`KeyMap`] is a trie from input byte sequences to bind targets:
//! operation tags or macro strings. Each node carries 256 child slots plus
//! an `another_key` fallback consulted when a valid prefix stalls (escape
//! timeout) — the fallback consumes the matched prefix and the unmatched
//! tail is re-queued by the binding reader.
//!
//! Resolution is pure and deterministic: it depends only on the trie and the
//! byte sequence, surfaces ambiguity as [`Lookup::Partial`], and never loops
//! (bindings are finite paths; there are no cycles to build).

pub mod defaults;
pub mod inputrc;
pub mod ops;
pub mod registry;

pub use defaults::{standard_registry, EditingMode};
pub use inputrc::{apply_inputrc, InputrcContext, InputrcOutcome, KeymapParseError};
pub use ops::{Operation, OPERATION_NAMES};
pub use registry::KeymapRegistry;

use tracing::trace;

/// What a key sequence is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A named editing operation.
    Op(Operation),
    /// Bytes to re-inject into the input stream (macro playback).
    Macro(Vec<u8>),
    /// A custom widget registered with the line reader by name.
    Widget(String),
}

#[derive(Debug, Clone, Default)]
enum Slot {
    #[default]
    Empty,
    Bound(Target),
    Child(Box<Node>),
}

#[derive(Debug, Clone)]
struct Node {
    slots: Box<[Slot; 256]>,
    another_key: Option<Target>,
}

impl Node {
    fn new() -> Self {
        Self {
            slots: Box::new(std::array::from_fn(|_| Slot::Empty)),
            another_key: None,
        }
    }
}

/// Result of looking up a byte sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a> {
    /// No binding and no binding starts with this sequence.
    Missing,
    /// A strict prefix of at least one binding; more bytes may resolve it.
    Partial,
    /// Exactly this sequence is bound.
    Final(&'a Target),
}

/// Fallback resolution after a stalled prefix: the target of the deepest
/// `another_key` on the path, how many bytes it consumes, and the re-queued
/// tail starting index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fallback<'a> {
    pub target: &'a Target,
    pub consumed: usize,
}

#[derive(Debug, Clone)]
pub struct KeyMap {
    name: String,
    root: Node,
}

impl KeyMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: Node::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind `seq` to `target`. Binding over an existing binding or subtree
    /// replaces it; binding the empty sequence is a no-op.
    pub fn bind(&mut self, seq: &[u8], target: Target) {
        let Some((&last, prefix)) = seq.split_last() else {
            return;
        };
        let mut node = &mut self.root;
        for &b in prefix {
            let slot = &mut node.slots[b as usize];
            if !matches!(slot, Slot::Child(_)) {
                // A final binding on the prefix is shadowed by the longer one.
                if !matches!(slot, Slot::Empty) {
                    trace!(target: "keymap.bind", byte = b, "prefix shadows existing binding");
                }
                *slot = Slot::Child(Box::new(Node::new()));
            }
            let Slot::Child(child) = slot else {
                unreachable!()
            };
            node = child;
        }
        node.slots[last as usize] = Slot::Bound(target);
    }

    pub fn bind_op(&mut self, seq: &[u8], op: Operation) {
        self.bind(seq, Target::Op(op));
    }

    pub fn bind_macro(&mut self, seq: &[u8], bytes: &[u8]) {
        self.bind(seq, Target::Macro(bytes.to_vec()));
    }

    /// Remove the binding for `seq` (child subtrees are kept).
    pub fn unbind(&mut self, seq: &[u8]) {
        let Some((&last, prefix)) = seq.split_last() else {
            return;
        };
        let mut node = &mut self.root;
        for &b in prefix {
            match &mut node.slots[b as usize] {
                Slot::Child(child) => node = child,
                _ => return,
            }
        }
        if matches!(node.slots[last as usize], Slot::Bound(_)) {
            node.slots[last as usize] = Slot::Empty;
        }
    }

    /// Set the fallback target for the node reached by `prefix` (empty
    /// prefix addresses the root, whose fallback handles any unbound byte).
    pub fn bind_fallback(&mut self, prefix: &[u8], target: Target) {
        let mut node = &mut self.root;
        for &b in prefix {
            let slot = &mut node.slots[b as usize];
            if !matches!(slot, Slot::Child(_)) {
                *slot = Slot::Child(Box::new(Node::new()));
            }
            let Slot::Child(child) = slot else {
                unreachable!()
            };
            node = child;
        }
        node.another_key = Some(target);
    }

    /// Total lookup: exactly one of Missing / Partial / Final.
    pub fn lookup(&self, seq: &[u8]) -> Lookup<'_> {
        if seq.is_empty() {
            return Lookup::Partial;
        }
        let mut node = &self.root;
        for (i, &b) in seq.iter().enumerate() {
            match &node.slots[b as usize] {
                Slot::Empty => return Lookup::Missing,
                Slot::Bound(t) => {
                    return if i + 1 == seq.len() {
                        Lookup::Final(t)
                    } else {
                        // Bound at a strict prefix: the tail makes it a miss.
                        Lookup::Missing
                    };
                }
                Slot::Child(child) => {
                    if i + 1 == seq.len() {
                        return Lookup::Partial;
                    }
                    node = child;
                }
            }
        }
        unreachable!("loop returns on the last byte")
    }

    /// Resolve a stalled sequence via the deepest `another_key` on its path.
    ///
    /// The root fallback consumes exactly one byte so self-insert style
    /// fallbacks receive the byte they apply to; deeper fallbacks consume
    /// their whole prefix. Bytes past `consumed` are the caller's to
    /// re-queue.
    pub fn fallback(&self, seq: &[u8]) -> Option<Fallback<'_>> {
        let mut best: Option<Fallback<'_>> = self
            .root
            .another_key
            .as_ref()
            .filter(|_| !seq.is_empty())
            .map(|t| Fallback {
                target: t,
                consumed: 1,
            });
        let mut node = &self.root;
        for (i, &b) in seq.iter().enumerate() {
            match &node.slots[b as usize] {
                Slot::Child(child) => {
                    node = child;
                    if let Some(t) = &node.another_key {
                        best = Some(Fallback {
                            target: t,
                            consumed: i + 1,
                        });
                    }
                }
                _ => break,
            }
        }
        best
    }

    /// Visit every bound sequence (used for grafting and diagnostics).
    pub fn for_each_binding<F: FnMut(&[u8], &Target)>(&self, mut f: F) {
        let mut path = Vec::new();
        walk(&self.root, &mut path, &mut f);
    }
}

fn walk<F: FnMut(&[u8], &Target)>(node: &Node, path: &mut Vec<u8>, f: &mut F) {
    for (b, slot) in node.slots.iter().enumerate() {
        match slot {
            Slot::Empty => {}
            Slot::Bound(t) => {
                path.push(b as u8);
                f(path, t);
                path.pop();
            }
            Slot::Child(child) => {
                path.push(b as u8);
                walk(child, path, f);
                path.pop();
            }
        }
    }
}
