//! Scope stack and per-function frame bookkeeping for [`super::Assembler`]
//! (spec.md §4.4), grounded on the teacher's `compiler/scope.rs` /
//! `precompiler/scope_stack.rs` split between "a scope's own symbols" and
//! "the stack of scopes currently open".

use std::collections::HashMap;

use crate::error::AssembleError;

pub const MAX_SCOPE_DEPTH: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Func,
    Block,
    If,
    Else,
    While,
    For,
}

/// A function/GLOBAL's local variable-slot counter. Slots are never reused
/// across sibling blocks, only across sibling functions (each function gets
/// its own frame).
#[derive(Debug, Default)]
pub struct Frame {
    pub next_slot: u32,
    pub max_vars: u32,
}

impl Frame {
    pub fn alloc_slot(&mut self) -> u32 {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.max_vars = self.max_vars.max(self.next_slot);
        slot
    }
}

pub struct PendingCall {
    pub name: String,
    /// Byte offset of the `CALL`'s `u32` address operand.
    pub patch_at: u32,
}

pub struct Scope {
    pub kind: ScopeKind,
    pub vars: HashMap<String, u32>,
    pub funcs: HashMap<String, u32>,
    pub pending_calls: Vec<PendingCall>,
}

impl Scope {
    pub fn new(kind: ScopeKind) -> Self {
        Scope {
            kind,
            vars: HashMap::new(),
            funcs: HashMap::new(),
            pending_calls: Vec::new(),
        }
    }
}

/// The stack of currently-open scopes plus the stack of function frames.
/// Two separate stacks because a function's body scope shares its frame
/// with any nested `Block`/`If`/`While`/`For` scopes inside it, but *not*
/// with scopes belonging to an enclosing function (no closures, spec.md §9).
#[derive(Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn push_scope(&mut self, kind: ScopeKind) -> Result<(), AssembleError> {
        if self.scopes.len() >= MAX_SCOPE_DEPTH {
            return Err(AssembleError::ScopeStackExhausted);
        }
        self.scopes.push(Scope::new(kind));
        Ok(())
    }

    pub fn push_frame(&mut self) -> Result<(), AssembleError> {
        if self.frames.len() >= MAX_SCOPE_DEPTH {
            return Err(AssembleError::ScopeStackExhausted);
        }
        self.frames.push(Frame::default());
        Ok(())
    }

    pub fn pop_frame(&mut self) -> Frame {
        self.frames.pop().expect("frame stack underflow")
    }

    pub fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no open frame")
    }

    pub fn declare_var(&mut self, name: &str) -> u32 {
        let slot = self.frames.last_mut().expect("no open frame").alloc_slot();
        self.scopes
            .last_mut()
            .expect("no open scope")
            .vars
            .insert(name.to_string(), slot);
        slot
    }

    /// Registers `name` in the *current* scope, erroring if it was already
    /// declared directly in that scope (shadowing an outer scope's function
    /// is fine; redeclaring in the same scope is a mistake).
    pub fn declare_func(&mut self, name: &str, addr: u32) -> Result<(), AssembleError> {
        let scope = self.scopes.last_mut().expect("no open scope");
        if scope.funcs.contains_key(name) {
            return Err(AssembleError::DuplicateDeclaration(name.to_string()));
        }
        scope.funcs.insert(name.to_string(), addr);
        Ok(())
    }

    /// Searches scopes innermost-to-outermost for a variable, stopping once
    /// the current function/global frame boundary is crossed.
    pub fn resolve_var(&self, name: &str) -> Result<u32, AssembleError> {
        for scope in self.scopes.iter().rev() {
            if let Some(&slot) = scope.vars.get(name) {
                return Ok(slot);
            }
            if matches!(scope.kind, ScopeKind::Func | ScopeKind::Global) {
                break;
            }
        }
        Err(AssembleError::UndeclaredVariable(name.to_string()))
    }

    /// Searches every open scope (functions ARE visible across frame
    /// boundaries — only locals are frame-local) for a resolved function.
    pub fn resolve_func(&self, name: &str) -> Option<u32> {
        for scope in self.scopes.iter().rev() {
            if let Some(&addr) = scope.funcs.get(name) {
                return Some(addr);
            }
        }
        None
    }

    /// Records an unresolved call against the innermost open scope.
    pub fn add_pending_call(&mut self, name: String, patch_at: u32) {
        self.scopes
            .last_mut()
            .expect("no open scope")
            .pending_calls
            .push(PendingCall { name, patch_at });
    }

    /// Pops the current scope, resolving its pending calls against its own
    /// (now-complete) function table. Resolved calls come back as
    /// `(patch_at, addr)` pairs for the caller to patch into the code
    /// buffer. Calls still unresolved propagate to the parent scope; at
    /// GLOBAL pop they're returned instead, and the caller turns the first
    /// one into `AssembleError::UndefinedFunction` (spec.md §4.4: "Calls
    /// still pending at GLOBAL pop are errors").
    pub fn pop_scope(&mut self) -> (Vec<(u32, u32)>, Vec<PendingCall>) {
        let popped = self.scopes.pop().expect("scope stack underflow");
        let mut resolved = Vec::new();
        let mut unresolved = Vec::new();
        for call in popped.pending_calls {
            if let Some(&addr) = popped.funcs.get(&call.name) {
                resolved.push((call.patch_at, addr));
            } else {
                unresolved.push(call);
            }
        }
        if let Some(parent) = self.scopes.last_mut() {
            parent.pending_calls.extend(unresolved);
            (resolved, Vec::new())
        } else {
            (resolved, unresolved)
        }
    }
}
