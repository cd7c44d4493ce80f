//! Lowers a parsed [`Unit`](crate::parser::ast::Unit) body into bytecode
//! (spec.md §4.4).
//!
//! The assembler is a single forward walk over the AST. Variables and
//! functions live in a stack of [`scope::Scope`]s; a function call to a name
//! not yet declared is left as a patch-later placeholder and resolved when
//! its enclosing scope closes (see [`scope::ScopeStack::pop_scope`]). See
//! `DESIGN.md` for why an unresolved call errors at GLOBAL pop rather than
//! falling back to a host `SYSCALL`.

pub mod scope;

use crate::error::AssembleError;
use crate::parser::ast::{BinOp, Expr, FunDecl, HtmlChild, HtmlElement, Stmt, UnOp};
use crate::program::{CodeBuffer, Op};
use scope::{ScopeKind, ScopeStack};

/// Whether the statement list currently being compiled auto-prints its bare
/// expression-statements (global body, `{...}` blocks, `if`/`while`/`for`
/// bodies) or produces a single tail value for a function's `GOVERWRITE`
/// (a `fun`/`procedure` body). Declared in `DESIGN.md` as the resolution of
/// spec.md's silence on implicit-print scope.
#[derive(Clone, Copy, PartialEq, Eq)]
enum StmtMode {
    Print,
    Value,
}

pub struct Assembler {
    buf: CodeBuffer,
    scopes: ScopeStack,
}

pub fn assemble(body: &[Stmt]) -> Result<CodeBuffer, AssembleError> {
    Assembler::new().assemble_unit(body)
}

impl Assembler {
    pub fn new() -> Self {
        Assembler {
            buf: CodeBuffer::default(),
            scopes: ScopeStack::default(),
        }
    }

    pub fn assemble_unit(mut self, body: &[Stmt]) -> Result<CodeBuffer, AssembleError> {
        self.scopes.push_frame()?;
        self.scopes.push_scope(ScopeKind::Global)?;

        self.buf.op(Op::Gtrunc);
        let max_vars_patch = self.buf.u32(0);

        self.assemble_body_inner(body, StmtMode::Print, false)?;
        self.buf.op(Op::Exit);

        let frame = self.scopes.pop_frame();
        self.buf.patch_u32(max_vars_patch, frame.max_vars);
        self.pop_scope()?;

        Ok(self.buf)
    }

    /// Pops the current scope and patches every call it resolved; surfaces
    /// `UndefinedFunction` for the first call still unresolved once there's
    /// no parent scope left to propagate to (spec.md §4.4).
    fn pop_scope(&mut self) -> Result<(), AssembleError> {
        let (resolved, unresolved) = self.scopes.pop_scope();
        for (at, addr) in resolved {
            self.buf.patch_u32(at, addr);
        }
        if let Some(first) = unresolved.into_iter().next() {
            return Err(AssembleError::UndefinedFunction(first.name));
        }
        Ok(())
    }

    // ---- statement lists -------------------------------------------------

    /// Compiles `stmts` under `mode`. `outer_is_tail` is only meaningful
    /// under `StmtMode::Value`: it marks whether the *last* statement here
    /// should push this list's single tail value (everything else is
    /// executed and its value, if any, discarded).
    fn assemble_body_inner(
        &mut self,
        stmts: &[Stmt],
        mode: StmtMode,
        outer_is_tail: bool,
    ) -> Result<(), AssembleError> {
        if stmts.is_empty() {
            if outer_is_tail {
                self.buf.op(Op::Pushn);
            }
            return Ok(());
        }
        let last = stmts.len() - 1;
        for (i, s) in stmts.iter().enumerate() {
            let is_tail = outer_is_tail && mode == StmtMode::Value && i == last;
            self.assemble_stmt(s, mode, is_tail)?;
        }
        Ok(())
    }

    fn assemble_stmt(
        &mut self,
        stmt: &Stmt,
        mode: StmtMode,
        is_tail: bool,
    ) -> Result<(), AssembleError> {
        match stmt {
            Stmt::Expr(e) => {
                if is_tail {
                    self.assemble_expr(e)?;
                } else if mode == StmtMode::Print && !matches!(e, Expr::Assign(..)) {
                    self.buf.op(Op::Group);
                    self.assemble_expr(e)?;
                    self.buf.op(Op::Gprint);
                } else {
                    self.buf.op(Op::Group);
                    self.assemble_expr(e)?;
                    self.buf.op(Op::Gpop);
                }
            }
            Stmt::Print(e) => {
                self.buf.op(Op::Group);
                self.assemble_expr(e)?;
                self.buf.op(Op::Gprint);
                if is_tail {
                    self.buf.op(Op::Pushn);
                }
            }
            Stmt::Let(name, init) => {
                match init {
                    Some(e) => self.assemble_expr(e)?,
                    None => self.buf.op(Op::Pushn),
                }
                let slot = self.scopes.declare_var(name);
                self.buf.op(Op::Setv);
                self.buf.u32(slot);
                if is_tail {
                    self.buf.op(Op::Pushn);
                }
            }
            Stmt::If(cond, then_b, else_b) => {
                self.assemble_expr(cond)?;
                self.buf.op(Op::Jifp);
                let else_patch = self.buf.u32(0);

                self.scopes.push_scope(ScopeKind::If)?;
                self.assemble_stmt(then_b, mode, is_tail)?;
                self.pop_scope()?;

                if let Some(else_b) = else_b {
                    self.buf.op(Op::Jump);
                    let end_patch = self.buf.u32(0);
                    self.buf.patch_u32(else_patch, self.buf.offset());

                    self.scopes.push_scope(ScopeKind::Else)?;
                    self.assemble_stmt(else_b, mode, is_tail)?;
                    self.pop_scope()?;

                    self.buf.patch_u32(end_patch, self.buf.offset());
                } else {
                    self.buf.patch_u32(else_patch, self.buf.offset());
                    if is_tail {
                        self.buf.op(Op::Pushn);
                    }
                }
            }
            Stmt::While(cond, body) => {
                let loop_start = self.buf.offset();
                self.assemble_expr(cond)?;
                self.buf.op(Op::Jifp);
                let end_patch = self.buf.u32(0);

                self.scopes.push_scope(ScopeKind::While)?;
                self.assemble_stmt(body, mode, false)?;
                self.pop_scope()?;

                self.buf.op(Op::Jump);
                self.buf.u32(loop_start);
                self.buf.patch_u32(end_patch, self.buf.offset());
                if is_tail {
                    self.buf.op(Op::Pushn);
                }
            }
            Stmt::For(var, idx_var, iter_expr, body) => {
                self.assemble_expr(iter_expr)?;
                self.scopes.push_scope(ScopeKind::For)?;

                let set_slot = self.scopes.declare_var("$for.set");
                self.buf.op(Op::Setv);
                self.buf.u32(set_slot);
                let item_slot = self.scopes.declare_var(var);
                let idx_slot = match idx_var {
                    Some(n) => self.scopes.declare_var(n),
                    None => self.scopes.declare_var("$for.idx"),
                };
                self.buf.op(Op::Pushi);
                self.buf.i64(0);
                self.buf.op(Op::Setv);
                self.buf.u32(idx_slot);

                let loop_start = self.buf.offset();
                self.buf.op(Op::For);
                self.buf.u32(set_slot);
                self.buf.u32(item_slot);
                self.buf.u32(idx_slot);
                let end_patch = self.buf.u32(0);

                self.assemble_stmt(body, mode, false)?;

                self.buf.op(Op::Jump);
                self.buf.u32(loop_start);
                self.buf.patch_u32(end_patch, self.buf.offset());
                self.pop_scope()?;
                if is_tail {
                    self.buf.op(Op::Pushn);
                }
            }
            Stmt::FunDecl(decl) => {
                self.assemble_fun_decl(decl)?;
                if is_tail {
                    self.buf.op(Op::Pushn);
                }
            }
            Stmt::Include(_) => {
                // Resolved by the compiler driver before assembly; any node
                // still here (e.g. a standalone `assemble` call in tests)
                // is simply a no-op.
                if is_tail {
                    self.buf.op(Op::Pushn);
                }
            }
            Stmt::Block(inner) => {
                self.scopes.push_scope(ScopeKind::Block)?;
                self.assemble_body_inner(inner, mode, is_tail)?;
                self.pop_scope()?;
            }
        }
        Ok(())
    }

    fn assemble_fun_decl(&mut self, decl: &FunDecl) -> Result<(), AssembleError> {
        self.buf.op(Op::Jump);
        let jump_patch = self.buf.u32(0);
        let addr = self.buf.offset();
        self.scopes.declare_func(&decl.name, addr)?;

        self.scopes.push_frame()?;
        self.scopes.push_scope(ScopeKind::Func)?;
        for p in &decl.params {
            self.scopes.declare_var(p);
        }

        self.buf.op(Op::Gtrunc);
        self.buf.u32(decl.params.len() as u32);
        self.buf.op(Op::Gtrunc);
        let max_vars_patch = self.buf.u32(0);

        self.buf.op(Op::Group);
        self.assemble_stmt(&decl.body, StmtMode::Value, true)?;
        self.buf.op(Op::Goverwrite);
        self.buf.op(Op::Ret);

        let frame = self.scopes.pop_frame();
        self.buf.patch_u32(max_vars_patch, frame.max_vars);
        self.pop_scope()?;

        self.buf.patch_u32(jump_patch, self.buf.offset());
        Ok(())
    }

    // ---- expressions -----------------------------------------------------
    //
    // Every arm leaves exactly one `Value` on the eval stack. `Call` and
    // `Html` each open (and close, via `GCOALESCE`/`GPACK`) their own group
    // to get there; everything else never touches the group stack.

    fn assemble_expr(&mut self, expr: &Expr) -> Result<(), AssembleError> {
        match expr {
            Expr::IntLit(i) => {
                self.buf.op(Op::Pushi);
                self.buf.i64(*i);
            }
            Expr::FloatLit(f) => {
                self.buf.op(Op::Pushf);
                self.buf.f64(*f);
            }
            Expr::StrLit(bytes) => self.push_str_const(bytes),
            Expr::NoneLit => self.buf.op(Op::Pushn),
            Expr::TrueLit => self.buf.op(Op::Pusht),
            Expr::FalseLit => self.buf.op(Op::Pushfl),
            Expr::Var(name) => {
                let slot = self.scopes.resolve_var(name)?;
                self.buf.op(Op::Pushv);
                self.buf.u32(slot);
            }
            Expr::SysVar(name) => {
                let (off, len) = self.buf.intern(name);
                self.buf.op(Op::Sysvar);
                self.buf.u32(off);
                self.buf.u32(len);
            }
            Expr::Unary(UnOp::Plus, e) => self.assemble_expr(e)?,
            Expr::Unary(UnOp::Neg, e) => {
                self.assemble_expr(e)?;
                self.buf.op(Op::Neg);
            }
            Expr::Binary(op, l, r) => {
                self.assemble_expr(l)?;
                self.assemble_expr(r)?;
                self.buf.op(match op {
                    BinOp::Add => Op::Add,
                    BinOp::Sub => Op::Sub,
                    BinOp::Mul => Op::Mul,
                    BinOp::Div => Op::Div,
                    BinOp::Mod => Op::Mod,
                    BinOp::Eq => Op::Eql,
                    BinOp::Neq => Op::Nql,
                    BinOp::Lt => Op::Lss,
                    BinOp::Gt => Op::Grt,
                });
            }
            Expr::Assign(lhs, rhs) => self.assemble_assign(lhs, rhs)?,
            Expr::Call(name, args) => {
                self.buf.op(Op::Group);
                for a in args {
                    self.assemble_expr(a)?;
                }
                self.buf.op(Op::Call);
                match self.scopes.resolve_func(name) {
                    Some(addr) => {
                        self.buf.u32(addr);
                    }
                    None => {
                        let patch_at = self.buf.u32(0);
                        self.scopes.add_pending_call(name.clone(), patch_at);
                    }
                }
                self.buf.op(Op::Gcoalesce);
            }
            Expr::Index(container, key) => {
                self.assemble_expr(container)?;
                self.assemble_expr(key)?;
                self.buf.op(Op::Select);
            }
            Expr::Field(container, name) => {
                self.assemble_expr(container)?;
                self.push_str_const(name.as_bytes());
                self.buf.op(Op::Select);
            }
            Expr::Array(items) => {
                self.buf.op(Op::Pusha);
                self.buf.u32(items.len() as u32);
                for it in items {
                    self.assemble_expr(it)?;
                    self.buf.op(Op::Append);
                }
            }
            Expr::Map(pairs) => {
                self.buf.op(Op::Pushm);
                self.buf.u32(pairs.len() as u32);
                for (k, v) in pairs {
                    self.assemble_expr(k)?;
                    self.assemble_expr(v)?;
                    self.buf.op(Op::Insert1);
                }
            }
            Expr::Html(el) => self.assemble_html(el)?,
        }
        Ok(())
    }

    fn push_str_const(&mut self, bytes: &[u8]) {
        let (off, len) = self.buf.intern_bytes(bytes);
        self.buf.op(Op::Pushs);
        self.buf.u32(off);
        self.buf.u32(len);
    }

    /// `target = value`, `target[key] = value`, `target.field = value`. The
    /// assignment expression's own value is the just-stored value: for a
    /// plain variable that's a cheap re-`PUSHV`; for an indexed/field target
    /// `INSERT2` is defined (by this assembler/VM pair, not spec text — see
    /// `DESIGN.md`) to leave the stored value on top so no opcode re-reads
    /// the target or key a second time.
    fn assemble_assign(&mut self, lhs: &Expr, rhs: &Expr) -> Result<(), AssembleError> {
        match lhs {
            Expr::Var(name) => {
                let slot = self.scopes.resolve_var(name)?;
                self.assemble_expr(rhs)?;
                self.buf.op(Op::Setv);
                self.buf.u32(slot);
                self.buf.op(Op::Pushv);
                self.buf.u32(slot);
            }
            Expr::Index(container, key) => {
                self.assemble_expr(container)?;
                self.assemble_expr(key)?;
                self.assemble_expr(rhs)?;
                self.buf.op(Op::Insert2);
            }
            Expr::Field(container, name) => {
                self.assemble_expr(container)?;
                self.push_str_const(name.as_bytes());
                self.assemble_expr(rhs)?;
                self.buf.op(Op::Insert2);
            }
            _ => unreachable!("parser only accepts Var/Index/Field assignment targets"),
        }
        Ok(())
    }

    // ---- HTML literals -----------------------------------------------------
    //
    // Static text accumulates in a scratch buffer and is flushed as one
    // `PUSHS` right before any dynamic piece (an attribute value, an
    // embedded statement, a nested element) interrupts it; `GPACK` renders
    // and concatenates everything the group collected into one string.

    fn assemble_html(&mut self, el: &HtmlElement) -> Result<(), AssembleError> {
        self.buf.op(Op::Group);
        let mut scratch = String::new();
        self.emit_open_tag(el, &mut scratch)?;
        if el.self_closing {
            scratch.push_str("/>");
            self.flush_scratch(&mut scratch);
        } else {
            scratch.push('>');
            for child in &el.children {
                match child {
                    HtmlChild::Text(t) => scratch.push_str(t),
                    HtmlChild::Element(e) => {
                        self.flush_scratch(&mut scratch);
                        self.assemble_html(e)?;
                    }
                    HtmlChild::Embedded(stmt) => {
                        self.flush_scratch(&mut scratch);
                        self.assemble_embedded(stmt)?;
                    }
                }
            }
            scratch.push_str("</");
            scratch.push_str(&el.tag);
            scratch.push('>');
            self.flush_scratch(&mut scratch);
        }
        self.buf.op(Op::Gpack);
        Ok(())
    }

    fn emit_open_tag(&mut self, el: &HtmlElement, scratch: &mut String) -> Result<(), AssembleError> {
        scratch.push('<');
        scratch.push_str(&el.tag);
        for a in &el.attrs {
            scratch.push(' ');
            scratch.push_str(&a.name);
            if let Some(val) = &a.value {
                scratch.push_str("=\"");
                self.flush_scratch(scratch);
                self.assemble_expr(val)?;
                scratch.push('"');
            }
        }
        Ok(())
    }

    fn flush_scratch(&mut self, scratch: &mut String) {
        if !scratch.is_empty() {
            self.push_str_const(scratch.as_bytes());
            scratch.clear();
        }
    }

    /// `\<stmt>` inside HTML text: compiled exactly like a function's
    /// single-statement tail-value body, pushing its result straight into
    /// the enclosing element's open group.
    fn assemble_embedded(&mut self, stmt: &Stmt) -> Result<(), AssembleError> {
        self.scopes.push_scope(ScopeKind::Block)?;
        self.assemble_stmt(stmt, StmtMode::Value, true)?;
        self.pop_scope()?;
        Ok(())
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}
