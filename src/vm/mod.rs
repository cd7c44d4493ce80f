//! Stack-based bytecode interpreter (spec.md §4.5, §4.6, §5, §7).
//!
//! Execution is a flat evaluation stack plus two auxiliary stacks: a
//! *group* stack of markers into the eval stack (spec.md's `GROUP` family —
//! temporary "this sub-expression's values live above here" regions) and a
//! *frame* stack of call frames, each remembering where its own locals
//! begin. The two are independent: a function body can open and close any
//! number of groups of its own (HTML literals, nested calls) while its
//! locals stay anchored at the frame's `locals_base`, however deep the
//! group nesting gets underneath it.
//!
//! `eval()` runs until the program exits, hits an unrecoverable error, or
//! needs the host: `GPRINT` yields rendered output, `SYSVAR`/`SYSCALL`
//! suspend for the host to answer via [`crate::host`]. Once an error is
//! raised it latches — every later `eval()` call returns the same error
//! without executing anything else (spec.md §7: "first cause wins").

use std::collections::VecDeque;

use crate::arena::Arena;
use crate::error::RuntimeError;
use crate::program::{Op, Program};
use crate::value::{self, Value};

pub const MAX_EVAL_DEPTH: usize = 128;
pub const MAX_GROUP_DEPTH: usize = 128;
pub const MAX_FRAME_DEPTH: usize = 128;

/// What happened during the most recent [`Runtime::eval`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    /// The program ran to `EXIT`.
    Done,
    /// Latched; every further call returns the same error.
    Error(RuntimeError),
    /// One printed value's rendered bytes. A `GPRINT` over a group of N
    /// values yields N of these in order, one per `eval()` call (spec.md
    /// §4.5 "Printing": "draining one per call, yielding each value
    /// rendered as a string") — never a single concatenation of the whole
    /// group, so a streaming host sees each value as it's produced. Bytes,
    /// not a `String`, since a rendered string value may carry a lone
    /// non-UTF-8 byte from a `\xHH` escape (spec.md §8).
    Output(Vec<u8>),
    /// Suspended on `SYSVAR name`. The host answers by pushing a value with
    /// [`crate::host`] and calling `eval()` again.
    Var(String),
    /// Suspended on `SYSCALL name`, arguments available via the host API's
    /// peek/pop calls. The host answers the same way as `Var`.
    Call(String),
}

struct CallFrame {
    return_pc: u32,
    /// Eval-stack index where this frame's local variable slots begin.
    locals_base: usize,
}

/// What a suspended `Runtime` is waiting on, and the "user frame window"
/// the host's peek/pop/push API is scoped to (spec.md §4.5 "Sysvar/syscall
/// protocol"). Lives until the *next* `eval()` call, which consumes it.
pub(crate) enum Suspend {
    None,
    /// `window_base` is where the host's one pushed value must land.
    Var { window_base: usize },
    /// `window_base` is where the call's arguments begin; `argc` is how
    /// many there are (the arity marker sits at `window_base + argc`).
    /// `consumed` counts how many args the host has popped so far — popping
    /// only logically shrinks the window, it never touches the eval stack,
    /// so the marker's position stays exactly where resume() expects it.
    Call {
        window_base: usize,
        argc: usize,
        consumed: usize,
    },
}

/// Owns the program, the three execution stacks, and the value arena. One
/// `Runtime` runs exactly one program from start to `Done`/latched error;
/// callers that want to run another program build a new one.
pub struct Runtime {
    program: Program,
    pc: u32,
    eval: Vec<Value>,
    groups: Vec<usize>,
    frames: Vec<CallFrame>,
    arena: Arena,
    error: Option<RuntimeError>,
    pub(crate) suspend: Suspend,
    /// Values from a `GPRINT` group still waiting to be handed out one at a
    /// time, beyond the first that `step()` already returned.
    pending_outputs: VecDeque<Vec<u8>>,
}

impl Runtime {
    /// `arena_capacity` is in bytes, 0 for unbounded (see [`Arena::new`]).
    pub fn new(program: Program, arena_capacity: usize) -> Self {
        Runtime {
            program,
            pc: 0,
            eval: Vec::new(),
            // The global frame's locals group is open from the start: there
            // is no caller to push it, so the VM plays that role itself.
            groups: vec![0],
            frames: vec![CallFrame {
                return_pc: 0,
                locals_base: 0,
            }],
            arena: Arena::new(arena_capacity),
            error: None,
            suspend: Suspend::None,
            pending_outputs: VecDeque::new(),
        }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Read-only view of the eval stack, for the host peek/pop API. Only
    /// meaningful while suspended in `Var`/`Call`.
    pub(crate) fn eval_stack(&self) -> &[Value] {
        &self.eval
    }

    pub(crate) fn eval_stack_mut(&mut self) -> &mut Vec<Value> {
        &mut self.eval
    }

    fn fail(&mut self, e: RuntimeError) -> EvalOutcome {
        let out = EvalOutcome::Error(e.clone());
        self.error = Some(e);
        out
    }

    /// Runs opcodes until the next suspension point. Returns immediately
    /// with the latched error if one was already raised.
    pub fn eval(&mut self) -> EvalOutcome {
        if let Some(e) = &self.error {
            return EvalOutcome::Error(e.clone());
        }
        if let Some(out) = self.pending_outputs.pop_front() {
            return EvalOutcome::Output(out);
        }
        if let Err(e) = self.resume() {
            return self.fail(e);
        }
        loop {
            match self.step() {
                Ok(Some(outcome)) => return outcome,
                Ok(None) => continue,
                Err(e) => return self.fail(e),
            }
        }
    }

    fn read_u8(&mut self) -> Result<u8, RuntimeError> {
        let b = *self
            .program
            .code
            .get(self.pc as usize)
            .ok_or(RuntimeError::InvalidCodeOffset(self.pc))?;
        self.pc += 1;
        Ok(b)
    }

    fn read_u32(&mut self) -> Result<u32, RuntimeError> {
        let at = self.pc as usize;
        let bytes = self
            .program
            .code
            .get(at..at + 4)
            .ok_or(RuntimeError::InvalidCodeOffset(self.pc))?;
        self.pc += 4;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_i64(&mut self) -> Result<i64, RuntimeError> {
        let at = self.pc as usize;
        let bytes = self
            .program
            .code
            .get(at..at + 8)
            .ok_or(RuntimeError::InvalidCodeOffset(self.pc))?;
        self.pc += 8;
        Ok(i64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_f64(&mut self) -> Result<f64, RuntimeError> {
        let at = self.pc as usize;
        let bytes = self
            .program
            .code
            .get(at..at + 8)
            .ok_or(RuntimeError::InvalidCodeOffset(self.pc))?;
        self.pc += 8;
        Ok(f64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.eval
            .pop()
            .ok_or_else(|| RuntimeError::MalformedProgram("eval stack underflow".into()))
    }

    /// `pub(crate)` so the host API ([`crate::host`]) can push return/sysvar
    /// values through the same depth cap as ordinary opcodes.
    pub(crate) fn push(&mut self, v: Value) -> Result<(), RuntimeError> {
        if self.eval.len() >= MAX_EVAL_DEPTH {
            return Err(RuntimeError::EvalStackOverflow);
        }
        self.eval.push(v);
        Ok(())
    }

    fn group_base(&self) -> Result<usize, RuntimeError> {
        self.groups
            .last()
            .copied()
            .ok_or(RuntimeError::GroupStackOverflow)
    }

    fn pop_group(&mut self) -> Result<usize, RuntimeError> {
        self.groups.pop().ok_or(RuntimeError::GroupStackOverflow)
    }

    fn frame_base(&self) -> usize {
        self.frames
            .last()
            .expect("frame stack is never empty")
            .locals_base
    }

    fn slot(&self, raw_slot: u32) -> Result<usize, RuntimeError> {
        let idx = self.frame_base() + raw_slot as usize;
        if idx >= self.eval.len() {
            return Err(RuntimeError::MalformedProgram(
                "variable slot out of range".into(),
            ));
        }
        Ok(idx)
    }

    fn truthy(&self, v: Value) -> Result<bool, RuntimeError> {
        match v {
            Value::Bool(b) => Ok(b),
            _ => Err(RuntimeError::InvalidCondition),
        }
    }

    /// Consumes whatever the host left in `self.suspend` from the previous
    /// `eval()` call, validating and (for `Call`) compacting the returned
    /// values down to the call's group base (spec.md §4.5 "Sysvar/syscall
    /// protocol"). A no-op when the runtime wasn't suspended.
    fn resume(&mut self) -> Result<(), RuntimeError> {
        match std::mem::replace(&mut self.suspend, Suspend::None) {
            Suspend::None => Ok(()),
            Suspend::Var { window_base } => {
                if self.eval.len() != window_base + 1 {
                    return Err(RuntimeError::HostProtocol(
                        "VAR resume expects exactly one pushed value".into(),
                    ));
                }
                Ok(())
            }
            Suspend::Call {
                window_base, argc, ..
            } => {
                let marker_idx = window_base + argc;
                if marker_idx >= self.eval.len() {
                    return Err(RuntimeError::HostProtocol(
                        "CALL resume: arity marker missing".into(),
                    ));
                }
                let returns = self.eval.split_off(marker_idx + 1);
                self.eval.truncate(window_base);
                self.eval.extend(returns);
                Ok(())
            }
        }
    }

    fn render(&self, values: Vec<Value>) -> Vec<u8> {
        let mut s = Vec::new();
        for v in values {
            s.extend_from_slice(&value::value_to_bytes(&self.arena, v));
        }
        s
    }

    /// Executes exactly one opcode. `Ok(Some(outcome))` means the VM must
    /// suspend and hand `outcome` back to the caller of `eval()`; `Ok(None)`
    /// means keep stepping.
    fn step(&mut self) -> Result<Option<EvalOutcome>, RuntimeError> {
        let op = Op::from_u8(self.read_u8()?)?;
        match op {
            Op::Group => {
                if self.groups.len() >= MAX_GROUP_DEPTH {
                    return Err(RuntimeError::GroupStackOverflow);
                }
                self.groups.push(self.eval.len());
            }
            Op::Gpop => {
                let base = self.pop_group()?;
                self.eval.truncate(base);
            }
            Op::Gcoalesce => {
                self.pop_group()?;
            }
            Op::Gtrunc => {
                let n = self.read_u32()? as usize;
                let base = self.group_base()?;
                let want = base + n;
                if self.eval.len() < want {
                    self.eval.resize(want, Value::None);
                } else {
                    self.eval.truncate(want);
                }
            }
            Op::Goverwrite => {
                let inner = self.pop_group()?;
                let outer = self.group_base()?;
                let tail = self.eval.split_off(inner);
                self.eval.truncate(outer);
                self.eval.extend(tail);
            }
            Op::Gpack => {
                let base = self.pop_group()?;
                let parts = self.eval.split_off(base);
                let s = self.render(parts);
                let packed = value::make_str(&self.arena, &s)?;
                self.push(packed)?;
            }
            Op::Gprint => {
                let base = self.pop_group()?;
                let parts = self.eval.split_off(base);
                let mut rendered: Vec<Vec<u8>> = parts
                    .into_iter()
                    .map(|v| value::value_to_bytes(&self.arena, v))
                    .collect();
                if rendered.is_empty() {
                    return Ok(None);
                }
                let first = rendered.remove(0);
                self.pending_outputs.extend(rendered);
                return Ok(Some(EvalOutcome::Output(first)));
            }

            Op::Pushi => {
                let v = self.read_i64()?;
                self.push(Value::Int(v))?;
            }
            Op::Pushf => {
                let v = self.read_f64()?;
                self.push(Value::Float(v))?;
            }
            Op::Pushs => {
                let off = self.read_u32()?;
                let len = self.read_u32()?;
                let bytes = self.program.data_bytes(off, len)?.to_vec();
                let v = value::make_str(&self.arena, &bytes)?;
                self.push(v)?;
            }
            Op::Pushn => self.push(Value::None)?,
            Op::Pusht => self.push(Value::Bool(true))?,
            Op::Pushfl => self.push(Value::Bool(false))?,
            Op::Pusha => {
                let _cap_hint = self.read_u32()?;
                let v = value::make_array(&self.arena)?;
                self.push(v)?;
            }
            Op::Pushm => {
                let _cap_hint = self.read_u32()?;
                let v = value::make_map(&self.arena)?;
                self.push(v)?;
            }
            Op::Pushv => {
                let raw = self.read_u32()?;
                let idx = self.slot(raw)?;
                self.push(self.eval[idx])?;
            }

            Op::Neg => {
                let a = self.pop()?;
                let r = value::neg(a)?;
                self.push(r)?;
            }
            Op::Add => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(value::add(a, b)?)?;
            }
            Op::Sub => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(value::sub(a, b)?)?;
            }
            Op::Mul => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(value::mul(a, b)?)?;
            }
            Op::Div => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(value::div(a, b)?)?;
            }
            Op::Mod => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(value::modulo(a, b)?)?;
            }
            Op::Eql => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Bool(value::valeq(&self.arena, a, b)))?;
            }
            Op::Nql => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Bool(!value::valeq(&self.arena, a, b)))?;
            }
            Op::Grt => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Bool(value::valgrt(&self.arena, a, b)?))?;
            }
            Op::Lss => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push(Value::Bool(value::valgrt(&self.arena, b, a)?))?;
            }

            Op::Setv => {
                let raw = self.read_u32()?;
                let idx = self.slot(raw)?;
                let v = self.pop()?;
                self.eval[idx] = v;
            }

            Op::Jump => {
                let off = self.read_u32()?;
                self.pc = off;
            }
            Op::Jifp => {
                let off = self.read_u32()?;
                let c = self.pop()?;
                if !self.truthy(c)? {
                    self.pc = off;
                }
            }
            Op::Call => {
                let addr = self.read_u32()?;
                if self.frames.len() >= MAX_FRAME_DEPTH {
                    return Err(RuntimeError::FrameStackOverflow);
                }
                // The caller already opened this call's locals group (the
                // args it just pushed) right before emitting CALL.
                let locals_base = self.group_base()?;
                self.frames.push(CallFrame {
                    return_pc: self.pc,
                    locals_base,
                });
                self.pc = addr;
            }
            Op::Ret => {
                // The synthetic global frame (index 0) is never popped: a
                // RET reaching it means the program has no caller to return
                // to, which is malformed.
                if self.frames.len() <= 1 {
                    return Err(RuntimeError::MalformedProgram(
                        "RET with no caller frame".into(),
                    ));
                }
                let frame = self.frames.pop().expect("checked above");
                self.pc = frame.return_pc;
            }

            Op::Append => {
                let v = self.pop()?;
                let arr = self.pop()?;
                let Value::Array(id) = arr else {
                    return Err(RuntimeError::TypeMismatch { op: "APPEND" });
                };
                self.arena.array_append(id, v)?;
                self.push(arr)?;
            }
            Op::Insert1 => {
                let v = self.pop()?;
                let k = self.pop()?;
                let m = self.pop()?;
                let Value::Map(id) = m else {
                    return Err(RuntimeError::TypeMismatch { op: "INSERT1" });
                };
                self.arena.map_insert(id, k, v)?;
                self.push(m)?;
            }
            Op::Insert2 => {
                let v = self.pop()?;
                let k = self.pop()?;
                let c = self.pop()?;
                match c {
                    Value::Map(id) => {
                        self.arena.map_insert(id, k, v)?;
                    }
                    Value::Array(id) => {
                        let idx = value::get_int(k)
                            .ok_or(RuntimeError::TypeMismatch { op: "INSERT2" })?;
                        let len = self.arena.array_len(id);
                        self.arena
                            .array_set(id, idx, v)
                            .ok_or(RuntimeError::IndexOutOfRange { index: idx, length: len })?;
                    }
                    _ => return Err(RuntimeError::TypeMismatch { op: "INSERT2" }),
                }
                self.push(v)?;
            }
            Op::Select => {
                let k = self.pop()?;
                let c = self.pop()?;
                let v = match c {
                    Value::Map(id) => self
                        .arena
                        .map_select(id, k, |x, y| value::valeq(&self.arena, x, y))
                        .ok_or(RuntimeError::KeyNotFound)?,
                    Value::Array(id) => {
                        let idx = value::get_int(k)
                            .ok_or(RuntimeError::TypeMismatch { op: "SELECT" })?;
                        let len = self.arena.array_len(id);
                        self.arena
                            .array_select(id, idx)
                            .ok_or(RuntimeError::IndexOutOfRange { index: idx, length: len })?
                    }
                    _ => return Err(RuntimeError::TypeMismatch { op: "SELECT" }),
                };
                self.push(v)?;
            }

            Op::Print => {
                // Kept for fidelity with the opcode set; the assembler only
                // ever emits GROUP/.../GPRINT for print contexts, so this is
                // unreachable from compiled WL source (see DESIGN.md).
                let v = self.pop()?;
                let s = value::value_to_bytes(&self.arena, v);
                return Ok(Some(EvalOutcome::Output(s)));
            }
            Op::Sysvar => {
                let off = self.read_u32()?;
                let len = self.read_u32()?;
                let name = self.program.data_str(off, len)?.to_owned();
                self.suspend = Suspend::Var {
                    window_base: self.eval.len(),
                };
                return Ok(Some(EvalOutcome::Var(name)));
            }
            Op::Syscall => {
                // Unreachable from compiled WL source in this
                // implementation (ordinary calls always resolve to declared
                // functions, never fall back to the host; see DESIGN.md)
                // but implemented for completeness since the opcode is
                // part of the set implementers must preserve.
                let off = self.read_u32()?;
                let len = self.read_u32()?;
                let name = self.program.data_str(off, len)?.to_owned();
                let window_base = self.group_base()?;
                let argc = self.eval.len() - window_base;
                self.push(Value::Int(argc as i64))?;
                self.suspend = Suspend::Call {
                    window_base,
                    argc,
                    consumed: 0,
                };
                return Ok(Some(EvalOutcome::Call(name)));
            }

            Op::For => {
                let set_slot = self.read_u32()?;
                let item_slot = self.read_u32()?;
                let idx_slot = self.read_u32()?;
                let end_off = self.read_u32()?;
                let set_idx = self.slot(set_slot)?;
                let idx_idx = self.slot(idx_slot)?;
                let set_v = self.eval[set_idx];
                let idx_v = self.eval[idx_idx];
                let idx = value::get_int(idx_v).ok_or(RuntimeError::MalformedProgram(
                    "FOR index slot is not an int".into(),
                ))?;
                let items = match set_v {
                    Value::Array(id) => self.arena.array_values(id),
                    Value::Map(id) => self
                        .arena
                        .map_keys_unique(id, |x, y| value::valeq(&self.arena, x, y)),
                    _ => return Err(RuntimeError::TypeMismatch { op: "FOR" }),
                };
                if idx < 0 || idx as usize >= items.len() {
                    self.pc = end_off;
                } else {
                    let item_idx = self.slot(item_slot)?;
                    self.eval[item_idx] = items[idx as usize];
                    let idx_idx = self.slot(idx_slot)?;
                    self.eval[idx_idx] = Value::Int(idx + 1);
                }
            }

            Op::Exit => return Ok(Some(EvalOutcome::Done)),
            Op::Nope => {}
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::CodeBuffer;

    fn build(f: impl FnOnce(&mut CodeBuffer)) -> Program {
        let mut buf = CodeBuffer::default();
        f(&mut buf);
        Program {
            code: buf.code,
            data: buf.data,
        }
    }

    #[test]
    fn arithmetic_then_exit() {
        let program = build(|buf| {
            buf.op(Op::Pushi);
            buf.i64(1);
            buf.op(Op::Pushi);
            buf.i64(2);
            buf.op(Op::Pushi);
            buf.i64(3);
            buf.op(Op::Mul);
            buf.op(Op::Add);
            buf.op(Op::Exit);
        });
        let mut rt = Runtime::new(program, 0);
        assert_eq!(rt.eval(), EvalOutcome::Done);
        assert_eq!(rt.eval_stack(), &[Value::Int(7)]);
    }

    #[test]
    fn gprint_yields_one_output_per_group_value() {
        let program = build(|buf| {
            buf.op(Op::Group);
            buf.op(Op::Pushi);
            buf.i64(1);
            buf.op(Op::Pushi);
            buf.i64(2);
            buf.op(Op::Gprint);
            buf.op(Op::Exit);
        });
        let mut rt = Runtime::new(program, 0);
        assert_eq!(rt.eval(), EvalOutcome::Output(b"1".to_vec()));
        assert_eq!(rt.eval(), EvalOutcome::Output(b"2".to_vec()));
        assert_eq!(rt.eval(), EvalOutcome::Done);
    }

    #[test]
    fn call_and_goverwrite_return_function_value() {
        // GLOBAL: GTRUNC 0; GROUP; PUSHI 1; CALL f; GCOALESCE; GROUP; PUSHV 0; GPRINT; EXIT
        // f:     GTRUNC 0; GTRUNC 0; GROUP; PUSHV 0; PUSHI 1; ADD; GOVERWRITE; RET
        let mut buf = CodeBuffer::default();
        buf.op(Op::Gtrunc);
        buf.u32(0);
        buf.op(Op::Group);
        buf.op(Op::Pushi);
        buf.i64(41);
        let call_patch = {
            buf.op(Op::Call);
            buf.u32(0) // placeholder, patched below
        };
        buf.op(Op::Gcoalesce);
        buf.op(Op::Group);
        buf.op(Op::Pushv);
        buf.u32(0);
        buf.op(Op::Gprint);
        buf.op(Op::Exit);

        let f_addr = buf.offset();
        buf.op(Op::Gtrunc);
        buf.u32(1);
        buf.op(Op::Group);
        buf.op(Op::Pushv);
        buf.u32(0);
        buf.op(Op::Pushi);
        buf.i64(1);
        buf.op(Op::Add);
        buf.op(Op::Goverwrite);
        buf.op(Op::Ret);

        buf.patch_u32(call_patch, f_addr);
        let program = Program {
            code: buf.code,
            data: buf.data,
        };
        let mut rt = Runtime::new(program, 0);
        assert_eq!(rt.eval(), EvalOutcome::Output(b"42".to_vec()));
        assert_eq!(rt.eval(), EvalOutcome::Done);
    }

    #[test]
    fn for_loop_iterates_array_values() {
        // $for.set=slot0, a=slot1, $for.idx=slot2
        let mut buf = CodeBuffer::default();
        buf.op(Op::Gtrunc);
        buf.u32(3);
        buf.op(Op::Pusha);
        buf.u32(0);
        buf.op(Op::Setv);
        buf.u32(0);
        for i in 1..=3i64 {
            buf.op(Op::Pushv);
            buf.u32(0);
            buf.op(Op::Pushi);
            buf.i64(i);
            buf.op(Op::Append);
            buf.op(Op::Setv);
            buf.u32(0);
        }
        buf.op(Op::Pushi);
        buf.i64(0);
        buf.op(Op::Setv);
        buf.u32(2);
        let loop_start = buf.offset();
        buf.op(Op::For);
        buf.u32(0);
        buf.u32(1);
        buf.u32(2);
        let end_patch = buf.u32(0);
        buf.op(Op::Group);
        buf.op(Op::Pushv);
        buf.u32(1);
        buf.op(Op::Gprint);
        buf.op(Op::Jump);
        buf.u32(loop_start);
        let end_off = buf.offset();
        buf.patch_u32(end_patch, end_off);
        buf.op(Op::Exit);

        let program = Program {
            code: buf.code,
            data: buf.data,
        };
        let mut rt = Runtime::new(program, 0);
        assert_eq!(rt.eval(), EvalOutcome::Output(b"1".to_vec()));
        assert_eq!(rt.eval(), EvalOutcome::Output(b"2".to_vec()));
        assert_eq!(rt.eval(), EvalOutcome::Output(b"3".to_vec()));
        assert_eq!(rt.eval(), EvalOutcome::Done);
    }
}
