//! Host-cooperator API (spec.md §4.5 "Sysvar/syscall protocol", §6
//! "Host-value API"): the calls a host program makes while a [`Runtime`] is
//! suspended in [`EvalOutcome::Var`]/[`EvalOutcome::Call`] to inspect
//! arguments and supply results.
//!
//! Every method here errors with [`RuntimeError::HostProtocol`] if called
//! while the runtime isn't suspended — these are not ordinary VM opcodes,
//! they're the other half of the cooperative-suspension contract described
//! in spec.md §5.

use crate::error::RuntimeError;
use crate::value::{self, Value};
use crate::vm::{Runtime, Suspend};

impl Runtime {
    /// Number of argument values still available to peek/pop. Zero while
    /// suspended on `VAR` (there's nothing to read, only one value to push)
    /// and while not suspended at all.
    pub fn window_len(&self) -> usize {
        match self.suspend {
            Suspend::Call { argc, consumed, .. } => argc - consumed,
            Suspend::Var { .. } | Suspend::None => 0,
        }
    }

    fn arg_index(&self, offset_from_top: isize) -> Result<usize, RuntimeError> {
        if offset_from_top >= 0 {
            return Err(RuntimeError::HostProtocol(
                "peek offset must be negative (top of window is -1)".into(),
            ));
        }
        let remaining = self.window_len();
        let n = (-offset_from_top) as usize;
        if n > remaining {
            return Err(RuntimeError::HostProtocol(
                "peek/pop offset past the start of the argument window".into(),
            ));
        }
        let Suspend::Call { window_base, .. } = self.suspend else {
            return Err(RuntimeError::HostProtocol(
                "peek/pop is only valid while suspended in CALL".into(),
            ));
        };
        Ok(window_base + remaining - n)
    }

    /// Reads the argument `offset_from_top` below the top of the window
    /// (`-1` is the last/topmost argument) without consuming it.
    pub fn peek_any(&self, offset_from_top: isize) -> Result<Value, RuntimeError> {
        let idx = self.arg_index(offset_from_top)?;
        Ok(self.eval_stack()[idx])
    }

    pub fn peek_none(&self, offset_from_top: isize) -> Result<(), RuntimeError> {
        match self.peek_any(offset_from_top)? {
            Value::None => Ok(()),
            _ => Err(RuntimeError::TypeMismatch { op: "peek_none" }),
        }
    }

    pub fn peek_int(&self, offset_from_top: isize) -> Result<i64, RuntimeError> {
        value::get_int(self.peek_any(offset_from_top)?)
            .ok_or(RuntimeError::TypeMismatch { op: "peek_int" })
    }

    pub fn peek_float(&self, offset_from_top: isize) -> Result<f64, RuntimeError> {
        value::get_float(self.peek_any(offset_from_top)?)
            .ok_or(RuntimeError::TypeMismatch { op: "peek_float" })
    }

    pub fn peek_str(&self, offset_from_top: isize) -> Result<String, RuntimeError> {
        let v = self.peek_any(offset_from_top)?;
        value::get_str(self.arena(), v).ok_or(RuntimeError::TypeMismatch { op: "peek_str" })
    }

    /// Consumes the topmost remaining argument (whatever its type).
    pub fn pop_any(&mut self) -> Result<Value, RuntimeError> {
        let v = self.peek_any(-1)?;
        match &mut self.suspend {
            Suspend::Call { consumed, .. } => *consumed += 1,
            _ => return Err(RuntimeError::HostProtocol("pop is only valid in CALL".into())),
        }
        Ok(v)
    }

    pub fn pop_none(&mut self) -> Result<(), RuntimeError> {
        match self.pop_any()? {
            Value::None => Ok(()),
            _ => Err(RuntimeError::TypeMismatch { op: "pop_none" }),
        }
    }

    pub fn pop_int(&mut self) -> Result<i64, RuntimeError> {
        value::get_int(self.pop_any()?).ok_or(RuntimeError::TypeMismatch { op: "pop_int" })
    }

    pub fn pop_float(&mut self) -> Result<f64, RuntimeError> {
        value::get_float(self.pop_any()?).ok_or(RuntimeError::TypeMismatch { op: "pop_float" })
    }

    pub fn pop_str(&mut self) -> Result<String, RuntimeError> {
        let v = self.pop_any()?;
        value::get_str(self.arena(), v).ok_or(RuntimeError::TypeMismatch { op: "pop_str" })
    }

    /// `set[key]`, array-by-int or map-by-any-key.
    pub fn select(&self, set: Value, key: Value) -> Result<Value, RuntimeError> {
        match set {
            Value::Map(id) => self
                .arena()
                .map_select(id, key, |a, b| value::valeq(self.arena(), a, b))
                .ok_or(RuntimeError::KeyNotFound),
            Value::Array(id) => {
                let idx = value::get_int(key).ok_or(RuntimeError::TypeMismatch { op: "select" })?;
                let length = self.arena().array_len(id);
                self.arena()
                    .array_select(id, idx)
                    .ok_or(RuntimeError::IndexOutOfRange { index: idx, length })
            }
            _ => Err(RuntimeError::TypeMismatch { op: "select" }),
        }
    }

    /// `set[key] = value`, array-by-int or map-by-any-key (map inserts
    /// unconditionally, per spec.md §3: duplicate keys shadow, never merge).
    pub fn insert(&self, set: Value, value: Value, key: Value) -> Result<(), RuntimeError> {
        match set {
            Value::Map(id) => Ok(self.arena().map_insert(id, key, value)?),
            Value::Array(id) => {
                let idx =
                    value::get_int(key).ok_or(RuntimeError::TypeMismatch { op: "insert" })?;
                let length = self.arena().array_len(id);
                self.arena()
                    .array_set(id, idx, value)
                    .ok_or(RuntimeError::IndexOutOfRange { index: idx, length })
            }
            _ => Err(RuntimeError::TypeMismatch { op: "insert" }),
        }
    }

    pub fn append(&self, array: Value, value: Value) -> Result<(), RuntimeError> {
        let Value::Array(id) = array else {
            return Err(RuntimeError::TypeMismatch { op: "append" });
        };
        Ok(self.arena().array_append(id, value)?)
    }

    fn check_can_push(&self) -> Result<(), RuntimeError> {
        match self.suspend {
            Suspend::Var { .. } | Suspend::Call { .. } => Ok(()),
            Suspend::None => Err(RuntimeError::HostProtocol(
                "push is only valid while suspended in VAR or CALL".into(),
            )),
        }
    }

    pub fn push_none(&mut self) -> Result<(), RuntimeError> {
        self.check_can_push()?;
        self.push(Value::None)
    }

    pub fn push_int(&mut self, v: i64) -> Result<(), RuntimeError> {
        self.check_can_push()?;
        self.push(Value::Int(v))
    }

    pub fn push_float(&mut self, v: f64) -> Result<(), RuntimeError> {
        self.check_can_push()?;
        self.push(Value::Float(v))
    }

    pub fn push_str(&mut self, s: &str) -> Result<(), RuntimeError> {
        self.check_can_push()?;
        let v = value::make_str(self.arena(), s.as_bytes())?;
        self.push(v)
    }

    /// Allocates a fresh empty array, pushes it, and returns its handle so
    /// the host can `append` into it before resuming `eval()`.
    pub fn push_array(&mut self) -> Result<Value, RuntimeError> {
        self.check_can_push()?;
        let v = value::make_array(self.arena())?;
        self.push(v)?;
        Ok(v)
    }

    /// Allocates a fresh empty map, pushes it, and returns its handle so the
    /// host can `insert` into it before resuming `eval()`.
    pub fn push_map(&mut self) -> Result<Value, RuntimeError> {
        self.check_can_push()?;
        let v = value::make_map(self.arena())?;
        self.push(v)?;
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{CodeBuffer, Op, Program};
    use crate::vm::EvalOutcome;

    fn build(f: impl FnOnce(&mut CodeBuffer)) -> Program {
        let mut buf = CodeBuffer::default();
        f(&mut buf);
        Program {
            code: buf.code,
            data: buf.data,
        }
    }

    #[test]
    fn sysvar_resumes_with_exactly_one_pushed_value() {
        let program = build(|buf| {
            let (off, len) = buf.intern("theme");
            buf.op(Op::Sysvar);
            buf.u32(off);
            buf.u32(len);
            buf.op(Op::Group);
            buf.op(Op::Pushv);
            buf.u32(0);
            buf.op(Op::Gprint);
            buf.op(Op::Exit);
        });
        let mut rt = Runtime::new(program, 0);
        assert_eq!(rt.eval(), EvalOutcome::Var("theme".to_string()));
        rt.push_str("dark").unwrap();
        assert_eq!(rt.eval(), EvalOutcome::Output(b"dark".to_vec()));
        assert_eq!(rt.eval(), EvalOutcome::Done);
    }

    #[test]
    fn syscall_args_are_peekable_and_results_compact_to_group_base() {
        // GROUP; PUSHI 1; PUSHI 2; SYSCALL "add"; GCOALESCE; GROUP; PUSHV 0; GPRINT; EXIT
        let program = build(|buf| {
            buf.op(Op::Gtrunc);
            buf.u32(1);
            buf.op(Op::Group);
            buf.op(Op::Pushi);
            buf.i64(1);
            buf.op(Op::Pushi);
            buf.i64(2);
            let (off, len) = buf.intern("add");
            buf.op(Op::Syscall);
            buf.u32(off);
            buf.u32(len);
            buf.op(Op::Gcoalesce);
            buf.op(Op::Setv);
            buf.u32(0);
            buf.op(Op::Group);
            buf.op(Op::Pushv);
            buf.u32(0);
            buf.op(Op::Gprint);
            buf.op(Op::Exit);
        });
        let mut rt = Runtime::new(program, 0);
        assert_eq!(rt.eval(), EvalOutcome::Call("add".to_string()));
        assert_eq!(rt.window_len(), 2);
        let b = rt.pop_int().unwrap();
        let a = rt.pop_int().unwrap();
        assert_eq!((a, b), (1, 2));
        rt.push_int(a + b).unwrap();
        assert_eq!(rt.eval(), EvalOutcome::Output(b"3".to_vec()));
        assert_eq!(rt.eval(), EvalOutcome::Done);
    }
}
