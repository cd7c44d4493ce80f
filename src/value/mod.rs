//! Tagged value representation (spec.md §3 "Value") and the arithmetic,
//! comparison and formatting rules that opcodes in [`crate::vm`] build on.
//!
//! The original C representation packs a discriminator into the low three
//! bits of a 64-bit word and boxes anything that doesn't fit. In Rust an
//! algebraic enum gives the same "total, cheap `type_of`" property the spec
//! requires (spec.md §9) without the bit-packing trick, so `Value` carries
//! its discriminant directly; boxed kinds (string/array/map) hold an
//! [`ArenaId`] instead of a raw pointer.

pub mod collections;

use std::io::Write as _;

use crate::arena::{Arena, ArenaId};
use crate::error::RuntimeError;
pub use collections::{ArrayChunk, ArrayObj, MapChunk, MapObj};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type {
    None,
    Bool,
    Int,
    Float,
    String,
    Array,
    Map,
    Error,
}

impl Type {
    pub fn name(self) -> &'static str {
        match self {
            Type::None => "none",
            Type::Bool => "bool",
            Type::Int => "int",
            Type::Float => "float",
            Type::String => "string",
            Type::Array => "array",
            Type::Map => "map",
            Type::Error => "error",
        }
    }
}

/// A runtime value. `Copy` because every variant is either scalar or a
/// 32-bit arena index — there is never an owned heap pointer to worry about
/// dropping twice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(ArenaId),
    Array(ArenaId),
    Map(ArenaId),
    /// The ERROR sentinel (spec.md §3). Never stored in a container; used
    /// only as a VM-internal marker.
    Error,
}

/// Heap-allocated payloads, addressed from a `Value::{Str,Array,Map}` by
/// `ArenaId`, plus the chunk continuations used by [`collections`].
#[derive(Debug, Clone)]
pub enum HeapObj {
    /// Raw bytes, not necessarily valid UTF-8: a `\xHH` escape can produce a
    /// lone non-UTF-8 byte that must survive untouched to `OUTPUT` (spec.md
    /// §8).
    Str(Vec<u8>),
    Array(ArrayObj),
    Map(MapObj),
    ArrayChunk(ArrayChunk),
    MapChunk(MapChunk),
}

impl HeapObj {
    /// Rough byte cost used by [`Arena`]'s capacity accounting.
    pub fn approx_size(&self) -> usize {
        match self {
            HeapObj::Str(s) => 24 + s.len(),
            HeapObj::Array(_) => 24 + collections::ARRAY_CHUNK_CAP * 16,
            HeapObj::Map(_) => 24 + collections::MAP_CHUNK_CAP * 32,
            HeapObj::ArrayChunk(c) => 24 + c.values.len() * 16,
            HeapObj::MapChunk(c) => 24 + c.pairs.len() * 32,
        }
    }
}

pub fn type_of(v: Value) -> Type {
    match v {
        Value::None => Type::None,
        Value::Bool(_) => Type::Bool,
        Value::Int(_) => Type::Int,
        Value::Float(_) => Type::Float,
        Value::Str(_) => Type::String,
        Value::Array(_) => Type::Array,
        Value::Map(_) => Type::Map,
        Value::Error => Type::Error,
    }
}

pub fn make_int(x: i64) -> Value {
    Value::Int(x)
}

pub fn make_float(x: f64) -> Value {
    Value::Float(x)
}

pub fn make_str(arena: &Arena, bytes: &[u8]) -> Result<Value, RuntimeError> {
    let id = arena.alloc(HeapObj::Str(bytes.to_vec()))?;
    Ok(Value::Str(id))
}

pub fn make_array(arena: &Arena) -> Result<Value, RuntimeError> {
    let id = arena.alloc(HeapObj::Array(ArrayObj::new()))?;
    Ok(Value::Array(id))
}

pub fn make_map(arena: &Arena) -> Result<Value, RuntimeError> {
    let id = arena.alloc(HeapObj::Map(MapObj::new()))?;
    Ok(Value::Map(id))
}

pub fn get_int(v: Value) -> Option<i64> {
    match v {
        Value::Int(i) => Some(i),
        _ => None,
    }
}

pub fn get_float(v: Value) -> Option<f64> {
    match v {
        Value::Float(f) => Some(f),
        _ => None,
    }
}

/// Zero-copy view of a string value's raw bytes, not necessarily valid
/// UTF-8 (spec.md §8: a `\xHH` escape can produce a lone non-UTF-8 byte).
/// Equality and ordering compare through this, never through a lossy
/// decode, so two different non-UTF-8 byte sequences can never be made to
/// look equal by both collapsing to the same `U+FFFD` replacement.
pub fn get_bytes<'a>(arena: &'a Arena, v: Value) -> Option<std::cell::Ref<'a, [u8]>> {
    match v {
        Value::Str(id) => Some(std::cell::Ref::map(arena.get(id), |h| match h {
            HeapObj::Str(s) => s.as_slice(),
            _ => unreachable!(),
        })),
        _ => None,
    }
}

/// Lossy owned-`String` view, for host-facing text access
/// ([`crate::host::Runtime::peek_str`]/`pop_str`) where an embedder wants an
/// ordinary Rust string rather than raw bytes.
pub fn get_str(arena: &Arena, v: Value) -> Option<String> {
    get_bytes(arena, v).map(|b| String::from_utf8_lossy(&b).into_owned())
}

/// Structural equality for scalars and strings (compared by content, the
/// way `valgrt` already compares string content below); identity (by arena
/// id) for arrays and maps (spec.md §4.5: "maps and arrays compare by
/// identity only, not deep"). Two `Str` handles from separate `make_str`
/// calls with equal content must compare equal, since every `PUSHS`/string
/// literal allocates a fresh `ArenaId` — comparing ids here would make
/// `'a'=='a'` false and break string-keyed map `SELECT`/`FOR`.
pub fn valeq(arena: &Arena, a: Value, b: Value) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => (x as f64) == y,
        (Value::Str(x), Value::Str(y)) => {
            *get_bytes(arena, Value::Str(x)).unwrap() == *get_bytes(arena, Value::Str(y)).unwrap()
        }
        (Value::Array(x), Value::Array(y)) => x == y,
        (Value::Map(x), Value::Map(y)) => x == y,
        _ => false,
    }
}

/// `a > b`, the `GRT` opcode's comparison (`LSS` is `valgrt(b, a)`).
pub fn valgrt(arena: &Arena, a: Value, b: Value) -> Result<bool, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x > y),
        (Value::Float(x), Value::Float(y)) => Ok(x > y),
        (Value::Int(x), Value::Float(y)) => Ok((x as f64) > y),
        (Value::Float(x), Value::Int(y)) => Ok(x > (y as f64)),
        (Value::Str(x), Value::Str(y)) => {
            let sx = get_bytes(arena, Value::Str(x)).unwrap();
            let sy = get_bytes(arena, Value::Str(y)).unwrap();
            Ok(*sx > *sy)
        }
        _ => Err(RuntimeError::TypeMismatch { op: "comparison" }),
    }
}

fn numeric_binop(
    a: Value,
    b: Value,
    op_name: &'static str,
    int_op: impl FnOnce(i64, i64) -> Result<i64, RuntimeError>,
    float_op: impl FnOnce(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(int_op(x, y)?)),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(float_op(x, y))),
        (Value::Int(x), Value::Float(y)) => Ok(Value::Float(float_op(x as f64, y))),
        (Value::Float(x), Value::Int(y)) => Ok(Value::Float(float_op(x, y as f64))),
        _ => Err(RuntimeError::TypeMismatch { op: op_name }),
    }
}

pub fn add(a: Value, b: Value) -> Result<Value, RuntimeError> {
    numeric_binop(
        a,
        b,
        "ADD",
        |x, y| Ok(x.wrapping_add(y)),
        |x, y| x + y,
    )
}

pub fn sub(a: Value, b: Value) -> Result<Value, RuntimeError> {
    numeric_binop(
        a,
        b,
        "SUB",
        |x, y| Ok(x.wrapping_sub(y)),
        |x, y| x - y,
    )
}

pub fn mul(a: Value, b: Value) -> Result<Value, RuntimeError> {
    numeric_binop(
        a,
        b,
        "MUL",
        |x, y| Ok(x.wrapping_mul(y)),
        |x, y| x * y,
    )
}

pub fn div(a: Value, b: Value) -> Result<Value, RuntimeError> {
    numeric_binop(
        a,
        b,
        "DIV",
        |x, y| {
            if y == 0 {
                Err(RuntimeError::DivideByZero)
            } else {
                Ok(x.wrapping_div(y))
            }
        },
        |x, y| x / y,
    )
}

/// `MOD` is integer-only (spec.md §4.5).
pub fn modulo(a: Value, b: Value) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(_), Value::Int(0)) => Err(RuntimeError::DivideByZero),
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(x.wrapping_rem(y))),
        _ => Err(RuntimeError::TypeMismatch { op: "MOD" }),
    }
}

pub fn neg(a: Value) -> Result<Value, RuntimeError> {
    match a {
        Value::Int(x) => Ok(Value::Int(x.wrapping_neg())),
        Value::Float(x) => Ok(Value::Float(-x)),
        _ => Err(RuntimeError::TypeMismatch { op: "NEG" }),
    }
}

/// The canonical rendering used for `OUTPUT` and implicit print coercions
/// (spec.md glossary: `value_to_string`). Returns raw bytes, not a `String`:
/// a string value's bytes (which may include a lone non-UTF-8 byte from a
/// `\xHH` escape) must reach the host untouched, which a `String` sink
/// cannot carry without re-encoding it as multi-byte UTF-8.
pub fn value_to_bytes(arena: &Arena, v: Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(arena, v, &mut out);
    out
}

fn write_value(arena: &Arena, v: Value, out: &mut Vec<u8>) {
    match v {
        Value::None => {}
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Int(i) => {
            let _ = write!(out, "{i}");
        }
        Value::Float(f) => {
            let _ = write!(out, "{f}");
        }
        Value::Error => out.extend_from_slice(b"<error>"),
        Value::Str(id) => {
            if let HeapObj::Str(s) = &*arena.get(id) {
                out.extend_from_slice(s);
            }
        }
        Value::Array(id) => {
            for item in arena.array_values(id) {
                write_value(arena, item, out);
            }
        }
        Value::Map(id) => {
            out.push(b'{');
            for (i, (k, val)) in arena.map_pairs(id).into_iter().enumerate() {
                if i > 0 {
                    out.extend_from_slice(b", ");
                }
                write_value(arena, k, out);
                out.extend_from_slice(b": ");
                write_value(arena, val, out);
            }
            out.push(b'}');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_roundtrip() {
        let v = make_int(-42);
        assert_eq!(type_of(v), Type::Int);
        assert_eq!(get_int(v), Some(-42));
    }

    #[test]
    fn add_is_commutative() {
        let a = Value::Int(3);
        let b = Value::Int(4);
        assert_eq!(add(a, b).unwrap(), add(b, a).unwrap());
    }

    #[test]
    fn sub_is_neg_of_reverse() {
        let a = Value::Int(10);
        let b = Value::Int(3);
        let lhs = sub(a, b).unwrap();
        let rhs = neg(sub(b, a).unwrap()).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn mixed_int_float_widens_to_float() {
        let r = add(Value::Int(1), Value::Float(2.5)).unwrap();
        assert_eq!(r, Value::Float(3.5));
    }

    #[test]
    fn mod_rejects_floats() {
        assert!(modulo(Value::Float(1.0), Value::Int(2)).is_err());
    }

    #[test]
    fn array_append_and_select() {
        let arena = Arena::new(0);
        let arr = make_array(&arena).unwrap();
        let Value::Array(id) = arr else { unreachable!() };
        for i in 0..40 {
            arena.array_append(id, Value::Int(i)).unwrap();
        }
        assert_eq!(arena.array_len(id), 40);
        for i in 0..40 {
            assert_eq!(arena.array_select(id, i), Some(Value::Int(i)));
        }
        assert_eq!(arena.array_select(id, 40), None);
    }

    #[test]
    fn map_select_returns_first_match() {
        let arena = Arena::new(0);
        let map = make_map(&arena).unwrap();
        let Value::Map(id) = map else { unreachable!() };
        // Two distinct allocations of equal content, not one reused handle:
        // this is what exercises content-based (not identity-based) lookup.
        let key1 = make_str(&arena, b"k").unwrap();
        let key2 = make_str(&arena, b"k").unwrap();
        arena.map_insert(id, key1, Value::Int(1)).unwrap();
        arena.map_insert(id, key2, Value::Int(2)).unwrap();
        let found = arena.map_select(id, key2, |a, b| valeq(&arena, a, b));
        assert_eq!(found, Some(Value::Int(1)));
    }

    #[test]
    fn string_equality_is_structural_not_by_identity() {
        let arena = Arena::new(0);
        let a = make_str(&arena, b"same").unwrap();
        let b = make_str(&arena, b"same").unwrap();
        let Value::Str(ai) = a else { unreachable!() };
        let Value::Str(bi) = b else { unreachable!() };
        assert_ne!(ai, bi, "test needs two distinct allocations");
        assert!(valeq(&arena, a, b));
    }

    #[test]
    fn map_keys_unique_preserves_first_occurrence_order() {
        let arena = Arena::new(0);
        let map = make_map(&arena).unwrap();
        let Value::Map(id) = map else { unreachable!() };
        // Each key is allocated twice with equal content, so dedup must go
        // by content, not by `ArenaId`, to collapse to two unique keys.
        let a1 = make_str(&arena, b"a").unwrap();
        let a2 = make_str(&arena, b"a").unwrap();
        let b = make_str(&arena, b"b").unwrap();
        arena.map_insert(id, a1, Value::Int(1)).unwrap();
        arena.map_insert(id, b, Value::Int(2)).unwrap();
        arena.map_insert(id, a2, Value::Int(3)).unwrap();
        let keys = arena.map_keys_unique(id, |x, y| valeq(&arena, x, y));
        assert_eq!(keys.len(), 2);
        assert!(valeq(&arena, keys[0], a1));
        assert!(valeq(&arena, keys[1], b));
    }
}
