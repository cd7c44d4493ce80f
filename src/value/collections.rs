//! Chunked array/map collections (spec.md §3 "Collections").
//!
//! Both are singly-linked lists of fixed-size chunks rather than a single
//! growable buffer: appends never need to move existing elements, which
//! matters because values live in a bump arena that never reallocates an
//! existing allocation. Map lookup is a linear scan in insertion order by
//! design (spec.md §9: "this is a small-map bias, not a bug").

use crate::arena::{Arena, ArenaError, ArenaId};
use crate::value::Value;

pub const ARRAY_CHUNK_CAP: usize = 16;
pub const MAP_CHUNK_CAP: usize = 8;

#[derive(Debug, Clone)]
pub struct ArrayChunk {
    pub values: Vec<Value>,
    pub next: Option<ArenaId>,
}

#[derive(Debug, Clone)]
pub struct ArrayObj {
    pub head: ArrayChunk,
    pub tail: Option<ArenaId>,
    pub count: u32,
}

impl ArrayObj {
    pub fn new() -> Self {
        ArrayObj {
            head: ArrayChunk {
                values: Vec::with_capacity(ARRAY_CHUNK_CAP),
                next: None,
            },
            tail: None,
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }
}

impl Default for ArrayObj {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct MapChunk {
    pub pairs: Vec<(Value, Value)>,
    pub next: Option<ArenaId>,
}

#[derive(Debug, Clone)]
pub struct MapObj {
    pub head: MapChunk,
    pub tail: Option<ArenaId>,
    pub count: u32,
}

impl MapObj {
    pub fn new() -> Self {
        MapObj {
            head: MapChunk {
                pairs: Vec::with_capacity(MAP_CHUNK_CAP),
                next: None,
            },
            tail: None,
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }
}

impl Default for MapObj {
    fn default() -> Self {
        Self::new()
    }
}

impl super::HeapObj {
    pub(crate) fn as_array_chunk_mut(&mut self) -> &mut ArrayChunk {
        match self {
            super::HeapObj::ArrayChunk(c) => c,
            _ => unreachable!("arena id did not point at an array chunk"),
        }
    }
    pub(crate) fn as_map_chunk_mut(&mut self) -> &mut MapChunk {
        match self {
            super::HeapObj::MapChunk(c) => c,
            _ => unreachable!("arena id did not point at a map chunk"),
        }
    }
}

impl Arena {
    /// Appends `v` to the array identified by `arr_id`. `arr_id` must name a
    /// `HeapObj::Array`.
    pub fn array_append(&self, arr_id: ArenaId, v: Value) -> Result<(), ArenaError> {
        let tail = self.with_mut(arr_id, |obj| match obj {
            super::HeapObj::Array(a) => a.tail,
            _ => unreachable!("array_append on non-array id"),
        });

        let overflowed = match tail {
            None => self.with_mut(arr_id, |obj| {
                let a = match obj {
                    super::HeapObj::Array(a) => a,
                    _ => unreachable!(),
                };
                if a.head.values.len() < ARRAY_CHUNK_CAP {
                    a.head.values.push(v);
                    a.count += 1;
                    None
                } else {
                    Some(())
                }
            }),
            Some(tail_id) => self.with_mut(tail_id, |obj| {
                let chunk = obj.as_array_chunk_mut();
                if chunk.values.len() < ARRAY_CHUNK_CAP {
                    chunk.values.push(v);
                    None
                } else {
                    Some(())
                }
            }),
        };

        if overflowed.is_some() {
            let new_id = self.alloc(super::HeapObj::ArrayChunk(ArrayChunk {
                values: vec![v],
                next: None,
            }))?;
            match tail {
                None => self.with_mut(arr_id, |obj| {
                    let a = match obj {
                        super::HeapObj::Array(a) => a,
                        _ => unreachable!(),
                    };
                    a.head.next = Some(new_id);
                    a.tail = Some(new_id);
                }),
                Some(tail_id) => {
                    self.with_mut(tail_id, |obj| obj.as_array_chunk_mut().next = Some(new_id));
                }
            }
            self.with_mut(arr_id, |obj| {
                if let super::HeapObj::Array(a) = obj {
                    a.tail = Some(new_id);
                    a.count += 1;
                }
            });
        }
        Ok(())
    }

    /// Returns the `i`-th appended value, or `None` if out of range.
    pub fn array_select(&self, arr_id: ArenaId, index: i64) -> Option<Value> {
        if index < 0 {
            return None;
        }
        let mut index = index as usize;
        let head = self.with_mut(arr_id, |obj| match obj {
            super::HeapObj::Array(a) => a.clone(),
            _ => unreachable!("array_select on non-array id"),
        });
        if index < head.head.values.len() {
            return Some(head.head.values[index]);
        }
        index -= head.head.values.len();
        let mut next = head.head.next;
        while let Some(chunk_id) = next {
            let chunk = self.with_mut(chunk_id, |obj| obj.as_array_chunk_mut().clone());
            if index < chunk.values.len() {
                return Some(chunk.values[index]);
            }
            index -= chunk.values.len();
            next = chunk.next;
        }
        None
    }

    /// Overwrites the `index`-th appended value in place. `None` if out of
    /// range — callers turn that into `RuntimeError::IndexOutOfRange`.
    pub fn array_set(&self, arr_id: ArenaId, index: i64, v: Value) -> Option<()> {
        if index < 0 {
            return None;
        }
        let mut index = index as usize;
        let head_len = self.with_mut(arr_id, |obj| match obj {
            super::HeapObj::Array(a) => a.head.values.len(),
            _ => unreachable!("array_set on non-array id"),
        });
        if index < head_len {
            self.with_mut(arr_id, |obj| match obj {
                super::HeapObj::Array(a) => a.head.values[index] = v,
                _ => unreachable!(),
            });
            return Some(());
        }
        index -= head_len;
        let mut next = self.with_mut(arr_id, |obj| match obj {
            super::HeapObj::Array(a) => a.head.next,
            _ => unreachable!(),
        });
        while let Some(chunk_id) = next {
            let len = self.with_mut(chunk_id, |obj| obj.as_array_chunk_mut().values.len());
            if index < len {
                self.with_mut(chunk_id, |obj| obj.as_array_chunk_mut().values[index] = v);
                return Some(());
            }
            index -= len;
            next = self.with_mut(chunk_id, |obj| obj.as_array_chunk_mut().next);
        }
        None
    }

    pub fn array_len(&self, arr_id: ArenaId) -> usize {
        self.with_mut(arr_id, |obj| match obj {
            super::HeapObj::Array(a) => a.len(),
            _ => unreachable!("array_len on non-array id"),
        })
    }

    /// All values in append order. Used by value_to_bytes and FOR iteration.
    pub fn array_values(&self, arr_id: ArenaId) -> Vec<Value> {
        let head = self.with_mut(arr_id, |obj| match obj {
            super::HeapObj::Array(a) => a.clone(),
            _ => unreachable!("array_values on non-array id"),
        });
        let mut out = head.head.values.clone();
        let mut next = head.head.next;
        while let Some(chunk_id) = next {
            let chunk = self.with_mut(chunk_id, |obj| obj.as_array_chunk_mut().clone());
            out.extend_from_slice(&chunk.values);
            next = chunk.next;
        }
        out
    }

    /// Appends a `(key, value)` pair unconditionally; duplicate keys shadow
    /// on lookup but are never rejected or merged (spec.md §3).
    pub fn map_insert(&self, map_id: ArenaId, key: Value, val: Value) -> Result<(), ArenaError> {
        let tail = self.with_mut(map_id, |obj| match obj {
            super::HeapObj::Map(m) => m.tail,
            _ => unreachable!("map_insert on non-map id"),
        });

        let overflowed = match tail {
            None => self.with_mut(map_id, |obj| {
                let m = match obj {
                    super::HeapObj::Map(m) => m,
                    _ => unreachable!(),
                };
                if m.head.pairs.len() < MAP_CHUNK_CAP {
                    m.head.pairs.push((key, val));
                    m.count += 1;
                    None
                } else {
                    Some(())
                }
            }),
            Some(tail_id) => self.with_mut(tail_id, |obj| {
                let chunk = obj.as_map_chunk_mut();
                if chunk.pairs.len() < MAP_CHUNK_CAP {
                    chunk.pairs.push((key, val));
                    None
                } else {
                    Some(())
                }
            }),
        };

        if overflowed.is_some() {
            let new_id = self.alloc(super::HeapObj::MapChunk(MapChunk {
                pairs: vec![(key, val)],
                next: None,
            }))?;
            match tail {
                None => self.with_mut(map_id, |obj| {
                    let m = match obj {
                        super::HeapObj::Map(m) => m,
                        _ => unreachable!(),
                    };
                    m.head.next = Some(new_id);
                    m.tail = Some(new_id);
                }),
                Some(tail_id) => {
                    self.with_mut(tail_id, |obj| obj.as_map_chunk_mut().next = Some(new_id));
                }
            }
            self.with_mut(map_id, |obj| {
                if let super::HeapObj::Map(m) = obj {
                    m.tail = Some(new_id);
                    m.count += 1;
                }
            });
        }
        Ok(())
    }

    /// All `(key, value)` pairs in insertion order, including shadowed
    /// duplicates; callers that need "first occurrence wins" semantics use
    /// [`Arena::map_select`] or [`Arena::map_keys_unique`].
    pub fn map_pairs(&self, map_id: ArenaId) -> Vec<(Value, Value)> {
        let head = self.with_mut(map_id, |obj| match obj {
            super::HeapObj::Map(m) => m.clone(),
            _ => unreachable!("map_pairs on non-map id"),
        });
        let mut out = head.head.pairs.clone();
        let mut next = head.head.next;
        while let Some(chunk_id) = next {
            let chunk = self.with_mut(chunk_id, |obj| obj.as_map_chunk_mut().clone());
            out.extend_from_slice(&chunk.pairs);
            next = chunk.next;
        }
        out
    }

    pub fn map_len(&self, map_id: ArenaId) -> usize {
        self.with_mut(map_id, |obj| match obj {
            super::HeapObj::Map(m) => m.len(),
            _ => unreachable!("map_len on non-map id"),
        })
    }

    /// Linear scan in insertion order; returns the first matching key's
    /// value (spec.md §8: "linear-scan SELECT returns the first matching
    /// key's value").
    pub fn map_select(&self, map_id: ArenaId, key: Value, arena_eq: impl Fn(Value, Value) -> bool) -> Option<Value> {
        for (k, v) in self.map_pairs(map_id) {
            if arena_eq(k, key) {
                return Some(v);
            }
        }
        None
    }

    /// Keys in insertion order of *first* occurrence, deduplicated — the
    /// order `FOR x in map` iterates (spec.md §8).
    pub fn map_keys_unique(&self, map_id: ArenaId, arena_eq: impl Fn(Value, Value) -> bool) -> Vec<Value> {
        let mut seen: Vec<Value> = Vec::new();
        for (k, _) in self.map_pairs(map_id) {
            if !seen.iter().any(|s| arena_eq(*s, k)) {
                seen.push(k);
            }
        }
        seen
    }
}
