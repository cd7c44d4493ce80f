//! Multi-file, host-paced compiler driver (spec.md §4.3, §6 "Compiler
//! API"). Grounded on the teacher's `compiler::workspace::CompilerWorkspace`
//! — a map of compiled units keyed by path — but paced differently: the
//! teacher's workspace loads files itself, while this driver never touches
//! a filesystem. It only ever reports which include path it's still
//! missing; the host supplies the next file by calling `add` again
//! (spec.md's `NEEDS_FILE`/`AGAIN` protocol, named [`AddOutcome`] here).

use std::collections::HashMap;

use crate::assembler;
use crate::error::CompileError;
use crate::parser::ast::{FunDecl, Stmt};
use crate::parser::Parser;
use crate::program::Program;

/// Fixed cap on distinct files in one compilation (spec.md §4.3: "a fixed
/// file-count cap (e.g. 32)").
pub const MAX_FILES: usize = 32;

struct CompiledUnit {
    body: Vec<Stmt>,
    includes: Vec<String>,
}

/// What the host should do next after `Compiler::add`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Every `include` referenced so far has a matching unit; `link` may be
    /// called with the entry path.
    Link,
    /// Some unit in the workspace references `path`, which hasn't been
    /// added yet — call `add(path, ...)` next.
    Again(String),
}

/// One `Compiler` compiles one program: `add` the entry unit and then every
/// unit `Again` asks for, in any order, until `add` returns `Link`; then
/// `link` the entry path into a [`Program`].
#[derive(Default)]
pub struct Compiler {
    units: HashMap<String, CompiledUnit>,
    error: Option<String>,
}

impl Compiler {
    pub fn new() -> Self {
        Compiler::default()
    }

    /// The first failure's message; empty if nothing has failed yet
    /// (spec.md §7: "the first cause is preserved").
    pub fn error(&self) -> String {
        self.error.clone().unwrap_or_default()
    }

    /// Parses `text` as the unit named `path` (a no-op if already added) and
    /// reports whether the workspace has every include it currently
    /// references.
    pub fn add(&mut self, path: &str, text: &str) -> Result<AddOutcome, CompileError> {
        if !self.units.contains_key(path) {
            if self.units.len() >= MAX_FILES {
                self.error = Some(CompileError::TooManyFiles.to_string());
                return Err(CompileError::TooManyFiles);
            }
            let unit = Parser::new(text).parse_unit().map_err(|e| {
                self.error = Some(e.to_string());
                CompileError::from(e)
            })?;
            self.units.insert(
                path.to_string(),
                CompiledUnit {
                    body: unit.body,
                    includes: unit.includes,
                },
            );
        }
        match self.first_missing_include() {
            Some(missing) => Ok(AddOutcome::Again(missing)),
            None => Ok(AddOutcome::Link),
        }
    }

    fn first_missing_include(&self) -> Option<String> {
        self.units
            .values()
            .flat_map(|u| u.includes.iter())
            .find(|path| !self.units.contains_key(path.as_str()))
            .cloned()
    }

    /// Splices every reachable `include` in place (depth first, entry unit
    /// first) and assembles the result.
    pub fn link(&mut self, entry_path: &str) -> Result<Program, CompileError> {
        if let Some(missing) = self.first_missing_include() {
            return Err(CompileError::MissingInclude(missing));
        }
        let mut seen = vec![entry_path.to_string()];
        let body = self.splice_unit(entry_path, &mut seen)?;
        let buf = assembler::assemble(&body).map_err(|e| {
            self.error = Some(e.to_string());
            CompileError::from(e)
        })?;
        Ok(Program {
            code: buf.code,
            data: buf.data,
        })
    }

    fn splice_unit(&self, path: &str, seen: &mut Vec<String>) -> Result<Vec<Stmt>, CompileError> {
        let unit = self
            .units
            .get(path)
            .ok_or_else(|| CompileError::MissingInclude(path.to_string()))?;
        let mut out = Vec::with_capacity(unit.body.len());
        for stmt in &unit.body {
            out.extend(self.splice_stmt(stmt, seen)?);
        }
        Ok(out)
    }

    /// Expands `stmt` into the statements it should be replaced by, only
    /// ever >1 for `Include`. Descends into every nested statement position
    /// (block lists, if/while/for bodies, function bodies) so an `include`
    /// buried anywhere still resolves. Does not descend into HTML-embedded
    /// statements (`\<stmt>` inside an HTML literal) — including a file
    /// there isn't a construct this language gives any meaning to.
    fn splice_stmt(&self, stmt: &Stmt, seen: &mut Vec<String>) -> Result<Vec<Stmt>, CompileError> {
        Ok(match stmt {
            Stmt::Include(path) => {
                if seen.contains(path) {
                    return Err(CompileError::MissingInclude(format!(
                        "circular include: {path}"
                    )));
                }
                seen.push(path.clone());
                let spliced = self.splice_unit(path, seen)?;
                seen.pop();
                spliced
            }
            Stmt::Expr(_) | Stmt::Print(_) | Stmt::Let(_, _) => vec![stmt.clone()],
            Stmt::If(cond, then_b, else_b) => {
                let then_s = self.splice_single(then_b, seen)?;
                let else_s = match else_b {
                    Some(e) => Some(Box::new(self.splice_single(e, seen)?)),
                    None => None,
                };
                vec![Stmt::If(cond.clone(), Box::new(then_s), else_s)]
            }
            Stmt::While(cond, body) => {
                vec![Stmt::While(
                    cond.clone(),
                    Box::new(self.splice_single(body, seen)?),
                )]
            }
            Stmt::For(v1, v2, set, body) => {
                vec![Stmt::For(
                    v1.clone(),
                    v2.clone(),
                    set.clone(),
                    Box::new(self.splice_single(body, seen)?),
                )]
            }
            Stmt::FunDecl(f) => {
                let body = Box::new(self.splice_single(&f.body, seen)?);
                vec![Stmt::FunDecl(FunDecl {
                    name: f.name.clone(),
                    params: f.params.clone(),
                    body,
                    is_procedure: f.is_procedure,
                })]
            }
            Stmt::Block(stmts) => {
                let mut out = Vec::with_capacity(stmts.len());
                for s in stmts {
                    out.extend(self.splice_stmt(s, seen)?);
                }
                vec![Stmt::Block(out)]
            }
        })
    }

    /// Like `splice_stmt`, but for the single-statement-body positions
    /// (`if`/`while`/`for`'s body, a function's body): if splicing expands
    /// to anything other than exactly one statement, wraps the result in a
    /// `Block` so the caller still has one `Stmt` to hold.
    fn splice_single(&self, stmt: &Stmt, seen: &mut Vec<String>) -> Result<Stmt, CompileError> {
        let mut expanded = self.splice_stmt(stmt, seen)?;
        Ok(if expanded.len() == 1 {
            expanded.pop().unwrap()
        } else {
            Stmt::Block(expanded)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_file_links_directly() {
        let mut c = Compiler::new();
        assert_eq!(c.add("main.wl", "1 + 2").unwrap(), AddOutcome::Link);
        assert!(c.link("main.wl").is_ok());
    }

    #[test]
    fn missing_include_asks_again_then_links() {
        let mut c = Compiler::new();
        assert_eq!(
            c.add("main.wl", "include \"lib.wl\"\n1").unwrap(),
            AddOutcome::Again("lib.wl".to_string())
        );
        assert_eq!(c.add("lib.wl", "let x = 1").unwrap(), AddOutcome::Link);
        assert!(c.link("main.wl").is_ok());
    }

    #[test]
    fn file_count_cap_is_enforced() {
        let mut c = Compiler::new();
        for i in 0..MAX_FILES {
            c.add(&format!("f{i}.wl"), "1").unwrap();
        }
        assert!(matches!(
            c.add("one-too-many.wl", "1"),
            Err(CompileError::TooManyFiles)
        ));
    }

    #[test]
    fn circular_include_is_reported_not_infinite() {
        let mut c = Compiler::new();
        c.add("a.wl", "include \"b.wl\"").unwrap();
        c.add("b.wl", "include \"a.wl\"").unwrap();
        assert!(c.link("a.wl").is_err());
    }
}
