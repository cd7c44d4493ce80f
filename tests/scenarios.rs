//! End-to-end scenarios (spec.md §8's seed table), driven through the public
//! `Compiler`/`Runtime` surface the way a host embedding this crate would:
//! parse+link a single unit, then pump `eval()` until it's `Done`,
//! concatenating every `Output` chunk along the way.

use indoc::indoc;
use wl::{Compiler, EvalOutcome, Runtime};

fn run(src: &str) -> String {
    String::from_utf8_lossy(&run_bytes(src)).into_owned()
}

fn run_bytes(src: &str) -> Vec<u8> {
    let mut compiler = Compiler::new();
    let outcome = compiler.add("main.wl", src).expect("add");
    assert_eq!(outcome, wl::AddOutcome::Link, "unexpected missing include");
    let program = compiler.link("main.wl").expect("link");
    let mut rt = Runtime::new(program, 0);
    let mut out = Vec::new();
    loop {
        match rt.eval() {
            EvalOutcome::Output(s) => out.extend_from_slice(&s),
            EvalOutcome::Done => break,
            EvalOutcome::Error(e) => panic!("runtime error: {e}"),
            other => panic!("unexpected suspension with no host attached: {other:?}"),
        }
    }
    out
}

#[test]
fn arithmetic_precedence() {
    assert_eq!(run("1+2*3"), "7");
}

#[test]
fn reassignment_then_read() {
    assert_eq!(run("let a=1\na=2\na"), "2");
}

#[test]
fn if_else_takes_true_branch() {
    assert_eq!(run("if 1<2: 'Y' else 'N'"), "Y");
}

#[test]
fn for_loop_concatenates_array_values() {
    assert_eq!(run("for a in ['A','B','C']: a"), "ABC");
}

#[test]
fn nested_function_shadows_enclosing_one() {
    let src = indoc! {"
        fun p() 1
        { fun p() 2
        p() }
        p()
    "};
    assert_eq!(run(src), "21");
}

#[test]
fn html_literal_renders_verbatim() {
    assert_eq!(run("<a>Hi</a>"), "<a>Hi</a>");
}

#[test]
fn hex_escape_produces_the_raw_byte_not_a_utf8_encoding() {
    let out = run_bytes("\"\\xFF\"");
    assert_eq!(out, vec![0xFFu8]);
}

#[test]
fn recursive_function_resolves_in_its_own_scope() {
    let src = indoc! {"
        fun fact(n) if n<2: 1 else n*fact(n-1)
        fact(5)
    "};
    assert_eq!(run(src), "120");
}

#[test]
fn multi_file_include_is_spliced_before_linking() {
    let mut compiler = Compiler::new();
    let outcome = compiler
        .add("main.wl", "include \"greeting.wl\"\ngreet()")
        .expect("add main");
    assert_eq!(outcome, wl::AddOutcome::Again("greeting.wl".to_string()));
    let outcome = compiler
        .add("greeting.wl", "fun greet() 'hi'")
        .expect("add include");
    assert_eq!(outcome, wl::AddOutcome::Link);
    let program = compiler.link("main.wl").expect("link");
    let mut rt = Runtime::new(program, 0);
    let mut out = Vec::new();
    loop {
        match rt.eval() {
            EvalOutcome::Output(s) => out.extend_from_slice(&s),
            EvalOutcome::Done => break,
            other => panic!("unexpected: {other:?}"),
        }
    }
    assert_eq!(out, b"hi");
}

#[test]
fn undeclared_call_is_an_assemble_time_error() {
    let mut compiler = Compiler::new();
    compiler.add("main.wl", "nope()").unwrap();
    assert!(compiler.link("main.wl").is_err());
}
