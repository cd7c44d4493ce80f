use criterion::{black_box, criterion_group, criterion_main, Criterion};
use wl::{Compiler, EvalOutcome, Runtime};

fn compile(src: &str) -> wl::Program {
    let mut compiler = Compiler::new();
    compiler.add("bench.wl", src).expect("add");
    compiler.link("bench.wl").expect("link")
}

fn run_to_done(program: wl::Program) {
    let mut rt = Runtime::new(program, 0);
    loop {
        match rt.eval() {
            EvalOutcome::Done => break,
            EvalOutcome::Output(_) => {}
            other => panic!("bench program should not suspend: {other:?}"),
        }
    }
}

fn bench_eval(c: &mut Criterion) {
    let src = "\
        fun fib(n) if n<2: n else fib(n-1)+fib(n-2)
        for a in [1,2,3,4,5,6,7,8,9,10]: fib(a)
    ";
    let program = compile(src);

    c.bench_function("eval fib-over-array", |b| {
        b.iter(|| run_to_done(black_box(program.clone())))
    });
}

criterion_group!(eval, bench_eval);
criterion_main!(eval);
