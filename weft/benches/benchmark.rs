use criterion::{black_box, criterion_group, criterion_main, Criterion};
use weft::{scanner, spec};

const TOY: &str = "\
/if|then|else|end/ { }
/[0-9]+/           { }
/[0-9]*\\.[0-9]*/  { }
/[a-z][a-z0-9]*/   { }
/\\n/              { }
/./                { }
//
";

fn compile_benchmark(c: &mut Criterion) {
    let spec = spec::parse(TOY).unwrap();
    c.bench_function("compile toy spec", |b| {
        b.iter(|| scanner::compile(black_box(&spec.root)).unwrap())
    });
}

fn scan_benchmark(c: &mut Criterion) {
    let spec = spec::parse(TOY).unwrap();
    let program = scanner::compile(&spec.root).unwrap();
    let input = "if x1 == 42 then 1.25 else frob end\n".repeat(256);
    c.bench_function("scan toy input", |b| {
        b.iter(|| {
            let mut scanner = scanner::Scanner::new(program.clone(), black_box(input.as_bytes()));
            let mut count = 0u64;
            while scanner.next(0) >= 0 {
                count += 1;
            }
            count
        })
    });
}

criterion_group!(benches, compile_benchmark, scan_benchmark);
criterion_main!(benches);
