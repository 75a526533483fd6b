//! Benchmarks for hamsta-core
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hamsta_core::expr::{ExpressionCompiler, Interpreter, Mode, Source};
use hamsta_core::reactive::{create_effect, Signal};
use hamsta_core::{Document, Element, Root, Value};

// =============================================================================
// SIGNAL BENCHMARKS
// =============================================================================

fn bench_signal_set(c: &mut Criterion) {
    let s = Signal::new(0i32);
    let mut n = 0;
    c.bench_function("signal_set", |b| {
        b.iter(|| {
            n += 1;
            s.set(black_box(n))
        })
    });
}

fn bench_signal_set_same_value(c: &mut Criterion) {
    let s = Signal::new(42i32);
    c.bench_function("signal_set_same_value", |b| b.iter(|| s.set(black_box(42))));
}

// =============================================================================
// EFFECT BENCHMARKS
// =============================================================================

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    for subscribers in [1, 10, 100] {
        let s = Signal::new(0i32);
        let disposers: Vec<_> = (0..subscribers)
            .map(|_| {
                let s = s.clone();
                create_effect(move || {
                    black_box(s.get());
                })
            })
            .collect();

        let mut n = 0;
        group.bench_with_input(BenchmarkId::from_parameter(subscribers), &subscribers, |b, _| {
            b.iter(|| {
                n += 1;
                s.set(n)
            })
        });

        for disposer in disposers {
            disposer.dispose();
        }
    }
    group.finish();
}

// =============================================================================
// EXPRESSION BENCHMARKS
// =============================================================================

fn bench_expression_call(c: &mut Criterion) {
    let callable = Interpreter::new()
        .compile(&Source::new(
            "active ? 'on ' + count : 'off'",
            "bench",
            &["active", "count"],
            Mode::Expression,
        ))
        .expect("compiles");
    let args = [Value::Bool(true), Value::from(3)];
    c.bench_function("expression_call", |b| {
        b.iter(|| black_box(callable.call(&args)))
    });
}

// =============================================================================
// DIRECTIVE BENCHMARKS
// =============================================================================

fn bench_text_binding_update(c: &mut Criterion) {
    let document = Document::new();
    let list = Element::new("ul").with_attr("h-signals", "{ count: 0 }");
    for _ in 0..50 {
        list.append_child(&Element::new("li").with_attr("h-text", "count"));
    }
    document.body().append_child(&list);
    let root = Root::builder(&document).mount(None);

    let mut n = 0;
    c.bench_function("text_binding_update_50", |b| {
        b.iter(|| {
            n += 1;
            root.store().set("count", Value::from(n)).expect("declared")
        })
    });
    root.teardown();
}

criterion_group!(
    benches,
    bench_signal_set,
    bench_signal_set_same_value,
    bench_fan_out,
    bench_expression_call,
    bench_text_binding_update,
);
criterion_main!(benches);
