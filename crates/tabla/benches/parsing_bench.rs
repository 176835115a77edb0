use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tabla::{CompiledParser, Grammar, GrammarBuilder, LrConfig};

fn arithmetic_grammar() -> Grammar<i64> {
    let mut g = GrammarBuilder::<i64>::new();
    let num = g.terminal("num", "[0-9]+", |text| text.parse().unwrap_or(0));
    let plus = g.literal("+");
    let minus = g.literal("-");
    let times = g.literal("*");
    let divide = g.literal("/");
    g.left([plus, minus]);
    g.left([times, divide]);
    g.ignore("[ \n]+");

    let e = g.non_terminal("e");
    g.production(e, [e.into(), plus.into(), e.into()], |v| v[0].wrapping_add(v[2]));
    g.production(e, [e.into(), minus.into(), e.into()], |v| v[0].wrapping_sub(v[2]));
    g.production(e, [e.into(), times.into(), e.into()], |v| v[0].wrapping_mul(v[2]));
    g.production(e, [e.into(), divide.into(), e.into()], |v| {
        v[0].checked_div(v[2]).unwrap_or(0)
    });
    g.production(e, ["(".into(), e.into(), ")".into()], |v| v[1]);
    g.production(e, [num.into()], |v| v[0]);
    g.start(e);
    g.build().expect("grammar")
}

fn expression(terms: usize) -> String {
    (0..terms)
        .map(|i| format!("({i} * {} - {})", i + 1, i / 2))
        .collect::<Vec<_>>()
        .join(" + ")
}

fn bench_table_construction(c: &mut Criterion) {
    let grammar = arithmetic_grammar();
    c.bench_function("lalr_tables", |b| {
        b.iter(|| black_box(grammar.compile(LrConfig::default()).is_ok()));
    });
    c.bench_function("canonical_tables", |b| {
        b.iter(|| black_box(grammar.compile(LrConfig::canonical()).is_ok()));
    });
}

fn bench_full_parse(c: &mut Criterion) {
    let parser: CompiledParser<i64> = arithmetic_grammar()
        .compile(LrConfig::default())
        .expect("tables");
    let small = expression(10);
    let large = expression(1_000);

    c.bench_function("full_parse_small", |b| {
        b.iter(|| black_box(parser.parse(black_box(&small)).ok()));
    });
    c.bench_function("full_parse_large", |b| {
        b.iter(|| black_box(parser.parse(black_box(&large)).ok()));
    });
}

criterion_group!(benches, bench_table_construction, bench_full_parse);
criterion_main!(benches);
