#![no_main]
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;
use tabla::{CompiledParser, GrammarBuilder, LrConfig};

fn parser() -> &'static CompiledParser<i64> {
    static PARSER: OnceLock<CompiledParser<i64>> = OnceLock::new();
    PARSER.get_or_init(|| {
        let mut g = GrammarBuilder::<i64>::new();
        let num = g.terminal("num", "[0-9]{1,6}", |text| text.parse().unwrap_or(0));
        let plus = g.literal("+");
        let times = g.literal("*");
        let semi = g.literal(";");
        let error = g.error();
        g.left([plus]);
        g.left([times]);
        g.ignore("[ \n]+");
        let list = g.non_terminal("list");
        let stmt = g.non_terminal("stmt");
        let e = g.non_terminal("e");
        g.production(list, [list.into(), stmt.into()], |v| v[0].wrapping_add(v[1]));
        g.production(list, [], |_| 0);
        g.production(stmt, [e.into(), semi.into()], |v| v[0]);
        g.error_production(stmt, [error.into(), semi.into()], |_, _| 0);
        g.production(e, [e.into(), plus.into(), e.into()], |v| v[0].wrapping_add(v[2]));
        g.production(e, [e.into(), times.into(), e.into()], |v| v[0].wrapping_mul(v[2]));
        g.production(e, ["(".into(), e.into(), ")".into()], |v| v[1]);
        g.production(e, [num.into()], |v| v[0]);
        g.start(list);
        g.build()
            .and_then(|grammar| grammar.compile(LrConfig::default()))
            .expect("fuzz grammar compiles")
    })
}

// Any input either parses or returns an error; recovery never panics or loops.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parser().parse(text);
    }
});
