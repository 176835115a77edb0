//! Line-oriented calculator with error recovery.
//!
//! Reads statements from standard input, one or more per line, each ending in
//! `;`. A malformed statement is reported and skipped; the others still run.
//!
//! ```text
//! $ printf '1 + 2 * 3;\n(4 + ) * 2;\n2 ^ 10;\n' | cargo run --example calculator
//! 7
//! error: unexpected `)` in state ..., expected one of: num, -, (
//! 1024
//! ```

use std::io::{self, BufRead};
use tabla::{GrammarBuilder, LrConfig};

#[derive(Debug, Clone, Default)]
enum Value {
    #[default]
    None,
    Number(f64),
    Results(Vec<Result<f64, String>>),
}

impl Value {
    fn number(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            _ => 0.0,
        }
    }
}

fn binary(op: fn(f64, f64) -> f64) -> impl Fn(Vec<Value>) -> Value + Send + Sync + 'static {
    move |v| Value::Number(op(v[0].number(), v[2].number()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut g = GrammarBuilder::<Value>::new();
    let num = g.terminal("num", "[0-9]+(\\.[0-9]+)?", |text| {
        Value::Number(text.parse().unwrap_or(0.0))
    });
    let plus = g.literal("+");
    let minus = g.literal("-");
    let times = g.literal("*");
    let divide = g.literal("/");
    let power = g.literal("^");
    let semi = g.literal(";");
    let error = g.error();
    g.left([plus, minus]);
    g.left([times, divide]);
    g.right([power]);
    g.ignore("[ \t]+");

    let program = g.non_terminal("program");
    let stmt = g.non_terminal("stmt");
    let expr = g.non_terminal("expr");

    g.production(program, [program.into(), stmt.into()], |mut v| {
        let stmt = v.pop().unwrap_or_default();
        let mut results = match v.pop() {
            Some(Value::Results(results)) => results,
            _ => Vec::new(),
        };
        if let Value::Results(more) = stmt {
            results.extend(more);
        }
        Value::Results(results)
    });
    g.production(program, [stmt.into()], |mut v| v.pop().unwrap_or_default());
    g.production(stmt, [expr.into(), semi.into()], |v| {
        Value::Results(vec![Ok(v[0].number())])
    });
    g.error_production(stmt, [error.into(), semi.into()], |err, _| {
        Value::Results(vec![Err(err.to_string())])
    });

    g.production(expr, [expr.into(), plus.into(), expr.into()], binary(|a, b| a + b));
    g.production(expr, [expr.into(), minus.into(), expr.into()], binary(|a, b| a - b));
    g.production(expr, [expr.into(), times.into(), expr.into()], binary(|a, b| a * b));
    g.production(expr, [expr.into(), divide.into(), expr.into()], binary(|a, b| a / b));
    g.production(expr, [expr.into(), power.into(), expr.into()], binary(f64::powf));
    let negate = g.production(expr, [minus.into(), expr.into()], |v| {
        Value::Number(-v[1].number())
    });
    g.precedence(negate, power);
    g.production(expr, ["(".into(), expr.into(), ")".into()], |v| v[1].clone());
    g.production(expr, [num.into()], |mut v| v.pop().unwrap_or_default());
    g.start(program);

    let parser = g.build()?.compile(LrConfig::default())?;

    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match parser.parse(&line) {
            Ok(Value::Results(results)) => {
                for result in results {
                    match result {
                        Ok(n) => println!("{n}"),
                        Err(message) => println!("error: {message}"),
                    }
                }
            }
            Ok(_) => {}
            Err(err) => println!("error: {err}"),
        }
    }
    Ok(())
}
