//! Quick benchmark to verify directive tokenizing performance

use std::sync::Arc;
use std::time::Instant;

use hintline::{peek_hints, tokenize, Enclosure, ModuleRegistry};
use serde_json::json;

fn main() {
    let bodies = vec![
        "flag",
        "key=value key2=value2",
        r#"name="some value" path=./../../some-_Path other"#,
        r#"flag name=value data={"foo": {"bar": [1, 2, true]}}"#,
        "cfg=@(import:@acme/test:jsonStr) fn=@(import:@acme/test=>getJSON) plain=x",
    ];

    println!("Tokenizer Performance Test");
    println!("==========================\n");

    // Warm up the lazy regexes; every body must tokenize cleanly
    for body in &bodies {
        if let Err(e) = tokenize(body) {
            panic!("bench body {body:?} does not tokenize: {e}");
        }
    }

    for body in &bodies {
        let iterations = 100_000;
        let start = Instant::now();

        for _ in 0..iterations {
            let _ = tokenize(body);
        }

        let elapsed = start.elapsed();
        let per_op = elapsed / iterations;

        println!("Body: {:60}", format!("\"{}\"", body));
        println!("  Time for {} iterations: {:?}", iterations, elapsed);
        println!("  Per operation: {:?}\n", per_op);
    }

    // Full peek: locate + tokenize + immediate module loads
    let registry = ModuleRegistry::default();
    registry.register_exports("@acme/test", json!({"jsonStr": {"prop": "jsonStr"}}));
    let registry = Arc::new(registry);
    let enclosure = Enclosure::default();
    let text = "<<re name=Hello cfg=@(import:@acme/test:jsonStr)>> remaining text";

    let iterations = 50_000;
    let start = Instant::now();
    for _ in 0..iterations {
        let _ = peek_hints(text, "re", &enclosure, registry.clone());
    }
    let elapsed = start.elapsed();
    println!("Peek: {:?} total, {:?} per operation", elapsed, elapsed / iterations);
}
