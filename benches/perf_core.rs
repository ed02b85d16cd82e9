use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lintsplice::index::group;
use lintsplice::index::parser::parse_java;
use lintsplice::{
    extract_blocks_from_source, insert_markers, parse_replacements, plan_batches,
    process_marked_file, Finding,
};
use std::path::Path;

/// `class_count` classes with `method_count` five-line methods each, plus one
/// finding inside every method body.
fn synthetic_source(class_count: usize, method_count: usize) -> (String, Vec<Finding>) {
    let mut source = String::from("package bench;\n\n");
    let mut findings = Vec::new();
    let mut line = 3;

    for c in 0..class_count {
        source.push_str(&format!("class Worker{c} {{\n    private int state{c};\n"));
        line += 2;
        for m in 0..method_count {
            source.push_str(&format!(
                "    public int step{m}(int x) {{\n        if (x > {m}) {{\n            return x - {m};\n        }}\n        return x + state{c};\n    }}\n"
            ));
            findings.push(Finding::new(line + 1, "CyclomaticComplexity", "too complex"));
            line += 6;
        }
        source.push_str("}\n");
        line += 1;
    }

    (source, findings)
}

fn bench_grouping(c: &mut Criterion) {
    let (source, findings) = synthetic_source(20, 50);
    let tree = parse_java(&source).expect("synthetic source should parse");

    c.bench_function("group_1000_findings", |b| {
        b.iter(|| {
            let blocks = group(tree.root_node(), &source, Path::new("Bench.java"), black_box(&findings));
            black_box(blocks.len());
        });
    });

    c.bench_function("extract_blocks_1000_findings", |b| {
        b.iter(|| {
            let blocks = extract_blocks_from_source(Path::new("Bench.java"), &source, black_box(&findings));
            black_box(blocks.len());
        });
    });
}

fn bench_planning(c: &mut Criterion) {
    let (source, findings) = synthetic_source(20, 50);
    let blocks = extract_blocks_from_source(Path::new("Bench.java"), &source, &findings);

    c.bench_function("plan_batches_default_budget", |b| {
        b.iter(|| {
            let plan = plan_batches(black_box(&blocks), 20_000);
            black_box(plan.batches.len());
        });
    });

    c.bench_function("plan_batches_tight_budget", |b| {
        b.iter(|| {
            let plan = plan_batches(black_box(&blocks), 600);
            black_box(plan.batches.len());
        });
    });
}

fn bench_splice(c: &mut Criterion) {
    let (source, findings) = synthetic_source(5, 40);
    let blocks = extract_blocks_from_source(Path::new("Bench.java"), &source, &findings);
    let marked = insert_markers(&source, &blocks);
    let response: String = (0..40)
        .map(|m| format!("public int step{m}(int x) {{\n    return x;\n}}\n\n"))
        .collect();

    c.bench_function("splice_round_trip", |b| {
        b.iter(|| {
            let replacements = parse_replacements(black_box(&response));
            let result = process_marked_file(&marked, &replacements);
            black_box(result.len());
        });
    });
}

criterion_group!(perf_core, bench_grouping, bench_planning, bench_splice);
criterion_main!(perf_core);
