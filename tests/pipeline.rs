use lintsplice::prompt::{build_request_payload, format_summary};
use lintsplice::quality::QualityOutcome;
use lintsplice::{
    compare_findings,
    extract_blocks, extract_blocks_from_source, extract_findings, insert_markers,
    parse_replacements, plan_batches, process_marked_file, BlockKind, BlockSpan, CodeBlock,
    Finding, ReplacementMap,
};
use std::path::{Path, PathBuf};

const SOURCE: &str = "\
public class C {
    public void foo() {
        int a = 1;
        int b = 2;
    }

    public void bar() {
        System.out.println(\"bar\");
    }
}
";

const ANALYZER_OUTPUT: &str = "\
/work/src/C.java:3:\tCyclomaticComplexity:\tThe method 'foo()' has a cyclomatic complexity of 12.
Processing errors follow
/work/src/C.java:8:\tNPathComplexity:\tThe method 'bar()' has an NPath complexity of 300
";

const RESPONSE: &str = r#"Sure, here are the refactored methods.

```java
public void foo() {
    int a = compute();
}

@Override
public void bar() {
    log("bar");
}

private int compute() {
    return 1;
}
```
"#;

fn member(start: usize, end: usize, size: usize) -> CodeBlock {
    CodeBlock {
        file_path: PathBuf::from("Big.java"),
        kind: BlockKind::Method,
        span: BlockSpan::new(start, end).unwrap(),
        text: "x".repeat(size),
        findings: vec![Finding::new(start, "Rule", "message")],
    }
}

#[test]
fn full_pipeline_rewrites_flagged_methods() {
    let findings = extract_findings(ANALYZER_OUTPUT);
    assert_eq!(findings.len(), 2);

    let blocks = extract_blocks_from_source(Path::new("C.java"), SOURCE, &findings);
    let kinds: Vec<BlockKind> = blocks.iter().map(|b| b.kind).collect();
    assert_eq!(kinds, vec![BlockKind::Type, BlockKind::Method, BlockKind::Method]);

    let plan = plan_batches(&blocks, 20_000);
    assert_eq!(plan.batches.len(), 1);
    assert!(plan.skipped.is_empty());
    assert_eq!(plan.batches[0], blocks);

    let payload = build_request_payload(&plan.batches[0], true, None).unwrap();
    assert_eq!(payload["classes"][0]["type_signature"], "public class C");
    assert_eq!(payload["classes"][0]["violations"].as_array().unwrap().len(), 2);

    let marked = insert_markers(SOURCE, &blocks);
    assert!(marked.contains("// <start-flagged:bar-1>"));
    assert!(marked.contains("// <start-flagged:foo-2>"));

    let replacements = parse_replacements(RESPONSE);
    assert_eq!(
        replacements.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["foo", "bar", "compute"]
    );

    let result = process_marked_file(&marked, &replacements);
    assert!(result.contains("// <start-replaced:foo-2>\npublic void foo() {\n    int a = compute();\n}\n// <end-replaced:foo-2>"));
    assert!(result.contains("// <start-replaced:bar-1>\n@Override\npublic void bar() {"));
    assert!(result.contains("// Additional helper method generated by LLM: compute"));
    assert!(!result.contains("flagged"));
    assert!(!result.contains("int b = 2;"));
    assert!(!result.contains("System.out.println"));

    let compute_at = result.find("private int compute()").unwrap();
    assert!(compute_at > result.find("end-replaced:bar-1").unwrap());
    assert!(result.trim_end().ends_with('}'));
}

#[test]
fn summary_reports_members_under_their_type() {
    let findings = extract_findings(ANALYZER_OUTPUT);
    let blocks = extract_blocks_from_source(Path::new("C.java"), SOURCE, &findings);
    let summary = format_summary(&blocks);

    assert!(summary.contains("Type Signature: public class C (Lines 1-10)"));
    assert!(summary.contains("  Method (Lines 2-5)\n    - CyclomaticComplexity:"));
    assert!(summary.contains("  Method (Lines 7-9)\n    - NPathComplexity:"));
}

#[test]
fn oversized_block_is_skipped_and_small_one_batched() {
    let a = member(1, 10, 500);
    let b = member(20, 400, 24_000);
    let plan = plan_batches(&[a.clone(), b.clone()], 20_000);

    assert_eq!(plan.batches, vec![vec![a]]);
    assert_eq!(plan.skipped, vec![b]);
    assert!(plan.advisory.contains("split into 1 batch."));
    assert!(plan.advisory.contains("1 block was too large to process and was skipped."));
}

#[test]
fn every_batch_respects_the_budget() {
    let blocks: Vec<CodeBlock> = (0..30).map(|i| member(i * 10 + 1, i * 10 + 5, 150 + i * 37)).collect();
    let budget = 1_000;
    let plan = plan_batches(&blocks, budget);

    for batch in &plan.batches {
        assert!(!batch.is_empty());
        assert!(lintsplice::BatchPlan::batch_size(batch) <= budget);
    }
    assert!(plan.skipped.iter().all(|b| b.size() > budget));
    assert_eq!(plan.all_blocks().count(), blocks.len());
}

#[test]
fn empty_replacement_map_removes_marked_blocks() {
    let findings = extract_findings(ANALYZER_OUTPUT);
    let blocks = extract_blocks_from_source(Path::new("C.java"), SOURCE, &findings);
    let marked = insert_markers(SOURCE, &blocks);

    let result = process_marked_file(&marked, &ReplacementMap::new());
    assert!(result.contains("// <removed-method: foo from marker foo-2>"));
    assert!(result.contains("// <removed-method: bar from marker bar-1>"));
    assert!(!result.contains("int a = 1;"));
    assert!(result.starts_with("public class C {"));
}

#[test]
fn extract_blocks_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("C.java");
    std::fs::write(&path, SOURCE).unwrap();

    let findings = vec![Finding::new(3, "CognitiveComplexity", "nested")];
    let blocks = extract_blocks(&path, &findings);
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].span, BlockSpan::new(2, 5).unwrap());
    assert_eq!(blocks[1].findings, findings);
}

#[test]
fn syntax_errors_yield_no_blocks() {
    let findings = vec![Finding::new(2, "Rule", "message")];
    let broken = "public class C {\n    void f( {\n}\n";
    assert!(extract_blocks_from_source(Path::new("C.java"), broken, &findings).is_empty());
}

#[test]
fn package_private_method_is_rewritten_not_removed() {
    let source = "class C {\n    void foo() {\n        int a = 1;\n    }\n}\n";
    let findings = vec![Finding::new(3, "CognitiveComplexity", "nested")];
    let blocks = extract_blocks_from_source(Path::new("C.java"), source, &findings);
    let marked = insert_markers(source, &blocks);

    let result = process_marked_file(&marked, &parse_replacements("void foo() {\n    int a = 2;\n}\n"));
    assert!(result.contains("// <start-replaced:foo-1>\nvoid foo() {\n    int a = 2;\n}"));
    assert!(!result.contains("removed-method"));
}

#[test]
fn type_level_finding_keeps_class_when_constructor_comes_back() {
    let source = "\
public class C {
    private int n;

    public C() {
        this.n = 0;
    }

    public int get() {
        return n;
    }
}
";
    let findings = vec![Finding::new(1, "ExcessivePublicCount", "too many public methods")];
    let blocks = extract_blocks_from_source(Path::new("C.java"), source, &findings);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].kind, BlockKind::Type);

    let marked = insert_markers(source, &blocks);
    assert!(marked.contains("// <start-flagged:C-1>"));

    let result = process_marked_file(&marked, &parse_replacements("public C() {\n    this.n = 1;\n}"));
    assert_eq!(result, source);
}

#[test]
fn quality_check_compares_analyzer_runs() {
    let before = extract_findings(ANALYZER_OUTPUT);
    let after = extract_findings("/work/src/C.java:8:\tNPathComplexity:\tThe method 'bar()' has an NPath complexity of 210\n");

    let report = compare_findings(&before, &after);
    assert_eq!(report.outcome, QualityOutcome::Fixed(1));
    assert_eq!(report.before_metrics.metrics["CyclomaticComplexity"].max, 12);
    assert_eq!(report.after_metrics.metrics["NPathComplexity"].max, 210);
    assert!(!report.after_metrics.metrics.contains_key("CyclomaticComplexity"));
}
