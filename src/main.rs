use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lintsplice::config::Config;
use lintsplice::prompt::{build_request_payload, format_summary};
use lintsplice::{
    compare_findings, extract_blocks_from_source, extract_findings, insert_markers,
    parse_replacements, plan_batches, process_marked_file,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "lintsplice",
    about = "Batch analyzer-flagged Java code for rewriting and splice the rewrites back",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract flagged blocks and show how they would be batched
    Plan {
        /// Java source file
        #[arg(short, long)]
        source: PathBuf,

        /// Analyzer output (`path:line: rule: message` per line)
        #[arg(short, long)]
        findings: PathBuf,

        /// Character budget per batch (defaults to the configured limit)
        #[arg(short, long)]
        budget: Option<usize>,

        /// Print the request payload of every batch as JSON
        #[arg(long)]
        json: bool,
    },

    /// Wrap flagged blocks in sentinel comments
    Mark {
        #[arg(short, long)]
        source: PathBuf,

        #[arg(short, long)]
        findings: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace marked blocks with the methods found in a rewrite response
    Apply {
        /// Previously marked source
        #[arg(short, long)]
        marked: PathBuf,

        /// Free-form response text containing rewritten methods
        #[arg(short, long)]
        response: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Analyzer output for the original file, compared against --findings-after
        #[arg(long, requires = "findings_after")]
        findings_before: Option<PathBuf>,

        /// Analyzer output for the rewritten file
        #[arg(long, requires = "findings_before")]
        findings_after: Option<PathBuf>,
    },

    /// Show the config file location and effective settings
    Config {
        /// Write a default config file if none exists yet
        #[arg(long)]
        init: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load();
    init_subscriber(&config.log_level);

    match cli.command {
        Command::Plan {
            source,
            findings,
            budget,
            json,
        } => run_plan(&config, &source, &findings, budget, json),
        Command::Mark {
            source,
            findings,
            output,
        } => run_mark(&source, &findings, output.as_deref()),
        Command::Apply {
            marked,
            response,
            output,
            findings_before,
            findings_after,
        } => {
            run_apply(&marked, &response, output.as_deref())?;
            if let (Some(before), Some(after)) = (findings_before, findings_after) {
                run_quality_check(&before, &after)?;
            }
            Ok(())
        }
        Command::Config { init } => run_config(&config, init),
    }
}

/// Stderr-only compact subscriber; RUST_LOG wins over the configured level
fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

fn load_blocks(source: &Path, findings: &Path) -> Result<(String, Vec<lintsplice::CodeBlock>)> {
    let content = fs::read_to_string(source)
        .with_context(|| format!("Failed to read source file {}", source.display()))?;
    let raw = fs::read_to_string(findings)
        .with_context(|| format!("Failed to read findings file {}", findings.display()))?;

    let findings = extract_findings(&raw);
    let blocks = extract_blocks_from_source(source, &content, &findings);
    Ok((content, blocks))
}

fn run_plan(
    config: &Config,
    source: &Path,
    findings: &Path,
    budget: Option<usize>,
    json: bool,
) -> Result<()> {
    let (_, blocks) = load_blocks(source, findings)?;
    let budget = budget.unwrap_or(config.batch_char_limit);
    let plan = plan_batches(&blocks, budget);

    if json {
        let payloads = plan
            .batches
            .iter()
            .map(|batch| {
                build_request_payload(batch, config.include_issues, config.instruction.as_deref())
            })
            .collect::<serde_json::Result<Vec<_>>>()
            .context("Failed to build request payloads")?;
        let out = serde_json::to_string_pretty(&payloads).context("Failed to serialize payloads")?;
        println!("{}", out);
        return Ok(());
    }

    println!("{}", plan.advisory);
    println!();
    print!("{}", format_summary(&blocks));
    if !blocks.is_empty() {
        println!();
    }
    for (i, batch) in plan.batches.iter().enumerate() {
        println!(
            "Batch {}: {} block(s), {} chars",
            i + 1,
            batch.len(),
            lintsplice::BatchPlan::batch_size(batch)
        );
    }
    Ok(())
}

fn run_mark(source: &Path, findings: &Path, output: Option<&Path>) -> Result<()> {
    let (content, blocks) = load_blocks(source, findings)?;
    let marked = insert_markers(&content, &blocks);
    write_output(output, &marked)
}

fn run_apply(marked: &Path, response: &Path, output: Option<&Path>) -> Result<()> {
    let marked_text = fs::read_to_string(marked)
        .with_context(|| format!("Failed to read marked file {}", marked.display()))?;
    let response_text = fs::read_to_string(response)
        .with_context(|| format!("Failed to read response file {}", response.display()))?;

    let replacements = parse_replacements(&response_text);
    let result = process_marked_file(&marked_text, &replacements);
    write_output(output, &result)
}

fn run_quality_check(before: &Path, after: &Path) -> Result<()> {
    let before_raw = fs::read_to_string(before)
        .with_context(|| format!("Failed to read findings file {}", before.display()))?;
    let after_raw = fs::read_to_string(after)
        .with_context(|| format!("Failed to read findings file {}", after.display()))?;

    let report = compare_findings(&extract_findings(&before_raw), &extract_findings(&after_raw));
    // stdout may carry the spliced file
    eprint!("{}", report);
    Ok(())
}

fn run_config(config: &Config, init: bool) -> Result<()> {
    let location = Config::config_location();
    if init && !Path::new(&location).exists() {
        let path = Config::default().save()?;
        println!("Wrote default config to {}", path.display());
    } else {
        println!("Config file: {}", location);
    }
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    println!("{}", json);
    Ok(())
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text)
                .with_context(|| format!("Failed to write output file {}", path.display()))?;
            info!(path = %path.display(), "wrote output");
        }
        None => print!("{}", text),
    }
    Ok(())
}
