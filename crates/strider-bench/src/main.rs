use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{create_dir_all, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use strider_tools::StageProbe;

mod synthetic;

const DEFAULT_CASES: [usize; 4] = [10, 50, 200, 1_000];
const SCHEMA_VERSION: u32 = 1;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Strider benchmark runner and reporting interface"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute benchmark cases and save JSONL artifacts
    Run(RunArgs),
    /// Render benchmark artifact summaries
    Report(ReportArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Comma-separated list of trajectory node counts
    #[arg(long, value_delimiter = ',')]
    cases: Option<Vec<usize>>,

    /// Number of repetitions per case
    #[arg(long, default_value_t = 3)]
    repetitions: u32,

    /// Number of evaluation sweeps per repetition
    #[arg(long, default_value_t = 10)]
    evaluations: u32,

    /// JSONL output artifact path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Output format for stdout
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Parser, Debug)]
struct ReportArgs {
    /// Input JSONL benchmark artifact
    #[arg(long)]
    input: PathBuf,

    /// Output format for stdout
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Ndjson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct BenchRecord {
    schema_version: u32,
    run_id: String,
    case_name: String,
    repetition: u32,
    variables: usize,
    constraints: usize,
    jacobian_nnz: usize,
    stage: String,
    duration_ms: f64,
    rss_before_bytes: u64,
    rss_after_bytes: u64,
    rss_delta_bytes: i64,
}

#[derive(Debug, Clone, Eq, Ord, PartialEq, PartialOrd)]
struct SummaryKey {
    case_name: String,
    stage: String,
}

#[derive(Debug, Clone, Serialize)]
struct SummaryRow {
    case_name: String,
    stage: String,
    samples: usize,
    mean_duration_ms: f64,
    max_duration_ms: f64,
    mean_rss_delta_bytes: f64,
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("STRIDER_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run_command(args),
        Command::Report(args) => report_command(args),
    }
}

fn run_command(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.repetitions == 0 {
        return Err(boxed_input_error("repetitions must be greater than zero"));
    }
    if args.evaluations == 0 {
        return Err(boxed_input_error("evaluations must be greater than zero"));
    }

    let run_id = build_run_id()?;
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("artifacts/bench/{}.jsonl", run_id.as_str())));

    let cases = args.cases.clone().unwrap_or_else(|| DEFAULT_CASES.to_vec());
    tracing::debug!(
        component = "bench",
        operation = "run",
        run_id = %run_id,
        cases = cases.len(),
        repetitions = args.repetitions,
        "Starting benchmark run"
    );
    let mut records = Vec::new();
    for &nodes in &cases {
        let case_name = format!("nodes_{}", nodes);
        for repetition in 1..=args.repetitions {
            let execution = execute_case(nodes, args.evaluations)?;
            records.extend(case_records(&run_id, &case_name, repetition, &execution));
        }
    }

    write_records_jsonl(&output_path, &records)?;
    render_output(args.format, &records)?;
    println!("artifact: {}", output_path.display());

    Ok(())
}

fn report_command(args: ReportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let records = load_records_jsonl(&args.input)?;
    render_output(args.format, &records)?;
    Ok(())
}

struct CaseExecution {
    variables: usize,
    constraints: usize,
    jacobian_nnz: usize,
    probe: StageProbe,
}

fn execute_case(nodes: usize, evaluations: u32) -> Result<CaseExecution, Box<dyn std::error::Error>> {
    let mut probe = StageProbe::new();

    let mut nlp = probe.measure("assemble", || synthetic::build_problem(nodes))?;
    let x = nlp.starting_values();

    // First evaluation links the containers and freezes the Jacobian pattern.
    probe.measure("link", || nlp.evaluate_jacobian(&x).map(|_| ()))??;

    probe.measure("residual", || -> Result<(), strider_core::NlpError> {
        for _ in 0..evaluations {
            nlp.evaluate_constraints(&x)?;
        }
        Ok(())
    })??;

    probe.measure("jacobian", || -> Result<(), strider_core::NlpError> {
        for _ in 0..evaluations {
            nlp.evaluate_jacobian(&x)?;
        }
        Ok(())
    })??;

    probe.measure("cost", || -> Result<(), strider_core::NlpError> {
        for _ in 0..evaluations {
            nlp.evaluate_cost(&x)?;
            nlp.evaluate_cost_gradient(&x)?;
        }
        Ok(())
    })??;

    let jacobian_nnz = nlp.jacobian_nnz()?;
    Ok(CaseExecution {
        variables: nlp.num_variables(),
        constraints: nlp.num_constraints(),
        jacobian_nnz,
        probe,
    })
}

fn case_records(
    run_id: &str,
    case_name: &str,
    repetition: u32,
    execution: &CaseExecution,
) -> Vec<BenchRecord> {
    execution
        .probe
        .measurements()
        .iter()
        .map(|measurement| BenchRecord {
            schema_version: SCHEMA_VERSION,
            run_id: run_id.to_string(),
            case_name: case_name.to_string(),
            repetition,
            variables: execution.variables,
            constraints: execution.constraints,
            jacobian_nnz: execution.jacobian_nnz,
            stage: measurement.stage.clone(),
            duration_ms: measurement.duration.as_secs_f64() * 1000.0,
            rss_before_bytes: measurement.rss_before_bytes,
            rss_after_bytes: measurement.rss_after_bytes,
            rss_delta_bytes: measurement.rss_delta_bytes(),
        })
        .collect()
}

fn render_output(
    format: OutputFormat,
    records: &[BenchRecord],
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Table => {
            let rows = summarize_records(records);
            print_summary_table(&rows);
            Ok(())
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(records)?);
            Ok(())
        }
        OutputFormat::Ndjson => {
            for record in records {
                println!("{}", serde_json::to_string(record)?);
            }
            Ok(())
        }
    }
}

fn summarize_records(records: &[BenchRecord]) -> Vec<SummaryRow> {
    #[derive(Default)]
    struct Acc {
        samples: usize,
        duration_sum: f64,
        duration_max: f64,
        rss_delta_sum: f64,
    }

    let mut groups: BTreeMap<SummaryKey, Acc> = BTreeMap::new();
    for record in records {
        let key = SummaryKey {
            case_name: record.case_name.clone(),
            stage: record.stage.clone(),
        };
        let entry = groups.entry(key).or_default();
        entry.samples += 1;
        entry.duration_sum += record.duration_ms;
        if record.duration_ms > entry.duration_max {
            entry.duration_max = record.duration_ms;
        }
        entry.rss_delta_sum += record.rss_delta_bytes as f64;
    }

    groups
        .into_iter()
        .map(|(key, acc)| SummaryRow {
            case_name: key.case_name,
            stage: key.stage,
            samples: acc.samples,
            mean_duration_ms: if acc.samples == 0 {
                0.0
            } else {
                acc.duration_sum / acc.samples as f64
            },
            max_duration_ms: acc.duration_max,
            mean_rss_delta_bytes: if acc.samples == 0 {
                0.0
            } else {
                acc.rss_delta_sum / acc.samples as f64
            },
        })
        .collect()
}

fn print_summary_table(rows: &[SummaryRow]) {
    println!(
        "{:<16} {:<12} {:>7} {:>12} {:>12} {:>14}",
        "case", "stage", "samples", "mean_ms", "max_ms", "mean_rss_mb"
    );
    for row in rows {
        println!(
            "{:<16} {:<12} {:>7} {:>12.3} {:>12.3} {:>14.3}",
            row.case_name,
            row.stage,
            row.samples,
            row.mean_duration_ms,
            row.max_duration_ms,
            row.mean_rss_delta_bytes / (1024.0 * 1024.0),
        );
    }
}

fn write_records_jsonl(
    path: &Path,
    records: &[BenchRecord],
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn load_records_jsonl(path: &Path) -> Result<Vec<BenchRecord>, Box<dyn std::error::Error>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str::<BenchRecord>(&line)?);
    }
    Ok(records)
}

fn build_run_id() -> Result<String, Box<dyn std::error::Error>> {
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    Ok(format!("run_{}_{}", timestamp, std::process::id()))
}

fn boxed_input_error(message: &str) -> Box<dyn std::error::Error> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        message,
    ))
}
