use anyhow::Result;
use caseproc::{init_tracing_once, CaseProcessor, ProcessOptions, Summary};
use clap::Parser;
use std::path::PathBuf;

const DEFAULT_OUTPUT: &str = "processed_data.xlsx";

#[derive(Parser)]
#[command(name = "caseproc")]
#[command(about = "Remove duplicate case rows (DISPOSE beats PENDING) and build pivot summaries")]
#[command(version)]
struct Cli {
    /// Input workbook (.xlsx/.xls/.ods) or record dump (.json/.ndjson/.jsonl[.zst])
    input: PathBuf,

    /// Output workbook
    #[arg(long, short = 'o', default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Column used to detect duplicates (default UID, or $CASEPROC_KEY_FIELD)
    #[arg(long)]
    key: Option<String>,

    /// Also write records.ndjson, pivots.json and summary.json here
    #[arg(long)]
    json_dir: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,
}

fn main() -> Result<()> {
    init_tracing_once();
    let cli = Cli::parse();

    let mut opts = ProcessOptions::from_env().with_progress(!cli.no_progress);
    if let Some(key) = cli.key.as_deref() {
        opts = opts.with_key_field(key);
    }
    let processor = CaseProcessor::with_options(opts);

    let report = match &cli.json_dir {
        Some(dir) => processor.process_file_with_json(&cli.input, &cli.output, dir)?,
        None => processor.process_file(&cli.input, &cli.output)?,
    };

    print_summary(&report.summary);
    println!("Pivot sheets: {}", report.pivots_written.join(", "));
    println!("Written to {}", cli.output.display());
    Ok(())
}

fn print_summary(s: &Summary) {
    println!("Processing Summary");
    println!("  Total Records: {}", s.total_records_processed);
    println!("  Unique Records: {}", s.unique_records);
    println!("  Pending Cases: {}", s.pending_cases);
    println!("  Disposed Cases: {}", s.disposed_cases);
    println!("  Civil Cases: {}", s.civil_cases);
    println!("  Criminal Cases: {}", s.criminal_cases);
    match s.avg_age_pending {
        Some(age) => println!("  Average Age of Pending Cases: {age:.2} years"),
        None => println!("  Average Age of Pending Cases: n/a"),
    }
    println!("  Duplicates Found: {}", s.duplicates_found);
    println!("  Duplicates Removed: {}", s.duplicates_removed);
}
