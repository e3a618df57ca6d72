//! # puwer-report CLI
//!
//! Usage:
//!   puwer-report assessment.json --questions bank.csv -o report.pdf
//!   puwer-report assessment.json --questions bank.csv --config report.toml
//!   puwer-report --example > assessment.json
//!
//! Without `-o` the report is written to its suggested filename.

use std::env;
use std::path::{Path, PathBuf};
use std::process;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use puwer_report::{
    parse_assessment, CsvQuestionBank, QuestionBank, ReportConfig, ReportError, ReportGenerator,
};

struct Args {
    input: PathBuf,
    questions: PathBuf,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_assessment_json());
        return;
    }

    let args = match parse_args(&args[1..]) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!(
                "usage: puwer-report <assessment.json> --questions <bank.csv> [-o out.pdf] [--config report.toml]"
            );
            process::exit(2);
        }
    };

    let config = match ReportConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load configuration: {}", e);
            process::exit(2);
        }
    };
    init_tracing(&config.log_level);

    if let Err(e) = run(args, config).await {
        error!(error = %e, retriable = e.is_retriable(), "report generation failed");
        process::exit(1);
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("puwer_report={}", default_level)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(args: Args, config: ReportConfig) -> Result<(), ReportError> {
    let json = tokio::fs::read_to_string(&args.input).await?;
    let assessment = parse_assessment(&json)?;
    let questions = CsvQuestionBank::new(&args.questions).load();
    if questions.is_empty() {
        warn!(path = %args.questions.display(), "question bank is empty");
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling report generation");
            on_interrupt.cancel();
        }
    });

    let generator = ReportGenerator::new(config)?;
    let report = generator.generate(&assessment, &questions, &cancel).await?;

    let output = args
        .output
        .unwrap_or_else(|| Path::new(".").join(&report.filename));
    tokio::fs::write(&output, &report.bytes).await?;
    info!(
        path = %output.display(),
        pages = report.page_count,
        bytes = report.bytes.len(),
        "report written"
    );
    Ok(())
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut input = None;
    let mut questions = None;
    let mut output = None;
    let mut config = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .map(PathBuf::from)
                .ok_or_else(|| format!("{} needs a value", flag))
        };
        match arg.as_str() {
            "-o" | "--output" => output = Some(value(arg)?),
            "-q" | "--questions" => questions = Some(value(arg)?),
            "-c" | "--config" => config = Some(value(arg)?),
            flag if flag.starts_with('-') => return Err(format!("unknown flag {}", flag)),
            path if input.is_none() => input = Some(PathBuf::from(path)),
            extra => return Err(format!("unexpected argument {}", extra)),
        }
    }

    Ok(Args {
        input: input.ok_or("missing assessment file")?,
        questions: questions.ok_or("missing --questions")?,
        output,
        config,
    })
}

fn example_assessment_json() -> &'static str {
    r##"{
  "id": "5b0c3a52-8f61-4d5e-9a0e-2f3c1d7a9b10",
  "equipmentDetails": {
    "name": "Pillar Drill PD-3",
    "location": "Workshop B",
    "reference": "ASSET-0412",
    "assessor": "J. Smith",
    "nameplateInfo": "Manufacturer: Meddings\nModel: MF4\nSerial: 118204\n240V 1-phase",
    "nameplatePhotos": []
  },
  "answers": {
    "4.1": { "answer": "yes", "comments": "Suitable for drilling mild steel stock.", "photos": [] },
    "4.2": { "answer": "no", "comments": "Chuck guard missing its interlock.", "photos": [] },
    "5.1": { "answer": "na", "comments": "", "photos": [] }
  },
  "recommendations": [
    {
      "id": "rec-1",
      "text": "Fit an interlocked chuck guard before the drill is returned to service.",
      "priority": "High",
      "assignee": "Maintenance",
      "dueDate": "2026-11-01",
      "createdAt": "2026-10-18T09:30:00Z"
    }
  ],
  "createdAt": "2026-10-18T09:00:00Z",
  "modifiedAt": "2026-10-18T09:30:00Z",
  "completed": true
}
"##
}
