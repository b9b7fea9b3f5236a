use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use hemogram_core::AnalysisConfig;
use hemogram_engine::{analyze_report, sanitize_report_text, ReferenceCatalogue};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "hemogram-cli",
    about = "Phân tích văn bản phiếu công thức máu và in báo cáo JSON."
)]
struct Args {
    /// Đường dẫn tới file văn bản phiếu xét nghiệm (đã OCR).
    #[arg(short, long)]
    input: PathBuf,

    /// Danh mục tham chiếu JSON thay cho danh mục tích hợp.
    #[arg(long)]
    catalogue: Option<PathBuf>,

    /// File JSON cấu hình ngưỡng phân tích.
    #[arg(long)]
    config: Option<PathBuf>,

    /// In JSON có thụt lề.
    #[arg(long)]
    pretty: bool,

    /// Bỏ qua bước làm sạch ký tự rác OCR.
    #[arg(long)]
    skip_sanitize: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let catalogue = match &args.catalogue {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Không đọc được danh mục {:?}", path))?;
            ReferenceCatalogue::from_json_str(&json)
                .with_context(|| format!("Danh mục không hợp lệ {:?}", path))?
        }
        None => ReferenceCatalogue::builtin().context("Danh mục tích hợp không hợp lệ")?,
    };

    let config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Không đọc được config {:?}", path))?;
            serde_json::from_str::<AnalysisConfig>(&json)
                .with_context(|| format!("Config không hợp lệ {:?}", path))?
        }
        None => AnalysisConfig::default(),
    };

    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Không đọc được file {:?}", args.input))?;
    let text = if args.skip_sanitize {
        raw
    } else {
        sanitize_report_text(&raw)
    };

    let report = analyze_report(&text, &catalogue, &config)?;
    tracing::info!(
        matches = report.summary().matches.len(),
        severity = ?report.summary().risk.severity_level,
        "Report analyzed"
    );

    let output = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{output}");

    Ok(())
}
