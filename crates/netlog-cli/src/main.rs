// netlog CLI - AI-assisted proxy/network log analysis from the terminal

mod sample;

use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};
use indicatif::{ProgressBar, ProgressStyle};
use netlog_core::config::CONFIG_PATH_ENV;
use netlog_core::{export_report, load_credential, Settings, UploadedLog};
use netlog_llm::model_selector::{GENERATE_METHOD, STREAM_METHOD};
use netlog_llm::{resolve_model, Analysis, Analyzer, GeminiClient, LlmClient};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "netlog")]
#[command(version = "0.1.0")]
#[command(about = "AI-assisted proxy and network log analysis", long_about = None)]
struct Cli {
    /// Settings file (TOML)
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a log file with Gemini
    Analyze {
        /// Path to the log file
        file: PathBuf,

        /// Wait for the whole response instead of streaming it
        #[arg(long)]
        no_stream: bool,

        /// Write the report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify the API key and list usable models
    Check,

    /// Write a synthetic proxy log to try the analyzer on
    Sample {
        /// Number of lines
        #[arg(short, long, default_value = "400")]
        lines: usize,

        /// Output file
        #[arg(short, long, default_value = "sample_proxy.log")]
        output: PathBuf,

        /// Random seed
        #[arg(short, long, default_value = "7")]
        seed: u64,
    },
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    match cli.command {
        Commands::Analyze {
            file,
            no_stream,
            output,
        } => {
            analyze_file(&settings, &file, !no_stream, output.as_deref()).await?;
        }
        Commands::Check => {
            check_setup(&settings).await?;
        }
        Commands::Sample {
            lines,
            output,
            seed,
        } => {
            write_sample(lines, &output, seed)?;
        }
    }

    Ok(())
}

async fn analyze_file(
    settings: &Settings,
    path: &Path,
    stream: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let log = UploadedLog::from_bytes(file_name, bytes)?;

    let ingest = &settings.ingest;
    let metadata = log.metadata(ingest.preview_chars, ingest.size_warning_bytes);
    let sample = log.sample(ingest.max_log_chars);

    println!("\n{}", "📄 Log file".cyan().bold());
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["File", "Size", "Lines", "Encoding", "Analyzed"]);
    table.add_row(vec![
        metadata.file_name.clone(),
        metadata.size_human.clone(),
        metadata.line_count.to_string(),
        log.encoding.label().to_string(),
        if sample.truncated {
            format!("first {} chars", sample.char_count())
        } else {
            "entire file".to_string()
        },
    ]);
    println!("{table}");
    if let Some(warning) = &metadata.warning {
        println!("{} {}", "⚠".yellow(), warning.yellow());
    }

    println!("\n{}", "Preview:".dimmed());
    println!("{}", metadata.preview.dimmed());
    println!("{}", "─".repeat(60).dimmed());

    let analyzer = Analyzer::connect(settings).await.map_err(|e| {
        println!("{} {}", "Configuration error:".red().bold(), e);
        println!("Run {} to diagnose.", "netlog check".cyan());
        e
    })?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!("Analyzing with {}...", analyzer.model().name));

    let outcome = if stream {
        run_streaming(&analyzer, &log, &pb).await
    } else {
        analyzer.analyze(&log).await
    };

    let analysis = match outcome {
        Ok(analysis) => {
            pb.finish_with_message(format!(
                "Done in {:.1}s ({} fragment(s))",
                analysis.elapsed.as_secs_f64(),
                analysis.result.fragment_count()
            ));
            analysis
        }
        Err(e) => {
            pb.abandon_with_message("Analysis failed".red().to_string());
            println!("{} {}", "Error:".red().bold(), e);
            return Err(e.into());
        }
    };

    let report = analysis.into_report();
    println!("\n{}", "🔍 Analysis".green().bold());
    println!("{}", report.text);
    println!("\n{}", "─".repeat(60).dimmed());
    println!(
        "{} {} | {} {}ms",
        "Model:".dimmed(),
        report.model.cyan(),
        "Time:".dimmed(),
        report.response_time_ms.to_string().yellow()
    );

    if let Some(output) = output {
        let artifact = export_report(report.text);
        std::fs::write(output, artifact.body)?;
        println!("{} {}", "Report saved to".green(), output.display());
    }

    Ok(())
}

async fn run_streaming(
    analyzer: &Analyzer,
    log: &UploadedLog,
    pb: &ProgressBar,
) -> Result<Analysis, netlog_llm::BackendError> {
    let stream = analyzer.analyze_stream(log).await?;
    let mut received_chars = 0;
    stream
        .collect_with(|index, fragment| {
            received_chars += fragment.chars().count();
            pb.set_message(format!(
                "Receiving... {} fragment(s), {} chars",
                index + 1,
                received_chars
            ));
        })
        .await
}

async fn check_setup(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    println!("\n{}", "🔧 Setup check".cyan().bold());
    println!("{}", "─".repeat(60).dimmed());

    let credential = match load_credential() {
        Ok(credential) => {
            println!("  {} API key found: {}", "✓".green(), credential.masked());
            credential
        }
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            println!("\n  Add your key to .env:");
            println!("    GEMINI_API_KEY=AIza... (your actual key)");
            println!("  Get one from: https://aistudio.google.com/app/apikey");
            return Err(e.into());
        }
    };

    let client = GeminiClient::from_settings(credential, settings)?;

    println!("\n{}", "📋 Models supporting generateContent".cyan().bold());
    let catalog = client.list_models().await.map_err(|e| {
        println!("  {} Could not list models: {}", "✗".red(), e);
        e
    })?;

    let capable: Vec<_> = catalog
        .iter()
        .filter(|m| m.supports(GENERATE_METHOD))
        .collect();
    if capable.is_empty() {
        println!("  {} No compatible models found", "⚠".yellow());
    } else {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec!["Model", "Streaming"]);
        for model in &capable {
            let streaming = if model.supports(STREAM_METHOD) {
                "yes".green().to_string()
            } else {
                "no".dimmed().to_string()
            };
            table.add_row(vec![model.name.clone(), streaming]);
        }
        println!("{table}");
        println!(
            "{} {} of {}",
            "Compatible:".dimmed(),
            capable.len().to_string().green(),
            catalog.len()
        );
    }

    println!("\n{}", "🧪 Model resolution".cyan().bold());
    match resolve_model(&client, &settings.model).await {
        Ok(handle) => {
            let note = if handle.name == settings.model.preferred {
                "preferred".green()
            } else {
                "fallback".yellow()
            };
            println!("  {} {} ({})", "✓".green(), handle.name.bold(), note);
            println!("\n{}", "✅ Setup verification complete!".green().bold());
            println!("You can now run: {}", "netlog-api".cyan());
        }
        Err(e) => {
            println!("  {} {}", "✗".red(), e);
            return Err(e.into());
        }
    }

    Ok(())
}

fn write_sample(lines: usize, output: &Path, seed: u64) -> Result<(), Box<dyn std::error::Error>> {
    let entries = sample::generate(lines, chrono::Utc::now(), seed);
    let content = sample::render_log(&entries);
    std::fs::write(output, &content)?;

    println!(
        "{} {} lines ({} bytes) to {}",
        "Wrote".green(),
        entries.len(),
        content.len(),
        output.display()
    );
    println!("Try: {} {}", "netlog analyze".cyan(), output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // nothing listens on the discard port, so any backend call fails fast
    fn offline_settings() -> Settings {
        Settings {
            api_base_url: "http://127.0.0.1:9/v1beta".to_string(),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_analyze_reports_setup_failure_as_error() {
        let path = std::env::temp_dir().join(format!("netlog-cli-{}.log", std::process::id()));
        std::fs::write(&path, "1707571845.123 120 10.0.0.5 TCP_MISS/200 512 GET http://example.com/\n")
            .unwrap();

        let result = analyze_file(&offline_settings(), &path, true, None).await;
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_check_reports_failure_as_error() {
        assert!(check_setup(&offline_settings()).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_log_file_is_error() {
        let missing = std::env::temp_dir().join("netlog-cli-missing.log");
        assert!(analyze_file(&offline_settings(), &missing, false, None).await.is_err());
    }
}
