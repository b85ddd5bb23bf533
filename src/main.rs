//! CLI entry point for `reportrelay`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use reportrelay::config::{self, Config};
use reportrelay::extract::pdf::PdfTextExtractor;
use reportrelay::extract::resolver::resolve;
use reportrelay::model::mail::EmailData;
use reportrelay::model::report::Grid;
use reportrelay::parser::header::now_iso;
use reportrelay::parser::mime::build_email_data;
use reportrelay::parser::table::{parse_delimited, to_csv, ParseMode};
use reportrelay::pipeline::{Orchestrator, RunSummary};
use reportrelay::render::{JsonRenderer, PayloadRenderer, RasterRenderer, Rendered};
use reportrelay::sink::HttpWebhookSink;
use reportrelay::source::eml::EmlDirSource;
use reportrelay::source::{self, MailSource};

#[derive(Parser)]
#[command(
    name = "reportrelay",
    version,
    about = "Relay BI report emails to TRMNL e-ink dashboards"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Process new report emails and deliver them to the webhook
    Run {
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
        /// Render payloads but neither deliver them nor mark emails read
        #[arg(long)]
        dry_run: bool,
    },
    /// Turn a CSV or .eml file into a payload on stdout
    Parse {
        file: PathBuf,
        /// Report title
        title: Option<String>,
        #[arg(short, long, value_enum, default_value = "json")]
        format: ParseFormat,
    },
    /// Render a CSV file to a PNG
    Render {
        file: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        title: Option<String>,
    },
    /// Print the effective configuration
    Config {
        /// Print only the config file location
        #[arg(long)]
        path: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Clone, Copy, ValueEnum)]
enum ParseFormat {
    /// TRMNL payload
    Json,
    /// The detected table, re-emitted as CSV
    Csv,
}

fn main() -> anyhow::Result<()> {
    // usage errors exit with 1, help and version with 0
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    dotenvy::dotenv().ok();

    let mut config = config::load_config(cli.config.as_deref())?;
    config.apply_env();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::Run { json, dry_run } => cmd_run(&config, json, dry_run),
        Commands::Parse {
            file,
            title,
            format,
        } => cmd_parse(&config, &file, title.as_deref(), format),
        Commands::Render {
            file,
            output,
            title,
        } => cmd_render(&config, &file, &output, title.as_deref()),
        Commands::Config { path } => cmd_config(&config, cli.config.as_deref(), path),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "reportrelay.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

/// One orchestrator run against the configured mailbox and webhook.
fn cmd_run(config: &Config, json: bool, dry_run: bool) -> anyhow::Result<()> {
    config.validate_for_run()?;

    let start = Instant::now();
    let summary = runtime()?.block_on(async {
        let source = source::from_config(config).await?;
        let sink = HttpWebhookSink::from_config(&config.webhook);
        let extractor = PdfTextExtractor;
        let renderer = reportrelay::render::renderer_for(config);

        let orchestrator = Orchestrator {
            config,
            source: source.as_ref(),
            sink: &sink,
            extractor: &extractor,
            renderer: renderer.as_ref(),
            dry_run,
        };

        let pb = if json {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Processing [{bar:40.cyan/blue}] {pos}/{len}")
                .expect("valid template")
                .progress_chars("#>-"),
        );
        let summary = orchestrator
            .run(Some(&|current, total| {
                pb.set_length(total as u64);
                pb.set_position(current as u64);
            }))
            .await;
        pb.finish_and_clear();
        summary
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_run_summary(&summary, start.elapsed(), dry_run);
    }
    Ok(())
}

fn print_run_summary(summary: &RunSummary, elapsed: std::time::Duration, dry_run: bool) {
    println!();
    if dry_run {
        println!("  (dry run: nothing delivered, nothing marked read)");
    }
    println!("  {:<12} {}", "Processed", summary.processed);
    println!("  {:<12} {}", "Failed", summary.failed);
    println!("  {:<12} {:.2?}", "Elapsed", elapsed);

    if !summary.messages.is_empty() {
        println!();
        for m in &summary.messages {
            let subject = m.subject.as_deref().unwrap_or("(no subject)");
            if m.success {
                println!("    ok    {:<20} {subject}", m.message_id);
            } else {
                let stage = m.stage.map(|s| s.to_string()).unwrap_or_default();
                let error = m.error.as_deref().unwrap_or_default();
                println!("    FAIL  {:<20} {subject}: {stage}: {error}", m.message_id);
            }
        }
    }
    println!();
}

/// Read a CSV or `.eml` file and print its payload or table.
fn cmd_parse(
    config: &Config,
    path: &Path,
    title: Option<&str>,
    format: ParseFormat,
) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let is_eml = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("eml"));

    let (grid, email) = if is_eml {
        let (grid, email) = runtime()?.block_on(load_eml(config, path))?;
        (grid.unwrap_or_default(), Some(email))
    } else {
        (read_csv(path)?, None)
    };

    match format {
        ParseFormat::Csv => print!("{}", to_csv(&grid)),
        ParseFormat::Json => {
            let renderer = JsonRenderer::new(
                config.output.currency_symbol.clone(),
                config.output.default_title.clone(),
            );
            let mut email = email.unwrap_or_default();
            if let Some(title) = title {
                email.subject = title.to_string();
            }
            let grid = (!grid.is_empty()).then_some(&grid);
            let Rendered::Json(payload) = renderer.render(&email, grid)? else {
                anyhow::bail!("renderer produced no payload");
            };
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
    }
    Ok(())
}

/// Parse a single `.eml` file through the same path a run takes.
async fn load_eml(config: &Config, path: &Path) -> anyhow::Result<(Option<Grid>, EmailData)> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let id = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let source = EmlDirSource::new(if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    });

    let raw = source.get_full(&id).await?;
    let mut email = build_email_data(&raw);
    let grid = resolve(
        &mut email,
        &source,
        &PdfTextExtractor,
        config.output.attachments,
    )
    .await;
    Ok((grid, email))
}

fn read_csv(path: &Path) -> anyhow::Result<Grid> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_delimited(
        text.trim_start_matches('\u{feff}'),
        ParseMode::Csv,
    ))
}

/// Render a CSV file to a PNG on disk.
fn cmd_render(
    config: &Config,
    path: &Path,
    output: &Path,
    title: Option<&str>,
) -> anyhow::Result<()> {
    use humansize::{format_size, BINARY};

    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let grid = read_csv(path)?;
    let renderer = RasterRenderer::new(
        config.output.image_width,
        config.output.image_height,
        config.output.default_title.clone(),
    );
    let email = EmailData {
        subject: title.unwrap_or_default().to_string(),
        date: now_iso(),
        ..Default::default()
    };
    let grid = (!grid.is_empty()).then_some(&grid);
    let Rendered::Png { bytes, .. } = renderer.render(&email, grid)? else {
        anyhow::bail!("renderer produced no image");
    };
    std::fs::write(output, &bytes)?;

    println!(
        "  {} ({}, {}x{})",
        output.display(),
        format_size(bytes.len(), BINARY),
        config.output.image_width,
        config.output.image_height
    );
    Ok(())
}

/// Print the effective configuration or the config file location.
fn cmd_config(config: &Config, explicit: Option<&Path>, path_only: bool) -> anyhow::Result<()> {
    if path_only {
        match explicit.map(Path::to_path_buf).or_else(config::config_file_path) {
            Some(p) => println!("{}", p.display()),
            None => anyhow::bail!("no configuration directory on this platform"),
        }
        return Ok(());
    }
    print!("{}", toml::to_string_pretty(&config.redacted())?);
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "reportrelay", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
