//! CLI binary for edgequake-photovibe.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig`, enforces the selection rules, and prints one card per
//! photo.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_photovibe::config::{DEFAULT_ENDPOINT, DEFAULT_MAX_FILES, DEFAULT_MODEL};
use edgequake_photovibe::{
    analyze, analyze_to_file, collect_image_files, AnalysisConfig, AnalysisOutput,
    AnalysisProgressCallback, Confidence, ItemState, Preset, ProgressCallback, PromptProfile,
    ResultItem, UploadBatch,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a progress bar plus one log line per photo.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading photos…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>2}/{len} photos  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Analysing");
        self.bar.set_message("");
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total: usize, already_failed: usize) {
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analysing {total} photos…"))
        ));
        if already_failed > 0 {
            self.errors.fetch_add(already_failed, Ordering::SeqCst);
            self.bar.println(format!(
                "  {} {} photo(s) could not be read and will be skipped",
                red("✗"),
                already_failed
            ));
            self.bar.inc(already_failed as u64);
        }
    }

    fn on_item_complete(&self, index: usize, total: usize, item: &ResultItem) {
        let matches = item
            .analysis
            .as_ref()
            .map_or(0, |a| a.matched_passions.len());
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {:<28}  {}  {}",
            green("✓"),
            index + 1,
            total,
            truncate(&item.file_name, 28),
            dim(&format!("{matches} match(es)")),
            dim(&format!("{:.1}s", item.duration_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, index: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}",
            red("✗"),
            index + 1,
            total,
            red(&truncate(error, 80)),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total: usize, succeeded: usize) {
        self.bar.finish_and_clear();
        let failed = total.saturating_sub(succeeded);
        if failed == 0 {
            eprintln!(
                "{} {} photos analysed",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} photos analysed  ({} failed)",
                status_mark(failed, total),
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

fn status_mark(failed: usize, total: usize) -> String {
    if failed == 0 {
        green("✔")
    } else if failed == total {
        red("✘")
    } else {
        cyan("⚠")
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}\u{2026}")
    } else {
        s.to_string()
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a few photos
  photovibe beach.jpg market.png

  # A whole folder (up to 25 photos), nightlife candidates
  photovibe --preset nightlife ~/Pictures/saturday/

  # Your own candidate list
  photovibe --passions "Street Art,Vintage Shops,Jazz Bars" trip/*.jpg

  # JSON output to a file
  photovibe -o vibes.json trip/

PRESETS:
  itinerary   Travel passions, capture date offered as context (default)
  nightlife   Bars, music, dancing
  outdoors    Hiking, surfing, camping, wildlife

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Gemini API key (GOOGLE_API_KEY also accepted)
  PHOTOVIBE_MODEL         Override model ID
  PHOTOVIBE_ENDPOINT      Override API base URL
  RUST_LOG                Override log filter
"#;

/// Describe the vibe of your photos and match them to passions.
#[derive(Parser, Debug)]
#[command(
    name = "photovibe",
    version,
    about = "Describe the vibe of your photos and match them to passions using Gemini",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Photo files or directories.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Recurse into subdirectories.
    #[arg(short, long)]
    recursive: bool,

    /// Write JSON output to this file instead of printing cards.
    #[arg(short, long, env = "PHOTOVIBE_OUTPUT")]
    output: Option<PathBuf>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model ID.
    #[arg(long, env = "PHOTOVIBE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// API base URL.
    #[arg(long, env = "PHOTOVIBE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Built-in prompt profile.
    #[arg(long, env = "PHOTOVIBE_PRESET", value_enum, default_value = "itinerary")]
    preset: PresetArg,

    /// Comma-separated candidate passions, replacing the preset's list.
    #[arg(long, env = "PHOTOVIBE_PASSIONS")]
    passions: Option<String>,

    /// Text file with a custom prompt template ({passions}, {metadata}).
    #[arg(long, env = "PHOTOVIBE_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Do not offer capture dates to the model.
    #[arg(long, env = "PHOTOVIBE_NO_METADATA")]
    no_metadata: bool,

    /// Maximum photos per run.
    #[arg(long, env = "PHOTOVIBE_MAX_FILES", default_value_t = DEFAULT_MAX_FILES)]
    max_files: usize,

    /// Attempts per photo on rate limiting or network failure.
    #[arg(long, env = "PHOTOVIBE_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Base retry backoff in milliseconds (doubles per attempt).
    #[arg(long, env = "PHOTOVIBE_RETRY_BASE_MS", default_value_t = 500)]
    retry_base_ms: u64,

    /// Per-request timeout in seconds.
    #[arg(long, env = "PHOTOVIBE_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PHOTOVIBE_TEMPERATURE", default_value_t = 0.4)]
    temperature: f32,

    /// Print results as JSON instead of cards.
    #[arg(long, env = "PHOTOVIBE_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PHOTOVIBE_NO_PROGRESS")]
    no_progress: bool,

    /// Exit non-zero if any photo failed.
    #[arg(long)]
    strict: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PHOTOVIBE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, env = "PHOTOVIBE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum PresetArg {
    Itinerary,
    Nightlife,
    Outdoors,
}

impl From<PresetArg> for Preset {
    fn from(v: PresetArg) -> Self {
        match v {
            PresetArg::Itinerary => Preset::Itinerary,
            PresetArg::Nightlife => Preset::Nightlife,
            PresetArg::Outdoors => Preset::Outdoors,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides all the feedback that matters while it is
    // shown, so library logs drop to ERROR unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Selection ────────────────────────────────────────────────────────
    let candidates =
        collect_image_files(&cli.paths, cli.recursive).context("Failed to collect photos")?;
    let mut batch = UploadBatch::new(cli.max_files);
    let outcome = batch.add(candidates).context("Selection rejected")?;

    if outcome.skipped_non_images > 0 && !cli.quiet {
        eprintln!(
            "{} skipped {} non-image file(s)",
            dim("note:"),
            outcome.skipped_non_images
        );
    }

    // ── Build config ─────────────────────────────────────────────────────
    let mut config = build_config(&cli).await?;

    // Checked here so a missing key blocks the run before any file is read.
    config.resolve_api_key().context("Cannot start analysis")?;

    // ── Progress ─────────────────────────────────────────────────────────
    if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        config.progress_callback = Some(cb);
    }

    // ── Run analysis ─────────────────────────────────────────────────────
    let output = if let Some(ref output_path) = cli.output {
        let output = analyze_to_file(batch.files(), output_path, &config)
            .await
            .context("Analysis failed")?;
        if !cli.quiet {
            eprintln!(
                "{}  {}/{} photos  {}ms  →  {}",
                status_mark(output.stats.failed, output.stats.total_files),
                output.stats.succeeded,
                output.stats.total_files,
                output.stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
        output
    } else {
        let output = analyze(batch.files(), &config)
            .await
            .context("Analysis failed")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        if cli.json {
            let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            writeln!(handle, "{json}").context("Failed to write to stdout")?;
        } else {
            render_cards(&mut handle, &output).context("Failed to write to stdout")?;
        }
        if !cli.quiet && !show_progress && !cli.json {
            let stats = &output.stats;
            eprintln!(
                "Analysed {}/{} photos in {}ms",
                stats.succeeded, stats.total_files, stats.total_duration_ms
            );
        }
        output
    };

    if cli.strict {
        output
            .into_result()
            .context("Some photos could not be analysed")?;
    }

    Ok(())
}

/// Map CLI args to `AnalysisConfig`. The progress callback is left unset.
async fn build_config(cli: &Cli) -> Result<AnalysisConfig> {
    let mut profile: PromptProfile = Preset::from(cli.preset.clone()).profile();

    if let Some(ref path) = cli.prompt_file {
        profile.template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt template from {path:?}"))?;
        profile.name = "custom".to_string();
    }

    if let Some(ref list) = cli.passions {
        let passions = parse_passions(list);
        profile = profile.with_passions(&passions);
    }

    if cli.no_metadata {
        profile = profile.with_metadata(false);
    }

    let mut builder = AnalysisConfig::builder()
        .endpoint(cli.endpoint.clone())
        .model(cli.model.clone())
        .profile(profile)
        .max_files(cli.max_files)
        .max_attempts(cli.max_attempts)
        .retry_base_delay_ms(cli.retry_base_ms)
        .request_timeout_secs(cli.timeout)
        .temperature(cli.temperature);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }

    builder.build().context("Invalid configuration")
}

/// Split `--passions` on commas, dropping blanks and duplicates.
fn parse_passions(s: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for p in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !out.iter().any(|o| o.eq_ignore_ascii_case(p)) {
            out.push(p.to_string());
        }
    }
    out
}

/// One card per photo, in selection order.
fn render_cards(w: &mut impl Write, output: &AnalysisOutput) -> io::Result<()> {
    for item in &output.results {
        match (item.state, &item.analysis, &item.error) {
            (ItemState::Done, Some(analysis), _) => {
                writeln!(w, "{} {}", cyan("◆"), bold(&item.file_name))?;
                writeln!(w, "  {}", analysis.description)?;
                let tiers = [
                    (Confidence::High, green("●")),
                    (Confidence::Suggested, dim("○")),
                ];
                for (tier, marker) in tiers {
                    let names: Vec<&str> = analysis
                        .with_confidence(tier)
                        .map(|m| m.passion_name.as_str())
                        .collect();
                    if !names.is_empty() {
                        writeln!(
                            w,
                            "  {marker} {:<10} {}",
                            tier.to_string(),
                            names.join(", ")
                        )?;
                    }
                }
            }
            (_, _, Some(error)) => {
                writeln!(w, "{} {}", red("✗"), bold(&item.file_name))?;
                writeln!(w, "  {}", red(error.detail()))?;
            }
            _ => {
                writeln!(
                    w,
                    "{} {}  {}",
                    dim("…"),
                    bold(&item.file_name),
                    dim("not analysed")
                )?;
            }
        }
        writeln!(w)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passions_are_trimmed_and_deduplicated() {
        assert_eq!(
            parse_passions(" Jazz Bars, street art ,,Street Art, Markets"),
            vec!["Jazz Bars", "street art", "Markets"]
        );
    }

    #[test]
    fn truncate_long_names() {
        assert_eq!(truncate("short.jpg", 28), "short.jpg");
        let t = truncate("a-very-long-file-name-from-a-camera-roll.jpeg", 10);
        assert_eq!(t.chars().count(), 10);
        assert!(t.ends_with('\u{2026}'));
    }

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::try_parse_from(["photovibe", "a.jpg"]).unwrap();
        assert_eq!(cli.max_files, DEFAULT_MAX_FILES);
        assert_eq!(cli.max_attempts, 3);
        assert!(matches!(cli.preset, PresetArg::Itinerary));
    }

    #[test]
    fn status_mark_reflects_failures() {
        assert!(status_mark(0, 3).contains('✔'));
        assert!(status_mark(1, 3).contains('⚠'));
        assert!(status_mark(3, 3).contains('✘'));
    }

    #[tokio::test]
    async fn build_config_leaves_progress_unset() {
        let args = ["photovibe", "--passions", "Jazz Bars,Markets", "a.jpg"];
        let cli = Cli::try_parse_from(args).unwrap();
        let config = build_config(&cli).await.unwrap();
        assert!(config.progress_callback.is_none());
        assert_eq!(config.profile.passions, vec!["Jazz Bars", "Markets"]);
    }

    #[tokio::test]
    async fn unreadable_prompt_file_fails_config() {
        let missing = "/definitely/not/here.txt";
        let cli = Cli::try_parse_from(["photovibe", "--prompt-file", missing, "a.jpg"]).unwrap();
        let err = build_config(&cli).await.unwrap_err();
        assert!(format!("{err:#}").contains("prompt template"));
    }
}
