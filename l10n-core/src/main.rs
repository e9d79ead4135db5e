use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use l10n_core::config::{model_version, Settings};
use l10n_core::services::lint::Severity;
use l10n_core::services::{cache, lint, locale_file};
use l10n_core::{run, OpenAiTranslator, RunOptions};

#[derive(Parser, Debug)]
#[command(name = "l10n")]
#[command(about = "Fill in missing UI translations with a cached, validated LLM pipeline", long_about = None)]
struct Cli {
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Settings file (default: $L10N_CONFIG or ./l10n.toml)
    #[arg(long, global = true, value_name = "TOML")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate missing and changed keys into one locale
    Translate(TranslateArgs),

    /// Check key and placeholder parity of a translated file
    Lint {
        #[arg(long, value_name = "JSON")]
        src: PathBuf,

        #[arg(long, value_name = "JSON")]
        dst: PathBuf,
    },

    /// Print cache entry count, size and model version
    CacheStats {
        #[arg(long, value_name = "JSON")]
        cache_file: Option<PathBuf>,

        /// Also report whether the cache matches this model
        #[arg(long)]
        model: Option<String>,
    },
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Source-language file (e.g. locales/en.json)
    #[arg(long, value_name = "JSON")]
    source: PathBuf,

    /// Destination file; created if missing
    #[arg(long, value_name = "JSON")]
    dst: PathBuf,

    /// Target locale code (default from settings)
    #[arg(long)]
    locale: Option<String>,

    /// Already translated locale used as a second reference
    #[arg(long, value_name = "JSON")]
    reference: Option<PathBuf>,

    /// Earlier draft translations offered as hints
    #[arg(long, value_name = "JSON")]
    draft: Option<PathBuf>,

    #[arg(long, value_name = "JSON")]
    cache_file: Option<PathBuf>,

    /// Retranslate keys that are already up to date
    #[arg(long)]
    force: bool,

    /// Ignore the cache file entirely
    #[arg(long)]
    no_cache: bool,

    /// Concurrent provider calls
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long, value_name = "FILE")]
    glossary: Option<PathBuf>,

    #[arg(long, value_name = "JSON")]
    fewshot: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    system_prompt: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match execute(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Translate(args) => translate(cli.config, args),
        Command::Lint { src, dst } => lint_files(src, dst),
        Command::CacheStats { cache_file, model } => cache_stats(cli.config, cache_file, model),
    }
}

fn translate(config: Option<PathBuf>, args: TranslateArgs) -> anyhow::Result<ExitCode> {
    let mut settings = Settings::load(config.as_deref()).context("failed to load settings")?;

    if let Some(locale) = args.locale {
        settings.pipeline.locale = locale;
    }
    if let Some(workers) = args.workers {
        settings.pipeline.workers = workers;
    }
    if let Some(p) = args.glossary {
        settings.pipeline.glossary_path = Some(p);
    }
    if let Some(p) = args.fewshot {
        settings.pipeline.fewshot_path = Some(p);
    }
    if let Some(p) = args.system_prompt {
        settings.pipeline.system_prompt_path = Some(p);
    }
    if let Some(p) = args.cache_file {
        settings.pipeline.cache_file = p;
    }
    settings.validate()?;

    let translator = OpenAiTranslator::new(&settings.provider)?;

    let mut options = RunOptions::from_settings(&settings);
    options.force = args.force;
    options.use_cache = !args.no_cache;

    // First Ctrl-C stops handing out keys; a second one exits at once.
    signal_hook::flag::register_conditional_shutdown(
        signal_hook::consts::SIGINT,
        1,
        Arc::clone(&options.cancel),
    )
    .context("failed to install SIGINT handler")?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&options.cancel))
        .context("failed to install SIGINT handler")?;

    let locale = settings.pipeline.locale.clone();
    let report = run(
        &args.source,
        args.reference.as_deref(),
        args.draft.as_deref(),
        &args.dst,
        &locale,
        &settings.pipeline.cache_file,
        &options,
        &translator,
    )
    .with_context(|| format!("translation run for '{locale}' failed"))?;

    print!("{report}");

    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn lint_files(src: PathBuf, dst: PathBuf) -> anyhow::Result<ExitCode> {
    let source = locale_file::load(&src)?;
    let destination = locale_file::load(&dst)?;

    let report = lint::lint(&source, &destination);
    for issue in &report.issues {
        let tag = match issue.severity {
            Severity::Fail => "fail",
            Severity::Warn => "warn",
        };
        println!("[{tag}] {}: {} ({})", issue.key, issue.message, issue.code);
    }
    println!(
        "{}: {} failure(s), {} warning(s)",
        dst.display(),
        report.failures(),
        report.warnings()
    );

    Ok(if report.ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn cache_stats(
    config: Option<PathBuf>,
    cache_file: Option<PathBuf>,
    model: Option<String>,
) -> anyhow::Result<ExitCode> {
    let path = match cache_file {
        Some(p) => p,
        None => {
            Settings::load(config.as_deref())
                .context("failed to load settings")?
                .pipeline
                .cache_file
        }
    };

    let stats = cache::inspect(&path)?;
    println!("cache:         {}", path.display());
    println!("entries:       {}", stats.count);
    println!("size:          {} bytes", stats.size);
    println!("model_version: {}", stats.model_version);

    if let Some(model) = model {
        let current = model_version(&model);
        if current == stats.model_version {
            println!("matches {current}");
        } else {
            println!("stale for {current}; the next run starts a fresh cache");
        }
    }

    Ok(ExitCode::SUCCESS)
}
