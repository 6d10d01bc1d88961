use std::ffi::OsStr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use resviz_config::{config_path, ensure_workspace_config, validate_config};
use resvizd::annotate::{AnnotationOutputFormat, run_annotate_once};
use resvizd::resources::run_list_resources;
use resvizd::watch::run_watch_loop;

#[derive(Debug, Parser)]
#[command(author, version, about = "Resolve resource references to their values")]
struct Cli {
    #[arg(long, default_value = ".", help = "Workspace root to load resources from")]
    workspace: PathBuf,

    #[arg(long, help = "Run as stdio LSP server publishing inlay hints")]
    lsp: bool,

    #[arg(
        long,
        conflicts_with_all = ["lsp", "list_resources"],
        help = "Print the resolved references in one source file and exit"
    )]
    annotate: Option<PathBuf>,

    #[arg(
        long,
        default_value = "table",
        value_parser = parse_output_format,
        requires = "annotate",
        help = "Annotation output format: table or json"
    )]
    output: AnnotationOutputFormat,

    #[arg(
        long,
        conflicts_with_all = ["lsp", "annotate"],
        help = "Print every loaded resource table and exit"
    )]
    list_resources: bool,

    #[arg(long, help = "Override the preferred culture from the workspace config")]
    culture: Option<String>,

    #[arg(long, help = "Enable debug logging")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = parse_cli();
    setup_tracing(cli.verbose);
    run(cli)
}

fn parse_cli() -> Cli {
    let mut args: Vec<_> = std::env::args_os().collect();
    if args.get(1).is_some_and(|arg| arg == OsStr::new("--")) {
        args.remove(1);
    }

    Cli::parse_from(args)
}

// Logs go to stderr so stdout stays free for LSP traffic and command output.
fn setup_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(cli: Cli) -> Result<()> {
    let workspace = cli.workspace.canonicalize().with_context(|| {
        format!(
            "failed to resolve workspace path {}",
            cli.workspace.display()
        )
    })?;

    let mut config = ensure_workspace_config(&workspace).with_context(|| {
        format!(
            "failed to load or create workspace config at {}",
            config_path(&workspace).display()
        )
    })?;
    if let Some(culture) = cli.culture {
        config.display.preferred_culture = culture.trim().to_owned();
    }
    for warning in validate_config(&config) {
        tracing::warn!(code = warning.code, "{}", warning.message);
    }

    if let Some(file) = cli.annotate.as_deref() {
        let mut out = std::io::stdout();
        return run_annotate_once(&workspace, config, file, cli.output, &mut out);
    }

    if cli.list_resources {
        let mut out = std::io::stdout();
        return run_list_resources(&workspace, config, &mut out);
    }

    if cli.lsp {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to build tokio runtime for LSP")?;
        runtime
            .block_on(resviz_lsp::run_stdio(workspace, config))
            .context("LSP server exited with error")?;
        return Ok(());
    }

    run_watch_loop(&workspace, config)
}

fn parse_output_format(value: &str) -> Result<AnnotationOutputFormat, String> {
    value.parse()
}
