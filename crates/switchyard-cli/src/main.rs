//! CLI binary for generating and checking graph-driven state machines.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use switchyard_codegen::{
    encode_union_by_name, generate_with_helpers, model_from_source, naming, run_generation, validate_graph,
    write_source, DocumentHost, FileDocumentHost, GraphSource, Severity,
};
use switchyard_syntax::{emit, parse_document, EmitOptions, SyntaxTree};
use switchyard_types::{GeneratorConfig, SwitchyardError};

#[derive(Parser)]
#[command(name = "switchyard", version, about = "Generate Rust state machines from DOT graphs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON generator configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

/// Flags that win over the configuration file.
#[derive(Args, Default)]
struct ConfigOverrides {
    /// Spaces per indentation level
    #[arg(long, global = true)]
    indent: Option<usize>,

    /// Do not place a header comment above a new state union
    #[arg(long, global = true)]
    no_header: bool,

    /// Skip the match_with family on unions
    #[arg(long, global = true)]
    no_match_methods: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate or update the state machine for a graph inside a source file
    Generate {
        /// Rust source file to update (created if missing)
        source: PathBuf,

        /// Graph file (default: the source path with a .dot extension)
        #[arg(short, long)]
        graph: Option<PathBuf>,

        /// Fail instead of writing when the file would change
        #[arg(long, conflicts_with = "stdout")]
        check: bool,

        /// Print the result instead of writing it
        #[arg(long)]
        stdout: bool,
    },

    /// Encode an enum as a union of case structs
    Union {
        source: PathBuf,
        /// Name of the enum to encode
        name: String,
    },

    /// Generate with_<field> helpers for a struct
    With {
        source: PathBuf,
        /// Name of the struct
        name: String,
    },

    /// Lint a graph file
    Validate {
        /// Path to the .dot file
        graph: PathBuf,
    },

    /// Print the state machine model derived from a graph as JSON
    Model {
        /// Path to the .dot file
        graph: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            let code = err
                .downcast_ref::<SwitchyardError>()
                .map(SwitchyardError::exit_code)
                .unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(cli.config.as_deref(), &cli.overrides)?;

    match cli.command {
        Commands::Generate {
            source,
            graph,
            check,
            stdout,
        } => Ok(if cmd_generate(&source, graph, check, stdout, &config).await? {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }),
        Commands::Union { source, name } => {
            cmd_rewrite(&source, &config, |tree| encode_union_by_name(tree, &name, &config)).await
        }
        Commands::With { source, name } => {
            cmd_rewrite(&source, &config, |tree| generate_with_helpers(tree, &name)).await
        }
        Commands::Validate { graph } => cmd_validate(&graph).await,
        Commands::Model { graph } => cmd_model(&graph).await,
    }
}

fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> anyhow::Result<GeneratorConfig> {
    let mut config = match path {
        Some(p) => GeneratorConfig::load(p)?,
        None => GeneratorConfig::default(),
    };
    if let Some(indent) = overrides.indent {
        config.indent_width = indent;
    }
    if overrides.no_header {
        config.header_comment = false;
    }
    if overrides.no_match_methods {
        config.match_methods = false;
    }
    config.validate()?;
    Ok(config)
}

/// `src/door.rs` -> `src/door.dot`.
fn default_graph_path(source: &Path) -> PathBuf {
    source.with_extension("dot")
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            token.cancel();
        }
    });
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

/// Reads through to the file host but keeps the committed text in memory.
struct PreviewHost {
    inner: FileDocumentHost,
    text: Mutex<Option<String>>,
}

#[async_trait]
impl DocumentHost for PreviewHost {
    async fn read_tree(&self) -> switchyard_types::Result<SyntaxTree> {
        self.inner.read_tree().await
    }

    async fn graph_source(&self) -> switchyard_types::Result<GraphSource> {
        self.inner.graph_source().await
    }

    async fn commit(&self, tree: &SyntaxTree) -> switchyard_types::Result<()> {
        let text = emit(tree, &self.inner.options);
        *self.text.lock().map_err(|e| SwitchyardError::Other(e.to_string()))? = Some(text);
        Ok(())
    }
}

/// Returns `false` when `--check` finds the file out of date.
async fn cmd_generate(
    source: &Path,
    graph: Option<PathBuf>,
    check: bool,
    stdout: bool,
    config: &GeneratorConfig,
) -> anyhow::Result<bool> {
    let graph = graph.unwrap_or_else(|| default_graph_path(source));
    let host = FileDocumentHost::new(source, &graph, EmitOptions::from_config(config));
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    if !check && !stdout {
        run_generation(&host, config, &cancel).await?;
        println!("Generated {} from {}", source.display(), graph.display());
        return Ok(true);
    }

    let preview = PreviewHost {
        inner: host,
        text: Mutex::new(None),
    };
    run_generation(&preview, config, &cancel).await?;
    let text = preview
        .text
        .into_inner()
        .map_err(|e| anyhow::anyhow!("{e}"))?
        .unwrap_or_default();

    if stdout {
        print!("{text}");
        return Ok(true);
    }

    let current = match tokio::fs::read_to_string(source).await {
        Ok(current) => current,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };
    if current == text {
        println!("{} is up to date", source.display());
        Ok(true)
    } else {
        println!("{} would change", source.display());
        Ok(false)
    }
}

// ---------------------------------------------------------------------------
// union / with
// ---------------------------------------------------------------------------

async fn cmd_rewrite(
    source: &Path,
    config: &GeneratorConfig,
    transform: impl FnOnce(&SyntaxTree) -> switchyard_types::Result<SyntaxTree>,
) -> anyhow::Result<ExitCode> {
    let text = tokio::fs::read_to_string(source).await?;
    let tree = parse_document(&text)?;
    let updated = transform(&tree)?;
    let changed = write_source(source, &emit(&updated, &EmitOptions::from_config(config))).await?;
    if changed {
        println!("Updated {}", source.display());
    } else {
        println!("{} is up to date", source.display());
    }
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// validate / model
// ---------------------------------------------------------------------------

async fn read_graph(path: &Path) -> anyhow::Result<(String, String)> {
    let text = tokio::fs::read_to_string(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok((file_name, text))
}

async fn cmd_validate(path: &Path) -> anyhow::Result<ExitCode> {
    let (file_name, text) = read_graph(path).await?;
    let graph = switchyard_dot::parse(&text)?;
    let base = naming::base_name_from_file(&file_name)?;
    let diagnostics = validate_graph(&base, &graph);

    if diagnostics.is_empty() {
        println!("Graph is valid");
        return Ok(ExitCode::SUCCESS);
    }

    let mut has_error = false;
    for diag in &diagnostics {
        let severity = match diag.severity {
            Severity::Error => {
                has_error = true;
                "ERROR"
            }
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        };
        match &diag.vertex {
            Some(vertex) => println!("[{}] {} ({}): {}", severity, diag.rule, vertex, diag.message),
            None => println!("[{}] {}: {}", severity, diag.rule, diag.message),
        }
    }

    // Same code as a model derivation failure.
    Ok(if has_error { ExitCode::from(3) } else { ExitCode::SUCCESS })
}

async fn cmd_model(path: &Path) -> anyhow::Result<ExitCode> {
    let (file_name, text) = read_graph(path).await?;
    let model = model_from_source(&file_name, &text)?;
    println!("{}", model.to_json()?);
    Ok(ExitCode::SUCCESS)
}
