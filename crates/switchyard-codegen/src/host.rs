//! The boundary to whatever owns the document being edited.
//!
//! A [`DocumentHost`] hands out the current syntax tree and the graph text,
//! and takes back the finished tree. [`run_generation`] reads, transforms in
//! one synchronous step and commits only if nothing failed and nobody asked
//! to cancel in the meantime.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use switchyard_syntax::{emit, parse_document, EmitOptions, SyntaxTree};
use switchyard_types::{GeneratorConfig, Result, SwitchyardError};

use crate::generator::generate_from_source;

/// Graph text together with the file name the base name is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSource {
    pub file_name: String,
    pub text: String,
}

#[async_trait]
pub trait DocumentHost: Send + Sync {
    async fn read_tree(&self) -> Result<SyntaxTree>;
    async fn graph_source(&self) -> Result<GraphSource>;
    async fn commit(&self, tree: &SyntaxTree) -> Result<()>;
}

/// Read, generate, commit. Cancellation before the commit leaves the document
/// untouched and yields [`SwitchyardError::Cancelled`].
pub async fn run_generation(
    host: &dyn DocumentHost,
    config: &GeneratorConfig,
    cancel: &CancellationToken,
) -> Result<SyntaxTree> {
    let (tree, graph) = tokio::select! {
        _ = cancel.cancelled() => return Err(SwitchyardError::Cancelled),
        inputs = async { tokio::try_join!(host.read_tree(), host.graph_source()) } => inputs?,
    };

    let generated = generate_from_source(&tree, &graph, config)?;

    if cancel.is_cancelled() {
        tracing::info!(graph = %graph.file_name, "generation cancelled before commit");
        return Err(SwitchyardError::Cancelled);
    }
    host.commit(&generated).await?;
    tracing::debug!(graph = %graph.file_name, "committed generated tree");
    Ok(generated)
}

// ---------------------------------------------------------------------------
// FileDocumentHost
// ---------------------------------------------------------------------------

/// A Rust source file and its graph on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileDocumentHost {
    pub source_path: PathBuf,
    pub graph_path: PathBuf,
    pub options: EmitOptions,
}

impl FileDocumentHost {
    pub fn new(source_path: impl Into<PathBuf>, graph_path: impl Into<PathBuf>, options: EmitOptions) -> Self {
        Self {
            source_path: source_path.into(),
            graph_path: graph_path.into(),
            options,
        }
    }
}

/// `Door.dot` -> `Door.dot`, falling back to the whole path.
fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

#[async_trait]
impl DocumentHost for FileDocumentHost {
    async fn read_tree(&self) -> Result<SyntaxTree> {
        match tokio::fs::read_to_string(&self.source_path).await {
            Ok(text) => parse_document(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.source_path.display(), "source file missing, starting empty");
                Ok(SyntaxTree::empty_file())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn graph_source(&self) -> Result<GraphSource> {
        let text = tokio::fs::read_to_string(&self.graph_path).await?;
        Ok(GraphSource {
            file_name: display_name(&self.graph_path),
            text,
        })
    }

    async fn commit(&self, tree: &SyntaxTree) -> Result<()> {
        write_source(&self.source_path, &emit(tree, &self.options)).await?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source.rs".to_string());
    path.with_file_name(format!(".{name}.switchyard.tmp"))
}

/// Replace the contents of `path` with `text` through a sibling temp file and
/// a rename, so readers never see a half-written source. Returns whether the
/// file changed.
pub async fn write_source(path: &Path, text: &str) -> Result<bool> {
    if let Ok(current) = tokio::fs::read_to_string(path).await {
        if current == text {
            tracing::debug!(path = %path.display(), "source already up to date");
            return Ok(false);
        }
    }
    let temp = temp_path(path);
    tokio::fs::write(&temp, text).await?;
    if let Err(e) = tokio::fs::rename(&temp, path).await {
        if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
            tracing::debug!(path = %temp.display(), error = %cleanup, "could not remove temp file");
        }
        return Err(e.into());
    }
    tracing::info!(path = %path.display(), bytes = text.len(), "wrote source");
    Ok(true)
}
