use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use resviz_analysis::Workspace;
use resviz_config::ResvizConfig;
use resviz_core::{Annotation, normalize_path, utf16_column};
use thiserror::Error;
use tower_lsp::lsp_types::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DidSaveTextDocumentParams, InitializeParams, InitializeResult, InitializedParams, InlayHint,
    InlayHintLabel, InlayHintParams, MessageType, OneOf, Position, Range, SaveOptions,
    ServerCapabilities, ServerInfo, TextDocumentSyncCapability, TextDocumentSyncKind,
    TextDocumentSyncOptions, TextDocumentSyncSaveOptions, Url,
};
use tower_lsp::{Client, LanguageServer, LspService, Server};

const REFRESH_POLL: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum LspServerError {
    #[error("workspace root is not a directory: {0}")]
    WorkspaceNotFound(PathBuf),
    #[error("workspace open task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub struct ResvizLspBackend {
    client: Client,
    workspace: Arc<Workspace>,
    documents: Arc<Mutex<HashMap<String, String>>>,
}

impl ResvizLspBackend {
    pub fn new(client: Client, workspace: Arc<Workspace>) -> Self {
        Self {
            client,
            workspace,
            documents: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn set_document(&self, uri: &Url, text: String) {
        if let Ok(mut documents) = self.documents.lock() {
            documents.insert(document_key(uri), text);
        }
    }

    fn document_text(&self, uri: &Url) -> Option<String> {
        self.documents
            .lock()
            .ok()
            .and_then(|documents| documents.get(&document_key(uri)).cloned())
    }

    fn refresh_constants(&self, uri: &Url) {
        if let Ok(path) = uri.to_file_path() {
            self.workspace.document_saved(&path);
        }
    }

    fn spawn_refresh_watch(&self) {
        let client = self.client.clone();
        let workspace = Arc::clone(&self.workspace);

        tokio::spawn(async move {
            let mut last_seen = workspace.generation();
            loop {
                tokio::time::sleep(REFRESH_POLL).await;

                let generation = workspace.generation();
                if generation == last_seen {
                    continue;
                }
                last_seen = generation;

                tracing::debug!(generation, "resources changed, refreshing inlay hints");
                if let Err(err) = client.inlay_hint_refresh().await {
                    tracing::debug!(error = %err, "client rejected inlay hint refresh");
                }
            }
        });
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for ResvizLspBackend {
    async fn initialize(
        &self,
        _: InitializeParams,
    ) -> tower_lsp::jsonrpc::Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                            include_text: Some(false),
                        })),
                        ..TextDocumentSyncOptions::default()
                    },
                )),
                inlay_hint_provider: Some(OneOf::Left(true)),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: "resviz".to_owned(),
                version: Some(env!("CARGO_PKG_VERSION").to_owned()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.spawn_refresh_watch();
        let _ = self
            .client
            .log_message(MessageType::INFO, "resviz LSP initialized")
            .await;
    }

    async fn shutdown(&self) -> tower_lsp::jsonrpc::Result<()> {
        self.workspace.close();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.refresh_constants(&params.text_document.uri);
        self.set_document(&params.text_document.uri, params.text_document.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        if let Some(change) = params.content_changes.into_iter().last() {
            self.set_document(&params.text_document.uri, change.text);
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        self.refresh_constants(&params.text_document.uri);
        if let Err(err) = self.client.inlay_hint_refresh().await {
            tracing::debug!(error = %err, "client rejected inlay hint refresh");
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let key = document_key(&params.text_document.uri);
        if let Ok(mut documents) = self.documents.lock() {
            documents.remove(&key);
        }
        self.workspace.forget_document(&key);
    }

    async fn inlay_hint(
        &self,
        params: InlayHintParams,
    ) -> tower_lsp::jsonrpc::Result<Option<Vec<InlayHint>>> {
        let uri = params.text_document.uri;
        let Some(text) = self.document_text(&uri) else {
            return Ok(None);
        };

        let hints = inlay_hints_for_document(
            &self.workspace,
            &document_key(&uri),
            &text,
            Some(params.range),
        );
        Ok(Some(hints))
    }
}

pub async fn run_stdio(workspace_root: PathBuf, config: ResvizConfig) -> Result<(), LspServerError> {
    if !workspace_root.is_dir() {
        return Err(LspServerError::WorkspaceNotFound(workspace_root));
    }

    let workspace =
        tokio::task::spawn_blocking(move || Arc::new(Workspace::open(workspace_root, config)))
            .await?;

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) =
        LspService::new(|client| ResvizLspBackend::new(client, Arc::clone(&workspace)));

    Server::new(stdin, stdout, socket).serve(service).await;
    Ok(())
}

pub fn inlay_hints_for_document(
    workspace: &Workspace,
    file_path: &str,
    text: &str,
    range: Option<Range>,
) -> Vec<InlayHint> {
    let lines = text.lines().collect::<Vec<_>>();

    workspace
        .annotate_document(file_path, text)
        .into_iter()
        .filter(|annotation| {
            range.is_none_or(|range| {
                let line = annotation.line as u32;
                line >= range.start.line && line <= range.end.line
            })
        })
        .map(|annotation| {
            let line_text = lines.get(annotation.line).copied().unwrap_or_default();
            annotation_hint(&annotation, line_text)
        })
        .collect()
}

fn annotation_hint(annotation: &Annotation, line_text: &str) -> InlayHint {
    InlayHint {
        position: Position::new(
            annotation.line as u32,
            utf16_column(line_text, annotation.end_column),
        ),
        label: InlayHintLabel::String(format!("\"{}\"", annotation.display_text)),
        kind: None,
        text_edits: None,
        tooltip: None,
        padding_left: Some(true),
        padding_right: None,
        data: None,
    }
}

fn document_key(uri: &Url) -> String {
    match uri.to_file_path() {
        Ok(path) => normalize_path(&path.to_string_lossy()),
        Err(()) => uri.to_string(),
    }
}
