// Shopware LSP - Language Server for Shopware and Symfony projects
//
// Copyright (c) 2025 the shopware-lsp contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The JSON-RPC dispatcher: capability advertisement, document sync,
//! request fan-out, and indexing lifecycle.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::notification::Notification;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info, warn};

use shopware_lsp_core::{
    CancelFlag, DocumentManager, FileScanner, HashStore, IndexerRegistry, VersionGate,
};

use crate::bootstrap::Bootstrap;
use crate::providers::{ProviderRegistry, RequestContext};

/// Debounce window for change-triggered diagnostics.
const DEBOUNCE_MS: u64 = 200;

/// `shopware/indexingStarted` notification.
pub enum IndexingStarted {}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexingStartedParams {
    pub message: String,
}

impl Notification for IndexingStarted {
    type Params = IndexingStartedParams;
    const METHOD: &'static str = "shopware/indexingStarted";
}

/// `shopware/indexingCompleted` notification.
pub enum IndexingCompleted {}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingCompletedParams {
    pub message: String,
    pub time_in_seconds: f64,
}

impl Notification for IndexingCompleted {
    type Params = IndexingCompletedParams;
    const METHOD: &'static str = "shopware/indexingCompleted";
}

/// Immediate reply to `shopware/forceReindex`; the scan itself runs
/// asynchronously.
#[derive(Debug, Serialize, Deserialize)]
pub struct ForceReindexResponse {
    pub message: String,
}

/// The Shopware language server.
pub struct ShopwareLanguageServer {
    client: Client,
    cache_dir: PathBuf,
    version: String,
    documents: Arc<DocumentManager>,
    scanner: Arc<FileScanner>,
    indexers: Arc<IndexerRegistry>,
    providers: Arc<ProviderRegistry>,
    hashes: Arc<HashStore>,
    cancel: CancelFlag,
    debounce: DashMap<Url, mpsc::UnboundedSender<()>>,
}

impl ShopwareLanguageServer {
    pub fn new(client: Client, bootstrap: Bootstrap, version: String) -> Self {
        Self {
            client,
            cache_dir: bootstrap.cache_dir,
            version,
            documents: bootstrap.documents,
            scanner: bootstrap.scanner,
            indexers: bootstrap.indexers,
            providers: bootstrap.providers,
            hashes: bootstrap.hashes,
            cancel: CancelFlag::new(),
            debounce: DashMap::new(),
        }
    }

    /// Handler for the custom `shopware/forceReindex` request. Replies
    /// immediately; a scan already in flight coalesces the new one away.
    pub async fn force_reindex(&self) -> Result<ForceReindexResponse> {
        info!("force reindex requested");
        self.spawn_index_all(true);
        Ok(ForceReindexResponse {
            message: "Reindexing started".to_string(),
        })
    }

    fn request_context(&self, uri: Url, position: Position) -> RequestContext {
        let mut ctx = RequestContext::new(&self.documents, uri, position);
        self.providers.enrich(&mut ctx);
        ctx
    }

    /// Run a full scan off the dispatcher, bracketed by the custom
    /// progress notifications.
    fn spawn_index_all(&self, force: bool) {
        let client = self.client.clone();
        let scanner = Arc::clone(&self.scanner);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            client
                .send_notification::<IndexingStarted>(IndexingStartedParams {
                    message: "Indexing workspace".to_string(),
                })
                .await;
            let started = Instant::now();
            let outcome =
                tokio::task::spawn_blocking(move || scanner.index_all(&cancel, force)).await;
            let message = match outcome {
                Ok(Ok(summary)) => format!(
                    "Indexing completed: {} indexed, {} removed, {} unchanged",
                    summary.indexed, summary.removed, summary.unchanged
                ),
                Ok(Err(e)) => format!("Indexing failed: {e}"),
                Err(e) => format!("Indexing task panicked: {e}"),
            };
            client
                .send_notification::<IndexingCompleted>(IndexingCompletedParams {
                    message,
                    time_in_seconds: started.elapsed().as_secs_f64(),
                })
                .await;
        });
    }

    fn spawn_targeted(&self, to_index: Vec<PathBuf>, to_remove: Vec<PathBuf>) {
        if to_index.is_empty() && to_remove.is_empty() {
            return;
        }
        let scanner = Arc::clone(&self.scanner);
        let cancel = self.cancel.clone();
        tokio::task::spawn_blocking(move || {
            if !to_index.is_empty() {
                if let Err(e) = scanner.index_files(&cancel, &to_index) {
                    warn!("targeted index failed: {e}");
                }
            }
            if !to_remove.is_empty() {
                if let Err(e) = scanner.remove_files(&to_remove) {
                    warn!("targeted remove failed: {e}");
                }
            }
        });
    }

    /// Publish diagnostics for one URI off the dispatcher.
    fn spawn_publish(&self, uri: Url) {
        let client = self.client.clone();
        let documents = Arc::clone(&self.documents);
        let providers = Arc::clone(&self.providers);
        tokio::spawn(async move {
            let Some(document) = documents.get(uri.as_str()) else {
                return;
            };
            let diagnostics = providers.diagnostics(&document);
            debug!(
                "publishing {} diagnostics for {uri} (v{})",
                diagnostics.len(),
                document.version()
            );
            client
                .publish_diagnostics(uri, diagnostics, Some(document.version()))
                .await;
        });
    }

    /// Debounced diagnostics for a changed document, one channel per URI
    /// so bursts of keystrokes collapse into one publication.
    fn schedule_diagnostics(&self, uri: Url) {
        if let Some(sender) = self.debounce.get(&uri) {
            let _ = sender.send(());
            return;
        }
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let documents = Arc::clone(&self.documents);
        let providers = Arc::clone(&self.providers);
        let task_uri = uri.clone();
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                sleep(Duration::from_millis(DEBOUNCE_MS)).await;
                while rx.try_recv().is_ok() {}

                let Some(document) = documents.get(task_uri.as_str()) else {
                    continue;
                };
                let diagnostics = providers.diagnostics(&document);
                client
                    .publish_diagnostics(task_uri.clone(), diagnostics, Some(document.version()))
                    .await;
            }
        });
        let _ = tx.send(());
        self.debounce.insert(uri, tx);
    }

    /// Republish diagnostics for every open document; used after scans
    /// change cross-file state.
    fn wire_scan_updates(&self) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<PathBuf>>();
        self.scanner.set_on_update(move |paths| {
            let _ = tx.send(paths.to_vec());
        });

        let client = self.client.clone();
        let documents = Arc::clone(&self.documents);
        let providers = Arc::clone(&self.providers);
        tokio::spawn(async move {
            while let Some(changed) = rx.recv().await {
                if changed.is_empty() {
                    continue;
                }
                for uri in documents.open_uris() {
                    let Some(document) = documents.get(&uri) else {
                        continue;
                    };
                    let Ok(url) = Url::parse(&uri) else {
                        continue;
                    };
                    let diagnostics = providers.diagnostics(&document);
                    client
                        .publish_diagnostics(url, diagnostics, Some(document.version()))
                        .await;
                }
            }
        });
    }

    fn file_operation_filters() -> FileOperationRegistrationOptions {
        FileOperationRegistrationOptions {
            filters: vec![FileOperationFilter {
                scheme: Some("file".to_string()),
                pattern: FileOperationPattern {
                    glob: "**/*.{xml,php}".to_string(),
                    matches: None,
                    options: None,
                },
            }],
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for ShopwareLanguageServer {
    #[allow(deprecated)]
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!("shopware language server v{} initializing", self.version);

        let root = params
            .root_path
            .map(PathBuf::from)
            .or_else(|| {
                params
                    .root_uri
                    .as_ref()
                    .and_then(|uri| uri.to_file_path().ok())
            })
            .or_else(|| {
                params
                    .workspace_folders
                    .as_ref()
                    .and_then(|folders| folders.first())
                    .and_then(|folder| folder.uri.to_file_path().ok())
            })
            .or_else(|| std::env::current_dir().ok());

        if let Some(root) = root {
            info!("workspace root: {}", root.display());
            self.scanner.set_root(root);
            if let Err(e) = self.scanner.start_watcher() {
                warn!("file watcher unavailable: {e}");
            }
        } else {
            warn!("no workspace root could be determined");
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(self.providers.trigger_characters()),
                    work_done_progress_options: Default::default(),
                    all_commit_characters: None,
                    completion_item: None,
                }),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                code_lens_provider: Some(CodeLensOptions {
                    resolve_provider: Some(true),
                }),
                code_action_provider: Some(CodeActionProviderCapability::Options(
                    CodeActionOptions {
                        code_action_kinds: Some(self.providers.code_action_kinds()),
                        work_done_progress_options: Default::default(),
                        resolve_provider: None,
                    },
                )),
                diagnostic_provider: Some(DiagnosticServerCapabilities::Options(
                    DiagnosticOptions {
                        identifier: Some("shopware".to_string()),
                        inter_file_dependencies: true,
                        workspace_diagnostics: false,
                        work_done_progress_options: Default::default(),
                    },
                )),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: self.providers.command_names(),
                    work_done_progress_options: Default::default(),
                }),
                workspace: Some(WorkspaceServerCapabilities {
                    workspace_folders: None,
                    file_operations: Some(WorkspaceFileOperationsServerCapabilities {
                        did_create: Some(Self::file_operation_filters()),
                        will_create: None,
                        did_rename: Some(Self::file_operation_filters()),
                        will_rename: None,
                        did_delete: Some(Self::file_operation_filters()),
                        will_delete: None,
                    }),
                }),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: "shopware-lsp".to_string(),
                version: Some(self.version.clone()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        info!("initialized; starting workspace indexing");
        self.wire_scan_updates();

        let force = VersionGate::check(&self.cache_dir, &self.version);
        VersionGate::record(&self.cache_dir, &self.version);
        self.spawn_index_all(force);
    }

    async fn shutdown(&self) -> Result<()> {
        info!("shutting down");
        self.scanner.stop_watcher();
        self.documents.close_all();
        self.indexers.close_all();
        if let Err(e) = self.hashes.flush() {
            warn!("failed to flush hash store on shutdown: {e}");
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!("did_open {uri}");
        self.documents.open(
            uri.as_str(),
            &params.text_document.text,
            params.text_document.version,
        );
        self.spawn_publish(uri);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        if let Some(change) = params.content_changes.into_iter().last() {
            self.documents
                .update(uri.as_str(), &change.text, params.text_document.version);
            self.schedule_diagnostics(uri);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!("did_close {uri}");
        self.documents.close(uri.as_str());
        self.debounce.remove(&uri);
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let position = params.text_document_position.position;
        let ctx =
            self.request_context(params.text_document_position.text_document.uri, position);
        let items = self.providers.complete(&ctx);
        Ok(Some(CompletionResponse::List(CompletionList {
            is_incomplete: false,
            items,
        })))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params.position;
        let ctx = self.request_context(
            params.text_document_position_params.text_document.uri,
            position,
        );
        let locations = self.providers.definitions(&ctx);
        Ok(match locations.len() {
            0 => None,
            1 => Some(GotoDefinitionResponse::Scalar(
                locations.into_iter().next().expect("len checked"),
            )),
            _ => Some(GotoDefinitionResponse::Array(locations)),
        })
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let position = params.text_document_position.position;
        let ctx =
            self.request_context(params.text_document_position.text_document.uri, position);
        let locations = self.providers.references(&ctx);
        Ok((!locations.is_empty()).then_some(locations))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let position = params.text_document_position_params.position;
        let ctx = self.request_context(
            params.text_document_position_params.text_document.uri,
            position,
        );
        Ok(self.providers.hover(&ctx))
    }

    async fn code_lens(&self, params: CodeLensParams) -> Result<Option<Vec<CodeLens>>> {
        let Some(document) = self.documents.get(params.text_document.uri.as_str()) else {
            return Ok(None);
        };
        Ok(Some(self.providers.code_lenses(&document)))
    }

    async fn code_lens_resolve(&self, lens: CodeLens) -> Result<CodeLens> {
        Ok(self.providers.resolve_code_lens(lens))
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let ctx = self.request_context(params.text_document.uri, params.range.start);
        let actions =
            self.providers
                .code_actions(&ctx, params.range, &params.context.diagnostics);
        Ok((!actions.is_empty()).then_some(actions))
    }

    async fn diagnostic(
        &self,
        params: DocumentDiagnosticParams,
    ) -> Result<DocumentDiagnosticReportResult> {
        let items = self
            .documents
            .get(params.text_document.uri.as_str())
            .map(|document| self.providers.diagnostics(&document))
            .unwrap_or_default();
        Ok(DocumentDiagnosticReportResult::Report(
            DocumentDiagnosticReport::Full(RelatedFullDocumentDiagnosticReport {
                related_documents: None,
                full_document_diagnostic_report: FullDocumentDiagnosticReport {
                    result_id: None,
                    items,
                },
            }),
        ))
    }

    async fn execute_command(
        &self,
        params: ExecuteCommandParams,
    ) -> Result<Option<serde_json::Value>> {
        debug!("executeCommand {}", params.command);
        Ok(self.providers.execute(&params.command, &params.arguments))
    }

    async fn did_create_files(&self, params: CreateFilesParams) {
        let paths: Vec<PathBuf> = params
            .files
            .iter()
            .map(|file| shopware_lsp_core::workspace::normalize_uri(&file.uri))
            .collect();
        self.spawn_targeted(paths, Vec::new());
    }

    async fn did_rename_files(&self, params: RenameFilesParams) {
        let mut to_index = Vec::new();
        let mut to_remove = Vec::new();
        for file in &params.files {
            to_remove.push(shopware_lsp_core::workspace::normalize_uri(&file.old_uri));
            to_index.push(shopware_lsp_core::workspace::normalize_uri(&file.new_uri));
        }
        self.spawn_targeted(to_index, to_remove);
    }

    async fn did_delete_files(&self, params: DeleteFilesParams) {
        let paths: Vec<PathBuf> = params
            .files
            .iter()
            .map(|file| shopware_lsp_core::workspace::normalize_uri(&file.uri))
            .collect();
        self.spawn_targeted(Vec::new(), paths);
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let mut to_index = Vec::new();
        let mut to_remove = Vec::new();
        for event in params.changes {
            let Ok(path) = event.uri.to_file_path() else {
                continue;
            };
            if event.typ == FileChangeType::CREATED || event.typ == FileChangeType::CHANGED {
                to_index.push(path);
            } else if event.typ == FileChangeType::DELETED {
                to_remove.push(path);
            }
        }
        self.spawn_targeted(to_index, to_remove);
    }
}
