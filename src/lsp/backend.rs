use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, error, info, warn};

use crate::config::{LspConfig, data_dir, db_path};
use crate::install::outdated::OutdatedCache;
use crate::lsp::commands::{
    HIDE_DEPENDENCY_STATUSES, HIDE_VERSION_LENSES, LensCommand, OPEN_LINK,
    SHOW_DEPENDENCY_STATUSES, SHOW_VERSION_LENSES, UPDATE_DEPENDENCY, parse_open_link_arguments,
    parse_update_arguments, supported_commands,
};
use crate::lsp::decorations::DecorationStore;
use crate::lsp::lens::{PackageLens, RegistryState, resolve_source, resolve_version};
use crate::lsp::provider::{LensData, project_dir, resolve_decoration, unresolved_lenses};
use crate::lsp::refresh::{refresh_packages, registry_state};
use crate::lsp::resolver::{PackageResolver, create_default_resolver};
use crate::lsp::settings::AppSettings;
use crate::parser::types::PackageSource;
use crate::version::cache::Cache;
use crate::version::checker::VersionStorer;

pub struct Backend<S: VersionStorer> {
    client: Client,
    storer: Option<Arc<S>>,
    resolver: RwLock<PackageResolver>,
    config: RwLock<LspConfig>,
    settings: Arc<AppSettings>,
    documents: RwLock<HashMap<Url, String>>,
    outdated: Arc<OutdatedCache>,
    decorations: Arc<DecorationStore>,
}

impl Backend<Cache> {
    pub fn new(client: Client) -> Self {
        let storer = Self::initialize_storer();
        Self::with_parts(
            client,
            storer,
            create_default_resolver(&LspConfig::default()),
        )
    }

    fn initialize_storer() -> Option<Arc<Cache>> {
        let data_dir = data_dir();
        let db_path = db_path();

        // Create data directory if it doesn't exist
        if let Err(e) = std::fs::create_dir_all(&data_dir) {
            error!("Failed to create data directory {:?}: {}", data_dir, e);
            return None;
        }

        match Cache::new(&db_path) {
            Ok(cache) => {
                info!("Cache initialized at {:?}", db_path);
                Some(Arc::new(cache))
            }
            Err(e) => {
                error!("Failed to initialize cache: {}", e);
                None
            }
        }
    }
}

impl<S: VersionStorer> Backend<S> {
    /// Build a Backend with custom storer and resolver
    pub fn build(client: Client, storer: Arc<S>, resolver: PackageResolver) -> Self {
        Self::with_parts(client, Some(storer), resolver)
    }

    fn with_parts(client: Client, storer: Option<Arc<S>>, resolver: PackageResolver) -> Self {
        let config = LspConfig::default();
        Self {
            client,
            storer,
            resolver: RwLock::new(resolver),
            settings: Arc::new(AppSettings::from_config(&config)),
            config: RwLock::new(config),
            documents: RwLock::new(HashMap::new()),
            outdated: Arc::new(OutdatedCache::new()),
            decorations: Arc::new(DecorationStore::new()),
        }
    }

    pub fn server_capabilities() -> ServerCapabilities {
        ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Options(
                TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::FULL),
                    ..Default::default()
                },
            )),
            code_lens_provider: Some(CodeLensOptions {
                resolve_provider: Some(true),
            }),
            inlay_hint_provider: Some(OneOf::Left(true)),
            execute_command_provider: Some(ExecuteCommandOptions {
                commands: supported_commands(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Apply a configuration payload. Registry and npm settings rebuild the resolver.
    async fn apply_config(&self, config: LspConfig) {
        self.settings.apply(&config);

        let mut current = self.config.write().await;
        if current.registry != config.registry || current.npm != config.npm {
            info!(
                "Using registry {} and {} for outdated checks",
                config.registry.url, config.npm.command
            );
            *self.resolver.write().await = create_default_resolver(&config);
        }
        *current = config;
    }

    async fn spawn_background_refresh(&self) {
        let Some(storer) = self.storer.clone() else {
            warn!("Storer not available, skipping background refresh");
            return;
        };

        let refresh_interval = self.config.read().await.cache.refresh_interval;
        let resolver = self.resolver.read().await.clone();

        tokio::spawn(async move {
            let Some(packages) = storer
                .get_packages_needing_refresh(refresh_interval)
                .inspect_err(|e| error!("Failed to get packages needing refresh: {}", e))
                .ok()
            else {
                return;
            };

            if packages.is_empty() {
                info!("No packages need refresh");
                return;
            }

            info!("{} packages need refresh", packages.len());
            refresh_packages(&*storer, &**resolver.registry(), packages).await;
        });
    }

    /// Ask the client to re-request lenses and hints without blocking the caller
    fn request_refresh(&self) {
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.code_lens_refresh().await {
                debug!("Code lens refresh failed: {}", e);
            }
            if let Err(e) = client.inlay_hint_refresh().await {
                debug!("Inlay hint refresh failed: {}", e);
            }
        });
    }

    async fn registry_state_for(
        &self,
        resolver: &PackageResolver,
        data: &LensData,
    ) -> RegistryState {
        if data.node.source != PackageSource::Registry {
            return RegistryState::NotQueried;
        }

        let Some(storer) = &self.storer else {
            warn!("Storer not available, cannot resolve {}", data.node.name);
            return RegistryState::Unavailable;
        };

        registry_state(&**storer, &**resolver.registry(), &data.node.name).await
    }

    /// Compute the install-state decoration in the background
    fn spawn_decoration(
        &self,
        resolver: &PackageResolver,
        data: LensData,
        registry: RegistryState,
    ) {
        let Some(project_dir) = project_dir(&data.uri) else {
            return;
        };

        let matcher = resolver.matcher().clone();
        let outdated = self.outdated.clone();
        let decorations = self.decorations.clone();
        let client = self.client.clone();

        tokio::spawn(async move {
            let Some(decoration) =
                resolve_decoration(&project_dir, &data, &registry, &*matcher, &outdated).await
            else {
                return;
            };

            if decorations.set(&data.uri, decoration).await
                && let Err(e) = client.inlay_hint_refresh().await
            {
                debug!("Inlay hint refresh failed: {}", e);
            }
        });
    }

    async fn update_dependency(&self, arguments: &[Value]) -> Result<Option<Value>> {
        let Some((uri, range, text)) = parse_update_arguments(arguments) else {
            return Err(Error::invalid_params("Expected [uri, range, text]"));
        };

        let edit = WorkspaceEdit {
            changes: Some(HashMap::from([(
                uri,
                vec![TextEdit {
                    range,
                    new_text: text,
                }],
            )])),
            ..Default::default()
        };

        match self.client.apply_edit(edit).await {
            Ok(response) if !response.applied => {
                warn!(
                    "Client rejected dependency update: {}",
                    response.failure_reason.unwrap_or_default()
                );
            }
            Ok(_) => {}
            Err(e) => error!("Failed to apply dependency update: {}", e),
        }

        Ok(None)
    }

    async fn open_link(&self, arguments: &[Value]) -> Result<Option<Value>> {
        let Some(uri) = parse_open_link_arguments(arguments) else {
            return Err(Error::invalid_params("Expected [url]"));
        };

        let external = matches!(uri.scheme(), "http" | "https");
        let params = ShowDocumentParams {
            uri,
            external: Some(external),
            take_focus: Some(true),
            selection: None,
        };

        if let Err(e) = self.client.show_document(params).await {
            error!("Failed to open link: {}", e);
        }

        Ok(None)
    }
}

#[tower_lsp::async_trait]
impl<S: VersionStorer> LanguageServer for Backend<S> {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        self.client
            .log_message(MessageType::INFO, "LSP server initializing")
            .await;

        if let Some(options) = params.initialization_options {
            self.apply_config(LspConfig::from_settings(Some(options))).await;
        }

        Ok(InitializeResult {
            capabilities: Self::server_capabilities(),
            server_info: Some(ServerInfo {
                name: "version-lens".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "LSP server initialized")
            .await;

        self.spawn_background_refresh().await;
    }

    async fn shutdown(&self) -> Result<()> {
        self.client
            .log_message(MessageType::INFO, "LSP server shutting down")
            .await;
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        self.client
            .log_message(
                MessageType::LOG,
                format!("Document opened: {}", params.text_document.uri),
            )
            .await;

        self.documents
            .write()
            .await
            .insert(params.text_document.uri, params.text_document.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // With FULL sync mode, the last content change contains the full document text
        let Some(content) = params.content_changes.into_iter().last().map(|c| c.text) else {
            return;
        };

        let uri = params.text_document.uri;
        // Lines may have moved, decorations come back with the next resolve
        self.decorations.clear(&uri).await;
        self.documents.write().await.insert(uri, content);
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.write().await.remove(&uri);
        self.decorations.clear(&uri).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        self.apply_config(LspConfig::from_settings(Some(params.settings))).await;

        if !self.settings.show_dependency_statuses() {
            self.decorations.clear_all().await;
        }
        self.request_refresh();
    }

    async fn code_lens(&self, params: CodeLensParams) -> Result<Option<Vec<CodeLens>>> {
        let uri = params.text_document.uri;

        if !self.settings.show_version_lenses() {
            return Ok(None);
        }

        let resolver = self.resolver.read().await.clone();
        if !resolver.parser().can_parse(uri.as_str()) {
            return Ok(None);
        }

        let Some(content) = self.documents.read().await.get(&uri).cloned() else {
            return Ok(None);
        };

        let nodes = match resolver.parser().parse(&content) {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!("Skipping lenses for {}: {}", uri, e);
                return Ok(None);
            }
        };

        if self.settings.in_progress() {
            debug!("Lens generation already running, regenerating {}", uri);
        }
        self.settings.set_in_progress(true);

        if self.settings.show_dependency_statuses()
            && let Some(dir) = project_dir(&uri)
        {
            self.outdated.refresh(&**resolver.outdated(), &dir).await;
        }

        let lenses = unresolved_lenses(&uri, &content, nodes);
        debug!("Generated {} lenses for {}", lenses.len(), uri);

        self.settings.set_in_progress(false);

        Ok(Some(lenses))
    }

    async fn code_lens_resolve(&self, mut lens: CodeLens) -> Result<CodeLens> {
        let Some(data) = LensData::from_code_lens(&lens) else {
            return Ok(lens);
        };

        let resolver = self.resolver.read().await.clone();
        let registry = self.registry_state_for(&resolver, &data).await;

        let package_lens = PackageLens::new(&data.node, &registry, &**resolver.matcher());
        let resolution = match resolve_source(&package_lens) {
            Some(resolution) => resolution,
            None => {
                let resolution = resolve_version(&package_lens);
                if self.settings.show_dependency_statuses() {
                    self.spawn_decoration(&resolver, data.clone(), registry.clone());
                }
                resolution
            }
        };

        let dir = project_dir(&data.uri);
        let command =
            LensCommand::from_resolution(&resolution, &data.uri, lens.range, dir.as_deref());
        debug!(
            "Resolved {} ({}): {}",
            data.node.name,
            data.node.field.as_str(),
            command.title()
        );
        lens.command = Some(command.into());

        Ok(lens)
    }

    async fn inlay_hint(&self, params: InlayHintParams) -> Result<Option<Vec<InlayHint>>> {
        if !self.settings.show_dependency_statuses() {
            return Ok(None);
        }

        let hints = self
            .decorations
            .inlay_hints(&params.text_document.uri, params.range)
            .await;

        Ok(Some(hints))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        debug!("Executing {}", params.command);

        match params.command.as_str() {
            UPDATE_DEPENDENCY => self.update_dependency(&params.arguments).await,
            OPEN_LINK => self.open_link(&params.arguments).await,
            SHOW_VERSION_LENSES | HIDE_VERSION_LENSES => {
                self.settings.set_show_version_lenses(params.command == SHOW_VERSION_LENSES);
                self.request_refresh();
                Ok(None)
            }
            SHOW_DEPENDENCY_STATUSES | HIDE_DEPENDENCY_STATUSES => {
                let show = params.command == SHOW_DEPENDENCY_STATUSES;
                self.settings.set_show_dependency_statuses(show);
                if !show {
                    self.decorations.clear_all().await;
                }
                self.request_refresh();
                Ok(None)
            }
            other => Err(Error::invalid_params(format!("Unknown command: {}", other))),
        }
    }
}
