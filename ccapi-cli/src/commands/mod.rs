//! CLI command implementations.

pub mod auth;
pub mod config;
pub mod request;

use std::sync::Arc;

use anyhow::Result;
use ccapi_core::TokenStore;
use ccapi_fetch::{ApiClient, ExecutionContext};
use ccapi_store::{Settings, SettingsStore, TokenBackend, open_token_store};

use crate::{Cli, ContextArg, StoreArg};

/// Everything a command needs to talk to the backend.
pub struct Session {
    pub settings: Settings,
    pub backend: TokenBackend,
    pub store: Arc<dyn TokenStore>,
    pub client: ApiClient,
}

impl Session {
    /// Loads settings, opens the token store and builds the client.
    pub async fn open(cli: &Cli) -> Result<Self> {
        let settings = SettingsStore::load_default().await.get().await;
        let backend = cli.store.map_or(settings.token_backend, backend_for);
        let store = open_token_store(backend, settings.tokens_path());

        let config = settings.client_config_from_env(execution_context(cli));
        let client = ApiClient::builder()
            .config(config)
            .store(Arc::clone(&store))
            .build()?;

        Ok(Self {
            settings,
            backend,
            store,
            client,
        })
    }
}

/// Returns the execution context selected on the command line.
pub fn execution_context(cli: &Cli) -> ExecutionContext {
    match cli.context {
        ContextArg::Server => ExecutionContext::Server,
        ContextArg::Browser => ExecutionContext::browser(cli.page_origin.clone()),
    }
}

fn backend_for(arg: StoreArg) -> TokenBackend {
    match arg {
        StoreArg::File => TokenBackend::File,
        StoreArg::Keychain => TokenBackend::Keychain,
        StoreArg::Memory => TokenBackend::Memory,
    }
}
