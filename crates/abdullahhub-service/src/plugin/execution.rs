//! Running installed plugins on behalf of users and API clients.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use abdullahhub_auth::CredentialCipher;
use abdullahhub_auth::crypto::ApiKeyHasher;
use abdullahhub_core::error::AppError;
use abdullahhub_core::types::{PluginId, UserId};
use abdullahhub_database::repositories::{
    ApiKeyRepository, InstallationRepository, PluginRepository,
};
use abdullahhub_entity::installation::merge_config;
use abdullahhub_entity::plugin::Plugin;
use abdullahhub_plugin::{
    ExecutionContext, ExecutionOutcome, InputFile, PluginExecutor, PluginLoader,
};

use crate::context::RequestContext;

/// Caller-supplied payload.
#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
    /// Input object (or scalar, wrapped as `{"value": ...}`).
    pub input: Value,
    /// Uploaded files keyed by form field.
    pub files: BTreeMap<String, InputFile>,
}

/// Executes plugins and records usage.
#[derive(Debug, Clone)]
pub struct ExecutionService {
    plugins: Arc<PluginRepository>,
    installations: Arc<InstallationRepository>,
    api_keys: Arc<ApiKeyRepository>,
    loader: PluginLoader,
    executor: PluginExecutor,
    cipher: Arc<CredentialCipher>,
    hasher: Arc<ApiKeyHasher>,
}

impl ExecutionService {
    /// Creates a new execution service.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        plugins: Arc<PluginRepository>,
        installations: Arc<InstallationRepository>,
        api_keys: Arc<ApiKeyRepository>,
        loader: PluginLoader,
        executor: PluginExecutor,
        cipher: Arc<CredentialCipher>,
        hasher: Arc<ApiKeyHasher>,
    ) -> Self {
        Self {
            plugins,
            installations,
            api_keys,
            loader,
            executor,
            cipher,
            hasher,
        }
    }

    /// Execute a plugin the caller has installed.
    ///
    /// Unknown plugin: not found. Not installed, disabled installation, or
    /// inactive plugin: forbidden. The caller's stored credential for the
    /// plugin, if any, is decrypted into the context.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        id: PluginId,
        request: ExecutionRequest,
    ) -> Result<ExecutionOutcome, AppError> {
        let plugin = super::find_plugin(&self.plugins, id).await?;
        let installation = self
            .installations
            .find(ctx.user_id, id)
            .await?
            .ok_or_else(|| AppError::authorization("Plugin not installed"))?;
        if !installation.is_usable() {
            return Err(AppError::authorization("Plugin installation is disabled"));
        }
        if !plugin.is_available() {
            return Err(AppError::authorization("Plugin is not active"));
        }

        let api_key = self.stored_key(ctx.user_id, id).await;
        let config = installation.effective_config(&plugin.default_config);
        self.run(&plugin, ctx.user_id, request, api_key, config)
            .await
    }

    /// Execute a plugin for an `X-API-Key` client.
    ///
    /// 401 for an unknown, inactive, or expired key; 404 for a missing or
    /// inactive plugin; 403 when the key belongs to another plugin.
    pub async fn execute_with_api_key(
        &self,
        presented_key: &str,
        id: PluginId,
        input: Value,
    ) -> Result<ExecutionOutcome, AppError> {
        let hash = self.hasher.hash(presented_key.trim());
        let key = self
            .api_keys
            .find_by_hash(&hash)
            .await?
            .filter(|k| k.is_usable())
            .ok_or_else(|| AppError::authentication("Invalid or expired API key"))?;

        let plugin = self
            .plugins
            .find_by_id(id)
            .await?
            .filter(Plugin::is_available)
            .ok_or_else(|| AppError::not_found("Plugin not found or inactive"))?;

        if key.plugin_id != plugin.id {
            return Err(AppError::authorization("API key is not valid for this plugin"));
        }

        let config = match self.installations.find(key.user_id, id).await? {
            Some(installation) => installation.effective_config(&plugin.default_config),
            None => merge_config(&plugin.default_config, &Value::Null),
        };

        let request = ExecutionRequest {
            input,
            files: BTreeMap::new(),
        };
        let outcome = self
            .run(
                &plugin,
                key.user_id,
                request,
                Some(presented_key.trim().to_string()),
                config,
            )
            .await?;
        self.api_keys.record_usage(key.id).await?;
        Ok(outcome)
    }

    async fn run(
        &self,
        plugin: &Plugin,
        user_id: UserId,
        request: ExecutionRequest,
        api_key: Option<String>,
        config: Value,
    ) -> Result<ExecutionOutcome, AppError> {
        self.loader.ensure_loaded(&plugin.slug).await?;

        let context = ExecutionContext::new(user_id.to_string(), plugin.id.to_string())
            .with_input(request.input)
            .with_files(request.files)
            .with_api_key(api_key)
            .with_config(config);

        let outcome = self.executor.execute(&plugin.slug, context).await?;

        self.plugins.increment_executions(plugin.id).await?;
        self.installations.record_usage(user_id, plugin.id).await?;
        debug!(plugin = %plugin.slug, user_id = %user_id, success = outcome.is_success(), "Execution recorded");
        Ok(outcome)
    }

    /// The caller's decrypted credential for a plugin. Unusable or
    /// undecryptable keys are skipped.
    async fn stored_key(&self, user_id: UserId, plugin_id: PluginId) -> Option<String> {
        let key = match self.api_keys.find_for_user_plugin(user_id, plugin_id).await {
            Ok(Some(key)) if key.is_usable() => key,
            Ok(_) => return None,
            Err(e) => {
                warn!(user_id = %user_id, plugin_id = %plugin_id, error = %e, "Failed to look up stored API key");
                return None;
            }
        };
        match self.cipher.decrypt(&key.api_key_encrypted) {
            Ok(plain) => Some(plain),
            Err(e) => {
                warn!(key_id = %key.id, error = %e, "Stored API key could not be decrypted");
                None
            }
        }
    }
}
