//! Provider lifecycle.
//!
//! [`ProviderService`] is the interface a host drives: schema discovery,
//! configuration, then plan/create/read/update/delete/import per resource.
//! [`AidboxProvider`] implements it for the single `aidbox_license` resource.

use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::client::{HttpClient, LicenseClient};
use crate::config::{provider_config_schema, EnvLookup, ProcessEnv, ProviderConfig};
use crate::error::ProviderError;
use crate::resource::{
    license_schema, plan_license, LicenseModel, LicenseResource, LICENSE_RESOURCE,
};
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{ImportedResource, PlanResult, ProviderMetadata};
use crate::validation::validate;

/// Provider type name; every resource type starts with it.
pub const PROVIDER_TYPE_NAME: &str = "aidbox";

/// Trait that provider implementations must implement.
///
/// States cross this boundary as JSON values. A `None` from [`read`] tells
/// the host the resource no longer exists.
///
/// [`read`]: ProviderService::read
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    // =========================================================================
    // Schema & Metadata
    // =========================================================================

    /// Return the provider's schema including all resources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata. By default, the resource list is derived
    /// from the schema.
    fn metadata(&self) -> ProviderMetadata {
        let mut resources: Vec<String> = self.schema().resources.keys().cloned().collect();
        resources.sort_unstable();
        ProviderMetadata {
            resources,
            ..Default::default()
        }
    }

    // =========================================================================
    // Provider Lifecycle
    // =========================================================================

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.schema().provider, &config))
    }

    /// Configure the provider with credentials and settings.
    /// Returns diagnostics (errors and warnings).
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Stop the provider gracefully.
    async fn stop(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    // =========================================================================
    // Resource Operations
    // =========================================================================

    /// Validate a resource's configuration before planning.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.schema();
        let resource = schema
            .resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))?;
        Ok(validate(resource, &config))
    }

    /// Plan changes for a resource. A null `proposed_state` plans a destroy.
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError>;

    /// Create a new resource.
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Read the current state of a resource. `None` means it is gone.
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError>;

    /// Update an existing resource.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError>;

    /// Import existing infrastructure into management.
    async fn import_resource(
        &self,
        resource_type: &str,
        _id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        Err(ProviderError::Sdk(format!(
            "Import not supported for resource type: {}",
            resource_type
        )))
    }
}

/// The Aidbox provider.
pub struct AidboxProvider {
    version: String,
    injected: Option<Arc<dyn LicenseClient>>,
    env: Box<dyn EnvLookup + Send + Sync>,
    client: RwLock<Option<Arc<dyn LicenseClient>>>,
}

impl AidboxProvider {
    /// Create a provider that talks HTTP once configured.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            injected: None,
            env: Box::new(ProcessEnv),
            client: RwLock::new(None),
        }
    }

    /// Create a provider that uses `client` instead of building an
    /// [`HttpClient`]. Configuration is still validated and resolved.
    pub fn with_client(version: impl Into<String>, client: Arc<dyn LicenseClient>) -> Self {
        Self {
            injected: Some(client),
            ..Self::new(version)
        }
    }

    /// Replace the environment consulted for the token fallback.
    pub fn with_env(mut self, env: impl EnvLookup + Send + Sync + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Returns true once `configure` has succeeded.
    pub fn is_configured(&self) -> bool {
        self.client
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn license_resource(&self, resource_type: &str) -> Result<LicenseResource, ProviderError> {
        check_resource_type(resource_type)?;
        let client = self
            .client
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| {
                ProviderError::NotConfigured(
                    "configure must succeed before managing resources".to_string(),
                )
            })?;
        Ok(LicenseResource::new(client))
    }
}

fn check_resource_type(resource_type: &str) -> Result<(), ProviderError> {
    if resource_type == LICENSE_RESOURCE {
        Ok(())
    } else {
        Err(ProviderError::UnknownResource(resource_type.to_string()))
    }
}

fn decode_state(value: Option<Value>) -> Result<Option<LicenseModel>, ProviderError> {
    value
        .filter(|v| !v.is_null())
        .map(LicenseModel::from_value)
        .transpose()
}

#[async_trait::async_trait]
impl ProviderService for AidboxProvider {
    fn schema(&self) -> ProviderSchema {
        ProviderSchema::new()
            .with_provider_config(provider_config_schema())
            .with_resource(LICENSE_RESOURCE, license_schema())
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            type_name: PROVIDER_TYPE_NAME.to_string(),
            version: self.version.clone(),
            resources: vec![LICENSE_RESOURCE.to_string()],
        }
    }

    #[instrument(skip(self, config), name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let mut diagnostics = self.validate_provider_config(config.clone()).await?;
        if diagnostics.iter().any(Diagnostic::is_error) {
            warn!(
                diagnostics = diagnostics.len(),
                "Provider configuration is invalid"
            );
            return Ok(diagnostics);
        }

        let resolved = match ProviderConfig::from_value(&config)
            .and_then(|cfg| cfg.resolve(&*self.env))
        {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(error = %e, "Provider configuration could not be resolved");
                diagnostics.push(e.to_diagnostic());
                return Ok(diagnostics);
            },
        };

        info!(endpoint = %resolved.endpoint, "Configuring Aidbox provider");
        let client: Arc<dyn LicenseClient> = match &self.injected {
            Some(client) => Arc::clone(client),
            None => Arc::new(HttpClient::new(resolved.endpoint, resolved.token)),
        };
        *self.client.write().unwrap_or_else(|e| e.into_inner()) = Some(client);

        Ok(diagnostics)
    }

    #[instrument(skip(self), name = "provider.stop")]
    async fn stop(&self) -> Result<(), ProviderError> {
        self.client.write().unwrap_or_else(|e| e.into_inner()).take();
        info!("Provider stopped");
        Ok(())
    }

    #[instrument(skip(self, prior_state, proposed_state, _config), name = "provider.plan")]
    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        proposed_state: Value,
        _config: Value,
    ) -> Result<PlanResult, ProviderError> {
        check_resource_type(resource_type)?;
        let prior = decode_state(prior_state)?;
        let proposed = decode_state(Some(proposed_state))?;

        let plan = plan_license(prior.as_ref(), proposed.as_ref())?;
        debug!(
            changes = plan.changes.len(),
            requires_replace = plan.requires_replace,
            "Plan computed"
        );
        Ok(plan)
    }

    #[instrument(skip(self, planned_state), name = "provider.create")]
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.license_resource(resource_type)?;
        let planned = LicenseModel::from_value(planned_state)?;
        resource.create(planned).await?.to_value()
    }

    #[instrument(skip(self, current_state), name = "provider.read")]
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        let resource = self.license_resource(resource_type)?;
        let state = LicenseModel::from_value(current_state)?;
        resource
            .read(state)
            .await?
            .map(|model| model.to_value())
            .transpose()
    }

    #[instrument(skip(self, _prior_state, planned_state), name = "provider.update")]
    async fn update(
        &self,
        resource_type: &str,
        _prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.license_resource(resource_type)?;
        let planned = LicenseModel::from_value(planned_state)?;
        resource.update(planned).to_value()
    }

    #[instrument(skip(self, current_state), name = "provider.delete")]
    async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        let resource = self.license_resource(resource_type)?;
        let state = LicenseModel::from_value(current_state)?;
        resource.delete(&state).await
    }

    #[instrument(skip(self), name = "provider.import_resource")]
    async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        let resource = self.license_resource(resource_type)?;
        let seed = resource.import(id)?;
        Ok(vec![ImportedResource::new(LICENSE_RESOURCE, seed.to_value()?)])
    }
}
