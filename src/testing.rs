//! Test support for provider implementations.
//!
//! [`ProviderTester`] drives a [`ProviderService`] through the calls a host
//! makes, in the order it makes them. [`MockLicenseClient`] is an in-memory
//! portal that stands in for [`HttpClient`](crate::HttpClient).
//!
//! # Example
//!
//! ```ignore
//! use aidbox_provider::testing::{MockLicenseClient, ProviderTester};
//! use aidbox_provider::AidboxProvider;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_create_license() {
//!     let mock = Arc::new(MockLicenseClient::new());
//!     let tester = ProviderTester::new(AidboxProvider::with_client("test", mock));
//!     tester.configure(json!({"token": "test"})).await.unwrap();
//!
//!     let state = tester
//!         .lifecycle_create("aidbox_license", json!({"name": "one", "type": "development"}))
//!         .await
//!         .unwrap();
//!     assert_eq!(state["name"], "one");
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::client::LicenseClient;
use crate::error::{ClientError, ProviderError};
use crate::provider::ProviderService;
use crate::schema::{Diagnostic, ProviderSchema};
use crate::types::{
    Creator, ImportedResource, Info, License, LicenseResponse, Meta, PlanResult, Project,
};

/// Drives a provider the way a host would.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Wrap `provider`.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The provider's schema.
    pub fn schema(&self) -> ProviderSchema {
        self.provider.schema()
    }

    /// Resource types the provider manages.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    // =========================================================================
    // Provider block
    // =========================================================================

    /// Validate the provider block. Error diagnostics become `Err`.
    pub async fn validate_provider_config(&self, config: Value) -> Result<(), TestError> {
        into_result(self.provider.validate_provider_config(config).await?)
    }

    /// Configure the provider. Error diagnostics become `Err`.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        into_result(self.provider.configure(config).await?)
    }

    // =========================================================================
    // Single steps
    // =========================================================================

    /// Validate a resource block. Error diagnostics become `Err`.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        into_result(
            self.provider
                .validate_resource_config(resource_type, config)
                .await?,
        )
    }

    /// Plan a resource that does not exist yet.
    pub async fn plan_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.plan(resource_type, None, config).await
    }

    /// Plan a new configuration for an existing resource.
    pub async fn plan_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.plan(resource_type, Some(prior_state), config).await
    }

    /// Plan the removal of an existing resource.
    pub async fn plan_delete(
        &self,
        resource_type: &str,
        prior_state: Value,
    ) -> Result<PlanResult, ProviderError> {
        self.plan(resource_type, Some(prior_state), Value::Null).await
    }

    async fn plan(
        &self,
        resource_type: &str,
        prior_state: Option<Value>,
        config: Value,
    ) -> Result<PlanResult, ProviderError> {
        // Hosts propose exactly what the user wrote.
        self.provider
            .plan(resource_type, prior_state, config.clone(), config)
            .await
    }

    /// Create from a planned state.
    pub async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, planned_state).await
    }

    /// Refresh a state. `None` means the resource is gone.
    pub async fn read(
        &self,
        resource_type: &str,
        state: Value,
    ) -> Result<Option<Value>, ProviderError> {
        self.provider.read(resource_type, state).await
    }

    /// Apply a planned state in place.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, planned_state)
            .await
    }

    /// Remove a resource.
    pub async fn delete(&self, resource_type: &str, state: Value) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, state).await
    }

    /// Seed state for an existing resource.
    pub async fn import_resource(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<ImportedResource>, ProviderError> {
        self.provider.import_resource(resource_type, id).await
    }

    // =========================================================================
    // Host workflows
    // =========================================================================

    /// Apply a new block: plan, create, refresh.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self.plan_create(resource_type, config).await?;
        let created = self.create(resource_type, plan.planned_state).await?;
        self.refresh(resource_type, created).await
    }

    /// Apply a changed block: plan, then update in place or delete and
    /// recreate, then refresh.
    pub async fn lifecycle_change(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let plan = self
            .plan_update(resource_type, prior_state.clone(), config.clone())
            .await?;

        if plan.requires_replace {
            self.delete(resource_type, prior_state).await?;
            return self.lifecycle_create(resource_type, config).await;
        }

        let updated = self
            .update(resource_type, prior_state, plan.planned_state)
            .await?;
        self.refresh(resource_type, updated).await
    }

    /// Import by id, then refresh each seeded state.
    pub async fn lifecycle_import(
        &self,
        resource_type: &str,
        id: &str,
    ) -> Result<Vec<Option<Value>>, ProviderError> {
        let mut states = Vec::new();
        for seed in self.import_resource(resource_type, id).await? {
            states.push(self.read(&seed.resource_type, seed.state).await?);
        }
        Ok(states)
    }

    /// Remove a block: plan the destroy, then delete.
    pub async fn lifecycle_delete(
        &self,
        resource_type: &str,
        state: Value,
    ) -> Result<(), ProviderError> {
        self.plan_delete(resource_type, state.clone()).await?;
        self.delete(resource_type, state).await
    }

    async fn refresh(&self, resource_type: &str, state: Value) -> Result<Value, ProviderError> {
        self.read(resource_type, state).await?.ok_or_else(|| {
            ProviderError::Sdk(format!(
                "{} disappeared right after it was written",
                resource_type
            ))
        })
    }
}

/// Failure of a tester step.
#[derive(Debug, Error)]
pub enum TestError {
    /// The provider answered with error diagnostics.
    #[error("{}", render_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),
    /// The provider returned an error.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    let mut out = format!("{} error diagnostic(s):", diagnostics.len());
    for diag in diagnostics {
        out.push_str("\n  ");
        out.push_str(&diag.summary);
        if let Some(detail) = &diag.detail {
            out.push_str(": ");
            out.push_str(detail);
        }
        if let Some(attribute) = &diag.attribute {
            out.push_str(&format!(" [{}]", attribute));
        }
    }
    out
}

fn into_result(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<Diagnostic> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

// =========================================================================
// Assertions
// =========================================================================

fn changed_paths(plan: &PlanResult) -> Vec<&str> {
    plan.changes.iter().map(|c| c.path.as_str()).collect()
}

fn error_summaries(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics
        .iter()
        .filter(|d| d.is_error())
        .map(|d| d.summary.as_str())
        .collect()
}

/// Panics unless `plan` creates in place.
pub fn assert_plan_creates(plan: &PlanResult) {
    assert!(!plan.changes.is_empty(), "plan for a create has no changes");
    assert!(!plan.requires_replace, "plan for a create asks for replacement");
}

/// Panics unless `plan` is a no-op.
pub fn assert_plan_no_changes(plan: &PlanResult) {
    assert!(
        plan.changes.is_empty(),
        "expected an empty plan, got changes to {:?}",
        changed_paths(plan)
    );
}

/// Panics unless `plan` destroys and recreates the resource.
pub fn assert_plan_replaces(plan: &PlanResult) {
    assert!(
        plan.requires_replace,
        "expected a replacement, plan changes {:?} in place",
        changed_paths(plan)
    );
}

/// Panics unless `plan` touches `path`.
pub fn assert_plan_changes_attribute(plan: &PlanResult, path: &str) {
    assert!(
        plan.changes.iter().any(|c| c.path == path),
        "expected a change to '{}', plan changes {:?}",
        path,
        changed_paths(plan)
    );
}

/// Panics if any diagnostic is an error.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors = error_summaries(diagnostics);
    assert!(errors.is_empty(), "unexpected error diagnostics: {:?}", errors);
}

/// Panics unless some error diagnostic's summary contains `needle`.
pub fn assert_error_contains(diagnostics: &[Diagnostic], needle: &str) {
    let errors = error_summaries(diagnostics);
    assert!(
        errors.iter().any(|s| s.contains(needle)),
        "no error diagnostic mentions '{}': {:?}",
        needle,
        errors
    );
}

// =========================================================================
// In-memory portal
// =========================================================================

#[derive(Default)]
struct MockState {
    licenses: HashMap<String, LicenseResponse>,
    next_id: u64,
    calls: Vec<&'static str>,
    fail_next: Option<(String, String)>,
    omit_jwt_on_get: bool,
}

/// In-memory [`LicenseClient`].
///
/// Issued licenses live until deleted. A get for an unknown id returns
/// `Ok(None)`, matching how [`HttpClient`](crate::HttpClient) reports
/// licenses the portal no longer shows.
#[derive(Default)]
pub struct MockLicenseClient {
    state: Mutex<MockState>,
}

impl MockLicenseClient {
    /// Create an empty portal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail with the given HTTP status line and body.
    pub fn fail_next(&self, status: impl Into<String>, body: impl Into<String>) {
        self.lock().fail_next = Some((status.into(), body.into()));
    }

    /// Return get responses without a token.
    pub fn omit_jwt_on_get(&self, omit: bool) {
        self.lock().omit_jwt_on_get = omit;
    }

    /// Names of the client methods invoked so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    /// Number of licenses currently issued.
    pub fn len(&self) -> usize {
        self.lock().licenses.len()
    }

    /// Returns true if no license is currently issued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self, call: &'static str) -> Result<MutexGuard<'_, MockState>, ClientError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.fail_next.take() {
            Some((status, body)) => Err(ClientError::Api { status, body }),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl LicenseClient for MockLicenseClient {
    async fn create_license(
        &self,
        name: &str,
        product: &str,
        license_type: &str,
    ) -> Result<LicenseResponse, ClientError> {
        let mut state = self.begin("create_license")?;
        state.next_id += 1;
        let id = format!("lic-{}", state.next_id);

        let resp = LicenseResponse {
            license: License {
                id: id.clone(),
                name: name.to_string(),
                product: product.to_string(),
                license_type: license_type.to_string(),
                expiration: "2099-01-01T00:00:00Z".to_string(),
                status: "active".to_string(),
                max_instances: 1,
                creator: Creator {
                    id: "mock-user".to_string(),
                    resource_type: "User".to_string(),
                },
                project: Project {
                    id: "mock-project".to_string(),
                    resource_type: "Project".to_string(),
                },
                offline: false,
                created: "2024-01-01T00:00:00Z".to_string(),
                meta: Meta {
                    last_updated: "2024-01-01T00:00:00Z".to_string(),
                    created_at: "2024-01-01T00:00:00Z".to_string(),
                    version_id: "1".to_string(),
                },
                issuer: "mock-portal".to_string(),
                info: Info {
                    hosting: "cloud".to_string(),
                },
                additional: Default::default(),
            },
            jwt: format!("jwt.{}.signature", id),
        };

        state.licenses.insert(id, resp.clone());
        Ok(resp)
    }

    async fn get_license(&self, id: &str) -> Result<Option<LicenseResponse>, ClientError> {
        let state = self.begin("get_license")?;
        let omit_jwt = state.omit_jwt_on_get;
        Ok(state.licenses.get(id).cloned().map(|mut resp| {
            if omit_jwt {
                resp.jwt.clear();
            }
            resp
        }))
    }

    async fn delete_license(&self, id: &str) -> Result<(), ClientError> {
        let mut state = self.begin("delete_license")?;
        state.licenses.remove(id);
        Ok(())
    }
}
