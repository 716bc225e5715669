//! The `aidbox_license` resource.
//!
//! [`LicenseModel`] is the flattened state the host stores; [`LicenseResource`]
//! maps it onto [`LicenseClient`] calls. A license can never be modified in
//! place: `name`, `product` and `type` force replacement, everything else is
//! computed by the portal.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::client::LicenseClient;
use crate::error::{ClientError, ProviderError};
use crate::schema::{Attribute, AttributeType, Schema};
use crate::types::{AttributeChange, LicenseResponse, PlanResult};

/// Resource type name.
pub const LICENSE_RESOURCE: &str = "aidbox_license";

/// Product used when the configuration does not name one.
pub const DEFAULT_PRODUCT: &str = "aidbox";

/// Host-side state of an `aidbox_license`.
///
/// `None` stands for null or not-yet-known.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LicenseModel {
    /// Portal-assigned identifier.
    pub id: Option<String>,
    /// License name.
    pub name: Option<String>,
    /// Licensed product.
    pub product: Option<String>,
    /// License type.
    #[serde(rename = "type")]
    pub license_type: Option<String>,
    /// Expiration timestamp.
    pub expiration: Option<String>,
    /// Current status.
    pub status: Option<String>,
    /// Maximum number of instances.
    pub max_instances: Option<i64>,
    /// Issuing user id.
    pub creator_id: Option<String>,
    /// Owning project id.
    pub project_id: Option<String>,
    /// Offline flag.
    pub offline: Option<bool>,
    /// Issue timestamp.
    pub created: Option<String>,
    /// Revision metadata: last update.
    pub meta_last_updated: Option<String>,
    /// Revision metadata: creation.
    pub meta_created_at: Option<String>,
    /// Revision metadata: version id.
    pub meta_version_id: Option<String>,
    /// Issuing authority.
    pub issuer: Option<String>,
    /// Hosting information.
    pub info_hosting: Option<String>,
    /// Signed license token.
    pub jwt: Option<String>,
}

impl LicenseModel {
    /// Seed state for importing an existing license.
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Decode host state. Null decodes to an empty model.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Encode as host state.
    pub fn to_value(&self) -> Result<Value, ProviderError> {
        Ok(serde_json::to_value(self)?)
    }

    /// The identifier, if present and non-empty.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// Overwrite every attribute from a portal response.
    ///
    /// The token is only replaced when the response carries one.
    pub fn apply_response(&mut self, resp: &LicenseResponse) {
        let lic = &resp.license;
        self.id = Some(lic.id.clone());
        self.name = Some(lic.name.clone());
        self.product = Some(lic.product.clone());
        self.license_type = Some(lic.license_type.clone());
        self.expiration = Some(lic.expiration.clone());
        self.status = Some(lic.status.clone());
        self.max_instances = Some(lic.max_instances);
        self.creator_id = Some(lic.creator.id.clone());
        self.project_id = Some(lic.project.id.clone());
        self.offline = Some(lic.offline);
        self.created = Some(lic.created.clone());
        self.meta_last_updated = Some(lic.meta.last_updated.clone());
        self.meta_created_at = Some(lic.meta.created_at.clone());
        self.meta_version_id = Some(lic.meta.version_id.clone());
        self.issuer = Some(lic.issuer.clone());
        self.info_hosting = Some(lic.info.hosting.clone());
        if !resp.jwt.is_empty() || self.jwt.is_none() {
            self.jwt = Some(resp.jwt.clone());
        }
    }
}

/// Schema of `aidbox_license`.
pub fn license_schema() -> Schema {
    Schema::v0()
        .with_description("Manages an Aidbox license")
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("name", Attribute::required_string().requires_replace())
        .with_attribute(
            "product",
            Attribute::optional_computed_string()
                .with_default(DEFAULT_PRODUCT)
                .requires_replace(),
        )
        .with_attribute("type", Attribute::required_string().requires_replace())
        .with_attribute("expiration", Attribute::computed_string())
        .with_attribute("status", Attribute::computed_string())
        .with_attribute("max_instances", Attribute::computed(AttributeType::Int64))
        .with_attribute("creator_id", Attribute::computed_string())
        .with_attribute("project_id", Attribute::computed_string())
        .with_attribute("offline", Attribute::computed(AttributeType::Bool))
        .with_attribute("created", Attribute::computed_string())
        .with_attribute("meta_last_updated", Attribute::computed_string())
        .with_attribute("meta_created_at", Attribute::computed_string())
        .with_attribute("meta_version_id", Attribute::computed_string())
        .with_attribute("issuer", Attribute::computed_string())
        .with_attribute("info_hosting", Attribute::computed_string())
        .with_attribute("jwt", Attribute::computed_string().sensitive())
}

/// Compute the plan for an `aidbox_license`.
///
/// Fills schema defaults, carries computed attributes over from prior
/// state when nothing changed, and asks for replacement when any
/// replace-on-change attribute differs.
pub fn plan_license(
    prior: Option<&LicenseModel>,
    proposed: Option<&LicenseModel>,
) -> Result<PlanResult, ProviderError> {
    let schema = license_schema();
    let replace_on_change = schema.replace_on_change_attributes();

    let Some(proposed) = proposed else {
        let changes = prior
            .and_then(|p| p.id().map(|id| AttributeChange::removed("id", Value::from(id))))
            .into_iter()
            .collect();
        return Ok(PlanResult::with_changes(Value::Null, changes, false));
    };

    let mut planned_value = proposed.to_value()?;
    schema.apply_defaults(&mut planned_value);

    let Some(prior) = prior else {
        let changes = replace_on_change
            .iter()
            .filter(|name| !planned_value[**name].is_null())
            .map(|name| AttributeChange::added(*name, planned_value[*name].clone()))
            .collect();
        return Ok(PlanResult::with_changes(planned_value, changes, false));
    };

    let prior_value = prior.to_value()?;
    let changes: Vec<AttributeChange> = replace_on_change
        .iter()
        .filter(|name| prior_value[**name] != planned_value[**name])
        .map(|name| {
            AttributeChange::modified(
                *name,
                prior_value[*name].clone(),
                planned_value[*name].clone(),
            )
        })
        .collect();

    if changes.is_empty() {
        return Ok(PlanResult::no_change(prior_value));
    }

    debug!(
        attributes = ?changes.iter().map(|c| c.path.as_str()).collect::<Vec<_>>(),
        "Replace-on-change attribute modified"
    );
    Ok(PlanResult::with_changes(planned_value, changes, true))
}

/// Lifecycle operations for `aidbox_license`.
#[derive(Clone)]
pub struct LicenseResource {
    client: Arc<dyn LicenseClient>,
}

impl LicenseResource {
    /// Create the resource on top of a configured client.
    pub fn new(client: Arc<dyn LicenseClient>) -> Self {
        Self { client }
    }

    /// Issue a license for the planned `name`, `product` and `type`.
    ///
    /// Schema defaults are filled in first, so an unplanned model still
    /// issues the default product.
    pub async fn create(&self, planned: LicenseModel) -> Result<LicenseModel, ProviderError> {
        let mut planned_value = planned.to_value()?;
        license_schema().apply_defaults(&mut planned_value);
        let planned = LicenseModel::from_value(planned_value)?;

        let name = required(&planned.name, "name")?;
        let product = required(&planned.product, "product")?;
        let license_type = required(&planned.license_type, "type")?;

        let resp = self
            .client
            .create_license(name, product, license_type)
            .await
            .map_err(|e| ProviderError::api("API Call Failed", e))?;

        if resp.license.id.is_empty() {
            error!(name, "Portal issued a license without an id");
            return Err(ProviderError::api(
                "API Call Failed",
                ClientError::Incomplete("license id"),
            ));
        }

        let mut model = planned.clone();
        model.apply_response(&resp);
        info!(id = %resp.license.id, name, "License created");
        Ok(model)
    }

    /// Refresh state. `Ok(None)` means the license is gone.
    pub async fn read(&self, state: LicenseModel) -> Result<Option<LicenseModel>, ProviderError> {
        let id = state
            .id()
            .ok_or(ProviderError::MissingId { operation: "read" })?;

        let resp = self
            .client
            .get_license(id)
            .await
            .map_err(|e| ProviderError::api("Failed to Fetch License", e))?;

        let Some(resp) = resp else {
            warn!(id, "License no longer exists, removing from state");
            return Ok(None);
        };
        if resp.license.id.is_empty() {
            warn!(id, "Portal returned a license without an id, removing from state");
            return Ok(None);
        }

        let mut model = state.clone();
        model.apply_response(&resp);
        debug!(id = %resp.license.id, "License read");
        Ok(Some(model))
    }

    /// Persist the planned state. The portal has no update call.
    pub fn update(&self, planned: LicenseModel) -> LicenseModel {
        planned
    }

    /// Remove the license.
    pub async fn delete(&self, state: &LicenseModel) -> Result<(), ProviderError> {
        let id = state
            .id()
            .ok_or(ProviderError::MissingId { operation: "delete" })?;

        self.client.delete_license(id).await.map_err(|e| {
            ProviderError::api(
                format!(
                    "Failed to Delete License: error while trying to delete the License with ID {}",
                    id
                ),
                e,
            )
        })?;

        info!(id, "License deleted");
        Ok(())
    }

    /// Seed state for an import; the host completes it with a read.
    pub fn import(&self, id: &str) -> Result<LicenseModel, ProviderError> {
        if id.is_empty() {
            return Err(ProviderError::MissingId { operation: "import" });
        }
        Ok(LicenseModel::from_id(id))
    }
}

fn required<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, ProviderError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ProviderError::Validation(format!("Missing required attribute '{}'", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Mode;
    use crate::testing::MockLicenseClient;
    use crate::types::LicenseResponse;
    use async_trait::async_trait;
    use tokio_test::assert_err;

    /// Portal that answers every call with an empty `result`.
    struct BlankPortal;

    #[async_trait]
    impl LicenseClient for BlankPortal {
        async fn create_license(
            &self,
            _name: &str,
            _product: &str,
            _license_type: &str,
        ) -> Result<LicenseResponse, ClientError> {
            Ok(LicenseResponse::default())
        }

        async fn get_license(&self, _id: &str) -> Result<Option<LicenseResponse>, ClientError> {
            Ok(Some(LicenseResponse::default()))
        }

        async fn delete_license(&self, _id: &str) -> Result<(), ClientError> {
            Ok(())
        }
    }

    fn planned(name: &str, license_type: &str) -> LicenseModel {
        LicenseModel {
            name: Some(name.to_string()),
            license_type: Some(license_type.to_string()),
            ..Default::default()
        }
    }

    fn resource() -> (Arc<MockLicenseClient>, LicenseResource) {
        let mock = Arc::new(MockLicenseClient::new());
        (mock.clone(), LicenseResource::new(mock))
    }

    #[tokio::test]
    async fn test_create_populates_computed_fields() {
        let (mock, res) = resource();
        let model = res.create(planned("license-one", "development")).await.unwrap();

        assert_eq!(model.name.as_deref(), Some("license-one"));
        assert_eq!(model.license_type.as_deref(), Some("development"));
        assert_eq!(model.product.as_deref(), Some(DEFAULT_PRODUCT));
        assert!(model.id().is_some());
        assert!(model.status.is_some());
        assert!(model.max_instances.is_some());
        assert!(model.creator_id.is_some());
        assert!(model.project_id.is_some());
        assert!(model.offline.is_some());
        assert!(model.meta_version_id.is_some());
        assert!(model.jwt.as_deref().is_some_and(|j| !j.is_empty()));
        assert_eq!(mock.calls(), vec!["create_license"]);
    }

    #[tokio::test]
    async fn test_create_then_read_roundtrip() {
        let (_, res) = resource();
        let created = res.create(planned("license-one", "development")).await.unwrap();
        let read = res.read(created.clone()).await.unwrap().expect("exists");
        assert_eq!(read, created);
    }

    #[tokio::test]
    async fn test_create_failure_is_terminal() {
        let (mock, res) = resource();
        mock.fail_next("500 Internal Server Error", "portal down");

        let err = assert_err!(res.create(planned("license-one", "development")).await);
        let text = err.to_string();
        assert!(text.starts_with("API Call Failed"));
        assert!(text.contains("500 Internal Server Error"));
        assert!(text.contains("portal down"));
        assert_eq!(mock.calls(), vec!["create_license"]);
    }

    #[tokio::test]
    async fn test_create_requires_name_and_type() {
        let (mock, res) = resource();
        let err = assert_err!(res.create(planned("", "development")).await);
        assert!(matches!(err, ProviderError::Validation(_)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_of_blank_license_is_absent() {
        let res = LicenseResource::new(Arc::new(BlankPortal));
        let state = LicenseModel {
            id: Some("lic-1".to_string()),
            ..planned("license-one", "development")
        };
        assert!(res.read(state).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_blank_license() {
        let res = LicenseResource::new(Arc::new(BlankPortal));
        let err = assert_err!(res.create(planned("license-one", "development")).await);
        assert!(matches!(
            err,
            ProviderError::Api {
                source: ClientError::Incomplete("license id"),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_create_keeps_explicit_product() {
        let (_, res) = resource();
        let model = LicenseModel {
            product: Some("multibox".to_string()),
            ..planned("license-one", "development")
        };
        let created = res.create(model).await.unwrap();
        assert_eq!(created.product.as_deref(), Some("multibox"));
    }

    #[tokio::test]
    async fn test_read_after_delete_is_absent() {
        let (_, res) = resource();
        let created = res.create(planned("license-one", "development")).await.unwrap();
        res.delete(&created).await.unwrap();
        assert!(res.read(created).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_and_delete_without_id_fail_fast() {
        let (mock, res) = resource();

        let err = assert_err!(res.read(LicenseModel::default()).await);
        assert!(err.is_missing_id());

        let err = assert_err!(res.delete(&LicenseModel::from_id("")).await);
        assert!(err.is_missing_id());

        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_names_id() {
        let (mock, res) = resource();
        let created = res.create(planned("license-one", "development")).await.unwrap();
        mock.fail_next("409 Conflict", "license in use");

        let err = assert_err!(res.delete(&created).await);
        let text = err.to_string();
        assert!(text.contains(created.id().unwrap()));
        assert!(text.contains("license in use"));
    }

    #[tokio::test]
    async fn test_read_keeps_token_when_portal_omits_it() {
        let (mock, res) = resource();
        let created = res.create(planned("license-one", "development")).await.unwrap();
        mock.omit_jwt_on_get(true);

        let read = res.read(created.clone()).await.unwrap().unwrap();
        assert_eq!(read.jwt, created.jwt);
    }

    #[test]
    fn test_update_is_passthrough() {
        let (mock, res) = resource();
        let model = LicenseModel {
            id: Some("lic-1".to_string()),
            ..planned("license-one", "development")
        };
        assert_eq!(res.update(model.clone()), model);
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_import_seeds_id() {
        let (_, res) = resource();
        let model = res.import("lic-77").unwrap();
        assert_eq!(model.id(), Some("lic-77"));
        assert!(model.name.is_none());
        assert!(res.import("").unwrap_err().is_missing_id());
    }

    #[test]
    fn test_plan_create_fills_product_default() {
        let plan = plan_license(None, Some(&planned("license-one", "development"))).unwrap();
        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["product"], DEFAULT_PRODUCT);
        assert!(plan.planned_state["id"].is_null());
        let paths: Vec<_> = plan.changes.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "product", "type"]);
    }

    #[test]
    fn test_plan_default_follows_schema() {
        let schema_default = license_schema().attributes["product"].default.clone();
        let proposed = LicenseModel {
            product: Some(String::new()),
            ..planned("license-one", "development")
        };
        let plan = plan_license(None, Some(&proposed)).unwrap();
        assert_eq!(Some(plan.planned_state["product"].clone()), schema_default);
    }

    #[test]
    fn test_plan_unchanged_keeps_prior_state() {
        let prior = LicenseModel {
            id: Some("lic-1".to_string()),
            product: Some(DEFAULT_PRODUCT.to_string()),
            status: Some("active".to_string()),
            ..planned("license-one", "development")
        };
        let proposed = planned("license-one", "development");
        let plan = plan_license(Some(&prior), Some(&proposed)).unwrap();
        assert!(plan.changes.is_empty());
        assert!(!plan.requires_replace);
        assert_eq!(plan.planned_state["id"], "lic-1");
        assert_eq!(plan.planned_state["status"], "active");
    }

    #[test]
    fn test_plan_name_change_requires_replace() {
        let prior = LicenseModel {
            id: Some("lic-1".to_string()),
            product: Some(DEFAULT_PRODUCT.to_string()),
            ..planned("license-one", "development")
        };
        let proposed = planned("license-two", "development");
        let plan = plan_license(Some(&prior), Some(&proposed)).unwrap();
        assert!(plan.requires_replace);
        assert_eq!(plan.changes.len(), 1);
        assert_eq!(plan.changes[0].path, "name");
        assert!(plan.planned_state["id"].is_null());
    }

    #[test]
    fn test_plan_destroy() {
        let prior = LicenseModel::from_id("lic-1");
        let plan = plan_license(Some(&prior), None).unwrap();
        assert!(plan.planned_state.is_null());
        assert_eq!(plan.changes, vec![AttributeChange::removed("id", Value::from("lic-1"))]);
    }

    #[test]
    fn test_schema_shape() {
        let schema = license_schema();
        assert_eq!(schema.replace_on_change_attributes(), vec!["name", "product", "type"]);
        assert_eq!(schema.attributes["name"].mode, Mode::Required);
        assert!(schema.attributes["jwt"].sensitive);
        assert_eq!(
            schema.attributes["product"].default,
            Some(Value::from(DEFAULT_PRODUCT))
        );
        assert_eq!(schema.computed_only_attributes().len(), 14);
    }

    #[test]
    fn test_model_serializes_type_key() {
        let value = planned("license-one", "development").to_value().unwrap();
        assert_eq!(value["type"], "development");
        let back = LicenseModel::from_value(value).unwrap();
        assert_eq!(back.license_type.as_deref(), Some("development"));
    }
}
