//! Wire and lifecycle types.
//!
//! The license records mirror the YAML documents exchanged with the Aidbox
//! RPC endpoint. Decoding is lenient: any field the remote side omits falls
//! back to its empty value. The plan and import types are the host-facing
//! shapes used by [`crate::ProviderService`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Reference to the user that issued a license.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Creator {
    /// User identifier.
    pub id: String,
    /// Always `User`.
    #[serde(rename = "resourceType")]
    pub resource_type: String,
}

/// Reference to the project a license belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    /// Project identifier.
    pub id: String,
    /// Always `Project`.
    #[serde(rename = "resourceType")]
    pub resource_type: String,
}

/// Hosting information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Info {
    /// Where the licensed instance runs.
    pub hosting: String,
}

/// Revision metadata maintained by the remote system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Meta {
    /// Last modification timestamp.
    pub last_updated: String,
    /// Creation timestamp of the stored record.
    pub created_at: String,
    /// Revision identifier.
    pub version_id: String,
}

/// Extra license properties. Decoded but not exposed in resource state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Additional {
    /// Validity period requested at issue time.
    pub expiration_days: i64,
    /// Instance URL bound to the license, if any.
    pub box_url: Option<String>,
}

/// A license as issued by the Aidbox portal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct License {
    /// Identifier assigned by the portal on issue.
    pub id: String,
    /// License name.
    pub name: String,
    /// Licensed product, e.g. `aidbox`.
    pub product: String,
    /// License type, e.g. `development`.
    #[serde(rename = "type")]
    pub license_type: String,
    /// Expiration timestamp.
    pub expiration: String,
    /// Current status.
    pub status: String,
    /// Maximum number of instances the license may run.
    pub max_instances: i64,
    /// Issuing user.
    pub creator: Creator,
    /// Owning project.
    pub project: Project,
    /// Whether the license works without contacting the portal.
    pub offline: bool,
    /// Issue timestamp.
    pub created: String,
    /// Revision metadata.
    pub meta: Meta,
    /// Issuing authority.
    pub issuer: String,
    /// Hosting information.
    pub info: Info,
    /// Extra properties.
    pub additional: Additional,
}

/// A license together with its signed token.
///
/// The token is only meaningful on the response that issued it; the remote
/// system never changes it afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LicenseResponse {
    /// The license record.
    pub license: License,
    /// Opaque signed license token.
    pub jwt: String,
}

/// RPC request envelope: `{method, params}`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RpcRequest<'a> {
    pub method: &'a str,
    pub params: BTreeMap<&'a str, &'a str>,
}

/// RPC response envelope: `{result: {license, jwt}}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RpcResponse {
    pub result: RpcResult,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RpcResult {
    pub license: License,
    pub jwt: String,
}

impl From<RpcResponse> for LicenseResponse {
    fn from(resp: RpcResponse) -> Self {
        Self {
            license: resp.result.license,
            jwt: resp.result.jwt,
        }
    }
}

/// A change to a single attribute during a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    /// The path to the attribute that changed.
    pub path: String,
    /// The value before the change (None if creating).
    pub before: Option<serde_json::Value>,
    /// The value after the change (None if deleting).
    pub after: Option<serde_json::Value>,
}

impl AttributeChange {
    /// Create a new attribute change.
    pub fn new(
        path: impl Into<String>,
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
    ) -> Self {
        Self {
            path: path.into(),
            before,
            after,
        }
    }

    /// Create a change for a new attribute.
    pub fn added(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, None, Some(value))
    }

    /// Create a change for a removed attribute.
    pub fn removed(path: impl Into<String>, value: serde_json::Value) -> Self {
        Self::new(path, Some(value), None)
    }

    /// Create a change for a modified attribute.
    pub fn modified(
        path: impl Into<String>,
        before: serde_json::Value,
        after: serde_json::Value,
    ) -> Self {
        Self::new(path, Some(before), Some(after))
    }
}

/// The result of a plan operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    /// The planned state after the operation.
    pub planned_state: serde_json::Value,
    /// The list of attribute changes.
    pub changes: Vec<AttributeChange>,
    /// Whether the resource must be destroyed and recreated.
    pub requires_replace: bool,
}

impl PlanResult {
    /// Create a plan result with no changes.
    pub fn no_change(state: serde_json::Value) -> Self {
        Self {
            planned_state: state,
            changes: Vec::new(),
            requires_replace: false,
        }
    }

    /// Create a plan result with changes.
    pub fn with_changes(
        planned_state: serde_json::Value,
        changes: Vec<AttributeChange>,
        requires_replace: bool,
    ) -> Self {
        Self {
            planned_state,
            changes,
            requires_replace,
        }
    }
}

/// An imported resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    /// The resource type.
    pub resource_type: String,
    /// The imported state, to be completed by a read.
    pub state: serde_json::Value,
}

impl ImportedResource {
    /// Create a new imported resource.
    pub fn new(resource_type: impl Into<String>, state: serde_json::Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            state,
        }
    }
}

/// Provider metadata: type name, version and managed resource types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// Provider type name, the prefix of every resource type.
    pub type_name: String,
    /// Provider version.
    pub version: String,
    /// List of resource type names.
    pub resources: Vec<String>,
}
