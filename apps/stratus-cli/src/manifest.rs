//! Deployment manifest loading.
//!
//! A manifest is a YAML document declaring the resources of one
//! deployment. Plain resources are listed under `resources:`; the three
//! higher-level sub-protocols have shorthand sections (`roles:`, `apis:`,
//! `streams:`) that expand through the engine's builders into correctly
//! wired declarations.
//!
//! ```yaml
//! region: us-east-1
//! roles:
//!   - name: controllerLambdaRole
//!     role_name: controller_lambda_role
//!     policies:
//!       - arn:aws:iam::aws:policy/AmazonDynamoDBFullAccess
//! resources:
//!   - name: controllerLambda
//!     kind: function
//!     properties:
//!       name: controller_lambda
//!       role:
//!         $ref: controllerLambdaRole.arn
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use stratus_core::LogicalName;
use stratus_provider::ResourceKind;
use stratus_provisioning::{
    ApiTreeAssembler, AuthMode, Declaration, RolePolicyBinder, StartingPosition,
    StreamBindingBuilder, TrustPolicy, Value,
};

use crate::error::{CliError, CliResult};

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_service() -> String {
    "lambda.amazonaws.com".to_string()
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_auth() -> String {
    "AWS_IAM".to_string()
}

fn default_timeout() -> u64 {
    29_000
}

fn default_stage() -> String {
    "dev".to_string()
}

fn default_position() -> String {
    "LATEST".to_string()
}

fn default_true() -> bool {
    true
}

/// A deployment manifest.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Region to provision into.
    #[serde(default = "default_region")]
    pub region: String,

    /// Maximum concurrent remote calls.
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Role/policy bindings, expanded through the role binder.
    #[serde(default)]
    pub roles: Vec<RoleEntry>,

    /// REST APIs, expanded through the API tree assembler.
    #[serde(default)]
    pub apis: Vec<ApiEntry>,

    /// Stream bindings, expanded through the stream binding builder.
    #[serde(default)]
    pub streams: Vec<StreamEntry>,

    /// Plain resource declarations.
    #[serde(default)]
    pub resources: Vec<ResourceEntry>,
}

/// Shorthand for a role with managed policy attachments.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleEntry {
    pub name: LogicalName,
    /// Provider-visible role name (defaults to the logical name).
    #[serde(default)]
    pub role_name: Option<String>,
    /// Service principal allowed to assume the role.
    #[serde(default = "default_service")]
    pub service: String,
    /// Managed policy ARNs to attach.
    #[serde(default)]
    pub policies: Vec<String>,
}

/// Shorthand for a REST API fronting a function.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiEntry {
    pub name: LogicalName,
    /// Path part under the API root.
    pub path: String,
    /// Backing function's logical name.
    pub backend: LogicalName,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_auth")]
    pub auth: String,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
    #[serde(default = "default_stage")]
    pub stage: String,
    #[serde(default = "default_true")]
    pub invoke_permission: bool,
}

/// Shorthand for a table-stream-to-function binding.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamEntry {
    pub name: LogicalName,
    pub table: LogicalName,
    pub function: LogicalName,
    #[serde(default = "default_position")]
    pub starting_position: String,
}

/// A plain resource declaration.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceEntry {
    pub name: LogicalName,
    pub kind: ResourceKind,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default)]
    pub depends_on: BTreeSet<LogicalName>,
}

impl Manifest {
    /// Load and parse a manifest file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::Io(format!("Failed to read file {}: {}", path.display(), e)))?;
        Self::parse(&content)
    }

    /// Parse manifest text.
    pub fn parse(content: &str) -> CliResult<Self> {
        serde_yaml::from_str(content).map_err(|e| {
            let location = e
                .location()
                .map(|l| format!(" at line {}, column {}", l.line(), l.column()))
                .unwrap_or_default();
            CliError::Validation(format!("Invalid manifest{location}: {e}"))
        })
    }

    /// Expand the manifest into a declaration set.
    pub fn declarations(&self) -> CliResult<Vec<Declaration>> {
        let mut declarations = Vec::new();

        for entry in &self.resources {
            let mut builder = Declaration::builder(entry.kind, entry.name.clone());
            for (property, value) in &entry.properties {
                builder = builder.property(property.clone(), value.clone());
            }
            for dependency in &entry.depends_on {
                builder = builder.depends_on(dependency.clone());
            }
            declarations.push(builder.build());
        }

        for role in &self.roles {
            let mut binder = RolePolicyBinder::new(
                role.name.clone(),
                TrustPolicy::assume_role(role.service.clone()),
            );
            if let Some(name) = &role.role_name {
                binder = binder.role_name(name.clone());
            }
            for policy_arn in &role.policies {
                binder = binder.attach_policy(policy_arn.clone());
            }
            let binding = binder
                .build()
                .map_err(|e| CliError::Validation(e.to_string()))?;
            declarations.extend(binding.into_declarations());
        }

        for api in &self.apis {
            let auth: AuthMode = api.auth.parse().map_err(CliError::Validation)?;
            let tree =
                ApiTreeAssembler::new(api.name.clone(), api.path.clone(), api.backend.clone())
                    .http_method(api.method.clone())
                    .auth(auth)
                    .timeout_ms(api.timeout_ms)
                    .stage(api.stage.clone())
                    .invoke_permission(api.invoke_permission)
                    .build()
                    .map_err(|e| CliError::Validation(e.to_string()))?;
            declarations.extend(tree.into_declarations());
        }

        for stream in &self.streams {
            let position: StartingPosition = stream
                .starting_position
                .parse()
                .map_err(CliError::Validation)?;
            declarations.push(
                StreamBindingBuilder::new(
                    stream.name.clone(),
                    stream.table.clone(),
                    stream.function.clone(),
                )
                .starting_position(position)
                .build(),
            );
        }

        Ok(declarations)
    }
}
