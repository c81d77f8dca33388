//! REST resource tree assembly.
//!
//! A REST endpoint is a strict chain: the API root, a path resource under
//! it, a method on that resource, the integration wiring the method to a
//! backend function, a deployment snapshotting the configuration, and a
//! named stage serving it. Each link depends on its predecessor, the
//! integration additionally depends on the backend function's resolved
//! invocation address, and the deployment depends on both the integration
//! and the method: a deployment cut before its integration is finalized
//! serves stale or missing routing.

use stratus_core::{CoreError, LogicalName};
use stratus_provider::ResourceKind;

use crate::declaration::Declaration;

/// Provider upper bound for an integration timeout.
pub const MAX_INTEGRATION_TIMEOUT_MS: u64 = 29_000;

/// Compute the backend URI an integration must use to invoke a function.
///
/// The format is provider-specific and reproduced exactly.
#[must_use]
pub fn invocation_address(region: &str, function_arn: &str) -> String {
    format!("arn:aws:apigateway:{region}:lambda:path/2015-03-31/functions/{function_arn}/invocations")
}

/// Widen an API execution ARN to cover every stage and route.
#[must_use]
pub fn invoke_source_arn(execution_arn: &str) -> String {
    format!("{execution_arn}/*")
}

/// Authorization mode of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// No authorization.
    None,
    /// Provider IAM authorization.
    AwsIam,
}

impl AuthMode {
    /// The string representation used in resource properties.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::None => "NONE",
            AuthMode::AwsIam => "AWS_IAM",
        }
    }
}

impl std::str::FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(AuthMode::None),
            "AWS_IAM" => Ok(AuthMode::AwsIam),
            other => Err(format!("unknown authorization mode: {other}")),
        }
    }
}

/// Builder for the fixed REST resource chain.
#[derive(Debug)]
pub struct ApiTreeAssembler {
    api: LogicalName,
    backend: LogicalName,
    path_part: String,
    http_method: String,
    auth: AuthMode,
    timeout_ms: u64,
    stage_name: String,
    invoke_permission: bool,
}

impl ApiTreeAssembler {
    /// Start assembling an API fronting `backend` at `/{path_part}`.
    pub fn new(api: LogicalName, path_part: impl Into<String>, backend: LogicalName) -> Self {
        Self {
            api,
            backend,
            path_part: path_part.into(),
            http_method: "POST".to_string(),
            auth: AuthMode::AwsIam,
            timeout_ms: MAX_INTEGRATION_TIMEOUT_MS,
            stage_name: "dev".to_string(),
            invoke_permission: true,
        }
    }

    /// Set the HTTP verb (default `POST`).
    #[must_use]
    pub fn http_method(mut self, verb: impl Into<String>) -> Self {
        self.http_method = verb.into();
        self
    }

    /// Set the authorization mode (default [`AuthMode::AwsIam`]).
    #[must_use]
    pub fn auth(mut self, auth: AuthMode) -> Self {
        self.auth = auth;
        self
    }

    /// Set the integration timeout in milliseconds (default the provider
    /// maximum). Values above the bound are rejected by validation
    /// before scheduling.
    #[must_use]
    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the stage name (default `dev`).
    #[must_use]
    pub fn stage(mut self, stage_name: impl Into<String>) -> Self {
        self.stage_name = stage_name.into();
        self
    }

    /// Whether to grant the API permission to invoke the backend
    /// (default true).
    #[must_use]
    pub fn invoke_permission(mut self, grant: bool) -> Self {
        self.invoke_permission = grant;
        self
    }

    /// Emit the chain's declarations.
    pub fn build(self) -> Result<ApiTree, CoreError> {
        let api = self.api.clone();
        let resource = LogicalName::new(format!("{api}-resource"))?;
        let method = LogicalName::new(format!("{api}-method"))?;
        let integration = LogicalName::new(format!("{api}-integration"))?;
        let deployment = LogicalName::new(format!("{api}-deployment"))?;
        let stage = LogicalName::new(format!("{api}-stage"))?;

        let mut declarations = vec![
            Declaration::builder(ResourceKind::RestApi, api.clone()).build(),
            Declaration::builder(ResourceKind::Resource, resource.clone())
                .reference("rest_api", api.clone(), "id")
                .reference("parent_id", api.clone(), "root_resource_id")
                .literal("path_part", self.path_part.clone())
                .build(),
            Declaration::builder(ResourceKind::Method, method.clone())
                .reference("rest_api", api.clone(), "id")
                .reference("resource_id", resource.clone(), "id")
                .literal("http_method", self.http_method.clone())
                .literal("authorization", self.auth.as_str())
                .build(),
            Declaration::builder(ResourceKind::Integration, integration.clone())
                .reference("rest_api", api.clone(), "id")
                .reference("resource_id", resource.clone(), "id")
                .reference("http_method", method.clone(), "http_method")
                .literal("integration_http_method", "POST")
                .literal("type", "AWS_PROXY")
                .reference("uri", self.backend.clone(), "invocation_address")
                .literal("timeout_ms", self.timeout_ms)
                .depends_on(self.backend.clone())
                .build(),
            Declaration::builder(ResourceKind::Deployment, deployment.clone())
                .reference("rest_api", api.clone(), "id")
                .depends_on(integration.clone())
                .depends_on(method.clone())
                .build(),
            Declaration::builder(ResourceKind::Stage, stage.clone())
                .reference("rest_api", api.clone(), "id")
                .reference("deployment", deployment.clone(), "id")
                .literal("stage_name", self.stage_name.clone())
                .build(),
        ];

        let permission = if self.invoke_permission {
            let permission = LogicalName::new(format!("{api}-invoke-permission"))?;
            declarations.push(
                Declaration::builder(ResourceKind::Permission, permission.clone())
                    .literal("statement_id", format!("Allow-{api}-Invoke"))
                    .literal("action", "lambda:InvokeFunction")
                    .reference("function", self.backend.clone(), "name")
                    .literal("principal", "apigateway.amazonaws.com")
                    .reference("source_arn", api.clone(), "execution_arn_wildcard")
                    .build(),
            );
            Some(permission)
        } else {
            None
        };

        Ok(ApiTree {
            api,
            resource,
            method,
            integration,
            deployment,
            stage,
            permission,
            declarations,
        })
    }
}

/// An assembled REST resource chain.
#[derive(Debug)]
pub struct ApiTree {
    /// The API root declaration.
    pub api: LogicalName,
    /// The path resource declaration.
    pub resource: LogicalName,
    /// The method declaration.
    pub method: LogicalName,
    /// The integration declaration.
    pub integration: LogicalName,
    /// The deployment declaration.
    pub deployment: LogicalName,
    /// The stage declaration.
    pub stage: LogicalName,
    /// The invoke permission declaration, when granted.
    pub permission: Option<LogicalName>,
    declarations: Vec<Declaration>,
}

impl ApiTree {
    /// The emitted declarations.
    #[must_use]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Consume the tree, yielding its declarations.
    #[must_use]
    pub fn into_declarations(self) -> Vec<Declaration> {
        self.declarations
    }
}
