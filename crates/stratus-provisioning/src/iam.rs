//! Role/policy binding.
//!
//! Identity roles go through a fixed sub-protocol: create the role with
//! its trust policy, then attach each managed policy to it. Attachments
//! depend on the role and are independent of each other, so they may run
//! concurrently once the role exists.
//!
//! The provider gives no visibility guarantee that attachments are
//! effective by the time the role is first used. Consumers therefore
//! choose their ordering explicitly via [`RoleConsumerOrdering`]:
//! depending on the role alone is enough to pass the role's ARN around,
//! while anything that exercises the granted capabilities on first use
//! should depend on the attachments too.

use serde_json::{json, Value as Json};

use stratus_core::{CoreError, LogicalName};
use stratus_provider::ResourceKind;

use crate::declaration::Declaration;

/// The principal allowed to assume a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// A provider service principal, e.g. `lambda.amazonaws.com`.
    Service(String),
}

impl Principal {
    fn document(&self) -> Json {
        match self {
            Principal::Service(service) => json!({ "Service": service }),
        }
    }
}

/// One statement of a trust policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustStatement {
    /// The permitted action.
    pub action: String,
    /// Who may perform it.
    pub principal: Principal,
    /// `Allow` or `Deny`.
    pub effect: String,
    /// Statement identifier; may be empty.
    pub sid: String,
}

/// A trust (assume-role) policy document.
///
/// Produced verbatim in the provider's JSON shape and passed through the
/// provisioning pipeline as an opaque literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPolicy {
    /// Policy language version.
    pub version: String,
    /// The policy's statements.
    pub statements: Vec<TrustStatement>,
}

impl TrustPolicy {
    /// The standard assume-role trust policy for a service principal.
    pub fn assume_role(service: impl Into<String>) -> Self {
        Self {
            version: "2012-10-17".to_string(),
            statements: vec![TrustStatement {
                action: "sts:AssumeRole".to_string(),
                principal: Principal::Service(service.into()),
                effect: "Allow".to_string(),
                sid: String::new(),
            }],
        }
    }

    /// Render the document in the provider's wire shape.
    #[must_use]
    pub fn document(&self) -> Json {
        json!({
            "Version": self.version,
            "Statement": self
                .statements
                .iter()
                .map(|statement| {
                    json!({
                        "Action": statement.action,
                        "Principal": statement.principal.document(),
                        "Effect": statement.effect,
                        "Sid": statement.sid,
                    })
                })
                .collect::<Vec<_>>(),
        })
    }
}

/// How a consumer of a role orders itself against the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleConsumerOrdering {
    /// Depend on the role existing; attachments may still be in flight.
    RoleCreated,
    /// Depend on the role and on every policy attachment.
    PoliciesAttached,
}

/// Builder for a role and its policy attachments.
#[derive(Debug)]
pub struct RolePolicyBinder {
    role: LogicalName,
    role_name: Option<String>,
    trust: TrustPolicy,
    policy_arns: Vec<String>,
}

impl RolePolicyBinder {
    /// Start a binding for a role assumable by the given trust policy.
    #[must_use]
    pub fn new(role: LogicalName, trust: TrustPolicy) -> Self {
        Self {
            role,
            role_name: None,
            trust,
            policy_arns: Vec::new(),
        }
    }

    /// Set the provider-visible role name (defaults to the logical
    /// name).
    #[must_use]
    pub fn role_name(mut self, name: impl Into<String>) -> Self {
        self.role_name = Some(name.into());
        self
    }

    /// Attach a managed policy by ARN.
    #[must_use]
    pub fn attach_policy(mut self, policy_arn: impl Into<String>) -> Self {
        self.policy_arns.push(policy_arn.into());
        self
    }

    /// Emit the role and attachment declarations.
    pub fn build(self) -> Result<RoleBinding, CoreError> {
        let mut role_builder = Declaration::builder(ResourceKind::Role, self.role.clone())
            .literal("assume_role_policy", self.trust.document());
        if let Some(name) = self.role_name {
            role_builder = role_builder.literal("name", name);
        }

        let mut declarations = vec![role_builder.build()];
        let mut attachments = Vec::new();

        for (index, policy_arn) in self.policy_arns.iter().enumerate() {
            let attachment = attachment_name(&self.role, policy_arn, index)?;
            declarations.push(
                Declaration::builder(ResourceKind::PolicyAttachment, attachment.clone())
                    .reference("role", self.role.clone(), "name")
                    .literal("policy_arn", policy_arn.clone())
                    .depends_on(self.role.clone())
                    .build(),
            );
            attachments.push(attachment);
        }

        Ok(RoleBinding {
            role: self.role,
            attachments,
            declarations,
        })
    }
}

/// A bound role: the emitted declarations plus the names consumers wire
/// their dependencies against.
#[derive(Debug)]
pub struct RoleBinding {
    /// The role declaration's logical name.
    pub role: LogicalName,
    /// The attachment declarations' logical names.
    pub attachments: Vec<LogicalName>,
    declarations: Vec<Declaration>,
}

impl RoleBinding {
    /// The emitted declarations.
    #[must_use]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Consume the binding, yielding its declarations.
    #[must_use]
    pub fn into_declarations(self) -> Vec<Declaration> {
        self.declarations
    }

    /// The names a consumer must list in `depends_on` for the chosen
    /// ordering.
    #[must_use]
    pub fn dependencies_for(&self, ordering: RoleConsumerOrdering) -> Vec<LogicalName> {
        match ordering {
            RoleConsumerOrdering::RoleCreated => vec![self.role.clone()],
            RoleConsumerOrdering::PoliciesAttached => {
                let mut names = vec![self.role.clone()];
                names.extend(self.attachments.iter().cloned());
                names
            }
        }
    }
}

/// Derive an attachment's logical name from the policy ARN leaf.
fn attachment_name(
    role: &LogicalName,
    policy_arn: &str,
    index: usize,
) -> Result<LogicalName, CoreError> {
    let leaf: String = policy_arn
        .rsplit('/')
        .next()
        .unwrap_or(policy_arn)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    if leaf.is_empty() {
        LogicalName::new(format!("{role}-attachment-{index}"))
    } else {
        LogicalName::new(format!("{role}-{leaf}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::Value;

    fn name(s: &str) -> LogicalName {
        LogicalName::new(s).unwrap()
    }

    fn binding() -> RoleBinding {
        RolePolicyBinder::new(
            name("controllerLambdaRole"),
            TrustPolicy::assume_role("lambda.amazonaws.com"),
        )
        .role_name("controller_lambda_role")
        .attach_policy("arn:aws:iam::aws:policy/AmazonDynamoDBFullAccess")
        .attach_policy("arn:aws:iam::aws:policy/AmazonS3FullAccess")
        .build()
        .unwrap()
    }

    #[test]
    fn test_trust_policy_wire_shape() {
        let document = TrustPolicy::assume_role("lambda.amazonaws.com").document();
        assert_eq!(
            document,
            json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Principal": { "Service": "lambda.amazonaws.com" },
                    "Effect": "Allow",
                    "Sid": "",
                }],
            })
        );
    }

    #[test]
    fn test_binding_emits_role_and_attachments() {
        let binding = binding();
        assert_eq!(binding.declarations().len(), 3);
        assert_eq!(
            binding.attachments,
            vec![
                name("controllerLambdaRole-AmazonDynamoDBFullAccess"),
                name("controllerLambdaRole-AmazonS3FullAccess"),
            ]
        );

        let role = &binding.declarations()[0];
        assert_eq!(role.kind(), ResourceKind::Role);
        assert!(role.property("assume_role_policy").is_some());
    }

    #[test]
    fn test_attachments_depend_on_role_only() {
        let binding = binding();
        for attachment in &binding.declarations()[1..] {
            assert_eq!(attachment.kind(), ResourceKind::PolicyAttachment);
            assert!(attachment.depends_on().contains(&name("controllerLambdaRole")));
            assert_eq!(
                attachment.property("role"),
                Some(&Value::reference(name("controllerLambdaRole"), "name"))
            );
            // Attachments are independent of each other
            assert_eq!(attachment.depends_on().len(), 1);
        }
    }

    #[test]
    fn test_consumer_ordering_choices() {
        let binding = binding();
        assert_eq!(
            binding.dependencies_for(RoleConsumerOrdering::RoleCreated),
            vec![name("controllerLambdaRole")]
        );

        let attached = binding.dependencies_for(RoleConsumerOrdering::PoliciesAttached);
        assert_eq!(attached.len(), 3);
        assert!(attached.contains(&name("controllerLambdaRole-AmazonS3FullAccess")));
    }
}
