use std::fmt::Write as _;
use std::path::Path;

use trellis_core::policy::{PolicyLimits, validate_policy_limits};
use trellis_core::{
    AuthorizationContext, Enforcer, Permission, PermissionSet, Policy, ResourceKey, ResourcePath,
    ResourceType, SubjectId,
};

use crate::cli::Command;
use crate::config::AppConfig;
use crate::error::CliError;

/// Rendered result of a command. `allowed` drives the process exit code for
/// commands that answer a yes/no question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub allowed: bool,
}

impl CommandOutput {
    fn allowed(text: String) -> Self {
        Self {
            text,
            allowed: true,
        }
    }

    fn decided(text: String, allowed: bool) -> Self {
        Self { text, allowed }
    }
}

pub fn run(command: Command, config: &AppConfig) -> Result<CommandOutput, CliError> {
    let limits = config.to_policy_limits();
    let default_type = config.defaults.resource_type.as_str();

    match command {
        Command::Validate { policy } => {
            let policy = load_policy(&policy, &limits)?;
            let enforcer = Enforcer::build(&policy)?;
            Ok(CommandOutput::allowed(format!(
                "policy '{}' at revision {} is valid: {} entries, {} subjects, {} nodes",
                policy.id(),
                policy.revision(),
                policy.len(),
                enforcer.known_subjects().count(),
                enforcer.node_count()
            )))
        }
        Command::Check {
            policy,
            resource,
            permissions,
            subjects,
            subtree,
            any_subtree,
        } => {
            let enforcer = load_enforcer(&policy, &limits)?;
            let key = resolve_key(&resource, default_type)?;
            let permissions: PermissionSet = permissions.iter().map(String::as_str).collect();
            let context = parse_context(&subjects)?;

            let allowed = if subtree {
                enforcer.has_permissions_on_resource(&key, &permissions, &context)
            } else if any_subtree {
                enforcer.has_permissions_on_resource_or_any_subresource(&key, &permissions, &context)
            } else {
                enforcer.has_permission(&key, &permissions, &context)
            };
            tracing::debug!(%key, %permissions, allowed, "checked permissions");

            let answer = if allowed { "ALLOWED" } else { "DENIED" };
            Ok(CommandOutput::decided(
                format!("{answer}: {permissions} on {key}"),
                allowed,
            ))
        }
        Command::Explain {
            policy,
            resource,
            permission,
            subjects,
        } => {
            let enforcer = load_enforcer(&policy, &limits)?;
            let key = resolve_key(&resource, default_type)?;
            let context = parse_context(&subjects)?;
            let explanation = enforcer.explain(&key, &Permission::new(permission), &context);

            let mut text = String::new();
            for step in &explanation.steps {
                let _ = writeln!(text, "{:<40} {}", step.path.to_string(), step.verdict);
            }
            match explanation.deciding_step() {
                Some(step) => {
                    let _ = write!(
                        text,
                        "{} {} on {}: decided at {}",
                        explanation.verdict, explanation.permission, explanation.key, step.path
                    );
                }
                None => {
                    let _ = write!(
                        text,
                        "{} {} on {}: no entry applies",
                        explanation.verdict, explanation.permission, explanation.key
                    );
                }
            }
            Ok(CommandOutput::decided(
                text,
                explanation.verdict.is_granted(),
            ))
        }
        Command::Subjects {
            policy,
            resource,
            permission,
            unrestricted,
        } => {
            let enforcer = load_enforcer(&policy, &limits)?;
            let key = resolve_key(&resource, default_type)?;
            let permission = Permission::new(permission);

            let subjects = if unrestricted {
                let permissions: PermissionSet = [permission].into_iter().collect();
                enforcer.subjects_with_unrestricted_permission(&key, &permissions)
            } else {
                enforcer.subjects_with_partial_permission(&key, &permission)
            };

            let text = subjects
                .iter()
                .map(SubjectId::as_str)
                .collect::<Vec<_>>()
                .join("\n");
            Ok(CommandOutput::decided(text, !subjects.is_empty()))
        }
        Command::View {
            policy,
            resource,
            document,
            permissions,
            subjects,
        } => {
            let enforcer = load_enforcer(&policy, &limits)?;
            let key = resolve_key(&resource, default_type)?;
            let permissions: PermissionSet = permissions.iter().map(String::as_str).collect();
            let context = parse_context(&subjects)?;
            let value: serde_json::Value = serde_json::from_str(&read_file(&document)?)?;

            match enforcer.build_json_view(&key, &value, &permissions, &context) {
                Some(view) => Ok(CommandOutput::allowed(serde_json::to_string_pretty(&view)?)),
                None => Ok(CommandOutput::decided(String::new(), false)),
            }
        }
    }
}

/// Reads a policy document and checks it against the configured limits.
pub fn load_policy(path: &Path, limits: &PolicyLimits) -> Result<Policy, CliError> {
    let policy = Policy::from_json(&read_file(path)?)?;
    validate_policy_limits(&policy, limits).map_err(CliError::Validation)?;
    tracing::debug!(
        policy_id = %policy.id(),
        revision = %policy.revision(),
        entries = policy.len(),
        "loaded policy"
    );
    Ok(policy)
}

fn load_enforcer(path: &Path, limits: &PolicyLimits) -> Result<Enforcer, CliError> {
    let policy = load_policy(path, limits)?;
    Ok(Enforcer::build(&policy)?)
}

/// Accepts `type:/path`, or a bare `/path` for the default resource type.
pub fn resolve_key(raw: &str, default_type: &str) -> Result<ResourceKey, CliError> {
    if raw.starts_with('/') {
        let resource_type = ResourceType::new(default_type)?;
        return Ok(ResourceKey::new(resource_type, ResourcePath::parse(raw)?));
    }
    Ok(ResourceKey::parse(raw)?)
}

fn parse_context(subjects: &[String]) -> Result<AuthorizationContext, CliError> {
    let subjects = subjects
        .iter()
        .map(|s| SubjectId::new(s.as_str()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(AuthorizationContext::new(subjects))
}

fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })
}
