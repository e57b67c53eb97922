//! Environment variable resolution.
//!
//! For one container the emitted list is built in passes:
//!
//! 1. Identity variables (`{prefix}_ENVIRONMENT_NAME`, `{prefix}_SERVICE_NAME`,
//!    `{prefix}_SERVICE_MAIN_PORT`).
//! 2. One rule chain per declaration: literal value, proxy port (scripts
//!    only), default host, service port. The first matching rule handles
//!    the declaration, except that the manifest service-port rule is
//!    evaluated on its own.
//! 3. Environment overrides of declared names, then universal overrides.
//! 4. The proxy service's own named ports.
//!
//! Later passes may emit a name again; [`EnvList`] applies the form's
//! collision policy.

use topoc_common::constants;
use topoc_common::warning::{Warnings, WarningKind};
use topoc_model::VariableDeclaration;

use crate::env::EnvList;
use crate::scope::{OutputForm, Scope};

/// Resolves every variable emitted for `scope` in the given form.
///
/// Lookups that find nothing emit nothing and record a warning.
pub fn resolve_variables(scope: &Scope<'_>, form: OutputForm, warnings: &mut Warnings) -> EnvList {
    let mut env = EnvList::new(form.collision_policy());
    push_identity(scope, &mut env);
    for decl in &scope.container.environment_variables {
        match form {
            OutputForm::Script => resolve_for_script(scope, decl, &mut env, warnings),
            OutputForm::Manifest => resolve_for_manifest(scope, decl, &mut env, warnings),
        }
    }
    push_overrides(scope, form, &mut env);
    push_proxy_passthrough(scope, &mut env);
    env
}

fn push_identity(scope: &Scope<'_>, env: &mut EnvList) {
    let prefix = &scope.config.prefix;
    env.push(
        format!("{prefix}_ENVIRONMENT_NAME"),
        scope.environment.name.clone(),
    );
    env.push(format!("{prefix}_SERVICE_NAME"), scope.service.name.clone());
    if let Some(port) = scope.container.main_port() {
        env.push(format!("{prefix}_SERVICE_MAIN_PORT"), port.to_string());
    }
}

fn resolve_for_script(
    scope: &Scope<'_>,
    decl: &VariableDeclaration,
    env: &mut EnvList,
    warnings: &mut Warnings,
) {
    if let Some(literal) = emittable_literal(decl) {
        push_literal(scope, OutputForm::Script, decl, literal, env);
    } else if decl.name.contains(constants::PROXY_PORT_MARKER) {
        match scope.proxy_ports.get(&decl.name) {
            Some(port) => env.push(decl.name.clone(), port.to_string()),
            None => warnings.push(scope.warning(WarningKind::UnresolvedProxyPort {
                variable: decl.name.clone(),
            })),
        }
    } else if host_rule_applies(scope, OutputForm::Script, decl) {
        push_default_host(scope, decl, env);
    } else if decl.name.contains(constants::SERVICE_PORT_MARKER) {
        push_service_port(scope, decl, env, warnings);
    }
}

fn resolve_for_manifest(
    scope: &Scope<'_>,
    decl: &VariableDeclaration,
    env: &mut EnvList,
    warnings: &mut Warnings,
) {
    if let Some(literal) = emittable_literal(decl) {
        push_literal(scope, OutputForm::Manifest, decl, literal, env);
    } else if host_rule_applies(scope, OutputForm::Manifest, decl) {
        push_default_host(scope, decl, env);
    }
    if decl.include_in_k8 && decl.name.contains(constants::SERVICE_PORT_MARKER) {
        push_service_port(scope, decl, env, warnings);
    }
}

fn emittable_literal(decl: &VariableDeclaration) -> Option<&str> {
    if decl.is_placeholder() {
        return None;
    }
    decl.literal_value.as_ref().map(|v| v.as_str())
}

fn push_literal(
    scope: &Scope<'_>,
    form: OutputForm,
    decl: &VariableDeclaration,
    literal: &str,
    env: &mut EnvList,
) {
    if decl.name == constants::USE_GPU_VARIABLE && scope.gpu_excluded(form) {
        tracing::debug!(
            environment = %scope.environment.name,
            service = %scope.service.name,
            ?form,
            "withholding USE_GPU literal"
        );
        return;
    }
    env.push(decl.name.clone(), literal);
}

fn host_rule_applies(scope: &Scope<'_>, form: OutputForm, decl: &VariableDeclaration) -> bool {
    if scope.environment.default_host.is_none() || decl.is_placeholder() {
        return false;
    }
    if !decl.name.to_lowercase().contains(constants::HOST_MARKER) {
        return false;
    }
    match form {
        OutputForm::Script => true,
        OutputForm::Manifest => {
            !decl.name.ends_with(constants::DISCOVERY_HOST_SUFFIX)
                && !decl.name.ends_with(constants::DISCOVERY_PORT_SUFFIX)
        }
    }
}

fn push_default_host(scope: &Scope<'_>, decl: &VariableDeclaration, env: &mut EnvList) {
    if scope.environment.has_override(&decl.name) {
        return;
    }
    if let Some(ref host) = scope.environment.default_host {
        env.push(decl.name.clone(), host.clone());
    }
}

/// Derives the service a `SERVICE_PORT` variable refers to.
///
/// `ORDERS_DB_SERVICE_SERVICE_PORT` becomes `orders-db`.
#[must_use]
pub fn service_port_candidate(variable: &str) -> String {
    variable
        .replace(constants::SERVICE_PORT_SUFFIX, "")
        .replace('_', "-")
        .to_lowercase()
}

fn push_service_port(
    scope: &Scope<'_>,
    decl: &VariableDeclaration,
    env: &mut EnvList,
    warnings: &mut Warnings,
) {
    let candidate = service_port_candidate(&decl.name);
    match scope.topology.service_main_port(&candidate) {
        Some(port) => env.push(decl.name.clone(), port.to_string()),
        None => warnings.push(scope.warning(WarningKind::UnresolvedServicePort {
            variable: decl.name.clone(),
            candidate,
        })),
    }
}

fn push_overrides(scope: &Scope<'_>, form: OutputForm, env: &mut EnvList) {
    for over in &scope.environment.overrides {
        let declared = scope
            .container
            .environment_variables
            .iter()
            .filter(|d| d.name == over.name);
        for decl in declared {
            match form {
                OutputForm::Script => env.push(over.name.clone(), over.value.as_str()),
                OutputForm::Manifest => {
                    let managed = over.name.ends_with(constants::DISCOVERY_HOST_SUFFIX)
                        || over
                            .name
                            .to_lowercase()
                            .contains(constants::PLACEHOLDER_VARIABLE_MARKER);
                    if !managed || decl.include_in_k8 {
                        env.push(over.name.clone(), over.value.as_str());
                    }
                }
            }
        }
        if over.universal {
            env.push(over.name.clone(), over.value.as_str());
        }
    }
}

fn push_proxy_passthrough(scope: &Scope<'_>, env: &mut EnvList) {
    if !scope.service.is_proxy() {
        return;
    }
    for mapping in &scope.container.port_mappings {
        if let Some(ref name) = mapping.proxy_name {
            env.push(name.clone(), mapping.target.to_string());
        }
    }
}
