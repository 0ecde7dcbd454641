//! Hooks that reject calls.

use super::{hook_fn, SharedHook};
use crate::context::Context;
use crate::error::{ServiceError, ServiceResult};
use crate::method::{HookType, Method};
use serde_json::Value;

/// Verifies a hook is used where it makes sense.
///
/// Empty `stages` or `methods` accept anything.
pub fn check_context(
    ctx: &Context,
    name: &str,
    stages: &[HookType],
    methods: &[Method],
) -> ServiceResult<()> {
    if !stages.is_empty() && !stages.contains(&ctx.stage()) {
        let allowed: Vec<&str> = stages.iter().map(|s| s.as_str()).collect();
        return Err(ServiceError::general(format!(
            "The '{}' hook can only be used as a '{}' hook",
            name,
            allowed.join("|")
        )));
    }
    if !methods.is_empty() && !methods.contains(&ctx.method()) {
        let allowed: Vec<&str> = methods.iter().map(|m| m.as_str()).collect();
        return Err(ServiceError::general(format!(
            "The '{}' hook can only be used on the '{}' service method(s)",
            name,
            allowed.join("|")
        )));
    }
    Ok(())
}

/// Rejects calls arriving through any of `providers` with `MethodNotAllowed`.
///
/// Accepts the same keywords as [`super::is_provider`]. With no providers
/// the method is disabled for every caller, the server included.
pub fn disallow(providers: &[&str]) -> SharedHook {
    let providers: Vec<String> = providers.iter().map(|p| p.to_string()).collect();
    hook_fn(move |ctx| {
        let current = ctx.params.provider.as_str();
        let blocked = providers.is_empty()
            || providers.iter().any(|p| match p.as_str() {
                "server" => current.is_empty(),
                "external" => !current.is_empty(),
                name => name == current,
            });
        if blocked {
            let via = if current.is_empty() { "server" } else { current };
            return Err(ServiceError::method_not_allowed(format!(
                "Provider '{}' can not call '{}' on '{}'",
                via,
                ctx.method(),
                ctx.path()
            )));
        }
        Ok(())
    })
}

/// Requires an authenticated caller.
///
/// Server calls always pass, as do calls whose params or connection are
/// already authenticated. Must be used in a Before stage.
pub fn authenticate() -> SharedHook {
    hook_fn(|ctx| {
        check_context(ctx, "authenticate", &[HookType::Before], &[])?;
        if ctx.params.is_server() || ctx.params.is_authenticated() {
            return Ok(());
        }
        Err(ServiceError::not_authenticated("Not authenticated"))
    })
}

/// Requires one of `required` among the caller's permissions.
///
/// Permissions are read from the `permissions` params field as a string or
/// an array of strings. A held permission `p` matches when `p`, `p:*` or
/// `p:<method>` is required; `*` and `*:<method>` always match. External
/// callers without permissions are rejected with `Forbidden`, server calls
/// without permissions pass.
pub fn check_permissions(required: &[&str]) -> SharedHook {
    let required: Vec<String> = required.iter().map(|p| p.to_string()).collect();
    hook_fn(move |ctx| {
        check_context(ctx, "check_permissions", &[HookType::Before], &[])?;
        let method = ctx.method().as_str();

        let held: Vec<String> = match ctx.params.get("permissions") {
            None if ctx.params.is_server() => return Ok(()),
            None => {
                return Err(ServiceError::forbidden(
                    "You do not have the correct permissions (invalid permission entity).",
                ))
            }
            Some(Value::String(permission)) => vec![permission.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| item.as_str().map(String::from))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| {
                    ServiceError::general("Permissions must be strings (permission datatype mismatch)")
                })?,
            Some(_) => {
                return Err(ServiceError::general(
                    "Permissions must be strings (permission datatype mismatch)",
                ))
            }
        };

        let accepted = |candidate: &str| {
            candidate == "*"
                || candidate == format!("*:{}", method)
                || required.iter().any(|r| r == candidate)
        };
        let granted = held.iter().any(|permission| {
            accepted(permission)
                || accepted(&format!("{}:*", permission))
                || accepted(&format!("{}:{}", permission, method))
        });
        if granted {
            Ok(())
        } else {
            Err(ServiceError::forbidden("You do not have the correct permissions."))
        }
    })
}
