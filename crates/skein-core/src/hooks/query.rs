//! Hooks that act on `params.query` before a call runs.

use super::guards::check_context;
use super::items::is_empty_value;
use super::{hook_fn, SharedHook};
use crate::error::ServiceError;
use crate::method::{HookType, Method};

const KEEP_METHODS: [Method; 4] = [Method::Create, Method::Update, Method::Patch, Method::Find];
const REQUIRED_METHODS: [Method; 5] = [
    Method::Find,
    Method::Create,
    Method::Update,
    Method::Patch,
    Method::Remove,
];

fn owned(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

/// Removes `fields` from the query.
pub fn discard_query(fields: &[&str]) -> SharedHook {
    let fields = owned(fields);
    hook_fn(move |ctx| {
        check_context(ctx, "discard_query", &[HookType::Before], &[])?;
        for field in &fields {
            ctx.params.query.remove(field);
        }
        Ok(())
    })
}

/// Removes every query field except `fields`.
pub fn keep_query(fields: &[&str]) -> SharedHook {
    let fields = owned(fields);
    hook_fn(move |ctx| {
        check_context(ctx, "keep_query", &[HookType::Before], &KEEP_METHODS)?;
        ctx.params
            .query
            .retain(|key, _| fields.iter().any(|f| f == key));
        Ok(())
    })
}

/// Fails with `BadRequest` when a query field is missing or empty.
pub fn required_query(fields: &[&str]) -> SharedHook {
    let fields = owned(fields);
    hook_fn(move |ctx| {
        check_context(ctx, "required_query", &[HookType::Before], &REQUIRED_METHODS)?;
        for field in &fields {
            match ctx.params.query.get(field) {
                Some(value) if !is_empty_value(value) => {}
                _ => {
                    return Err(ServiceError::bad_request(format!(
                        "Field {} does not exist. (required_query)",
                        field
                    )))
                }
            }
        }
        Ok(())
    })
}
