//! Hooks that transform the records of a call.
//!
//! In a Before stage the record is the payload (`ctx.data`). In After and
//! Error stages it is the result, which may be one object, an array of
//! objects or a page of the form `{ "total": n, "data": [..] }`.

use super::guards::check_context;
use super::{hook_fn, SharedHook};
use crate::context::Context;
use crate::error::{ServiceError, ServiceResult};
use crate::method::{HookType, Method};
use crate::params::Data;
use serde_json::Value;

const WRITE_METHODS: [Method; 3] = [Method::Create, Method::Update, Method::Patch];

/// Applies `f` to every record of the call.
pub fn for_each_item<F>(ctx: &mut Context, mut f: F) -> ServiceResult<()>
where
    F: FnMut(&mut Data) -> ServiceResult<()>,
{
    if ctx.stage() == HookType::Before {
        return f(&mut ctx.data);
    }

    match ctx.result.as_mut() {
        Some(Value::Array(items)) => apply_all(items, &mut f),
        Some(Value::Object(map)) => {
            if map.contains_key("total") {
                if let Some(Value::Array(items)) = map.get_mut("data") {
                    return apply_all(items, &mut f);
                }
            }
            f(map)
        }
        _ => Ok(()),
    }
}

fn apply_all<F>(items: &mut [Value], f: &mut F) -> ServiceResult<()>
where
    F: FnMut(&mut Data) -> ServiceResult<()>,
{
    for item in items {
        if let Value::Object(map) = item {
            f(map)?;
        }
    }
    Ok(())
}

type ItemFn = dyn Fn(Data, &Context) -> ServiceResult<Option<Data>> + Send + Sync;

fn alter_all(items: Vec<Value>, f: &ItemFn, ctx: &Context) -> ServiceResult<Vec<Value>> {
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Object(map) => {
                if let Some(map) = f(map, ctx)? {
                    kept.push(Value::Object(map));
                }
            }
            other => kept.push(other),
        }
    }
    Ok(kept)
}

fn alter_result(result: Value, f: &ItemFn, ctx: &Context) -> ServiceResult<Value> {
    match result {
        Value::Array(items) => Ok(Value::Array(alter_all(items, f, ctx)?)),
        Value::Object(mut map) => {
            if map.contains_key("total") {
                if let Some(Value::Array(items)) = map.remove("data") {
                    map.insert("data".into(), Value::Array(alter_all(items, f, ctx)?));
                    return Ok(Value::Object(map));
                }
            }
            Ok(f(map, ctx)?.map(Value::Object).unwrap_or(Value::Null))
        }
        other => Ok(other),
    }
}

fn check_write_context(ctx: &Context, name: &str) -> ServiceResult<()> {
    if ctx.stage() == HookType::Before {
        check_context(ctx, name, &[HookType::Before], &WRITE_METHODS)?;
    }
    Ok(())
}

fn owned(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Removes `fields` from every record.
pub fn discard(fields: &[&str]) -> SharedHook {
    let fields = owned(fields);
    hook_fn(move |ctx| {
        check_write_context(ctx, "discard")?;
        for_each_item(ctx, |item| {
            for field in &fields {
                item.remove(field);
            }
            Ok(())
        })
    })
}

/// Removes every field except `fields` from every record.
pub fn keep(fields: &[&str]) -> SharedHook {
    let fields = owned(fields);
    hook_fn(move |ctx| {
        check_write_context(ctx, "keep")?;
        for_each_item(ctx, |item| {
            item.retain(|key, _| fields.iter().any(|f| f == key));
            Ok(())
        })
    })
}

/// Fails with `BadRequest` when a field is missing or empty.
///
/// On `patch` a field may be absent; it only has to be non-empty when sent.
pub fn required(fields: &[&str]) -> SharedHook {
    let fields = owned(fields);
    hook_fn(move |ctx| {
        check_context(ctx, "required", &[HookType::Before], &WRITE_METHODS)?;
        let partial = ctx.method() == Method::Patch;
        for field in &fields {
            match ctx.data.get(field) {
                None if partial => {}
                None => {
                    return Err(ServiceError::bad_request(format!(
                        "Field {} does not exist. (required)",
                        field
                    )))
                }
                Some(value) if is_empty_value(value) => {
                    return Err(ServiceError::bad_request(format!(
                        "Field {} is empty. (required)",
                        field
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    })
}

/// Lower-cases string fields; non-string values are rejected.
pub fn lower_case(fields: &[&str]) -> SharedHook {
    let fields = owned(fields);
    hook_fn(move |ctx| {
        check_write_context(ctx, "lower_case")?;
        for_each_item(ctx, |item| {
            for field in &fields {
                match item.get_mut(field) {
                    Some(Value::String(s)) => *s = s.to_lowercase(),
                    Some(Value::Null) | None => {}
                    Some(_) => {
                        return Err(ServiceError::bad_request(format!(
                            "Expected string data. (lower_case {})",
                            field
                        )))
                    }
                }
            }
            Ok(())
        })
    })
}

/// Stamps `fields` with the current UTC time (RFC 3339).
pub fn set_now(fields: &[&str]) -> SharedHook {
    let fields = owned(fields);
    hook_fn(move |ctx| {
        let now = chrono::Utc::now().to_rfc3339();
        for_each_item(ctx, |item| {
            for field in &fields {
                item.insert(field.clone(), Value::String(now.clone()));
            }
            Ok(())
        })
    })
}

/// Keeps a `patch` from touching `fields`.
///
/// With `fail` set the call is rejected with `BadRequest`; otherwise the
/// fields are silently dropped from the payload.
pub fn prevent_changes(fail: bool, fields: &[&str]) -> SharedHook {
    let fields = owned(fields);
    hook_fn(move |ctx| {
        check_context(ctx, "prevent_changes", &[HookType::Before], &[Method::Patch])?;
        for field in &fields {
            if ctx.data.contains_key(field) {
                if fail {
                    return Err(ServiceError::bad_request(format!(
                        "Field {} may not change. (prevent_changes)",
                        field
                    )));
                }
                ctx.data.remove(field);
            }
        }
        Ok(())
    })
}

/// Rewrites every record with `f`.
///
/// Returning `None` removes the record: from a result array or page it is
/// dropped, a single record becomes empty (Before) or `null` (After).
pub fn alter_items<F>(f: F) -> SharedHook
where
    F: Fn(Data, &Context) -> ServiceResult<Option<Data>> + Send + Sync + 'static,
{
    let f: Box<ItemFn> = Box::new(f);
    hook_fn(move |ctx| {
        if ctx.stage() == HookType::Before {
            ctx.data = f(ctx.data.clone(), &*ctx)?.unwrap_or_default();
            return Ok(());
        }
        if let Some(result) = ctx.result.clone() {
            ctx.result = Some(alter_result(result, f.as_ref(), &*ctx)?);
        }
        Ok(())
    })
}
