//! Hooks that run other hooks.

use super::predicates::SharedPredicate;
use super::{run_chain, Hook, SharedHook};
use crate::context::Context;
use crate::error::ServiceResult;
use async_trait::async_trait;
use std::sync::Arc;

struct Iff {
    predicate: SharedPredicate,
    then: Vec<SharedHook>,
    otherwise: Vec<SharedHook>,
}

#[async_trait]
impl Hook for Iff {
    async fn call(&self, ctx: &mut Context) -> ServiceResult<()> {
        if self.predicate.test(ctx)? {
            run_chain(&self.then, ctx).await
        } else {
            run_chain(&self.otherwise, ctx).await
        }
    }
}

/// Runs `hooks` only when `predicate` holds.
pub fn iff(predicate: SharedPredicate, hooks: Vec<SharedHook>) -> SharedHook {
    iff_else(predicate, hooks, Vec::new())
}

pub fn iff_else(
    predicate: SharedPredicate,
    then: Vec<SharedHook>,
    otherwise: Vec<SharedHook>,
) -> SharedHook {
    Arc::new(Iff {
        predicate,
        then,
        otherwise,
    })
}

/// Runs `hooks` only when `predicate` does not hold.
pub fn iff_not(predicate: SharedPredicate, hooks: Vec<SharedHook>) -> SharedHook {
    iff_else(predicate, Vec::new(), hooks)
}

struct Combine(Vec<SharedHook>);

#[async_trait]
impl Hook for Combine {
    async fn call(&self, ctx: &mut Context) -> ServiceResult<()> {
        run_chain(&self.0, ctx).await
    }
}

/// Groups hooks so they can be registered as one.
pub fn combine(hooks: Vec<SharedHook>) -> SharedHook {
    Arc::new(Combine(hooks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::hooks::{hook_fn, is_provider};
    use crate::method::Method;
    use crate::params::Params;
    use serde_json::json;

    fn mark(key: &'static str) -> SharedHook {
        hook_fn(move |ctx| {
            ctx.data.insert(key.into(), json!(true));
            Ok(())
        })
    }

    fn ctx_from(provider: &str) -> Context {
        Context::new(App::new(), Method::Create, "items")
            .with_params(Params::from_provider(provider))
    }

    #[tokio::test]
    async fn test_iff_branches() {
        let hook = iff_else(is_provider(&["external"]), vec![mark("then")], vec![mark("else")]);

        let mut external = ctx_from("rest");
        hook.call(&mut external).await.unwrap();
        assert!(external.data.contains_key("then"));
        assert!(!external.data.contains_key("else"));

        let mut server = ctx_from("");
        hook.call(&mut server).await.unwrap();
        assert!(server.data.contains_key("else"));
    }

    #[tokio::test]
    async fn test_iff_not() {
        let hook = iff_not(is_provider(&["server"]), vec![mark("ran")]);

        let mut server = ctx_from("");
        hook.call(&mut server).await.unwrap();
        assert!(server.data.is_empty());

        let mut socket = ctx_from("socket");
        hook.call(&mut socket).await.unwrap();
        assert!(socket.data.contains_key("ran"));
    }

    #[tokio::test]
    async fn test_combine_runs_all() {
        let hook = combine(vec![mark("a"), mark("b")]);
        let mut ctx = ctx_from("");
        hook.call(&mut ctx).await.unwrap();
        assert!(ctx.data.contains_key("a") && ctx.data.contains_key("b"));
    }
}
