//! Hooks and hook trees.
//!
//! A hook is an interceptor that runs against a [`Context`] before a service
//! method, after it, or when the call failed. Hooks mutate the context in
//! place and return `Err` to stop the chain.
//!
//! # Chains
//!
//! A [`HookTree`] keeps three branches (Before, After, Error). Each branch
//! holds an `all` list and one list per [`Method`]. The chain executed for a
//! stage is:
//!
//! ```text
//! app.all ++ app.<method> ++ service.all ++ service.<method>
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use skein_core::hooks::{hook_fn, HookTree};
//! use skein_core::Method;
//!
//! let hooks = HookTree::new()
//!     .before(Method::Create, hook_fn(|ctx| {
//!         ctx.data.insert("source".into(), "api".into());
//!         Ok(())
//!     }))
//!     .after_all(skein_core::hooks::log_duration());
//! ```

pub mod conditional;
pub mod guards;
pub mod items;
pub mod predicates;
pub mod query;
pub mod timing;

pub use conditional::{combine, iff, iff_else, iff_not};
pub use guards::{authenticate, check_context, check_permissions, disallow};
pub use items::{alter_items, discard, keep, lower_case, prevent_changes, required, set_now};
pub use predicates::{every, is_not, is_provider, some, Predicate, SharedPredicate};
pub use query::{discard_query, keep_query, required_query};
pub use timing::log_duration;

use crate::context::Context;
use crate::error::ServiceResult;
use crate::method::{HookType, Method};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// An interceptor in a hook chain.
#[async_trait]
pub trait Hook: Send + Sync {
    async fn call(&self, ctx: &mut Context) -> ServiceResult<()>;
}

pub type SharedHook = Arc<dyn Hook>;

struct FnHook<F>(F);

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn(&mut Context) -> ServiceResult<()> + Send + Sync,
{
    async fn call(&self, ctx: &mut Context) -> ServiceResult<()> {
        (self.0)(ctx)
    }
}

/// Wraps a synchronous closure as a hook.
pub fn hook_fn<F>(f: F) -> SharedHook
where
    F: Fn(&mut Context) -> ServiceResult<()> + Send + Sync + 'static,
{
    Arc::new(FnHook(f))
}

type AsyncHookFn = Box<
    dyn Fn(Context) -> std::pin::Pin<Box<dyn Future<Output = ServiceResult<Context>> + Send>>
        + Send
        + Sync,
>;

struct AsyncFnHook {
    callback: AsyncHookFn,
}

#[async_trait]
impl Hook for AsyncFnHook {
    async fn call(&self, ctx: &mut Context) -> ServiceResult<()> {
        let returned = (self.callback)(ctx.clone()).await?;
        ctx.absorb(returned);
        Ok(())
    }
}

/// Wraps an async closure as a hook.
///
/// The closure receives an owned copy of the context and returns the
/// version that should continue down the chain. Only the id, data, result,
/// error and params of the returned context are kept; the method, path and
/// stage of the call are fixed.
///
/// ```rust,ignore
/// let hook = async_hook(|mut ctx| async move {
///     let users = ctx
///         .app()
///         .service("users")
///         .ok_or_else(|| ServiceError::general("users missing"))?;
///     let owner = users.get("42", &ctx.params.derive()).await?;
///     ctx.data.insert("owner".into(), owner);
///     Ok(ctx)
/// });
/// ```
pub fn async_hook<F, Fut>(f: F) -> SharedHook
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ServiceResult<Context>> + Send + 'static,
{
    Arc::new(AsyncFnHook {
        callback: Box::new(move |ctx| Box::pin(f(ctx))),
    })
}

/// Hooks of one stage, split by method.
#[derive(Clone, Default)]
pub struct HookBranch {
    all: Vec<SharedHook>,
    methods: [Vec<SharedHook>; 6],
}

impl HookBranch {
    pub fn push_all(&mut self, hook: SharedHook) {
        self.all.push(hook);
    }

    pub fn push(&mut self, method: Method, hook: SharedHook) {
        self.methods[method.index()].push(hook);
    }

    /// `all` followed by the method's own hooks.
    pub fn chain(&self, method: Method) -> Vec<SharedHook> {
        self.all
            .iter()
            .chain(self.methods[method.index()].iter())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.all.len() + self.methods.iter().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn extend(&mut self, other: HookBranch) {
        self.all.extend(other.all);
        for (mine, theirs) in self.methods.iter_mut().zip(other.methods) {
            mine.extend(theirs);
        }
    }
}

impl fmt::Debug for HookBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("HookBranch");
        dbg.field("all", &self.all.len());
        for method in Method::ALL {
            dbg.field(method.as_str(), &self.methods[method.index()].len());
        }
        dbg.finish()
    }
}

/// Before, After and Error hook branches for an app or a service.
#[derive(Debug, Clone, Default)]
pub struct HookTree {
    before: HookBranch,
    after: HookBranch,
    error: HookBranch,
}

impl HookTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn branch(&self, stage: HookType) -> &HookBranch {
        match stage {
            HookType::Before => &self.before,
            HookType::After => &self.after,
            HookType::Error => &self.error,
        }
    }

    pub fn branch_mut(&mut self, stage: HookType) -> &mut HookBranch {
        match stage {
            HookType::Before => &mut self.before,
            HookType::After => &mut self.after,
            HookType::Error => &mut self.error,
        }
    }

    /// Adds a hook to `stage`, for one method or, with `None`, for all.
    pub fn add(&mut self, stage: HookType, method: Option<Method>, hook: SharedHook) {
        let branch = self.branch_mut(stage);
        match method {
            Some(method) => branch.push(method, hook),
            None => branch.push_all(hook),
        }
    }

    pub fn before_all(mut self, hook: SharedHook) -> Self {
        self.add(HookType::Before, None, hook);
        self
    }

    pub fn before(mut self, method: Method, hook: SharedHook) -> Self {
        self.add(HookType::Before, Some(method), hook);
        self
    }

    pub fn after_all(mut self, hook: SharedHook) -> Self {
        self.add(HookType::After, None, hook);
        self
    }

    pub fn after(mut self, method: Method, hook: SharedHook) -> Self {
        self.add(HookType::After, Some(method), hook);
        self
    }

    pub fn error_all(mut self, hook: SharedHook) -> Self {
        self.add(HookType::Error, None, hook);
        self
    }

    pub fn error(mut self, method: Method, hook: SharedHook) -> Self {
        self.add(HookType::Error, Some(method), hook);
        self
    }

    pub fn chain(&self, stage: HookType, method: Method) -> Vec<SharedHook> {
        self.branch(stage).chain(method)
    }

    /// Appends every hook of `other` after this tree's hooks.
    pub fn merge(&mut self, other: HookTree) {
        self.before.extend(other.before);
        self.after.extend(other.after);
        self.error.extend(other.error);
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty() && self.error.is_empty()
    }
}

/// App-level hooks followed by service-level hooks for one stage.
pub fn effective_chain(
    app: &HookTree,
    service: &HookTree,
    stage: HookType,
    method: Method,
) -> Vec<SharedHook> {
    let mut chain = app.chain(stage, method);
    chain.extend(service.chain(stage, method));
    chain
}

/// Runs `hooks` in order, stopping at the first error.
///
/// The call deadline is checked before each hook.
pub async fn run_chain(hooks: &[SharedHook], ctx: &mut Context) -> ServiceResult<()> {
    execute_chain(hooks, ctx, true).await
}

/// Like [`run_chain`]; with `check_deadline` unset hooks still run after the
/// deadline has passed, as the Error stage needs.
pub(crate) async fn execute_chain(
    hooks: &[SharedHook],
    ctx: &mut Context,
    check_deadline: bool,
) -> ServiceResult<()> {
    for hook in hooks {
        if check_deadline {
            ctx.params.deadline.check()?;
        }
        hook.call(ctx).await?;
    }
    Ok(())
}
