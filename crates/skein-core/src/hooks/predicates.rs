//! Boolean checks over a context, used by the conditional hooks.

use crate::context::Context;
use crate::error::ServiceResult;
use std::sync::Arc;

pub trait Predicate: Send + Sync {
    fn test(&self, ctx: &Context) -> ServiceResult<bool>;
}

impl<F> Predicate for F
where
    F: Fn(&Context) -> ServiceResult<bool> + Send + Sync,
{
    fn test(&self, ctx: &Context) -> ServiceResult<bool> {
        self(ctx)
    }
}

pub type SharedPredicate = Arc<dyn Predicate>;

/// True when the call came through one of `providers`.
///
/// `"server"` matches calls made from inside the process and `"external"`
/// matches any transport.
pub fn is_provider(providers: &[&str]) -> SharedPredicate {
    let providers: Vec<String> = providers.iter().map(|p| p.to_string()).collect();
    Arc::new(move |ctx: &Context| -> ServiceResult<bool> {
        let current = ctx.params.provider.as_str();
        Ok(providers.iter().any(|wanted| match wanted.as_str() {
            "server" => current.is_empty(),
            "external" => !current.is_empty(),
            name => name == current,
        }))
    })
}

pub fn is_not(predicate: SharedPredicate) -> SharedPredicate {
    Arc::new(move |ctx: &Context| -> ServiceResult<bool> {
        Ok(!predicate.test(ctx)?)
    })
}

/// True when any predicate holds. Evaluation stops at the first match.
pub fn some(predicates: Vec<SharedPredicate>) -> SharedPredicate {
    Arc::new(move |ctx: &Context| -> ServiceResult<bool> {
        for predicate in &predicates {
            if predicate.test(ctx)? {
                return Ok(true);
            }
        }
        Ok(false)
    })
}

/// True when every predicate holds. Evaluation stops at the first miss.
pub fn every(predicates: Vec<SharedPredicate>) -> SharedPredicate {
    Arc::new(move |ctx: &Context| -> ServiceResult<bool> {
        for predicate in &predicates {
            if !predicate.test(ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::error::ServiceError;
    use crate::method::Method;
    use crate::params::Params;

    fn ctx_from(provider: &str) -> Context {
        Context::new(App::new(), Method::Find, "items")
            .with_params(Params::from_provider(provider))
    }

    fn constant(value: bool) -> SharedPredicate {
        Arc::new(move |_: &Context| -> ServiceResult<bool> { Ok(value) })
    }

    #[test]
    fn test_is_provider_keywords() {
        let server = ctx_from("");
        let rest = ctx_from("rest");

        assert!(is_provider(&["server"]).test(&server).unwrap());
        assert!(!is_provider(&["server"]).test(&rest).unwrap());
        assert!(is_provider(&["external"]).test(&rest).unwrap());
        assert!(!is_provider(&["external"]).test(&server).unwrap());
        assert!(is_provider(&["socket", "rest"]).test(&rest).unwrap());
        assert!(!is_provider(&["socket"]).test(&rest).unwrap());
    }

    #[test]
    fn test_combinators() {
        let ctx = ctx_from("rest");
        assert!(some(vec![constant(false), constant(true)]).test(&ctx).unwrap());
        assert!(!some(vec![]).test(&ctx).unwrap());
        assert!(every(vec![constant(true), constant(true)]).test(&ctx).unwrap());
        assert!(!every(vec![constant(true), constant(false)]).test(&ctx).unwrap());
        assert!(is_not(constant(false)).test(&ctx).unwrap());
    }

    #[test]
    fn test_errors_propagate() {
        let failing: SharedPredicate = Arc::new(|_: &Context| -> ServiceResult<bool> {
            Err(ServiceError::general("broken"))
        });
        let ctx = ctx_from("");
        assert!(some(vec![failing.clone()]).test(&ctx).is_err());
        assert!(every(vec![constant(true), failing]).test(&ctx).is_err());
    }
}
