use super::{hook_fn, SharedHook};
use crate::method::HookType;
use serde_json::json;
use tracing::{debug, info};

const STARTED_AT: &str = "startedAt";

/// Logs how long a call took.
///
/// Register the same hook in both the Before and After (or Error) stages: the
/// first records the start time in the params side channel, the second logs
/// the elapsed milliseconds.
pub fn log_duration() -> SharedHook {
    hook_fn(|ctx| {
        let now = chrono::Utc::now().timestamp_millis();
        if ctx.stage() == HookType::Before {
            ctx.params.set(STARTED_AT, json!(now));
            return Ok(());
        }

        match ctx.params.get(STARTED_AT).and_then(|v| v.as_i64()) {
            Some(started) => info!(
                service = %ctx.path(),
                method = %ctx.method(),
                stage = %ctx.stage(),
                elapsed_ms = now - started,
                "Call finished"
            ),
            None => debug!(service = %ctx.path(), "No start time recorded"),
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::context::Context;
    use crate::hooks::Hook;
    use crate::method::Method;
    use tracing_test::traced_test;

    #[traced_test]
    #[tokio::test]
    async fn test_log_duration_records_and_logs() {
        let hook = log_duration();
        let mut ctx = Context::new(App::new(), Method::Find, "items");

        hook.call(&mut ctx).await.unwrap();
        assert!(ctx.params.get(STARTED_AT).is_some());

        let mut ctx = ctx.with_stage(HookType::After);
        hook.call(&mut ctx).await.unwrap();
        assert!(logs_contain("Call finished"));
    }
}
