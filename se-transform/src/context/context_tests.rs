//! Tests for the ambient run context.

#[cfg(test)]
mod tests {
    use crate::context::{
        clear_context, enter, get_context, set_context, try_get_context, with_context, RunContext,
    };
    use crate::lineage::{CollectingLineageSink, JobRef, LineageEvent, NoOpLineageSink};
    use crate::params::Params;
    use crate::storage::LocalFsStorage;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Map};
    use std::sync::Arc;
    use std::thread;

    fn context(run_id: &str) -> RunContext {
        let dir = std::env::temp_dir().join("se-transform-context-tests");
        RunContext::new(
            Params::new().with("ds", json!("2025-10-01")),
            Arc::new(LocalFsStorage::new(dir)),
            Arc::new(NoOpLineageSink),
        )
        .with_run_id(run_id)
        .with_tenant("acme")
        .with_repo("acme/etl")
    }

    #[test]
    fn test_new_context_has_fresh_run_id() {
        let storage = Arc::new(LocalFsStorage::new(std::env::temp_dir()));
        let a = RunContext::new(Params::new(), storage.clone(), Arc::new(NoOpLineageSink));
        let b = RunContext::new(Params::new(), storage, Arc::new(NoOpLineageSink));
        assert_ne!(a.run_id(), b.run_id());
        assert_eq!(a.run_id().len(), 36);
    }

    #[test]
    fn test_job_namespace() {
        let ctx = context("run-1");
        assert_eq!(ctx.job_namespace(), "se://acme/acme/etl");
        assert_eq!(ctx.params().get_str("ds").unwrap(), "2025-10-01");
    }

    #[test]
    fn test_set_and_get_context() {
        clear_context();
        set_context(context("run-1"));
        assert_eq!(get_context().run_id(), "run-1");
        assert_eq!(get_context().tenant(), "acme");
        clear_context();
        assert!(try_get_context().is_none());
    }

    #[test]
    fn test_get_context_defaults_to_unattributed() {
        thread::spawn(|| {
            assert!(try_get_context().is_none());
            let first = get_context();
            let second = get_context();
            assert_eq!(first.run_id(), second.run_id());
            assert!(first.params().is_empty());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_guard_restores_previous_context() {
        clear_context();
        set_context(context("outer"));
        {
            let _guard = enter(context("inner"));
            assert_eq!(get_context().run_id(), "inner");
        }
        assert_eq!(get_context().run_id(), "outer");

        let seen = with_context(context("scoped"), || get_context().run_id().to_string());
        assert_eq!(seen, "scoped");
        assert_eq!(get_context().run_id(), "outer");
        clear_context();
    }

    #[test]
    fn test_guard_restores_empty_slot() {
        clear_context();
        {
            let _guard = context("temp").enter();
            assert!(try_get_context().is_some());
        }
        assert!(try_get_context().is_none());
    }

    #[test]
    fn test_contexts_are_thread_isolated() {
        set_context(context("main"));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                thread::spawn(move || {
                    let run_id = format!("worker-{i}");
                    with_context(context(&run_id), || {
                        thread::yield_now();
                        get_context().run_id().to_string()
                    })
                })
            })
            .collect();

        let seen: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(seen, vec!["worker-0", "worker-1", "worker-2", "worker-3"]);
        assert_eq!(get_context().run_id(), "main");
        clear_context();
    }

    #[test]
    fn test_emit_goes_through_sink() {
        let sink = Arc::new(CollectingLineageSink::new());
        let ctx = context("run-1").with_sink(sink.clone());
        let job = JobRef::new(ctx.job_namespace(), "daily");

        ctx.emit(LineageEvent::start(job, ctx.run_id(), Map::new()))
            .unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.events()[0].run_id(), "run-1");
    }

    #[test]
    fn test_debug_omits_collaborator_internals() {
        let rendered = format!("{:?}", context("run-1"));
        assert!(rendered.contains("run-1"));
        assert!(rendered.contains("local"));
    }
}
