//! Class-scoped runner
//!
//! Test classes are registered as explicit descriptors: an instance factory,
//! the class directives, and the test methods in declaration order. A
//! [`ClassRunner`] owns one scheduler for the class and finishes it once all
//! of the class's units have been handed over.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use tracing::info;

use super::inject::{Injector, NoInjection};
use super::notifier::RunNotifier;
use super::unit::{expand, TestUnit, UnitId};
use super::{RunOutcome, Runner, RunnerError};
use crate::executor::{ConcurrentScheduler, InterruptHandle, RunnerScheduler};
use crate::models::{ClassConfig, Repeat, UnitResult};
use crate::utils::Timer;

type Body<T> = Arc<dyn Fn(&T) -> Result<()> + Send + Sync>;
type Factory<T> = Arc<dyn Fn() -> Result<T> + Send + Sync>;

/// A test method: a name, optional directives, and its body
pub struct TestMethod<T> {
    name: String,
    repeat: Option<Repeat>,
    ignored: bool,
    body: Body<T>,
}

impl<T> TestMethod<T> {
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&T) -> Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            repeat: None,
            ignored: false,
            body: Arc::new(body),
        }
    }

    /// Method-level repeat, overriding the class default
    pub fn repeat(mut self, times: u32) -> Self {
        self.repeat = Some(Repeat::times(times));
        self
    }

    /// Report the method as skipped instead of running it
    pub fn ignore(mut self) -> Self {
        self.ignored = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn repeat_directive(&self) -> Option<Repeat> {
        self.repeat
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Units this method expands to under the given class default
    pub fn units(&self, class_default: Option<Repeat>) -> Vec<UnitId> {
        expand(&self.name, self.repeat, class_default)
    }
}

impl<T> Clone for TestMethod<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            repeat: self.repeat,
            ignored: self.ignored,
            body: self.body.clone(),
        }
    }
}

/// Descriptor of a test class
pub struct TestClass<T> {
    name: String,
    config: ClassConfig,
    factory: Factory<T>,
    methods: Vec<TestMethod<T>>,
}

impl<T> TestClass<T> {
    /// Register a class whose instances are built by `factory`, one per unit
    pub fn new(
        name: impl Into<String>,
        factory: impl Fn() -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            config: ClassConfig::default(),
            factory: Arc::new(factory),
            methods: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        name: String,
        config: ClassConfig,
        factory: Factory<T>,
        methods: Vec<TestMethod<T>>,
    ) -> Self {
        Self {
            name,
            config,
            factory,
            methods,
        }
    }

    /// Worker pool size for this class
    pub fn concurrent(mut self, threads: u32) -> Self {
        self.config = self.config.with_threads(threads);
        self
    }

    /// Default repeat count for methods without their own directive
    pub fn repeat(mut self, times: u32) -> Self {
        self.config = self.config.with_repeat(times);
        self
    }

    pub fn with_config(mut self, config: ClassConfig) -> Self {
        self.config = config;
        self
    }

    pub fn test(mut self, method: TestMethod<T>) -> Self {
        self.methods.push(method);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &ClassConfig {
        &self.config
    }

    pub fn methods(&self) -> &[TestMethod<T>] {
        &self.methods
    }

    /// Every unit of the class in declaration order, ignored methods included
    pub fn units(&self) -> Vec<UnitId> {
        self.methods
            .iter()
            .flat_map(|m| m.units(self.config.repeat))
            .collect()
    }
}

impl<T: Default + 'static> TestClass<T> {
    /// Register a class whose instances come from `T::default()`
    pub fn with_default(name: impl Into<String>) -> Self {
        Self::new(name, || Ok(T::default()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SchedulerScope {
    /// The runner finishes the scheduler when its own units are handed over
    Owned,
    /// A parent runner finishes the scheduler
    Shared,
}

/// Runs one test class on its own worker pool
pub struct ClassRunner<T> {
    class: TestClass<T>,
    scheduler: Arc<ConcurrentScheduler>,
    scope: SchedulerScope,
    injector: Arc<dyn Injector<T>>,
}

impl<T: 'static> ClassRunner<T> {
    /// Build a runner with a scheduler sized from the class's concurrency directive
    pub fn new(class: TestClass<T>) -> Result<Self, RunnerError> {
        let scheduler = ConcurrentScheduler::for_class(&class.name, &class.config)?;

        Ok(Self {
            class,
            scheduler: Arc::new(scheduler),
            scope: SchedulerScope::Owned,
            injector: Arc::new(NoInjection),
        })
    }

    pub(crate) fn with_shared_scheduler(
        class: TestClass<T>,
        scheduler: Arc<ConcurrentScheduler>,
    ) -> Self {
        Self {
            class,
            scheduler,
            scope: SchedulerScope::Shared,
            injector: Arc::new(NoInjection),
        }
    }

    pub fn with_injector(mut self, injector: impl Injector<T> + 'static) -> Self {
        self.injector = Arc::new(injector);
        self
    }

    pub(crate) fn set_injector(&mut self, injector: Arc<dyn Injector<T>>) {
        self.injector = injector;
    }

    pub fn class(&self) -> &TestClass<T> {
        &self.class
    }

    pub fn scheduler(&self) -> &ConcurrentScheduler {
        &self.scheduler
    }

    /// Hand every unit of the class to the scheduler, in declaration order
    fn schedule_children(
        &self,
        notifier: &RunNotifier,
        outcome: &mut RunOutcome,
    ) -> Result<(), RunnerError> {
        for method in &self.class.methods {
            for id in method.units(self.class.config.repeat) {
                if method.ignored {
                    notifier.fire_ignored(&self.class.name, &id.display_name());
                    outcome.ignored += 1;
                    continue;
                }
                let unit = self.bind_unit(id, method, notifier);
                self.scheduler.schedule(unit)?;
                outcome.scheduled += 1;
            }
        }
        Ok(())
    }

    fn bind_unit(&self, id: UnitId, method: &TestMethod<T>, notifier: &RunNotifier) -> TestUnit {
        let class_name = self.class.name.clone();
        let name = id.display_name();
        let factory = self.class.factory.clone();
        let injector = self.injector.clone();
        let body = method.body.clone();
        let notifier = notifier.clone();

        TestUnit::new(id, move || {
            notifier.fire_started(&class_name, &name);
            let timer = Timer::start(format!("{class_name}.{name}"));
            let outcome = invoke(factory.as_ref(), injector.as_ref(), body.as_ref());
            let elapsed = timer.stop().as_millis() as u64;

            let result = match outcome {
                Ok(()) => UnitResult::pass(&class_name, &name, elapsed),
                Err(UnitFailure::Panicked(message)) => {
                    UnitResult::fail(&class_name, &name, elapsed, message)
                }
                Err(UnitFailure::Errored(error)) => {
                    UnitResult::error(&class_name, &name, elapsed, format!("{error:#}"))
                }
            };
            let thread = thread::current().name().map(str::to_string);
            notifier.fire_finished(result.on_thread(thread));
        })
    }
}

impl<T: 'static> Runner for ClassRunner<T> {
    fn name(&self) -> &str {
        &self.class.name
    }

    fn children(&self) -> Vec<String> {
        self.class
            .units()
            .iter()
            .map(|id| format!("{}.{}", self.class.name, id))
            .collect()
    }

    fn run(&self, notifier: &RunNotifier) -> Result<RunOutcome, RunnerError> {
        info!(
            "Running {} ({} units, {} thread(s))",
            self.class.name,
            self.class.units().len(),
            self.class.config.threads()
        );

        let mut outcome = RunOutcome::default();
        let scheduled = self.schedule_children(notifier, &mut outcome);

        if self.scope == SchedulerScope::Owned {
            outcome.drain = Some(self.scheduler.finished());
        }

        scheduled.map(|()| outcome)
    }

    fn interrupt_handle(&self) -> Option<InterruptHandle> {
        Some(self.scheduler.interrupt_handle())
    }
}

enum UnitFailure {
    /// Assertion macros and explicit panics
    Panicked(String),
    Errored(anyhow::Error),
}

fn invoke<T>(
    factory: &(dyn Fn() -> Result<T> + Send + Sync),
    injector: &dyn Injector<T>,
    body: &(dyn Fn(&T) -> Result<()> + Send + Sync),
) -> Result<(), UnitFailure> {
    let attempt = panic::catch_unwind(AssertUnwindSafe(|| -> Result<()> {
        let mut instance = factory().context("Failed to construct test instance")?;
        injector
            .inject_fields(&mut instance)
            .context("Failed to inject test instance fields")?;
        body(&instance)
    }));

    match attempt {
        Ok(Ok(())) => Ok(()),
        Ok(Err(error)) => Err(UnitFailure::Errored(error)),
        Err(payload) => Err(UnitFailure::Panicked(panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unit panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{SchedulerError, SchedulerState};
    use crate::models::UnitStatus;
    use crate::runner::inject::FnInjector;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn run(runner: &ClassRunner<()>) -> (RunOutcome, Vec<UnitResult>) {
        let notifier = RunNotifier::new();
        let outcome = runner.run(&notifier).unwrap();
        (outcome, notifier.results())
    }

    #[test]
    fn test_children_follow_declaration_order() {
        let class = TestClass::<()>::with_default("RepeatedTest")
            .repeat(2)
            .test(TestMethod::new("repeatedMethod", |_| Ok(())))
            .test(TestMethod::new("anotherRepeatedMethod", |_| Ok(())).repeat(3));
        let runner = ClassRunner::new(class).unwrap();

        assert_eq!(
            runner.children(),
            vec![
                "RepeatedTest.repeatedMethod[0]",
                "RepeatedTest.repeatedMethod[1]",
                "RepeatedTest.anotherRepeatedMethod[0]",
                "RepeatedTest.anotherRepeatedMethod[1]",
                "RepeatedTest.anotherRepeatedMethod[2]",
            ]
        );
    }

    #[test]
    fn test_every_unit_reports_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let class = TestClass::<()>::with_default("Counted")
            .concurrent(3)
            .test(TestMethod::new("count", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .repeat(12));
        let runner = ClassRunner::new(class).unwrap();

        let (outcome, results) = run(&runner);
        assert_eq!(outcome.scheduled, 12);
        assert_eq!(outcome.drain.map(|d| d.completed), Some(12));
        assert_eq!(calls.load(Ordering::SeqCst), 12);
        assert_eq!(results.len(), 12);
        assert!(results.iter().all(|r| r.status == UnitStatus::Pass));
        assert_eq!(runner.scheduler().state(), SchedulerState::Closed);
    }

    #[test]
    fn test_failures_and_errors_are_reported_not_raised() {
        let class = TestClass::<()>::with_default("Mixed")
            .concurrent(2)
            .test(TestMethod::new("passes", |_| Ok(())))
            .test(TestMethod::new("asserts", |_| {
                assert_eq!(1, 2, "values differ");
                Ok(())
            }))
            .test(TestMethod::new("errors", |_| anyhow::bail!("backend unavailable")))
            .test(TestMethod::new("ignored", |_| Ok(())).ignore());
        let runner = ClassRunner::new(class).unwrap();

        let (outcome, results) = run(&runner);
        assert_eq!(outcome.scheduled, 3);
        assert_eq!(outcome.ignored, 1);

        let status_of = |name: &str| {
            results
                .iter()
                .find(|r| r.name == name)
                .map(|r| r.status)
                .unwrap()
        };
        assert_eq!(status_of("passes"), UnitStatus::Pass);
        assert_eq!(status_of("asserts"), UnitStatus::Fail);
        assert_eq!(status_of("errors"), UnitStatus::Error);
        assert_eq!(status_of("ignored"), UnitStatus::Skip);

        let failure = results.iter().find(|r| r.name == "asserts").unwrap();
        assert!(failure.message.as_deref().unwrap().contains("values differ"));
    }

    #[test]
    fn test_units_run_on_named_class_pool() {
        let class = TestClass::<()>::with_default("ThreadNames")
            .concurrent(2)
            .test(TestMethod::new("m", |_| Ok(())).repeat(4));
        let runner = ClassRunner::new(class).unwrap();
        let prefix = format!("{}-thread-", runner.scheduler().pool_name().unwrap());

        let (_, results) = run(&runner);
        for result in results {
            assert!(result.thread.unwrap().starts_with(&prefix));
        }
    }

    #[test]
    fn test_fresh_instance_and_injection_per_unit() {
        struct Probe {
            id: usize,
            injected: bool,
        }

        let built = Arc::new(AtomicUsize::new(0));
        let next_id = built.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = seen.clone();

        let class = TestClass::new("Injected", move || {
            Ok(Probe {
                id: next_id.fetch_add(1, Ordering::SeqCst),
                injected: false,
            })
        })
        .test(TestMethod::new("check", move |probe: &Probe| {
            anyhow::ensure!(probe.injected, "fields were not injected");
            record.lock().unwrap().push(probe.id);
            Ok(())
        })
        .repeat(3));

        let runner = ClassRunner::new(class)
            .unwrap()
            .with_injector(FnInjector(|probe: &mut Probe| {
                probe.injected = true;
                Ok(())
            }));

        let notifier = RunNotifier::new();
        runner.run(&notifier).unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 3);
        assert_eq!(seen.lock().unwrap().len(), 3);
        assert!(notifier.results().iter().all(|r| r.status == UnitStatus::Pass));
    }

    #[test]
    fn test_factory_error_reports_error() {
        let class = TestClass::<()>::new("Broken", || anyhow::bail!("no database"))
            .test(TestMethod::new("m", |_| Ok(())));
        let runner = ClassRunner::new(class).unwrap();

        let (_, results) = run(&runner);
        assert_eq!(results[0].status, UnitStatus::Error);
        assert!(results[0].message.as_deref().unwrap().contains("no database"));
    }

    #[test]
    fn test_sequential_without_directives() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut class = TestClass::<()>::with_default("Sequential");
        for i in 0..5 {
            let order = order.clone();
            class = class.test(TestMethod::new(format!("method{i}"), move |_| {
                order.lock().unwrap().push(i);
                Ok(())
            }));
        }
        let runner = ClassRunner::new(class).unwrap();
        run(&runner);

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_zero_threads_fails_construction() {
        let class = TestClass::<()>::with_default("Invalid").concurrent(0);
        assert!(matches!(
            ClassRunner::new(class),
            Err(RunnerError::Scheduler(SchedulerError::InvalidDirective(_)))
        ));
    }

    #[test]
    fn test_second_run_rejected() {
        let class = TestClass::<()>::with_default("Once").test(TestMethod::new("m", |_| Ok(())));
        let runner = ClassRunner::new(class).unwrap();
        run(&runner);

        let notifier = RunNotifier::new();
        assert!(matches!(
            runner.run(&notifier),
            Err(RunnerError::Scheduler(_))
        ));
    }
}
