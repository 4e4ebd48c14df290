//! Parameterized runner
//!
//! One child class runner per parameter set, all feeding a single scheduler
//! that spans the whole suite. The children never finish that scheduler; the
//! parameterized runner does, once, after every child has handed over its
//! units.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use super::class::{ClassRunner, TestClass, TestMethod};
use super::inject::Injector;
use super::notifier::RunNotifier;
use super::{RunOutcome, Runner, RunnerError};
use crate::executor::{ConcurrentScheduler, InterruptHandle, RunnerScheduler};
use crate::models::ClassConfig;

/// Descriptor of a data-driven test class
pub struct ParameterizedClass<T, P> {
    name: String,
    config: ClassConfig,
    parameters: Vec<P>,
    constructor: Arc<dyn Fn(&P) -> Result<T> + Send + Sync>,
    methods: Vec<TestMethod<T>>,
}

impl<T, P> ParameterizedClass<T, P> {
    /// Register a class whose instances are built from one parameter set each
    pub fn new(
        name: impl Into<String>,
        constructor: impl Fn(&P) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            config: ClassConfig::default(),
            parameters: Vec::new(),
            constructor: Arc::new(constructor),
            methods: Vec::new(),
        }
    }

    pub fn parameters(mut self, parameters: impl IntoIterator<Item = P>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn concurrent(mut self, threads: u32) -> Self {
        self.config = self.config.with_threads(threads);
        self
    }

    pub fn repeat(mut self, times: u32) -> Self {
        self.config = self.config.with_repeat(times);
        self
    }

    pub fn test(mut self, method: TestMethod<T>) -> Self {
        self.methods.push(method);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Runs every parameter set of a class on one shared worker pool
pub struct ParameterizedRunner<T> {
    name: String,
    scheduler: Arc<ConcurrentScheduler>,
    children: Vec<ClassRunner<T>>,
}

impl<T: 'static> ParameterizedRunner<T> {
    pub fn new<P>(class: ParameterizedClass<T, P>) -> Result<Self, RunnerError>
    where
        P: Send + Sync + 'static,
    {
        let scheduler = Arc::new(ConcurrentScheduler::for_class(&class.name, &class.config)?);

        let children = class
            .parameters
            .into_iter()
            .enumerate()
            .map(|(index, parameter)| {
                let constructor = class.constructor.clone();
                let child = TestClass::from_parts(
                    format!("{}[{}]", class.name, index),
                    class.config,
                    Arc::new(move || constructor(&parameter)),
                    class.methods.clone(),
                );
                ClassRunner::with_shared_scheduler(child, scheduler.clone())
            })
            .collect();

        Ok(Self {
            name: class.name,
            scheduler,
            children,
        })
    }

    /// Use one injector for every child runner
    pub fn with_injector(mut self, injector: impl Injector<T> + 'static) -> Self {
        let injector: Arc<dyn Injector<T>> = Arc::new(injector);
        for child in &mut self.children {
            child.set_injector(injector.clone());
        }
        self
    }

    pub fn child_runners(&self) -> &[ClassRunner<T>] {
        &self.children
    }

    pub fn scheduler(&self) -> &ConcurrentScheduler {
        &self.scheduler
    }
}

impl<T: 'static> Runner for ParameterizedRunner<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn children(&self) -> Vec<String> {
        self.children.iter().flat_map(|c| c.children()).collect()
    }

    fn run(&self, notifier: &RunNotifier) -> Result<RunOutcome, RunnerError> {
        info!(
            "Running {} with {} parameter set(s)",
            self.name,
            self.children.len()
        );

        let mut outcome = RunOutcome::default();
        let mut failure = None;

        for child in &self.children {
            match child.run(notifier) {
                Ok(child_outcome) => {
                    outcome.scheduled += child_outcome.scheduled;
                    outcome.ignored += child_outcome.ignored;
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }

        outcome.drain = Some(self.scheduler.finished());

        match failure {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }

    fn interrupt_handle(&self) -> Option<InterruptHandle> {
        Some(self.scheduler.interrupt_handle())
    }
}
