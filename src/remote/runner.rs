//! Runner that executes a class's units on a remote endpoint

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use super::client::{RemoteDispatcher, RemoteOutcome};
use crate::models::UnitResult;
use crate::runner::{RunNotifier, RunOutcome, Runner, RunnerError, TestClass, UnitId};

struct RemoteUnit {
    method: String,
    id: UnitId,
    ignored: bool,
}

/// Runs every unit of a class through a [`RemoteDispatcher`], one request
/// per unit, sequentially on the calling thread
pub struct RemoteClassRunner {
    class: String,
    units: Vec<RemoteUnit>,
    dispatcher: Arc<dyn RemoteDispatcher>,
}

impl RemoteClassRunner {
    /// Mirror the units of a locally declared class; the bodies stay unused
    pub fn for_class<T>(class: &TestClass<T>, dispatcher: Arc<dyn RemoteDispatcher>) -> Self {
        let units = class
            .methods()
            .iter()
            .flat_map(|method| {
                method
                    .units(class.config().repeat)
                    .into_iter()
                    .map(move |id| RemoteUnit {
                        method: method.name().to_string(),
                        id,
                        ignored: method.is_ignored(),
                    })
            })
            .collect();

        Self {
            class: class.name().to_string(),
            units,
            dispatcher,
        }
    }

    /// Run the named methods of a class that only exists remotely
    pub fn for_methods(
        class: impl Into<String>,
        methods: impl IntoIterator<Item = impl Into<String>>,
        dispatcher: Arc<dyn RemoteDispatcher>,
    ) -> Self {
        let units = methods
            .into_iter()
            .map(|method| {
                let method = method.into();
                RemoteUnit {
                    id: UnitId::single(&method),
                    method,
                    ignored: false,
                }
            })
            .collect();

        Self {
            class: class.into(),
            units,
            dispatcher,
        }
    }

    fn run_unit(&self, unit: &RemoteUnit) -> UnitResult {
        let name = unit.id.display_name();
        let start = Instant::now();
        // The endpoint only knows method names; repeat indices stay local
        let outcome = self.dispatcher.dispatch(&self.class, &unit.method);
        let elapsed = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(RemoteOutcome::Passed) => UnitResult::pass(&self.class, &name, elapsed),
            Ok(RemoteOutcome::Failed(payload)) => {
                UnitResult::fail(&self.class, &name, elapsed, payload.to_string())
            }
            Err(e) => {
                warn!("Remote dispatch of {}.{} failed: {}", self.class, name, e);
                UnitResult::error(&self.class, &name, elapsed, e.to_string())
            }
        }
    }
}

impl Runner for RemoteClassRunner {
    fn name(&self) -> &str {
        &self.class
    }

    fn children(&self) -> Vec<String> {
        self.units
            .iter()
            .map(|u| format!("{}.{}", self.class, u.id))
            .collect()
    }

    fn run(&self, notifier: &RunNotifier) -> Result<RunOutcome, RunnerError> {
        info!("Running {} remotely ({} units)", self.class, self.units.len());

        let mut outcome = RunOutcome::default();
        for unit in &self.units {
            if unit.ignored {
                notifier.fire_ignored(&self.class, &unit.id.display_name());
                outcome.ignored += 1;
                continue;
            }
            notifier.fire_started(&self.class, &unit.id.display_name());
            notifier.fire_finished(self.run_unit(unit));
            outcome.scheduled += 1;
        }
        Ok(outcome)
    }
}
