use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::SuiteOptions;
use crate::runner::{ClassRunner, Runner, RunnerError, TestClass, TestMethod};

/// Counter whose updates are a separate load and store, so concurrent
/// updates can be lost
#[derive(Debug, Default)]
pub struct RacyCounter {
    value: AtomicI64,
}

impl RacyCounter {
    pub fn new(value: i64) -> Self {
        Self {
            value: AtomicI64::new(value),
        }
    }

    pub fn increment(&self) {
        let current = self.value.load(Ordering::Relaxed);
        thread::yield_now();
        self.value.store(current + 1, Ordering::Relaxed);
    }

    pub fn decrement(&self) {
        let current = self.value.load(Ordering::Relaxed);
        thread::yield_now();
        self.value.store(current - 1, Ordering::Relaxed);
    }

    pub fn value(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Instance handed to each unit; every instance of a run shares one counter
struct MissingSync {
    counter: Arc<RacyCounter>,
}

pub fn missing_sync(options: &SuiteOptions) -> Result<Box<dyn Runner>, RunnerError> {
    let counter = Arc::new(RacyCounter::new(10));

    let class = TestClass::new("MissingSync", move || {
        Ok(MissingSync {
            counter: counter.clone(),
        })
    })
    .concurrent(options.threads_or(1))
    .test(
        TestMethod::new("incrementAndDecrement", |t: &MissingSync| {
            let initial = t.counter.value();
            t.counter.increment();
            thread::sleep(Duration::from_millis(5));
            t.counter.decrement();
            assert_eq!(initial, t.counter.value());
            Ok(())
        })
        .repeat(10),
    );

    Ok(Box::new(ClassRunner::new(class)?))
}
