use std::thread;

use tracing::debug;

use super::{SuiteOptions, MAX_LOOP};
use crate::runner::{ClassRunner, Runner, RunnerError, TestClass, TestMethod};

pub fn multithreaded(options: &SuiteOptions) -> Result<Box<dyn Runner>, RunnerError> {
    let mut class = TestClass::<()>::with_default("Multithreaded");
    if let Some(threads) = options.threads {
        class = class.concurrent(threads);
    }

    for n in 1..=10 {
        let step = options.step;
        let name = format!("method{n}");
        class = class.test(TestMethod::new(name, move |_| {
            for i in 0..MAX_LOOP {
                debug!("method{}: {}", n, i);
                thread::sleep(step);
            }
            Ok(())
        }));
    }

    Ok(Box::new(ClassRunner::new(class)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::run_suite;
    use std::time::{Duration, Instant};

    #[test]
    fn test_runs_in_parallel_when_threads_given() {
        let options = SuiteOptions::default()
            .with_threads(Some(10))
            .with_step(Duration::from_millis(10));
        let runner = multithreaded(&options).unwrap();

        let start = Instant::now();
        let summary = run_suite(runner.as_ref(), 1).unwrap();

        assert_eq!(summary.passed, 10);
        // Serial execution would take at least 500ms
        assert!(start.elapsed() < Duration::from_millis(400));
    }
}
