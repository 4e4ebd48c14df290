use std::thread;

use tracing::debug;

use super::{SuiteOptions, MAX_LOOP};
use crate::runner::{ParameterizedClass, ParameterizedRunner, Runner, RunnerError, TestMethod};

/// One instance per parameter set
struct Parameterized {
    parameter: u32,
}

fn looping(
    label: &'static str,
    step: std::time::Duration,
) -> impl Fn(&Parameterized) -> anyhow::Result<()> {
    move |t| {
        for i in 0..MAX_LOOP {
            debug!("{}: parameter={}: {}", label, t.parameter, i);
            thread::sleep(step);
        }
        Ok(())
    }
}

pub fn parameterized(options: &SuiteOptions) -> Result<Box<dyn Runner>, RunnerError> {
    let class = ParameterizedClass::new("Parameterized", |p: &u32| {
        Ok(Parameterized { parameter: *p })
    })
    .parameters(1..=4)
    .concurrent(options.threads_or(8))
    .test(TestMethod::new("methodOne", looping("methodOne", options.step)))
    .test(TestMethod::new("methodTwo", looping("methodTwo", options.step)));

    Ok(Box::new(ParameterizedRunner::new(class)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::run_suite;
    use std::time::{Duration, Instant};

    #[test]
    fn test_all_parameter_sets_run_together() {
        let options = SuiteOptions::default().with_step(Duration::from_millis(10));
        let runner = parameterized(&options).unwrap();

        let start = Instant::now();
        let summary = run_suite(runner.as_ref(), 1).unwrap();

        assert_eq!(summary.suite, "Parameterized");
        assert_eq!(summary.passed, 8);
        // Eight units of 50ms on eight threads; serial would be 400ms
        assert!(start.elapsed() < Duration::from_millis(300));
    }
}
