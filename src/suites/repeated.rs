use std::thread;

use tracing::debug;

use super::{SuiteOptions, MAX_LOOP};
use crate::runner::{ClassRunner, Runner, RunnerError, TestClass, TestMethod};

fn looping(label: &'static str, step: std::time::Duration) -> impl Fn(&()) -> anyhow::Result<()> {
    move |_| {
        for i in 0..MAX_LOOP {
            debug!("{}: {}", label, i);
            thread::sleep(step);
        }
        Ok(())
    }
}

pub fn repeated(options: &SuiteOptions) -> Result<Box<dyn Runner>, RunnerError> {
    let class = TestClass::<()>::with_default("Repeated")
        .repeat(2)
        .concurrent(options.threads_or(10))
        .test(TestMethod::new(
            "repeatedMethod",
            looping("repeatedMethod", options.step),
        ))
        .test(
            TestMethod::new(
                "anotherRepeatedMethod",
                looping("anotherRepeatedMethod", options.step),
            )
            .repeat(3),
        );

    Ok(Box::new(ClassRunner::new(class)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::run_suite;
    use std::time::Duration;

    #[test]
    fn test_method_repeat_overrides_class_default() {
        let options = SuiteOptions::default().with_step(Duration::from_millis(1));
        let runner = repeated(&options).unwrap();

        assert_eq!(
            runner.children(),
            vec![
                "Repeated.repeatedMethod[0]",
                "Repeated.repeatedMethod[1]",
                "Repeated.anotherRepeatedMethod[0]",
                "Repeated.anotherRepeatedMethod[1]",
                "Repeated.anotherRepeatedMethod[2]",
            ]
        );

        let summary = run_suite(runner.as_ref(), 1).unwrap();
        assert_eq!(summary.passed, 5);
    }
}
