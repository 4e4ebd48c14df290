//! Environment variable overrides

use std::env;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "CONCURRENT_RUNNER";

/// Settings read from `CONCURRENT_RUNNER_*` variables
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvConfig {
    /// CONCURRENT_RUNNER_THREADS
    pub threads: Option<u32>,
    /// CONCURRENT_RUNNER_ROUNDS
    pub rounds: Option<u32>,
    /// CONCURRENT_RUNNER_FORMAT
    pub format: Option<String>,
    /// CONCURRENT_RUNNER_LOG
    pub log_level: Option<String>,
    /// CONCURRENT_RUNNER_CONFIG
    pub config_file: Option<String>,
    /// CONCURRENT_RUNNER_ENDPOINT
    pub endpoint: Option<String>,
}

impl EnvConfig {
    pub fn load() -> Self {
        Self {
            threads: get_env_parse("THREADS"),
            rounds: get_env_parse("ROUNDS"),
            format: get_env("FORMAT"),
            log_level: get_env("LOG"),
            config_file: get_env("CONFIG"),
            endpoint: get_env("ENDPOINT"),
        }
    }

    pub fn has_any(&self) -> bool {
        *self != Self::default()
    }

    pub fn print_summary(&self) {
        println!("Environment Configuration:");
        println!("  {}_THREADS:  {:?}", ENV_PREFIX, self.threads);
        println!("  {}_ROUNDS:   {:?}", ENV_PREFIX, self.rounds);
        println!("  {}_FORMAT:   {:?}", ENV_PREFIX, self.format);
        println!("  {}_LOG:      {:?}", ENV_PREFIX, self.log_level);
        println!("  {}_CONFIG:   {:?}", ENV_PREFIX, self.config_file);
        println!("  {}_ENDPOINT: {:?}", ENV_PREFIX, self.endpoint);
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}_{name}"))
        .ok()
        .filter(|v| !v.is_empty())
}

fn get_env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    get_env(name).and_then(|v| v.parse().ok())
}

/// Sets `CONCURRENT_RUNNER_*` variables, mostly for tests
#[derive(Default)]
pub struct EnvBuilder {
    vars: Vec<(String, String)>,
}

impl EnvBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn var(mut self, name: &str, value: impl ToString) -> Self {
        self.vars.push((format!("{ENV_PREFIX}_{name}"), value.to_string()));
        self
    }

    pub fn threads(self, threads: u32) -> Self {
        self.var("THREADS", threads)
    }

    pub fn rounds(self, rounds: u32) -> Self {
        self.var("ROUNDS", rounds)
    }

    pub fn format(self, format: &str) -> Self {
        self.var("FORMAT", format)
    }

    pub fn log_level(self, level: &str) -> Self {
        self.var("LOG", level)
    }

    pub fn config_file(self, path: &str) -> Self {
        self.var("CONFIG", path)
    }

    pub fn endpoint(self, endpoint: &str) -> Self {
        self.var("ENDPOINT", endpoint)
    }

    pub fn apply(self) {
        for (key, value) in &self.vars {
            env::set_var(key, value);
        }
    }

    /// Apply and return a guard that restores the previous values on drop
    pub fn apply_scoped(self) -> EnvGuard {
        let previous = self
            .vars
            .iter()
            .map(|(k, _)| (k.clone(), env::var(k).ok()))
            .collect();

        self.apply();

        EnvGuard { previous }
    }
}

/// Restores environment variables on drop
pub struct EnvGuard {
    previous: Vec<(String, Option<String>)>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in &self.previous {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

pub fn print_env_help() {
    println!("Environment Variables:");
    println!();
    println!("  {ENV_PREFIX}_THREADS    Worker threads for every suite");
    println!("  {ENV_PREFIX}_ROUNDS     Number of rounds per run");
    println!("  {ENV_PREFIX}_FORMAT     Output format (table, json, json-pretty, csv, summary)");
    println!("  {ENV_PREFIX}_LOG        Log level (trace, debug, info, warn, error)");
    println!("  {ENV_PREFIX}_CONFIG     Path to configuration file");
    println!("  {ENV_PREFIX}_ENDPOINT   Remote test endpoint URL");
    println!();
    println!("Example:");
    println!("  export {ENV_PREFIX}_THREADS=5");
    println!("  concurrent-runner run missing-sync --rounds 20");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests in this module mutate process-wide state
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_env_builder() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvBuilder::new()
            .threads(5)
            .rounds(20)
            .format("csv")
            .endpoint("http://localhost:8080/testrunner")
            .apply_scoped();

        let config = EnvConfig::load();
        assert_eq!(config.threads, Some(5));
        assert_eq!(config.rounds, Some(20));
        assert_eq!(config.format.as_deref(), Some("csv"));
        assert_eq!(
            config.endpoint.as_deref(),
            Some("http://localhost:8080/testrunner")
        );
        assert!(config.has_any());
    }

    #[test]
    fn test_guard_restores_previous_values() {
        let _lock = ENV_LOCK.lock().unwrap();
        let key = format!("{ENV_PREFIX}_LOG");
        {
            let _guard = EnvBuilder::new().log_level("debug").apply_scoped();
            assert_eq!(env::var(&key).ok().as_deref(), Some("debug"));
        }
        assert!(env::var(&key).is_err());
    }

    #[test]
    fn test_unparsable_values_are_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        let _guard = EnvBuilder::new().var("THREADS", "many").apply_scoped();
        assert_eq!(EnvConfig::load().threads, None);
    }

    #[test]
    fn test_default_is_empty() {
        assert!(!EnvConfig::default().has_any());
    }
}
