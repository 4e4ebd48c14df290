//! Field injection seam
//!
//! A runner calls its injector on every freshly constructed test instance
//! before the unit body runs. Exactly one injector is active per runner and
//! it is handed over when the runner is built.

use anyhow::Result;

/// Supplies dependencies to a test instance the runner constructed
pub trait Injector<T>: Send + Sync {
    fn inject_fields(&self, target: &mut T) -> Result<()>;
}

/// Leaves instances untouched
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInjection;

impl<T> Injector<T> for NoInjection {
    fn inject_fields(&self, _target: &mut T) -> Result<()> {
        Ok(())
    }
}

/// Adapts a closure into an [`Injector`]
pub struct FnInjector<F>(pub F);

impl<T, F> Injector<T> for FnInjector<F>
where
    F: Fn(&mut T) -> Result<()> + Send + Sync,
{
    fn inject_fields(&self, target: &mut T) -> Result<()> {
        (self.0)(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Library {
        repository: Option<String>,
    }

    #[test]
    fn test_no_injection() {
        let mut target = Library::default();
        NoInjection.inject_fields(&mut target).unwrap();
        assert!(target.repository.is_none());
    }

    #[test]
    fn test_fn_injector() {
        let injector = FnInjector(|lib: &mut Library| {
            lib.repository = Some("authors".to_string());
            Ok(())
        });
        let mut target = Library::default();
        injector.inject_fields(&mut target).unwrap();
        assert_eq!(target.repository.as_deref(), Some("authors"));
    }
}
