//! Schedulable units and repeat expansion

use std::fmt;

use crate::models::Repeat;

/// Identity of one schedulable invocation of a test method
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UnitId {
    pub method: String,
    /// Repeat index; `None` when the method is not repeated
    pub index: Option<u32>,
}

impl UnitId {
    pub fn single(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            index: None,
        }
    }

    pub fn repeated(method: impl Into<String>, index: u32) -> Self {
        Self {
            method: method.into(),
            index: Some(index),
        }
    }

    /// `method` or `method[index]`
    pub fn display_name(&self) -> String {
        match self.index {
            Some(index) => format!("{}[{}]", self.method, index),
            None => self.method.clone(),
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Expand a method into its units.
///
/// The method directive wins over the class default. Without either the method
/// yields one undecorated unit; with `n` it yields `n` indexed units in
/// ascending order, and `n = 0` yields none.
pub fn expand(method: &str, method_repeat: Option<Repeat>, class_default: Option<Repeat>) -> Vec<UnitId> {
    match method_repeat.or(class_default) {
        None => vec![UnitId::single(method)],
        Some(repeat) => (0..repeat.times)
            .map(|index| UnitId::repeated(method, index))
            .collect(),
    }
}

type Action = Box<dyn FnOnce() + Send + 'static>;

/// One invocation of one test method, consumed when it runs
pub struct TestUnit {
    id: UnitId,
    action: Action,
}

impl TestUnit {
    pub fn new(id: UnitId, action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            id,
            action: Box::new(action),
        }
    }

    pub fn id(&self) -> &UnitId {
        &self.id
    }

    pub fn name(&self) -> String {
        self.id.display_name()
    }

    pub fn run(self) {
        (self.action)()
    }
}

impl fmt::Debug for TestUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestUnit").field("id", &self.id).finish()
    }
}
