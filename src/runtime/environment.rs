use crate::runtime::{
    error::{RuntimeError, RuntimeResult},
    value::Value,
};
use std::collections::HashMap;

/// A call-frame snapshot: the entire binding map as it was when taken.
pub struct Snapshot {
    bindings: HashMap<String, Value>,
}

/// Flat name-to-value bindings for the executing frame. There are no nested
/// scopes: a call frame is made by snapshotting the whole map, binding
/// parameters over it, and swapping the snapshot back afterwards.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    bindings: HashMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> RuntimeResult<Value> {
        self.bindings
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.bindings.insert(name.into(), value);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            bindings: self.bindings.clone(),
        }
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.bindings = snapshot.bindings;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let mut env = Environment::new();
        env.set("x", Value::Number(4.0));
        assert!(matches!(env.get("x"), Ok(Value::Number(v)) if v == 4.0));
    }

    #[test]
    fn get_of_missing_name_fails() {
        let env = Environment::new();
        assert!(matches!(
            env.get("missing"),
            Err(RuntimeError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn set_overwrites_existing_binding() {
        let mut env = Environment::new();
        env.set("x", Value::Number(1.0));
        env.set("x", Value::Number(2.0));
        assert!(matches!(env.get("x"), Ok(Value::Number(v)) if v == 2.0));
    }

    #[test]
    fn restore_discards_changes_made_after_snapshot() {
        let mut env = Environment::new();
        env.set("kept", Value::Number(1.0));
        let snapshot = env.snapshot();
        env.set("kept", Value::Number(9.0));
        env.set("temp", Value::Number(2.0));
        env.restore(snapshot);
        assert!(matches!(env.get("kept"), Ok(Value::Number(v)) if v == 1.0));
        assert!(!env.contains("temp"));
    }
}
