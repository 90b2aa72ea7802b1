//! Startup-built tables shared, read-only, by the translator and the
//! dispatcher.

use crate::chord::VariableTable;
use crate::command::Command;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Error returned by a registered function.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FunctionError(pub String);

/// A callback reachable through `func <key>` commands.
pub type Function = Arc<dyn Fn() -> Result<(), FunctionError> + Send + Sync>;

/// Callbacks keyed by the value of their `func` command.
#[derive(Clone, Default)]
pub struct FunctionTable {
    entries: HashMap<String, Function>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `f` under `key` and return the command that invokes it.
    ///
    /// A later registration under the same key replaces the earlier one.
    pub fn register<F>(&mut self, key: impl Into<String>, f: F) -> Command
    where
        F: Fn() -> Result<(), FunctionError> + Send + Sync + 'static,
    {
        let key = key.into();
        let cmd = Command::func(&key);
        self.entries.insert(key, Arc::new(f));
        cmd
    }

    pub fn get(&self, key: &str) -> Option<&Function> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for FunctionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("FunctionTable").field("keys", &keys).finish()
    }
}

/// Everything the runtime needs that is fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct RuntimeContext {
    pub variables: VariableTable,
    pub functions: FunctionTable,
}

impl RuntimeContext {
    pub fn new(variables: VariableTable, functions: FunctionTable) -> Self {
        Self {
            variables,
            functions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn register_returns_matching_func_command() {
        let mut table = FunctionTable::new();
        let cmd = table.register("7", || Ok(()));
        assert_eq!(cmd, Command::func("7"));
        assert!(table.contains("7"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn registered_function_is_callable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut table = FunctionTable::new();
        let counter = Arc::clone(&calls);
        table.register("count", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let f = table.get("count").unwrap();
        f().unwrap();
        f().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(table.get("missing").is_none());
    }

    #[test]
    fn debug_lists_keys_only() {
        let mut table = FunctionTable::new();
        table.register("b", || Ok(()));
        table.register("a", || Err(FunctionError("nope".into())));
        assert_eq!(format!("{:?}", table), r#"FunctionTable { keys: ["a", "b"] }"#);
    }
}
