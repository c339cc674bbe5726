use crate::value::Value;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Name → value bindings used while resolving a document.
///
/// Child scopes copy their parent and add bindings; a parent is never
/// mutated through a child.
#[derive(Debug, Clone, Default)]
pub struct VariableScope {
    bindings: Rc<BTreeMap<String, Value>>,
}

impl VariableScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bindings<I, K>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self { bindings: Rc::new(bindings.into_iter().map(|(k, v)| (k.into(), v)).collect()) }
    }

    /// Looks a binding up by name. `a.b` reads field `b` of binding `a`
    /// when no binding is literally named `a.b`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.bindings.get(name) {
            return Some(value);
        }
        let (root, path) = name.split_once('.')?;
        path.split('.').try_fold(self.bindings.get(root)?, |value, segment| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|index| items.get(index)),
            _ => None,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// A new scope holding every binding of `self` plus `name`.
    pub fn extend(&self, name: impl Into<String>, value: Value) -> Self {
        let mut bindings = (*self.bindings).clone();
        bindings.insert(name.into(), value);
        Self { bindings: Rc::new(bindings) }
    }

    pub fn extend_many<I, K>(&self, extra: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut bindings = (*self.bindings).clone();
        for (name, value) in extra {
            bindings.insert(name.into(), value);
        }
        Self { bindings: Rc::new(bindings) }
    }

    /// Replaces a binding in place. Only the owner of a root scope does this
    /// (runtime `SetVariable`); clones taken earlier keep their snapshot.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        Rc::make_mut(&mut self.bindings).insert(name.into(), value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.bindings.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn child_scope_does_not_touch_parent() {
        let parent = VariableScope::with_bindings([("title", json!("Main"))]);
        let child = parent.extend("i", json!(2)).extend("title", json!("Loop"));
        assert_eq!(parent.get("title"), Some(&json!("Main")));
        assert!(parent.get("i").is_none());
        assert_eq!(child.get("title"), Some(&json!("Loop")));
        assert_eq!(child.get("i"), Some(&json!(2)));
    }

    #[test]
    fn set_leaves_earlier_snapshots_alone() {
        let mut root = VariableScope::new();
        root.set("count", json!(1));
        let snapshot = root.clone();
        root.set("count", json!(2));
        assert_eq!(snapshot.get("count"), Some(&json!(1)));
        assert_eq!(root.get("count"), Some(&json!(2)));
    }

    #[test]
    fn dotted_names_read_nested_fields() {
        let scope = VariableScope::with_bindings([("entry", json!({"label": "Play", "tags": ["a", "b"]}))]);
        assert_eq!(scope.get("entry.label"), Some(&json!("Play")));
        assert_eq!(scope.get("entry.tags.1"), Some(&json!("b")));
        assert!(scope.get("entry.missing").is_none());
        assert!(!scope.contains("other.label"));
    }
}
