use crate::predicate::ConditionSet;
use crate::value::{field, field_str, Value};
use std::rc::Rc;

/// One named operation with its parameters and optional guard.
#[derive(Clone, Debug, PartialEq)]
pub struct Action {
    pub name: String,
    pub params: Value,
    pub guard: ConditionSet,
}

impl Action {
    pub fn new(name: impl Into<String>, params: Value) -> Self {
        Self { name: name.into(), params, guard: ConditionSet::default() }
    }

    pub fn guarded(mut self, guard: ConditionSet) -> Self {
        self.guard = guard;
        self
    }

    /// Parses an action node. Returns `None` when the node has no name.
    pub fn from_value(node: &Value) -> Option<Self> {
        let map = node.as_object()?;
        let name = field_str(map, &["name", "type", "action"])?;
        let params = field(map, &["params", "settings", "parameters"]).cloned().unwrap_or(Value::Null);
        let guard = field(map, &["guard", "condition", "conditions"])
            .map(ConditionSet::from_value)
            .unwrap_or_default();
        Some(Self { name: name.to_string(), params, guard })
    }
}

/// Ordered sibling actions. Cheap to clone so a list can be executed while
/// the runtime that owns it is mutated.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionList {
    actions: Rc<Vec<Action>>,
}

impl ActionList {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions: Rc::new(actions) }
    }

    pub fn single(name: impl Into<String>, params: Value) -> Self {
        Self::new(vec![Action::new(name, params)])
    }

    /// Accepts a single action node or (nested) arrays of them. `null`
    /// yields an empty list; unnamed nodes are skipped.
    pub fn from_value(node: &Value) -> Self {
        let mut actions = Vec::new();
        collect(node, &mut actions);
        Self::new(actions)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|action| action.name.as_str())
    }

    pub fn then(&self, other: &ActionList) -> ActionList {
        let mut combined = (*self.actions).clone();
        combined.extend(other.iter().cloned());
        Self::new(combined)
    }
}

fn collect(node: &Value, out: &mut Vec<Action>) {
    match node {
        Value::Array(items) => {
            for item in items {
                collect(item, out);
            }
        }
        Value::Object(_) => match Action::from_value(node) {
            Some(action) => out.push(action),
            None => tracing::warn!("skipping action node without a name: {node}"),
        },
        Value::String(name) if !name.is_empty() => out.push(Action::new(name.clone(), Value::Null)),
        _ => {}
    }
}
