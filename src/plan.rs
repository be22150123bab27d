//! Schema-driven planning for resources.
//!
//! A plan compares prior and proposed state attribute by attribute. Only
//! attributes the practitioner can set take part in the diff; computed-only
//! attributes are reset to unknown whenever the resource will be created or
//! changed, because the controller assigns them during apply.

use serde_json::Value;

use crate::schema::{Block, BlockNestingMode, Schema};
use crate::types::{AttributeChange, PlanResult};
use crate::value::unknown;

/// Plan a resource change.
///
/// - `prior == None`: create; every configured attribute is an addition.
/// - `proposed` null: destroy; the planned state is null.
/// - otherwise: update; replacement is required when any changed attribute
///   is marked force-new. An update with no changes keeps the prior state.
pub fn plan_resource(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let mut diff = Diff::default();
    let before = prior.unwrap_or(&Value::Null);
    diff.block(&schema.block, before, proposed, "");

    if proposed.is_null() {
        return PlanResult::with_changes(Value::Null, diff.changes, false);
    }

    if prior.is_some() && diff.changes.is_empty() {
        return PlanResult::no_change(before.clone());
    }

    let mut planned = proposed.clone();
    mark_computed_unknown(&schema.block, &mut planned);
    let requires_replace = prior.is_some() && diff.requires_replace;
    PlanResult::with_changes(planned, diff.changes, requires_replace)
}

#[derive(Default)]
struct Diff {
    changes: Vec<AttributeChange>,
    requires_replace: bool,
}

impl Diff {
    fn block(&mut self, block: &Block, prior: &Value, proposed: &Value, prefix: &str) {
        for (name, attr) in &block.attributes {
            if attr.flags.is_computed_only() {
                continue;
            }
            if self.compare(prior, proposed, name, prefix) && attr.force_new {
                self.requires_replace = true;
            }
        }

        for (name, nested) in &block.blocks {
            match nested.nesting_mode {
                BlockNestingMode::Single => {
                    let prior = prior.get(name).unwrap_or(&Value::Null);
                    let proposed = proposed.get(name).unwrap_or(&Value::Null);
                    self.block(&nested.block, prior, proposed, &join(prefix, name));
                },
                BlockNestingMode::List => {
                    self.compare(prior, proposed, name, prefix);
                },
            }
        }
    }

    /// Record a change for `name` if it differs; returns whether it did.
    fn compare(&mut self, prior: &Value, proposed: &Value, name: &str, prefix: &str) -> bool {
        let before = present(prior, name);
        let after = present(proposed, name);
        if before == after {
            return false;
        }
        self.changes.push(AttributeChange::new(
            join(prefix, name),
            before.cloned(),
            after.cloned(),
        ));
        true
    }
}

fn present<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value.get(name).filter(|v| !v.is_null())
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn mark_computed_unknown(block: &Block, value: &mut Value) {
    let Some(object) = value.as_object_mut() else {
        return;
    };
    for (name, attr) in &block.attributes {
        if attr.flags.is_computed_only() {
            object.insert(name.clone(), unknown());
        }
    }
    for (name, nested) in &block.blocks {
        if nested.nesting_mode == BlockNestingMode::Single {
            if let Some(child) = object.get_mut(name) {
                mark_computed_unknown(&nested.block, child);
            }
        }
    }
}
