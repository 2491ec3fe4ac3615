use std::collections::{HashMap, VecDeque};

use crate::aggregate::RequestContext;
use crate::condition::{ConditionResult, evaluate_condition, placeholder_name, placeholder_regex};
use crate::spec::form::{ConditionKind, ConditionSpec, FormSpec};
use crate::state::{FormState, Visibility};

/// One applied condition effect.
#[derive(Debug, Clone)]
pub struct TriggerOutcome {
    pub target: String,
    pub kind: ConditionKind,
    pub visible: bool,
    /// Whether the target's annotation actually flipped.
    pub changed: bool,
    pub condition: ConditionResult,
}

/// Re-runs conditions on input events and applies show/hide effects.
///
/// Each evaluation carries a monotonically increasing sequence number so a
/// stale result can never overwrite a newer one for the same target. With
/// `apply` running every evaluation synchronously, results land in issue
/// order and the guard never fires; it only matters when a host defers or
/// interleaves evaluations (for example by completing them out of order on
/// an event queue). A
/// field-to-condition dependency index prunes per-event rescans; flipped
/// targets re-enqueue their dependents, so the reachable fixed point
/// matches a naive re-evaluate-everything loop.
pub struct TriggerEngine {
    conditions: Vec<ConditionSpec>,
    /// Referenced field id -> indices of conditions mentioning it.
    index: HashMap<String, Vec<usize>>,
    next_seq: u64,
    applied: HashMap<String, u64>,
}

impl TriggerEngine {
    pub fn new(spec: &FormSpec) -> Self {
        let conditions: Vec<ConditionSpec> = spec
            .all_conditions()
            .into_iter()
            .cloned()
            .collect();

        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, condition) in conditions.iter().enumerate() {
            for found in placeholder_regex().find_iter(&condition.expression) {
                let name = placeholder_name(found.as_str());
                if let Some(field) = spec.field_by_name(name) {
                    let entries = index.entry(field.id.clone()).or_default();
                    if !entries.contains(&position) {
                        entries.push(position);
                    }
                }
            }
        }

        Self {
            conditions,
            index,
            next_seq: 0,
            applied: HashMap::new(),
        }
    }

    /// Evaluate every condition once, in document order. Used on initial
    /// render and before submission.
    pub fn run_all(
        &mut self,
        spec: &FormSpec,
        state: &mut FormState,
        ctx: &RequestContext,
    ) -> Vec<TriggerOutcome> {
        let mut outcomes = Vec::new();
        for position in 0..self.conditions.len() {
            if let Some(outcome) = self.apply(position, spec, state, ctx) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// React to a value-changing interaction on one field: evaluate the
    /// conditions referencing it, cascading into conditions that reference
    /// any target whose visibility flipped.
    pub fn process_event(
        &mut self,
        changed_field: &str,
        spec: &FormSpec,
        state: &mut FormState,
        ctx: &RequestContext,
    ) -> Vec<TriggerOutcome> {
        let field_id = spec
            .field_by_name(changed_field)
            .map(|field| field.id.clone())
            .unwrap_or_else(|| changed_field.to_string());

        let mut queue: VecDeque<usize> = self
            .index
            .get(&field_id)
            .into_iter()
            .flatten()
            .copied()
            .collect();
        let mut outcomes = Vec::new();
        // Oscillating condition pairs would otherwise loop forever within
        // one event.
        let budget = self.conditions.len() + 1;
        let mut evaluations: HashMap<usize, usize> = HashMap::new();

        while let Some(position) = queue.pop_front() {
            let count = evaluations.entry(position).or_insert(0);
            if *count >= budget {
                continue;
            }
            *count += 1;

            let Some(outcome) = self.apply(position, spec, state, ctx) else {
                continue;
            };
            if outcome.changed
                && let Some(dependents) = self.index.get(&outcome.target)
            {
                queue.extend(dependents.iter().copied());
            }
            outcomes.push(outcome);
        }
        outcomes
    }

    fn apply(
        &mut self,
        position: usize,
        spec: &FormSpec,
        state: &mut FormState,
        ctx: &RequestContext,
    ) -> Option<TriggerOutcome> {
        let seq = self.next_seq;
        self.next_seq += 1;

        let condition = self.conditions[position].clone();
        let result = evaluate_condition(&condition.expression, spec, state, ctx);

        // Stale-result guard: a later evaluation already applied to this
        // target, so this result is discarded. Unreachable while apply
        // runs synchronously in issue order.
        if self
            .applied
            .get(&condition.target)
            .is_some_and(|last| *last > seq)
        {
            return None;
        }
        self.applied.insert(condition.target.clone(), seq);

        let visible = match condition.kind {
            ConditionKind::Show => result.result,
            ConditionKind::Hide => !result.result,
        };
        let annotation = if visible {
            Visibility::Shown
        } else {
            Visibility::Hidden
        };
        let previous = state.visibility_of(&condition.target);
        state.set_visibility(&condition.target, annotation);

        Some(TriggerOutcome {
            target: condition.target,
            kind: condition.kind,
            visible,
            changed: previous != annotation,
            condition: result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec_with_conditions() -> FormSpec {
        serde_json::from_value(json!({
            "id": "f",
            "fields": [
                { "id": "switch", "type": "text" },
                { "id": "details", "type": "text" },
                { "id": "extra", "type": "text" }
            ],
            "conditions": [
                { "target": "details", "kind": "show", "expression": "{switch} === \"on\"" },
                { "target": "extra", "kind": "hide", "expression": "{details} === \"\"" }
            ]
        }))
        .expect("spec")
    }

    #[test]
    fn show_condition_annotates_target() {
        let spec = spec_with_conditions();
        let mut state = FormState::default();
        state.field_mut("switch").values = vec!["on".into()];

        let mut engine = TriggerEngine::new(&spec);
        let outcomes = engine.run_all(&spec, &mut state, &RequestContext::default());

        assert_eq!(outcomes.len(), 2);
        assert_eq!(state.visibility_of("details"), Visibility::Shown);
        assert!(outcomes[0].visible);
    }

    #[test]
    fn hide_condition_inverts_result() {
        let spec = spec_with_conditions();
        let mut state = FormState::default();
        // details is empty, so the hide condition is true and extra hides.
        let mut engine = TriggerEngine::new(&spec);
        engine.run_all(&spec, &mut state, &RequestContext::default());
        assert_eq!(state.visibility_of("extra"), Visibility::Hidden);
    }

    #[test]
    fn event_processing_cascades_through_flipped_targets() {
        let spec: FormSpec = serde_json::from_value(json!({
            "id": "f",
            "fields": [
                { "id": "a", "type": "text" },
                { "id": "b", "type": "text" },
                { "id": "c", "type": "text" }
            ],
            "conditions": [
                { "target": "b", "kind": "show", "expression": "{a} === \"1\"" },
                { "target": "c", "kind": "show", "expression": "{b} === \"yes\"" }
            ]
        }))
        .expect("spec");

        let mut state = FormState::default();
        state.field_mut("a").values = vec!["1".into()];
        state.field_mut("b").values = vec!["yes".into()];

        let mut engine = TriggerEngine::new(&spec);
        let outcomes = engine.process_event("a", &spec, &mut state, &RequestContext::default());

        // The event on `a` shows `b`; the flip cascades into the condition
        // watching `b`, which shows `c` without a second event.
        assert!(outcomes.iter().any(|outcome| outcome.target == "c"));
        assert_eq!(state.visibility_of("b"), Visibility::Shown);
        assert_eq!(state.visibility_of("c"), Visibility::Shown);
    }

    #[test]
    fn unindexed_field_event_is_a_no_op() {
        let spec = spec_with_conditions();
        let mut state = FormState::default();
        let mut engine = TriggerEngine::new(&spec);
        let outcomes = engine.process_event("unrelated", &spec, &mut state, &RequestContext::default());
        assert!(outcomes.is_empty());
    }
}
