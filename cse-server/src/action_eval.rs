//! `<ACTR>`/`<DEPR>` evaluation (§4.6), grounded on the reference CSE's
//! `ActionManager.evaluateActions` and `ACTR`/`DEPR` eval-criteria
//! handling, built on [`cse_model::EvalCriteria`]/[`cse_model::ActionToPerform`].
//!
//! Cadence (`evm`): `Once` fires the first time its criteria hold, then
//! persists `evm=0` (off) so it never fires again; `Periodic` fires on
//! every tick its criteria hold (gated by any `<SCH>` child, §4.6
//! "Schedule gating"); `Continuous` fires once per false-to-true
//! transition. A `<DEPR>` child with `sfc=true` must hold its own
//! criteria at the same instant as its `<ACTR>`; one with `sfc=false`
//! only needs to have ever held since the action was armed.

use std::sync::Arc;
use std::time::Duration;

use cse_core::ids::IdAllocator;
use cse_dispatcher::{Dispatcher, Request};
use cse_model::{ActionToPerform, EvalCriteria, EvalCriteriaOperator, EvalMode, Operation, Resource, ResourceType};
use cse_scheduler::{schedule_window, ScheduleConfig, ScheduledTask, Scheduler};
use cse_storage::Store;
use dashmap::DashMap;
use serde_json::{json, Value};

const TICK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Default)]
struct ActrState {
    last_result: Option<bool>,
    fired_once: bool,
}

pub struct ActionEvaluator {
    store: Arc<dyn Store>,
    dispatcher: Arc<Dispatcher>,
    ids: IdAllocator,
    actr_state: DashMap<String, ActrState>,
    depr_ever_true: DashMap<String, bool>,
}

impl ActionEvaluator {
    pub fn new(store: Arc<dyn Store>, dispatcher: Arc<Dispatcher>) -> Arc<Self> {
        Arc::new(Self {
            store,
            dispatcher,
            ids: IdAllocator::new(),
            actr_state: DashMap::new(),
            depr_ever_true: DashMap::new(),
        })
    }

    pub fn spawn(self: Arc<Self>, scheduler: &Scheduler) {
        scheduler.spawn(ScheduledTask::new("action-evaluator", ScheduleConfig::Interval(TICK_INTERVAL), move || {
            let this = self.clone();
            async move { this.tick().await }
        }));
    }

    async fn tick(&self) {
        let Ok(actions) = self.store.resources_by_type(ResourceType::Actr).await else {
            tracing::warn!("action evaluator: failed to list <ACTR> resources");
            return;
        };

        for actr in actions {
            self.evaluate_one(actr).await;
        }
    }

    async fn evaluate_one(&self, actr: Resource) {
        let Some(evm) = actr.get_attr("evm").and_then(Value::as_i64).and_then(eval_mode_from_i64) else {
            return;
        };
        if evm == EvalMode::Off {
            return;
        }

        let Some(subject_ri) = actr.get_attr("sbjt").and_then(Value::as_str) else {
            return;
        };
        let Some(criteria) = actr.get_attr("ecp").and_then(parse_eval_criteria) else {
            return;
        };
        let Ok(Some(subject)) = self.store.get_by_ri(subject_ri).await else {
            return;
        };
        let Some(current) = subject.get_attr(&criteria.subject_attribute) else {
            return;
        };
        let Some(own_satisfied) = criteria.evaluate(current) else {
            return;
        };

        if evm == EvalMode::Periodic && !self.schedule_allows(&actr).await {
            return;
        }

        let dependencies_satisfied = self.dependencies_satisfied(&actr).await;
        let satisfied = own_satisfied && dependencies_satisfied;

        let should_fire = match evm {
            EvalMode::Off => false,
            EvalMode::Once => {
                let mut state = self.actr_state.entry(actr.ri.clone()).or_default();
                satisfied && !state.fired_once
            }
            EvalMode::Periodic => satisfied,
            EvalMode::Continuous => {
                let mut state = self.actr_state.entry(actr.ri.clone()).or_default();
                let was_satisfied = state.last_result.unwrap_or(false);
                state.last_result = Some(satisfied);
                satisfied && !was_satisfied
            }
        };

        if !should_fire {
            return;
        }

        let Some(action) = actr.get_attr("apv").and_then(parse_action_to_perform) else {
            return;
        };
        self.fire(&actr, &action).await;

        if evm == EvalMode::Once {
            self.actr_state.entry(actr.ri.clone()).or_default().fired_once = true;
            self.disable(&actr).await;
        }
    }

    /// Any `<SCH>` child gates a `Periodic` action's cadence; absent one,
    /// periodic evaluation runs unrestricted on every tick.
    async fn schedule_allows(&self, actr: &Resource) -> bool {
        let children = self.store.children_of(&actr.ri).await.unwrap_or_default();
        let entries: Vec<String> = children
            .iter()
            .filter(|c| c.ty == ResourceType::Sch)
            .filter_map(|c| c.get_attr("se"))
            .filter_map(|v| v.as_array())
            .flat_map(|arr| arr.iter().filter_map(|s| s.as_str().map(str::to_string)))
            .collect();
        schedule_window::is_active(&entries, cse_core::time::now())
    }

    async fn dependencies_satisfied(&self, actr: &Resource) -> bool {
        let children = self.store.children_of(&actr.ri).await.unwrap_or_default();
        for depr in children.into_iter().filter(|c| c.ty == ResourceType::Depr) {
            if !self.depr_satisfied(&depr).await {
                return false;
            }
        }
        true
    }

    async fn depr_satisfied(&self, depr: &Resource) -> bool {
        let Some(subject_ri) = depr.get_attr("rri").and_then(Value::as_str) else {
            return false;
        };
        let Some(criteria) = depr.get_attr("evc").and_then(parse_eval_criteria) else {
            return false;
        };
        let sequential = depr.get_attr("sfc").and_then(Value::as_bool).unwrap_or(false);

        let Ok(Some(subject)) = self.store.get_by_ri(subject_ri).await else {
            return false;
        };
        let Some(current) = subject.get_attr(&criteria.subject_attribute) else {
            return false;
        };
        let holds = criteria.evaluate(current).unwrap_or(false);

        if sequential {
            return holds;
        }

        if holds {
            self.depr_ever_true.insert(depr.ri.clone(), true);
        }
        self.depr_ever_true.get(&depr.ri).map(|v| *v).unwrap_or(false)
    }

    async fn fire(&self, actr: &Resource, action: &ActionToPerform) {
        let Some(op) = operation_from_i32(action.operation) else {
            tracing::warn!(ri = %actr.ri, op = action.operation, "unsupported apv.op");
            return;
        };

        let mut request = Request::new(op, action.target.clone(), action.originator.clone(), self.ids.new_rqi());
        request.content = action.content.clone();

        let response = self.dispatcher.dispatch(request).await;
        tracing::info!(ri = %actr.ri, target = %action.target, rsc = ?response.rsc, "action fired");
    }

    async fn disable(&self, actr: &Resource) {
        let mut updated = actr.clone();
        updated.set_attr("evm", json!(EvalMode::Off as i32));
        updated.touch();
        if let Err(err) = self.store.update_resource(updated).await {
            tracing::warn!(ri = %actr.ri, error = %err, "failed to disable one-shot action");
        }
    }
}

fn parse_eval_criteria(value: &Value) -> Option<EvalCriteria> {
    let subject_attribute = value.get("sbjt")?.as_str()?.to_string();
    let threshold = value.get("thld")?.clone();
    let operator = value.get("optr")?.as_i64().and_then(eval_operator_from_i64)?;
    Some(EvalCriteria { subject_attribute, threshold, operator })
}

fn parse_action_to_perform(value: &Value) -> Option<ActionToPerform> {
    Some(ActionToPerform {
        operation: value.get("op")?.as_i64()? as i32,
        target: value.get("to")?.as_str()?.to_string(),
        originator: value.get("fr")?.as_str().unwrap_or("CAdmin").to_string(),
        content: value.get("in").cloned(),
    })
}

fn eval_mode_from_i64(n: i64) -> Option<EvalMode> {
    use EvalMode::*;
    Some(match n {
        0 => Off,
        1 => Once,
        2 => Periodic,
        3 => Continuous,
        _ => return None,
    })
}

fn eval_operator_from_i64(n: i64) -> Option<EvalCriteriaOperator> {
    use EvalCriteriaOperator::*;
    Some(match n {
        1 => Equal,
        2 => NotEqual,
        3 => GreaterThan,
        4 => LessThan,
        5 => GreaterThanEqual,
        6 => LessThanEqual,
        _ => return None,
    })
}

fn operation_from_i32(n: i32) -> Option<Operation> {
    use Operation::*;
    Some(match n {
        1 => Create,
        2 => Retrieve,
        3 => Update,
        4 => Delete,
        5 => Notify,
        _ => return None,
    })
}
