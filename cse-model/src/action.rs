//! `<ACTR>`/`<DEPR>` evaluation-criteria types and evaluation logic (§3,
//! §4.6), grounded on the reference CSE's `acme/resources/ACTR.py` and
//! `acme/resources/DEPR.py`.

use crate::types::EvalCriteriaOperator;
use serde_json::Value;

/// `evc`/`ecp` evaluation criteria: compare the current value of `sbjt` on
/// the subject resource against `thld` using `optr` (reference:
/// `ACTR._checkThreshold`, `ACTR._checkOperator`).
#[derive(Debug, Clone)]
pub struct EvalCriteria {
    pub subject_attribute: String,
    pub threshold: Value,
    pub operator: EvalCriteriaOperator,
}

impl EvalCriteria {
    /// Evaluate the criteria against the subject attribute's current value.
    /// Returns `None` if the threshold and current value are not
    /// comparable (reference rejects at validation time; this mirrors that
    /// by refusing to silently coerce).
    pub fn evaluate(&self, current: &Value) -> Option<bool> {
        use EvalCriteriaOperator::*;
        let (a, b) = (as_f64(current)?, as_f64(&self.threshold)?);
        Some(match self.operator {
            Equal => a == b,
            NotEqual => a != b,
            GreaterThan => a > b,
            LessThan => a < b,
            GreaterThanEqual => a >= b,
            LessThanEqual => a <= b,
        })
    }
}

fn as_f64(v: &Value) -> Option<f64> {
    v.as_f64().or_else(|| v.as_i64().map(|n| n as f64)).or_else(|| v.as_u64().map(|n| n as f64))
}

/// `apv` action-to-perform: the request this action issues once its
/// criteria are met (reference: `ACTR._doActivate`, `apv.op/apv.to/apv.fr`).
#[derive(Debug, Clone)]
pub struct ActionToPerform {
    pub operation: i32,
    pub target: String,
    pub originator: String,
    pub content: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn greater_than_operator_compares_numerically() {
        let ec = EvalCriteria {
            subject_attribute: "cbs".into(),
            threshold: json!(1000),
            operator: EvalCriteriaOperator::GreaterThan,
        };
        assert_eq!(ec.evaluate(&json!(1500)), Some(true));
        assert_eq!(ec.evaluate(&json!(500)), Some(false));
    }

    #[test]
    fn non_numeric_values_refuse_to_evaluate() {
        let ec = EvalCriteria {
            subject_attribute: "cbs".into(),
            threshold: json!(1000),
            operator: EvalCriteriaOperator::Equal,
        };
        assert_eq!(ec.evaluate(&json!("not-a-number")), None);
    }
}
