// Lenses: optional chart overlays gated by compatibility rules

use std::cmp::Ordering;
use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::dataset::DatasetDescriptor;
use crate::error::TransportError;
use crate::session::LensBackend;
use crate::workflow::WorkflowState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LensControl {
    #[serde(rename = "type")]
    pub kind: String,
    pub target: String,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    EqualTo,
    NotEqualTo,
    In,
    NotIn,
    GreaterThan,
    LessThan,
    GreaterThanOrEqualTo,
    LessThanOrEqualTo,
    /// Count list items matching `params`, then test the count with `expected`
    CountWhere,
    /// Filter list items matching `params`, then test the result size with `expected`
    FilterWhere,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityRule {
    /// Dot path into the evaluation context, e.g. `chart.type`
    pub fact: String,
    pub operator: RuleOperator,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub expected: Option<Box<CompatibilityRule>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LensConfig {
    pub id: String,
    pub name: String,
    pub description: String,
    /// All must pass for the lens to be offered
    pub compatibility: Vec<CompatibilityRule>,
    pub controls: Vec<LensControl>,
    pub lens_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartContext {
    #[serde(rename = "type")]
    pub chart_type: String,
    #[serde(default)]
    pub active_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetContext {
    pub columns: Vec<Value>,
    pub column_counts_by_dtype: BTreeMap<String, usize>,
}

/// What the rules are evaluated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    pub chart: ChartContext,
    pub dataset: DatasetContext,
}

impl EvaluationContext {
    pub fn new(state: &WorkflowState, dataset: &DatasetDescriptor) -> Self {
        let chart = ChartContext {
            chart_type: state.chart_type.map(|kind| kind.id().to_string()).unwrap_or_default(),
            active_columns: state.column_mapping.assigned_columns().map(str::to_string).collect(),
        };

        let mut column_counts_by_dtype = BTreeMap::new();
        let columns = dataset
            .columns
            .iter()
            .map(|col| {
                *column_counts_by_dtype.entry(col.dtype.clone()).or_insert(0) += 1;
                json!({
                    "name": col.name,
                    "dtype": col.dtype,
                    "kind": col.kind().to_string(),
                    "description": col.description,
                })
            })
            .collect();

        Self {
            chart,
            dataset: DatasetContext {
                columns,
                column_counts_by_dtype,
            },
        }
    }
}

/// Evaluates rules against a JSON view of a context.
pub struct RuleEvaluator {
    facts: Value,
}

impl RuleEvaluator {
    pub fn new(context: &EvaluationContext) -> Self {
        Self {
            facts: serde_json::to_value(context).unwrap_or(Value::Null),
        }
    }

    fn from_facts(facts: Value) -> Self {
        Self { facts }
    }

    /// Walk a dot path; `None` if any segment is missing or null
    pub fn resolve(&self, path: &str) -> Option<&Value> {
        let mut current = &self.facts;
        for key in path.split('.') {
            let Value::Object(map) = current else {
                tracing::warn!(key, path, "Cannot resolve key in a non-object fact");
                return None;
            };
            current = map.get(key)?;
            if current.is_null() {
                return None;
            }
        }
        Some(current)
    }

    pub fn evaluate(&self, rule: &CompatibilityRule) -> bool {
        let Some(fact) = self.resolve(&rule.fact) else {
            return false;
        };

        match rule.operator {
            RuleOperator::EqualTo => values_equal(fact, &rule.value),
            RuleOperator::NotEqualTo => !values_equal(fact, &rule.value),
            RuleOperator::In => match &rule.value {
                Value::Array(options) => options.iter().any(|v| values_equal(fact, v)),
                _ => false,
            },
            RuleOperator::NotIn => match &rule.value {
                Value::Array(options) => !options.iter().any(|v| values_equal(fact, v)),
                _ => false,
            },
            RuleOperator::GreaterThan => compare(fact, &rule.value) == Some(Ordering::Greater),
            RuleOperator::LessThan => compare(fact, &rule.value) == Some(Ordering::Less),
            RuleOperator::GreaterThanOrEqualTo => {
                matches!(compare(fact, &rule.value), Some(Ordering::Greater | Ordering::Equal))
            }
            RuleOperator::LessThanOrEqualTo => {
                matches!(compare(fact, &rule.value), Some(Ordering::Less | Ordering::Equal))
            }
            RuleOperator::CountWhere => self.nested(rule, "count"),
            RuleOperator::FilterWhere => self.nested(rule, "result"),
        }
    }

    /// Count matching list items and test the count with the nested rule
    fn nested(&self, rule: &CompatibilityRule, fact_name: &str) -> bool {
        let Some(Value::Array(items)) = self.resolve(&rule.fact) else {
            return false;
        };
        let Some(expected) = &rule.expected else {
            tracing::warn!(fact = %rule.fact, operator = ?rule.operator, "Rule is missing its 'expected' block");
            return false;
        };

        let count = items
            .iter()
            .filter(|item| match item {
                _ if rule.params.is_empty() => true,
                Value::Object(map) => rule
                    .params
                    .iter()
                    .all(|(k, v)| map.get(k).is_some_and(|actual| values_equal(actual, v))),
                _ => false,
            })
            .count();

        let mut facts = Map::new();
        facts.insert(fact_name.to_string(), json!(count));
        let nested_rule = CompatibilityRule {
            fact: fact_name.to_string(),
            ..(**expected).clone()
        };
        RuleEvaluator::from_facts(Value::Object(facts)).evaluate(&nested_rule)
    }

    pub fn all_pass(&self, rules: &[CompatibilityRule]) -> bool {
        rules.iter().all(|rule| self.evaluate(rule))
    }
}

/// Numbers compare by value (so `2` equals `2.0`); everything else structurally
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Lenses held in memory, filtered locally.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLensCatalog {
    lenses: Vec<LensConfig>,
}

impl InMemoryLensCatalog {
    pub fn new(lenses: Vec<LensConfig>) -> Self {
        Self { lenses }
    }

    /// Load a JSON array of lens configs
    pub fn from_json(input: &str) -> Result<Self> {
        let lenses: Vec<LensConfig> = serde_json::from_str(input).context("Failed to parse lens configs")?;
        tracing::info!(count = lenses.len(), "Loaded lens configurations");
        Ok(Self { lenses })
    }

    pub fn get(&self, id: &str) -> Option<&LensConfig> {
        self.lenses.iter().find(|lens| lens.id == id)
    }

    pub fn lenses(&self) -> &[LensConfig] {
        &self.lenses
    }

    pub fn compatible(&self, context: &EvaluationContext) -> Vec<LensConfig> {
        let evaluator = RuleEvaluator::new(context);
        self.lenses
            .iter()
            .filter(|lens| evaluator.all_pass(&lens.compatibility))
            .cloned()
            .collect()
    }
}

impl LensBackend for InMemoryLensCatalog {
    fn fetch_compatible_lenses(&self, context: &EvaluationContext) -> Result<Vec<LensConfig>, TransportError> {
        Ok(self.compatible(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{AxisId, ChartCatalog, ChartKind};
    use crate::dataset::ColumnDescriptor;
    use crate::mapping::{ColumnMapper, ColumnMapping};
    use crate::workflow::WorkflowStep;

    fn context() -> EvaluationContext {
        let catalog = ChartCatalog::default();
        let bar = catalog.get(ChartKind::Bar).unwrap();
        let dataset = DatasetDescriptor::new(
            vec![
                ColumnDescriptor::new("region", "String"),
                ColumnDescriptor::new("sales", "Float64"),
                ColumnDescriptor::new("units", "Int64"),
                ColumnDescriptor::new("cost", "Float64"),
            ],
            100,
        );
        let mut mapping = ColumnMapping::for_chart(bar);
        let mapper = ColumnMapper::new(bar, &dataset);
        mapper.assign(&mut mapping, AxisId::Category, "region").unwrap();
        mapper.assign(&mut mapping, AxisId::Value, "sales").unwrap();
        let state = WorkflowState {
            step: WorkflowStep::Visualization,
            chart_type: Some(ChartKind::Bar),
            column_mapping: mapping,
            ..Default::default()
        };
        EvaluationContext::new(&state, &dataset)
    }

    fn rule(json: Value) -> CompatibilityRule {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_resolve_nested_path() {
        let evaluator = RuleEvaluator::new(&context());
        assert_eq!(evaluator.resolve("chart.type"), Some(&json!("bar")));
        assert_eq!(
            evaluator.resolve("dataset.column_counts_by_dtype.Float64"),
            Some(&json!(2))
        );
        assert_eq!(evaluator.resolve("chart.type.length"), None);
        assert_eq!(evaluator.resolve("chart.missing"), None);
    }

    #[test]
    fn test_simple_operators() {
        let evaluator = RuleEvaluator::new(&context());
        assert!(evaluator.evaluate(&rule(json!({"fact": "chart.type", "operator": "equal_to", "value": "bar"}))));
        assert!(evaluator.evaluate(&rule(json!({"fact": "chart.type", "operator": "in", "value": ["bar", "line"]}))));
        assert!(!evaluator.evaluate(&rule(json!({"fact": "chart.type", "operator": "not_in", "value": ["bar"]}))));
        assert!(evaluator.evaluate(&rule(json!({"fact": "chart.type", "operator": "not_equal_to", "value": "pie"}))));
        assert!(evaluator.evaluate(&rule(json!({
            "fact": "dataset.column_counts_by_dtype.Float64",
            "operator": "greater_than_or_equal_to",
            "value": 2.0
        }))));
        assert!(!evaluator.evaluate(&rule(json!({
            "fact": "dataset.column_counts_by_dtype.Int64",
            "operator": "greater_than",
            "value": 1
        }))));
        assert!(evaluator.evaluate(&rule(json!({
            "fact": "dataset.column_counts_by_dtype.Int64",
            "operator": "less_than_or_equal_to",
            "value": 1
        }))));
    }

    #[test]
    fn test_missing_fact_fails() {
        let evaluator = RuleEvaluator::new(&context());
        assert!(!evaluator.evaluate(&rule(json!({"fact": "chart.nope", "operator": "not_equal_to", "value": 1}))));
    }

    #[test]
    fn test_count_where_with_expected() {
        let evaluator = RuleEvaluator::new(&context());
        let numeric_columns = rule(json!({
            "fact": "dataset.columns",
            "operator": "count_where",
            "params": {"kind": "numeric"},
            "expected": {"fact": "", "operator": "greater_than_or_equal_to", "value": 3}
        }));
        assert!(evaluator.evaluate(&numeric_columns));

        let too_many = rule(json!({
            "fact": "dataset.columns",
            "operator": "filter_where",
            "params": {"dtype": "Float64"},
            "expected": {"fact": "", "operator": "greater_than", "value": 2}
        }));
        assert!(!evaluator.evaluate(&too_many));

        let no_expected = rule(json!({
            "fact": "dataset.columns",
            "operator": "count_where",
            "params": {"kind": "numeric"}
        }));
        assert!(!evaluator.evaluate(&no_expected));
    }

    #[test]
    fn test_catalog_filters_by_all_rules() {
        let catalog = InMemoryLensCatalog::from_json(
            r#"[
                {"id": "threshold", "name": "Threshold", "description": "",
                 "compatibility": [
                    {"fact": "chart.type", "operator": "in", "value": ["bar", "line"]},
                    {"fact": "chart.active_columns", "operator": "count_where", "params": {},
                     "expected": {"fact": "", "operator": "equal_to", "value": 2}}
                 ],
                 "controls": [{"type": "draggable_handle", "target": "y_domain", "label": "Max"}],
                 "lens_prompt": "Explain the threshold"},
                {"id": "slices", "name": "Slices", "description": "",
                 "compatibility": [{"fact": "chart.type", "operator": "equal_to", "value": "pie"}],
                 "controls": [], "lens_prompt": ""}
            ]"#,
        )
        .unwrap();

        let ids: Vec<String> = catalog
            .fetch_compatible_lenses(&context())
            .unwrap()
            .into_iter()
            .map(|lens| lens.id)
            .collect();
        assert_eq!(ids, vec!["threshold"]);
        assert_eq!(catalog.get("slices").unwrap().controls.len(), 0);
    }
}
