// Local data preparation: projection, aggregation and sampling of raw rows

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::chart::{AggregationMethod, ChartDescriptor, SamplingMethod};
use crate::config::PrepareConfig;
use crate::dataset::{PreparedRow, Row, Scalar};
use crate::error::ValidationError;
use crate::session::RowQuery;

/// Label of the bucket holding everything outside the top groups
pub const OTHER_LABEL: &str = "Other";

// Remainders at or below this are rounding noise
const OTHER_EPSILON: f64 = 0.001;

/// Project raw records onto `{x, y}`. Missing cells become null.
pub fn project(rows: &[Row], x_column: &str, y_column: &str) -> Vec<PreparedRow> {
    rows.iter()
        .map(|row| PreparedRow {
            x: row.get(x_column).cloned().unwrap_or(Scalar::Null),
            y: row.get(y_column).cloned().unwrap_or(Scalar::Null),
        })
        .collect()
}

/// Group by `x` (first-seen order) and reduce each group's `y`
pub fn aggregate(rows: Vec<PreparedRow>, method: AggregationMethod) -> Vec<PreparedRow> {
    struct Group {
        key: Scalar,
        sum: f64,
        numeric: usize,
        rows: usize,
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for row in rows {
        let label = row.x.to_string();
        let slot = *index.entry(label).or_insert_with(|| {
            groups.push(Group {
                key: row.x.clone(),
                sum: 0.0,
                numeric: 0,
                rows: 0,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.rows += 1;
        if let Some(v) = row.y.as_f64() {
            group.sum += v;
            group.numeric += 1;
        }
    }

    groups
        .into_iter()
        .map(|group| {
            let y = match method {
                AggregationMethod::Sum => Scalar::Number(group.sum),
                AggregationMethod::Count => Scalar::Number(group.rows as f64),
                AggregationMethod::Mean if group.numeric == 0 => Scalar::Null,
                AggregationMethod::Mean => Scalar::Number(group.sum / group.numeric as f64),
            };
            PreparedRow { x: group.key, y }
        })
        .collect()
}

/// Reduce `rows` to roughly `threshold` rows.
///
/// With no method the first `threshold` rows are kept.
pub fn sample(
    rows: Vec<PreparedRow>,
    method: Option<SamplingMethod>,
    threshold: usize,
    config: &PrepareConfig,
) -> Vec<PreparedRow> {
    let Some(method) = method else {
        return rows.into_iter().take(threshold).collect();
    };
    tracing::info!(method = method.id(), rows = rows.len(), threshold, "Applying sampling method");

    match method {
        SamplingMethod::TopN => top_n(rows, config.top_n),
        SamplingMethod::Systematic => {
            let step = (rows.len() / threshold.max(1)).max(1);
            rows.into_iter().step_by(step).collect()
        }
        SamplingMethod::Random => {
            let amount = rows.len().min(threshold);
            let mut rng = StdRng::seed_from_u64(config.random_seed);
            let mut picked = rand::seq::index::sample(&mut rng, rows.len(), amount).into_vec();
            picked.sort_unstable();

            let mut rows: Vec<Option<PreparedRow>> = rows.into_iter().map(Some).collect();
            picked.into_iter().filter_map(|i| rows[i].take()).collect()
        }
    }
}

/// Largest `count` groups by summed `y`, plus an "Other" bucket for the rest
fn top_n(rows: Vec<PreparedRow>, count: usize) -> Vec<PreparedRow> {
    let row_count = rows.len();
    let total: f64 = rows.iter().filter_map(|row| row.y.as_f64()).sum();

    let mut groups = aggregate(rows, AggregationMethod::Sum);
    // Stable: ties keep first-seen order
    groups.sort_by(|a, b| {
        let (a, b) = (a.y.as_f64().unwrap_or(0.0), b.y.as_f64().unwrap_or(0.0));
        b.total_cmp(&a)
    });
    groups.truncate(count);

    let kept: f64 = groups.iter().filter_map(|row| row.y.as_f64()).sum();
    let other = total - kept;
    if other > OTHER_EPSILON && row_count > count {
        groups.push(PreparedRow::new(OTHER_LABEL, other));
    }
    groups
}

/// The full local pipeline for one row query
pub fn prepare(
    rows: &[Row],
    chart: &ChartDescriptor,
    query: &RowQuery,
    config: &PrepareConfig,
) -> Result<Vec<PreparedRow>, ValidationError> {
    query.mapping.ensure_complete(chart)?;
    let (Some(x_column), Some(y_column)) = (query.mapping.x_column(), query.mapping.y_column()) else {
        return Err(ValidationError::IncompleteMapping {
            chart: chart.id,
            missing: "x, y".to_string(),
        });
    };

    let mut prepared = project(rows, x_column, y_column);
    if let Some(method) = query.aggregation {
        prepared = aggregate(prepared, method);
    }
    let method = query.sampling.and_then(|decision| decision.method());
    Ok(sample(prepared, method, chart.sampling_threshold, config))
}
