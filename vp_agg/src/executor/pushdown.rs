/*
This file is part of the Building Aggregration Tool
Copyright (C) 2022 Novel-T

The Building Aggregration Tool is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/
use anyhow::Result;
use log::debug;

use crate::cancel::CancelFlag;
use crate::datasource::{AggregateFunction, AggregateQuery, DataSource, MemoryDataSet};
use crate::errors::ErrorKind;
use crate::executor::{ExecutionResult, Executor, Strategy};
use crate::grouping::GroupKey;
use crate::output::{ColumnPlan, ColumnSource, ModeWidths, OutputSchema, RowBuilder, SummaryKind};
use crate::stats::StatisticKind;
use crate::value::Value;

fn function_for(kind: StatisticKind) -> Option<AggregateFunction> {
    let f = match kind {
        StatisticKind::Min => AggregateFunction::Min,
        StatisticKind::Max => AggregateFunction::Max,
        StatisticKind::Mean => AggregateFunction::Avg,
        StatisticKind::Sum => AggregateFunction::Sum,
        StatisticKind::Count => AggregateFunction::CountAll,
        StatisticKind::ValidCount => AggregateFunction::Count,
        StatisticKind::StdDeviation => AggregateFunction::StdDevPop,
        StatisticKind::Variance => AggregateFunction::VarPop,
        StatisticKind::Amplitude => AggregateFunction::Amplitude,
        StatisticKind::VarCoeff => AggregateFunction::VarCoeff,
        StatisticKind::Skewness | StatisticKind::Kurtosis |
        StatisticKind::Median | StatisticKind::Mode => return None,
    };
    Some(f)
}

/// Query computing every column of `schema` but the key.  Aggregates are aliased
/// with their output column name and come in the output column order
pub fn build_query(plan: &ColumnPlan, schema: &OutputSchema) -> Result<AggregateQuery> {
    let mut query = AggregateQuery::new(&plan.input_dataset);
    for (name, _) in &plan.grouping {
        query.add_group_by(name);
    }

    for column in &schema.columns {
        match &column.source {
            ColumnSource::Key => {}
            ColumnSource::NumObj => query.add_column(AggregateFunction::CountAll, None, &column.name, false),
            ColumnSource::Statistic { planned, kind } => {
                let planned = &plan.statistics[*planned];
                let function = match function_for(*kind) {
                    Some(f) => f,
                    None => Err(ErrorKind::StatisticNotPushable {
                        statistic: kind.to_string(),
                        property_name: planned.property.clone(),
                    })?,
                };
                //min / max of an empty group are 0 in memory too
                let zero_if_empty = planned.summary == SummaryKind::Numeric;
                query.add_column(function, Some(&planned.property), &column.name, zero_if_empty);
            }
            ColumnSource::Mode { planned, .. } => Err(ErrorKind::StatisticNotPushable {
                statistic: StatisticKind::Mode.to_string(),
                property_name: plan.statistics[*planned].property.clone(),
            })?,
            ColumnSource::Geometry => {
                if let Some((_, geom)) = &plan.geometry {
                    query.add_column(AggregateFunction::Union, Some(&geom.name), &column.name, false);
                }
            }
        }
    }

    Ok(query)
}

/// Runs the aggregation as one query in the data source
pub struct PushdownExecutor;

impl Executor for PushdownExecutor {
    fn strategy(&self) -> Strategy {
        Strategy::Pushdown
    }

    fn execute(&self,
               source: &dyn DataSource,
               plan: &ColumnPlan,
               output_name: &str,
               cancel: &CancelFlag) -> Result<ExecutionResult>
    {
        let schema = OutputSchema::build(output_name, plan, &ModeWidths::default());
        let query = build_query(plan, &schema)?;
        debug!("Aggregation query: {}", query.to_sql());

        let mut result = source.query(&query)?;

        let num_keys = plan.grouping.len();
        let mut output = MemoryDataSet::new(schema.dataset_type.clone());
        let mut rows_read = 0;

        while result.move_next()? {
            cancel.check()?;

            let key_values = (0..num_keys).map(|i| result.value(i)).collect::<Result<Vec<_>>>()?;

            let mut builder = RowBuilder::new(&schema.dataset_type);
            for (col_idx, column) in schema.columns.iter().enumerate() {
                let value = match column.source {
                    ColumnSource::Key => Value::String(GroupKey::from_values(&key_values).label()),
                    //query columns are the keys then every output column after the key
                    _ => result.value(num_keys + col_idx - 1)?,
                };
                if column.source == ColumnSource::NumObj {
                    rows_read += value.as_f64().unwrap_or(0.0) as u64;
                }
                builder.set(&column.name, value)?;
            }
            output.push_row(builder.finish())?;
        }

        debug!("Aggregation query on {} gave {} rows", plan.input_dataset, output.len());

        Ok(ExecutionResult {
            output,
            rows_read,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::StatisticsRequest;
    use crate::test_util::buildings_type;

    fn plan(req: &StatisticsRequest) -> ColumnPlan {
        ColumnPlan::resolve(&buildings_type(), &["region".to_string()], req).unwrap()
    }

    #[test]
    fn test_build_query() {
        let mut req = StatisticsRequest::new();
        req.add("pop", &[StatisticKind::Sum, StatisticKind::ValidCount]);
        req.add("name", &[StatisticKind::Min]);
        let plan = plan(&req);
        let schema = OutputSchema::build("out", &plan, &ModeWidths::default());

        let query = build_query(&plan, &schema).unwrap();
        assert_eq!(vec!["region".to_string()], query.group_by);

        let aliases: Vec<_> = query.columns.iter().map(|c| c.alias.as_str()).collect();
        assert_eq!(vec!["NUM_OBJ", "pop_SUM", "pop_VALID_COUNT", "name_MIN", "geom"], aliases);

        assert_eq!(AggregateFunction::Count, query.columns[2].function);
        assert!(query.columns[1].zero_if_empty);
        assert!(!query.columns[3].zero_if_empty);
        assert_eq!(AggregateFunction::Union, query.columns[4].function);
        assert_eq!(Some("geom".to_string()), query.columns[4].property);
    }

    #[test]
    fn test_mode_not_pushable() {
        let mut req = StatisticsRequest::new();
        req.add("pop", &[StatisticKind::Mode]);
        let plan = plan(&req);
        let schema = OutputSchema::build("out", &plan, &ModeWidths::default());

        let err = build_query(&plan, &schema).unwrap_err();
        assert!(matches!(err.downcast_ref::<ErrorKind>(), Some(ErrorKind::StatisticNotPushable { .. })));
    }
}
