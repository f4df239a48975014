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
use geo::Geometry;
use log::debug;

use geo_util::util::ProgressLog;

use crate::cancel::CancelFlag;
use crate::datasource::{DataSource, MemoryDataSet};
use crate::executor::{ExecutionResult, Executor, Strategy};
use crate::geometry_merge::merge_geometries;
use crate::grouping::group_rows;
use crate::output::{ColumnPlan, ColumnSource, ModeWidths, OutputSchema, RowBuilder, SummaryKind};
use crate::stats::{NumericSummary, StatisticKind, StringSummary};
use crate::value::Value;

enum Summary {
    Numeric(NumericSummary),
    Text(StringSummary),
}

impl Summary {
    fn value_of(&self, kind: StatisticKind) -> Value {
        match self {
            Summary::Numeric(s) => s.value_of(kind).map(Value::Double),
            Summary::Text(s) => s.value_of(kind).map(Value::String),
        }.unwrap_or(Value::Null)
    }

    fn mode(&self, position: usize) -> Value {
        match self {
            Summary::Numeric(s) => s.mode.get(position).map(|m| Value::Double(*m)).unwrap_or(Value::Null),
            Summary::Text(_) => Value::Null,
        }
    }
}

/// What is left of a group once it has been summarized
struct GroupResult {
    label: String,
    num_obj: usize,
    summaries: Vec<Summary>,
    geometry: Option<Geometry<f64>>,
}

/// Reads every row of the input and groups, summarizes and merges locally
pub struct InMemoryExecutor;

impl Executor for InMemoryExecutor {
    fn strategy(&self) -> Strategy {
        Strategy::InMemory
    }

    fn execute(&self,
               source: &dyn DataSource,
               plan: &ColumnPlan,
               output_name: &str,
               cancel: &CancelFlag) -> Result<ExecutionResult>
    {
        let mut input = source.get_dataset(&plan.input_dataset)?;
        let grouping = group_rows(input.as_mut(), &plan.key_columns(), &plan.captured_columns(), cancel)?;

        let geom_pos = plan.statistics.len();
        let geom_type = plan.geometry.as_ref()
            .and_then(|(_, p)| p.geometry)
            .map(|g| g.geom_type)
            .unwrap_or_default();

        let mut mode_widths = ModeWidths::default();
        let mut results = Vec::with_capacity(grouping.groups.len());
        let mut progress = ProgressLog::new("Summarizing groups", Some(grouping.groups.len() as u64));

        //groups are dropped as soon as they are summarized
        for group in grouping.groups {
            cancel.check()?;
            progress.tick();

            let mut summaries = Vec::with_capacity(plan.statistics.len());
            for (pos, planned) in plan.statistics.iter().enumerate() {
                let summary = match planned.summary {
                    SummaryKind::Numeric => {
                        let values: Vec<Option<f64>> = group.column(pos).map(|v| v.as_f64()).collect();
                        let s = NumericSummary::compute(&values);
                        if planned.statistics.contains(&StatisticKind::Mode) {
                            mode_widths.update(&planned.property, s.mode.len());
                        }
                        Summary::Numeric(s)
                    }
                    SummaryKind::Text => {
                        let values: Vec<Option<String>> = group.column(pos).map(|v| v.to_canonical_string()).collect();
                        Summary::Text(StringSummary::compute(&values))
                    }
                };
                summaries.push(summary);
            }

            let geometry = if plan.geometry.is_some() {
                merge_geometries(group.column(geom_pos).filter_map(|v| v.as_geometry().cloned()), geom_type)
            } else {
                None
            };

            results.push(GroupResult {
                label: group.key.label(),
                num_obj: group.len(),
                summaries,
                geometry,
            });
        }

        let schema = OutputSchema::build(output_name, plan, &mode_widths);
        let mut output = MemoryDataSet::new(schema.dataset_type.clone());

        for result in results {
            let mut builder = RowBuilder::new(&schema.dataset_type);
            for column in &schema.columns {
                let value = match &column.source {
                    ColumnSource::Key => Value::String(result.label.clone()),
                    ColumnSource::NumObj => Value::Int64(result.num_obj as i64),
                    ColumnSource::Statistic { planned, kind } => result.summaries[*planned].value_of(*kind),
                    ColumnSource::Mode { planned, position } => result.summaries[*planned].mode(*position),
                    ColumnSource::Geometry => result.geometry.clone().map(Value::Geometry).unwrap_or(Value::Null),
                };
                builder.set(&column.name, value)?;
            }
            output.push_row(builder.finish())?;
        }

        debug!("In memory aggregation of {} gave {} rows", plan.input_dataset, output.len());

        Ok(ExecutionResult {
            output,
            rows_read: grouping.rows_read,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::StatisticsRequest;
    use crate::datasource::{DataSet, MemoryDataSource};
    use crate::test_util::{assert_close, mixed_buildings, rows_by_key};

    #[test]
    fn test_modes_and_text() {
        let mut source = MemoryDataSource::new();
        source.insert_dataset(mixed_buildings()).unwrap();

        let mut req = StatisticsRequest::new();
        req.add("pop", &[StatisticKind::Mode, StatisticKind::Median, StatisticKind::Count]);
        req.add("name", &[StatisticKind::Max, StatisticKind::ValidCount]);
        let plan = ColumnPlan::resolve(&source.dataset_type("buildings").unwrap(), &["region".to_string()], &req).unwrap();

        let result = InMemoryExecutor.execute(&source, &plan, "out", &CancelFlag::new()).unwrap();
        assert_eq!(8, result.rows_read);
        assert_eq!(vec!["region", "NUM_OBJ", "pop_MODE_1", "pop_MODE_2", "pop_MEDIAN", "pop_COUNT",
                        "name_MAX", "name_VALID_COUNT", "geom"],
                   result.output.schema().column_names());

        let rows = rows_by_key(&result.output);
        assert_eq!(3, rows.len());

        //A: 100, 200, null. All values unique so no mode
        let a = &rows[0].1;
        assert_eq!(Value::Int32(3), a[1]);
        assert_eq!(vec![Value::Null, Value::Null], a[2..4].to_vec());
        assert_close(150.0, a[4].as_f64().unwrap());
        assert_eq!(Value::String("town hall".to_string()), a[6]);
        assert_eq!(Value::String("2".to_string()), a[7]);

        //B: 50, 50, 70, 70 is bimodal
        let b = &rows[1].1;
        assert_eq!(vec![Value::String("50".to_string()), Value::String("70".to_string())], b[2..4].to_vec());
        assert_close(60.0, b[4].as_f64().unwrap());
        match &b[8] {
            Value::Geometry(Geometry::MultiPolygon(mp)) => assert_eq!(2, mp.0.len()),
            v => panic!("Expected a multipolygon, got {:?}", v)
        }

        //C has only nulls
        let c = &rows[2].1;
        assert_eq!(Value::Int32(1), c[1]);
        assert_eq!(Value::Double(0.0), c[4]);
        assert_eq!(Value::Double(1.0), c[5]);
        assert_eq!(Value::Null, c[6]);
        assert_eq!(Value::String("0".to_string()), c[7]);
        assert_eq!(Value::Null, c[8]);
    }
}
