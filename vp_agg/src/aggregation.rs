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
//! Entry point: run an aggregation and persist its result

use std::collections::HashSet;
use anyhow::Result;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::cancel::CancelFlag;
use crate::datasource::{AddOptions, DataSet, DataSource, MemoryDataSet};
use crate::errors::ErrorKind;
use crate::executor::{executor_for, select_strategy, Strategy};
use crate::output::ColumnPlan;
use crate::stats::StatisticKind;

/// Statistics per property, in the order the output columns will have
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRequest {
    entries: Vec<(String, Vec<StatisticKind>)>,
}

impl StatisticsRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds to the statistics already requested for `property`, ignoring repeats
    pub fn add(&mut self, property: &str, statistics: &[StatisticKind]) {
        let idx = match self.entries.iter().position(|(p, _)| p == property) {
            Some(idx) => idx,
            None => {
                self.entries.push((property.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        let kinds = &mut self.entries[idx].1;
        for s in statistics {
            if !kinds.contains(s) {
                kinds.push(*s);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item=(&str, &[StatisticKind])> + '_ {
        self.entries.iter().map(|(p, k)| (p.as_str(), k.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregationParams {
    pub input_dataset: String,
    pub output_dataset: String,
    /// Property names, in key order
    pub grouping: Vec<String>,
    pub statistics: StatisticsRequest,
    pub strategy: Strategy,
    /// Primary key on the key column, if the output data source has them
    pub create_primary_key: bool,
    pub add_options: AddOptions,
}

impl AggregationParams {
    pub fn new(input_dataset: &str, output_dataset: &str, grouping: &[&str]) -> Self {
        AggregationParams {
            input_dataset: input_dataset.to_string(),
            output_dataset: output_dataset.to_string(),
            grouping: grouping.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AggregationReport {
    /// Strategy that ran, never Auto
    pub strategy: Strategy,
    pub rows_read: u64,
    pub groups: usize,
    pub columns: Vec<String>,
}

/// Runs the aggregation, the result is only staged in memory
pub fn execute(input: &dyn DataSource, params: &AggregationParams, cancel: &CancelFlag) -> Result<(MemoryDataSet, AggregationReport)> {
    let input_type = input.dataset_type(&params.input_dataset)?;
    let plan = ColumnPlan::resolve(&input_type, &params.grouping, &params.statistics)?;

    let strategy = select_strategy(params.strategy, input.capabilities(), &plan)?;
    info!("Aggregating {} by {} ({})", params.input_dataset, plan.key_column_name(), strategy);

    let result = executor_for(strategy).execute(input, &plan, &params.output_dataset, cancel)?;

    let report = AggregationReport {
        strategy,
        rows_read: result.rows_read,
        groups: result.output.len(),
        columns: result.output.schema().column_names(),
    };
    info!("Read {} rows in to {} groups", report.rows_read, report.groups);

    Ok((result.output, report))
}

/// Writes the staged result as a new dataset of `output`
pub fn persist(output: &mut dyn DataSource, staging: &MemoryDataSet, params: &AggregationParams) -> Result<()> {
    if output.dataset_exists(&params.output_dataset)? {
        Err(ErrorKind::DatasetExists(params.output_dataset.clone()))?;
    }

    let adapted = output.create_dataset_type(staging.schema())?;

    //the adapted type has the same columns in the same order, possibly with other types
    let mut adapted_rows = MemoryDataSet::new(adapted.clone());
    for row in staging.rows() {
        let coerced = row.iter().cloned().zip(adapted.properties.iter())
            .map(|(v, p)| v.coerce_to(p.data_type, &p.name))
            .collect::<Result<Vec<_>>>()?;
        adapted_rows.push_row(coerced)?;
    }
    output.add(&adapted.name, &mut adapted_rows, &params.add_options)?;

    if params.create_primary_key {
        let key_column = &adapted.properties[0].name;
        if !output.capabilities().primary_keys {
            warn!("Output data source has no primary keys, {} will not have one", adapted.name);
        } else if !labels_unique(staging) {
            warn!("Key column {} has duplicate values, {} will not have a primary key", key_column, adapted.name);
        } else {
            output.add_primary_key(&adapted.name, key_column)?;
        }
    }

    info!("Wrote {} rows to {}", staging.len(), adapted.name);
    Ok(())
}

/// Distinct groups can share a key label when grouping values contain `_`
fn labels_unique(staging: &MemoryDataSet) -> bool {
    let mut seen = HashSet::new();
    staging.rows().iter().all(|r| seen.insert(r[0].to_canonical_string()))
}

/// Aggregates a dataset of `input` in to a new dataset of `output`
pub fn aggregate(input: &dyn DataSource,
                 output: &mut dyn DataSource,
                 params: &AggregationParams,
                 cancel: &CancelFlag) -> Result<AggregationReport>
{
    if output.dataset_exists(&params.output_dataset)? {
        Err(ErrorKind::DatasetExists(params.output_dataset.clone()))?;
    }

    let (staging, report) = execute(input, params, cancel)?;
    cancel.check()?;
    persist(output, &staging, params)?;

    Ok(report)
}

/// Same as [aggregate] with the output written next to the input
pub fn aggregate_in_place(source: &mut dyn DataSource, params: &AggregationParams, cancel: &CancelFlag) -> Result<AggregationReport> {
    if source.dataset_exists(&params.output_dataset)? {
        Err(ErrorKind::DatasetExists(params.output_dataset.clone()))?;
    }

    let (staging, report) = execute(&*source, params, cancel)?;
    cancel.check()?;
    persist(source, &staging, params)?;

    Ok(report)
}
