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
use std::cmp::Ordering;
use std::collections::HashMap;
use anyhow::{bail, Result};
use log::debug;

use crate::datasource::{AddOptions, AggregateColumn, AggregateFunction, AggregateQuery, Capabilities, DataSet, DataSource};
use crate::errors::ErrorKind;
use crate::geometry_merge::merge_geometries;
use crate::grouping::GroupKey;
use crate::schema::{DataSetType, Property};
use crate::value::Value;

fn current_value(rows: &[Vec<Value>], position: usize, idx: usize, method_name: &'static str) -> Result<Value> {
    let row = match position.checked_sub(1).and_then(|r| rows.get(r)) {
        Some(row) => row,
        None => Err(ErrorKind::NoCurrentRow { method_name })?,
    };
    match row.get(idx) {
        Some(v) => Ok(v.clone()),
        None => Err(ErrorKind::InvalidColumnIndex { index: idx, method_name })?,
    }
}

/// Dataset held in memory, used to stage the aggregation output and as fixture data
#[derive(Clone, Debug, PartialEq)]
pub struct MemoryDataSet {
    schema: DataSetType,
    rows: Vec<Vec<Value>>,
    /// 1 based index of the current row, 0 before the first move_next
    position: usize,
}

impl MemoryDataSet {
    pub fn new(schema: DataSetType) -> Self {
        MemoryDataSet {
            schema,
            rows: Vec::new(),
            position: 0,
        }
    }

    /// Copies the remaining rows of `data`
    pub fn from_dataset(data: &mut dyn DataSet) -> Result<Self> {
        let mut ds = MemoryDataSet::new(data.schema().clone());
        let num_cols = ds.schema.property_count();
        while data.move_next()? {
            let row = (0..num_cols).map(|i| data.value(i)).collect::<Result<Vec<_>>>()?;
            ds.push_row(row)?;
        }
        Ok(ds)
    }

    /// Values must either be null or exactly of the type of their column
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.schema.property_count() {
            bail!("Row has {} values but dataset {} has {} columns",
                row.len(), self.schema.name, self.schema.property_count());
        }
        for (value, property) in row.iter().zip(self.schema.properties.iter()) {
            if let Some(value_type) = value.data_type() {
                if value_type != property.data_type {
                    Err(ErrorKind::TypeMismatch {
                        value_type,
                        column_name: property.name.clone(),
                        column_type: property.data_type,
                    })?;
                }
            }
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rewinds to before the first row
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Independent cursor over the rows
    pub fn cursor(&self) -> MemoryCursor<'_> {
        MemoryCursor {
            schema: &self.schema,
            rows: &self.rows,
            position: 0,
        }
    }
}

impl DataSet for MemoryDataSet {
    fn schema(&self) -> &DataSetType {
        &self.schema
    }

    fn move_next(&mut self) -> Result<bool> {
        if self.position >= self.rows.len() {
            self.position = self.rows.len() + 1;
            return Ok(false);
        }
        self.position += 1;
        Ok(true)
    }

    fn value(&self, idx: usize) -> Result<Value> {
        current_value(&self.rows, self.position, idx, "value")
    }
}

/// Read only cursor borrowing the rows of a [MemoryDataSet]
pub struct MemoryCursor<'a> {
    schema: &'a DataSetType,
    rows: &'a [Vec<Value>],
    position: usize,
}

impl<'a> DataSet for MemoryCursor<'a> {
    fn schema(&self) -> &DataSetType {
        self.schema
    }

    fn move_next(&mut self) -> Result<bool> {
        if self.position >= self.rows.len() {
            self.position = self.rows.len() + 1;
            return Ok(false);
        }
        self.position += 1;
        Ok(true)
    }

    fn value(&self, idx: usize) -> Result<Value> {
        current_value(self.rows, self.position, idx, "value")
    }
}

/// Named datasets held in memory.
///
/// With prepared queries and spatial SQL enabled, aggregate queries are evaluated
/// here with the semantics a SQL store gives them.
#[derive(Clone, Debug)]
pub struct MemoryDataSource {
    datasets: HashMap<String, MemoryDataSet>,
    capabilities: Capabilities,
}

impl Default for MemoryDataSource {
    fn default() -> Self {
        MemoryDataSource::new()
    }
}

impl MemoryDataSource {
    /// No query support, primary keys supported
    pub fn new() -> Self {
        MemoryDataSource::with_capabilities(Capabilities {
            prepared_queries: false,
            spatial_sql: false,
            primary_keys: true,
        })
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        MemoryDataSource {
            datasets: HashMap::new(),
            capabilities,
        }
    }

    pub fn insert_dataset(&mut self, mut dataset: MemoryDataSet) -> Result<()> {
        let name = dataset.schema.name.clone();
        if self.datasets.contains_key(&name) {
            return Err(ErrorKind::DatasetExists(name).into());
        }
        dataset.reset();
        self.datasets.insert(name, dataset);
        Ok(())
    }

    pub fn dataset(&self, name: &str) -> Result<&MemoryDataSet> {
        match self.datasets.get(name) {
            Some(ds) => Ok(ds),
            None => Err(ErrorKind::DatasetNotFound(name.to_string()))?,
        }
    }

    fn dataset_mut(&mut self, name: &str) -> Result<&mut MemoryDataSet> {
        match self.datasets.get_mut(name) {
            Some(ds) => Ok(ds),
            None => Err(ErrorKind::DatasetNotFound(name.to_string()))?,
        }
    }
}

impl DataSource for MemoryDataSource {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn dataset_exists(&self, name: &str) -> Result<bool> {
        Ok(self.datasets.contains_key(name))
    }

    fn dataset_type(&self, name: &str) -> Result<DataSetType> {
        Ok(self.dataset(name)?.schema.clone())
    }

    fn get_dataset<'a>(&'a self, name: &str) -> Result<Box<dyn DataSet + 'a>> {
        Ok(Box::new(self.dataset(name)?.cursor()))
    }

    fn query<'a>(&'a self, query: &AggregateQuery) -> Result<Box<dyn DataSet + 'a>> {
        if !self.capabilities.supports_pushdown() {
            Err(ErrorKind::PushdownUnsupported {
                reason: "memory data source has query support disabled".to_string()
            })?;
        }
        let input = self.dataset(&query.dataset)?;
        Ok(Box::new(evaluate_query(input, query)?))
    }

    fn create_dataset_type(&mut self, dataset_type: &DataSetType) -> Result<DataSetType> {
        let mut adapted = dataset_type.clone();
        adapted.primary_key = None;
        self.insert_dataset(MemoryDataSet::new(adapted.clone()))?;
        Ok(adapted)
    }

    fn add(&mut self, name: &str, data: &mut dyn DataSet, options: &AddOptions) -> Result<()> {
        debug!("Adding to {} with options {:?}", name, options);

        let target = self.dataset_mut(name)?;

        // source column for each target column, matched by name
        let mapping = target.schema.properties.iter()
            .map(|p| data.schema().property_index(&p.name))
            .collect::<Result<Vec<_>>>()?;

        while data.move_next()? {
            let mut row = Vec::with_capacity(mapping.len());
            for (&src_idx, property) in mapping.iter().zip(target.schema.properties.iter()) {
                row.push(data.value(src_idx)?.coerce_to(property.data_type, &property.name)?);
            }
            target.push_row(row)?;
        }

        Ok(())
    }

    fn add_primary_key(&mut self, name: &str, column: &str) -> Result<()> {
        if !self.capabilities.primary_keys {
            bail!("Primary keys are not supported");
        }
        let target = self.dataset_mut(name)?;
        let idx = target.schema.property_index(column)?;

        let mut seen = std::collections::HashSet::new();
        for row in &target.rows {
            match row[idx].to_canonical_string() {
                None => bail!("Primary key column {} of {} contains nulls", column, name),
                Some(s) => if !seen.insert(s) {
                    bail!("Primary key column {} of {} contains duplicates", column, name);
                }
            }
        }

        target.schema.primary_key = Some(column.to_string());
        Ok(())
    }
}

/// Orders numbers numerically, everything else by canonical string
fn sql_compare(lhs: &Value, rhs: &Value) -> Ordering {
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(l), Some(r)) => l.partial_cmp(&r).unwrap_or(Ordering::Equal),
        _ => lhs.to_canonical_string().cmp(&rhs.to_canonical_string()),
    }
}

fn is_null_or_nan(value: &Value) -> bool {
    value.is_null() || value.as_f64().map_or(false, f64::is_nan)
}

fn zero_or_null(column: &AggregateColumn) -> Value {
    if column.zero_if_empty { Value::Double(0.0) } else { Value::Null }
}

fn aggregate_column(column: &AggregateColumn, result: &Property, values: &[&Value], num_rows: usize) -> Value {
    //NaN counts as null, same as the in-memory summaries
    let valid: Vec<&Value> = values.iter().copied().filter(|v| !is_null_or_nan(v)).collect();

    match column.function {
        AggregateFunction::CountAll => return Value::Int64(num_rows as i64),
        AggregateFunction::Count => return Value::Int64(valid.len() as i64),
        AggregateFunction::Min | AggregateFunction::Max => {
            let best = if column.function == AggregateFunction::Min {
                valid.iter().copied().min_by(|a, b| sql_compare(a, b))
            } else {
                valid.iter().copied().max_by(|a, b| sql_compare(a, b))
            };
            return match best {
                Some(v) if column.zero_if_empty => Value::Double(v.as_f64().unwrap_or(0.0)),
                Some(v) => v.clone(),
                None => zero_or_null(column),
            };
        }
        AggregateFunction::Union => {
            let geoms = valid.iter().filter_map(|v| v.as_geometry()).cloned();
            let target = result.geometry.map(|g| g.geom_type).unwrap_or_default();
            return merge_geometries(geoms, target).map(Value::Geometry).unwrap_or(Value::Null);
        }
        _ => {}
    }

    let xs: Vec<f64> = valid.iter().filter_map(|v| v.as_f64()).collect();
    if xs.is_empty() {
        return zero_or_null(column);
    }

    let n = xs.len() as f64;
    let sum: f64 = xs.iter().sum();
    let avg = sum / n;
    let var_pop = xs.iter().map(|x| (x - avg) * (x - avg)).sum::<f64>() / n;

    let v = match column.function {
        AggregateFunction::Sum => sum,
        AggregateFunction::Avg => avg,
        AggregateFunction::VarPop => var_pop,
        AggregateFunction::StdDevPop => var_pop.sqrt(),
        AggregateFunction::Amplitude => {
            let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let min = xs.iter().cloned().fold(f64::INFINITY, f64::min);
            max - min
        }
        AggregateFunction::VarCoeff => {
            if avg == 0.0 {
                return zero_or_null(column);
            }
            var_pop.sqrt() / avg
        }
        AggregateFunction::CountAll | AggregateFunction::Count |
        AggregateFunction::Min | AggregateFunction::Max | AggregateFunction::Union => unreachable!(),
    };
    Value::Double(v)
}

/// GROUP BY evaluation of `query` over the rows of `input`, groups in order of first occurrence
pub fn evaluate_query(input: &MemoryDataSet, query: &AggregateQuery) -> Result<MemoryDataSet> {
    let schema = input.schema();
    let result_type = query.result_type(schema)?;

    let key_idx = query.group_by.iter()
        .map(|g| schema.property_index(g))
        .collect::<Result<Vec<_>>>()?;
    let column_idx = query.columns.iter()
        .map(|c| c.property.as_deref().map(|p| schema.property_index(p)).transpose())
        .collect::<Result<Vec<_>>>()?;

    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (row_idx, row) in input.rows().iter().enumerate() {
        let key_values: Vec<Value> = key_idx.iter().map(|&i| row[i].clone()).collect();
        let key = GroupKey::from_values(&key_values);
        match index.get(&key) {
            Some(&g) => groups[g].push(row_idx),
            None => {
                index.insert(key, groups.len());
                groups.push(vec![row_idx]);
            }
        }
    }

    let mut result = MemoryDataSet::new(result_type);
    for members in groups {
        let first = &input.rows()[members[0]];
        let mut out: Vec<Value> = key_idx.iter().map(|&i| first[i].clone()).collect();

        for (col_num, column) in query.columns.iter().enumerate() {
            let values: Vec<&Value> = match column_idx[col_num] {
                Some(idx) => members.iter().map(|&r| &input.rows()[r][idx]).collect(),
                None => Vec::new(),
            };
            let result_property = &result.schema.properties[key_idx.len() + col_num];
            out.push(aggregate_column(column, result_property, &values, members.len()));
        }

        result.push_row(out)?;
    }

    Ok(result)
}
