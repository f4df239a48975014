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
//! Dataset / data source abstraction the aggregation reads from and writes to

use std::collections::HashMap;
use anyhow::{bail, Result};
use geo::Geometry;

use crate::schema::DataSetType;
use crate::value::Value;

mod memory;
mod query;
#[cfg(feature = "postgres")]
mod postgis;

pub use memory::*;
pub use query::*;
#[cfg(feature = "postgres")]
pub use postgis::*;

/// Forward only cursor over the rows of a dataset
pub trait DataSet {
    fn schema(&self) -> &DataSetType;

    /// Advances to the next row, false when there are no more rows
    fn move_next(&mut self) -> Result<bool>;

    /// Value of the current row
    fn value(&self, idx: usize) -> Result<Value>;

    fn is_null(&self, idx: usize) -> Result<bool> {
        Ok(self.value(idx)?.is_null())
    }

    fn value_by_name(&self, name: &str) -> Result<Value> {
        let idx = self.schema().property_index(name)?;
        self.value(idx)
    }

    fn get_string(&self, idx: usize) -> Result<Option<String>> {
        Ok(self.value(idx)?.to_canonical_string())
    }

    fn get_double(&self, idx: usize) -> Result<Option<f64>> {
        let value = self.value(idx)?;
        if value.is_null() {
            return Ok(None);
        }
        match value.as_f64() {
            Some(v) => Ok(Some(v)),
            None => bail!("Column {} of {} is not numeric", idx, self.schema().name)
        }
    }

    fn get_int32(&self, idx: usize) -> Result<Option<i32>> {
        match self.value(idx)? {
            Value::Null => Ok(None),
            Value::Int16(v) => Ok(Some(v as i32)),
            Value::Int32(v) => Ok(Some(v)),
            v => bail!("Column {} of {} is not a 32 bit integer, found {:?}", idx, self.schema().name, v.data_type())
        }
    }

    fn get_int64(&self, idx: usize) -> Result<Option<i64>> {
        match self.value(idx)? {
            Value::Null => Ok(None),
            Value::Int16(v) => Ok(Some(v as i64)),
            Value::Int32(v) => Ok(Some(v as i64)),
            Value::Int64(v) => Ok(Some(v)),
            v => bail!("Column {} of {} is not an integer, found {:?}", idx, self.schema().name, v.data_type())
        }
    }

    fn get_geometry(&self, idx: usize) -> Result<Option<Geometry<f64>>> {
        match self.value(idx)? {
            Value::Null => Ok(None),
            Value::Geometry(g) => Ok(Some(g)),
            v => bail!("Column {} of {} is not a geometry, found {:?}", idx, self.schema().name, v.data_type())
        }
    }
}

/// What a data source can do
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub prepared_queries: bool,
    /// Understands a SQL dialect with spatial extensions (ST_Union etc.)
    pub spatial_sql: bool,
    pub primary_keys: bool,
}

impl Capabilities {
    pub fn supports_pushdown(&self) -> bool {
        self.prepared_queries && self.spatial_sql
    }
}

/// Options passed to DataSource::add
pub type AddOptions = HashMap<String, String>;

pub trait DataSource {
    fn capabilities(&self) -> Capabilities;

    fn dataset_exists(&self, name: &str) -> Result<bool>;

    fn dataset_type(&self, name: &str) -> Result<DataSetType>;

    fn get_dataset<'a>(&'a self, name: &str) -> Result<Box<dyn DataSet + 'a>>;

    /// Runs the aggregation query in the store.  Result columns are the group by
    /// properties followed by the aggregates, named by their alias
    fn query<'a>(&'a self, query: &AggregateQuery) -> Result<Box<dyn DataSet + 'a>>;

    /// Creates an empty dataset, returns the type as the store actually created it
    fn create_dataset_type(&mut self, dataset_type: &DataSetType) -> Result<DataSetType>;

    /// Appends all remaining rows of `data` to the dataset `name`
    fn add(&mut self, name: &str, data: &mut dyn DataSet, options: &AddOptions) -> Result<()>;

    fn add_primary_key(&mut self, name: &str, column: &str) -> Result<()>;
}
