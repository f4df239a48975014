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
//! Vector processing aggregation: groups the rows of a dataset by the values of
//! some properties, summarizes the other properties per group, merges the group
//! geometries and writes one row per group to a new dataset.
//!
//! The work is done either in memory or, when the data source understands spatial
//! SQL, as a single GROUP BY query.  Both produce the same output schema.

pub mod aggregation;
pub mod cancel;
pub mod config;
pub mod datasource;
pub mod errors;
pub mod executor;
pub mod geometry_merge;
pub mod grouping;
pub mod output;
pub mod schema;
pub mod stats;
pub mod value;

#[cfg(test)]
mod test_util;

pub use aggregation::{aggregate, aggregate_in_place, execute, persist, AggregationParams, AggregationReport, StatisticsRequest};
pub use cancel::CancelFlag;
pub use errors::ErrorKind;
