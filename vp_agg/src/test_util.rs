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
//! Fixtures shared by the unit tests

use float_cmp::{ApproxEq, F64Margin};
use geo::{polygon, Geometry};

use geo_util::vector::GeomType;

use crate::datasource::{Capabilities, MemoryDataSet, MemoryDataSource};
use crate::schema::{DataSetType, Property};
use crate::value::{DataType, Value};

pub const SRID: i32 = 2056;

pub fn assert_close(expected: f64, actual: f64) {
    let margin = F64Margin { epsilon: 1e-9, ulps: 4 };
    assert!(actual.approx_eq(expected, margin), "Expected {} got {}", expected, actual);
}

pub fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Geometry<f64> {
    polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0)].into()
}

pub fn buildings_type() -> DataSetType {
    DataSetType::new("buildings")
        .with_property(Property::new("region", DataType::String, ""))
        .with_property(Property::new("pop", DataType::Int32, ""))
        .with_property(Property::new("name", DataType::String, ""))
        .with_property(Property::geometry("geom", GeomType::Polygon, SRID, ""))
}

fn building(region: &str, pop: Option<i32>, name: Option<&str>, geom: Option<Geometry<f64>>) -> Vec<Value> {
    vec![
        Value::String(region.to_string()),
        pop.map(Value::Int32).unwrap_or(Value::Null),
        name.map(|n| Value::String(n.to_string())).unwrap_or(Value::Null),
        geom.map(Value::Geometry).unwrap_or(Value::Null),
    ]
}

/// Two adjacent squares in A, one in B
pub fn region_buildings() -> MemoryDataSet {
    let mut ds = MemoryDataSet::new(buildings_type());
    ds.push_row(building("A", Some(100), Some("town hall"), Some(square(0., 0., 1., 1.)))).unwrap();
    ds.push_row(building("A", Some(200), Some("bakery"), Some(square(1., 0., 2., 1.)))).unwrap();
    ds.push_row(building("B", Some(50), Some("farm"), Some(square(5., 5., 6., 6.)))).unwrap();
    ds
}

/// Like [region_buildings] with nulls, a region without valid values, and a tie for the mode
pub fn mixed_buildings() -> MemoryDataSet {
    let mut ds = region_buildings();
    ds.push_row(building("A", None, None, None)).unwrap();
    ds.push_row(building("B", Some(50), Some("barn"), Some(square(6., 5., 7., 6.)))).unwrap();
    ds.push_row(building("B", Some(70), Some("barn"), None)).unwrap();
    ds.push_row(building("B", Some(70), None, Some(square(20., 20., 21., 21.)))).unwrap();
    ds.push_row(building("C", None, None, None)).unwrap();
    ds
}

pub fn pushdown_capabilities() -> Capabilities {
    Capabilities {
        prepared_queries: true,
        spatial_sql: true,
        primary_keys: true,
    }
}

pub fn source_with(dataset: MemoryDataSet, capabilities: Capabilities) -> MemoryDataSource {
    let mut source = MemoryDataSource::with_capabilities(capabilities);
    source.insert_dataset(dataset).unwrap();
    source
}

/// Rows of a dataset keyed by the string in the first column
pub fn rows_by_key(ds: &MemoryDataSet) -> Vec<(String, Vec<Value>)> {
    let mut rows: Vec<_> = ds.rows().iter()
        .map(|r| (r[0].to_canonical_string().unwrap_or_default(), r.clone()))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    rows
}
