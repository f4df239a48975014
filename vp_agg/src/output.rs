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
//! Output schema of an aggregation and the builder filling its rows.
//!
//! The schema is built by one function for both execution strategies:
//!
//! 1. key column, grouping property names joined by `_`, string
//! 2. `NUM_OBJ`, number of rows in the group, int32
//! 3. `<property>_<STATISTIC>` per requested statistic, double for numeric
//!    properties and string for textual ones.  MODE gives `<property>_MODE_<i>`
//!    string columns, as many as the largest number of modes of a group
//! 4. `geom`, the collection type of the input geometry type

use std::collections::{HashMap, HashSet};
use anyhow::Result;
use itertools::Itertools;
use log::warn;

use crate::aggregation::StatisticsRequest;
use crate::errors::ErrorKind;
use crate::schema::{DataSetType, GeometryInfo, Property};
use crate::stats::StatisticKind;
use crate::value::{DataType, Value};

pub const NUM_OBJ_COLUMN: &str = "NUM_OBJ";
pub const GEOMETRY_COLUMN: &str = "geom";

/// How the values of a statistics property are summarized
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SummaryKind {
    Numeric,
    Text,
}

/// Statistics to compute for one input property, after validation
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedStatistics {
    pub property: String,
    pub input_index: usize,
    pub summary: SummaryKind,
    pub statistics: Vec<StatisticKind>,
}

/// Input side of the aggregation, validated against the input schema
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnPlan {
    pub input_dataset: String,
    /// Names and input indexes of the grouping properties
    pub grouping: Vec<(String, usize)>,
    pub statistics: Vec<PlannedStatistics>,
    /// Input geometry property
    pub geometry: Option<(usize, Property)>,
}

impl ColumnPlan {
    pub fn resolve(input: &DataSetType, grouping: &[String], request: &StatisticsRequest) -> Result<ColumnPlan> {
        if grouping.is_empty() {
            Err(ErrorKind::NoGroupingProperty)?;
        }

        let mut grouping_columns = Vec::with_capacity(grouping.len());
        for name in grouping {
            let idx = input.property_index(name)?;
            let property = &input.properties[idx];
            if !property.data_type.is_groupable() {
                Err(ErrorKind::InvalidGroupingProperty {
                    property_name: name.clone(),
                    data_type: property.data_type,
                })?;
            }
            grouping_columns.push((name.clone(), idx));
        }

        let mut statistics = Vec::new();
        for (name, kinds) in request.iter() {
            let idx = input.property_index(name)?;
            let data_type = input.properties[idx].data_type;

            let (summary, kept) = if data_type.is_numeric() {
                (SummaryKind::Numeric, kinds.to_vec())
            } else if data_type.is_textual() {
                let (kept, dropped): (Vec<StatisticKind>, Vec<StatisticKind>) =
                    kinds.iter().copied().partition(|k| k.applies_to_text());
                if !dropped.is_empty() {
                    warn!("Skipping statistics {} on textual property {}", dropped.iter().join(", "), name);
                }
                (SummaryKind::Text, kept)
            } else {
                warn!("Skipping statistics on property {} of unsupported type {}", name, data_type);
                continue;
            };

            if kept.is_empty() {
                continue;
            }

            statistics.push(PlannedStatistics {
                property: name.to_string(),
                input_index: idx,
                summary,
                statistics: kept,
            });
        }

        let geometry = input.geometry_property().map(|(idx, p)| (idx, p.clone()));
        if geometry.is_none() {
            warn!("Dataset {} has no geometry, output will not have one either", input.name);
        }

        Ok(ColumnPlan {
            input_dataset: input.name.clone(),
            grouping: grouping_columns,
            statistics,
            geometry,
        })
    }

    pub fn key_column_name(&self) -> String {
        self.grouping.iter().map(|(name, _)| name).join("_")
    }

    pub fn key_columns(&self) -> Vec<usize> {
        self.grouping.iter().map(|(_, idx)| *idx).collect()
    }

    /// Input columns to keep per row, the statistics properties then the geometry
    pub fn captured_columns(&self) -> Vec<usize> {
        self.statistics.iter().map(|s| s.input_index)
            .chain(self.geometry.as_ref().map(|(idx, _)| *idx))
            .collect()
    }

    pub fn requested_kinds(&self) -> impl Iterator<Item=(&PlannedStatistics, StatisticKind)> + '_ {
        self.statistics.iter().flat_map(|s| s.statistics.iter().map(move |k| (s, *k)))
    }
}

/// Number of mode columns per property
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModeWidths {
    widths: HashMap<String, usize>,
}

impl ModeWidths {
    /// Widens the column count of `property` to at least `num_modes`
    pub fn update(&mut self, property: &str, num_modes: usize) {
        let w = self.widths.entry(property.to_string()).or_insert(0);
        *w = (*w).max(num_modes);
    }

    /// Always at least 1
    pub fn width(&self, property: &str) -> usize {
        self.widths.get(property).copied().unwrap_or(0).max(1)
    }
}

/// Where the value of an output column comes from
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnSource {
    Key,
    NumObj,
    /// `planned` indexes ColumnPlan::statistics
    Statistic { planned: usize, kind: StatisticKind },
    /// 0 based index in the modes of the group
    Mode { planned: usize, position: usize },
    Geometry,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OutputColumn {
    pub name: String,
    pub source: ColumnSource,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OutputSchema {
    pub dataset_type: DataSetType,
    /// Parallel to the properties of dataset_type
    pub columns: Vec<OutputColumn>,
}

fn unique_name(name: String, taken: &mut HashSet<String>) -> String {
    let mut candidate = name.clone();
    let mut n = 1;
    while taken.contains(&candidate) {
        candidate = format!("{}_{}", name, n);
        n += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

impl OutputSchema {
    pub fn build(dataset_name: &str, plan: &ColumnPlan, mode_widths: &ModeWidths) -> OutputSchema {
        let mut dataset_type = DataSetType::new(dataset_name);
        let mut columns = Vec::new();
        let mut taken = HashSet::new();

        let mut add = |property: Property, source: ColumnSource| {
            let name = unique_name(property.name.clone(), &mut taken);
            dataset_type.add_property(Property { name: name.clone(), ..property });
            columns.push(OutputColumn { name, source });
        };

        add(Property::new(&plan.key_column_name(), DataType::String, dataset_name), ColumnSource::Key);
        add(Property::new(NUM_OBJ_COLUMN, DataType::Int32, dataset_name), ColumnSource::NumObj);

        for (planned, stats) in plan.statistics.iter().enumerate() {
            for kind in &stats.statistics {
                if *kind == StatisticKind::Mode {
                    for position in 0..mode_widths.width(&stats.property) {
                        let name = format!("{}_{}_{}", stats.property, kind.short_name(), position + 1);
                        add(Property::new(&name, DataType::String, dataset_name),
                            ColumnSource::Mode { planned, position });
                    }
                    continue;
                }

                let data_type = match stats.summary {
                    SummaryKind::Numeric => DataType::Double,
                    SummaryKind::Text => DataType::String,
                };
                let name = format!("{}_{}", stats.property, kind.short_name());
                add(Property::new(&name, data_type, dataset_name),
                    ColumnSource::Statistic { planned, kind: *kind });
            }
        }

        if let Some((_, geom)) = &plan.geometry {
            let info = geom.geometry.unwrap_or(GeometryInfo { geom_type: Default::default(), srid: 0 });
            add(Property::geometry(GEOMETRY_COLUMN, info.geom_type.collection_type(), info.srid, dataset_name),
                ColumnSource::Geometry);
        }

        OutputSchema { dataset_type, columns }
    }

    pub fn key_column(&self) -> &str {
        &self.columns[0].name
    }
}

/// Fills one output row, values are converted to the column type
pub struct RowBuilder<'a> {
    dataset_type: &'a DataSetType,
    row: Vec<Value>,
}

impl<'a> RowBuilder<'a> {
    pub fn new(dataset_type: &'a DataSetType) -> Self {
        RowBuilder {
            dataset_type,
            row: vec![Value::Null; dataset_type.property_count()],
        }
    }

    pub fn set(&mut self, column: &str, value: Value) -> Result<()> {
        let idx = self.dataset_type.property_index(column)?;
        let property = &self.dataset_type.properties[idx];
        self.row[idx] = value.coerce_to(property.data_type, &property.name)?;
        Ok(())
    }

    pub fn finish(self) -> Vec<Value> {
        self.row
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_util::vector::GeomType;
    use crate::test_util::{buildings_type, SRID};

    #[test]
    fn test_schema_layout() {
        let mut req = StatisticsRequest::new();
        req.add("pop", &[StatisticKind::Sum, StatisticKind::Mean, StatisticKind::Mode]);
        req.add("name", &[StatisticKind::Min, StatisticKind::Mean, StatisticKind::Count]);
        let plan = ColumnPlan::resolve(&buildings_type(), &["region".to_string()], &req).unwrap();

        // MEAN is dropped for the string property
        assert_eq!(vec![StatisticKind::Min, StatisticKind::Count], plan.statistics[1].statistics);
        assert_eq!(vec![1, 2, 3], plan.captured_columns());

        let mut widths = ModeWidths::default();
        widths.update("pop", 2);
        widths.update("pop", 1);
        let schema = OutputSchema::build("out", &plan, &widths);

        assert_eq!(vec!["region", "NUM_OBJ", "pop_SUM", "pop_MEAN", "pop_MODE_1", "pop_MODE_2",
                        "name_MIN", "name_COUNT", "geom"],
                   schema.dataset_type.column_names());

        let types: Vec<_> = schema.dataset_type.properties.iter().map(|p| p.data_type).collect();
        assert_eq!(vec![DataType::String, DataType::Int32, DataType::Double, DataType::Double,
                        DataType::String, DataType::String, DataType::String, DataType::String,
                        DataType::Geometry],
                   types);

        let geom = schema.dataset_type.properties[8].geometry.unwrap();
        assert_eq!(GeomType::MultiPolygon, geom.geom_type);
        assert_eq!(SRID, geom.srid);
        assert_eq!("out", schema.dataset_type.properties[8].dataset_name);
        assert_eq!(ColumnSource::Mode { planned: 0, position: 1 }, schema.columns[5].source);
    }

    #[test]
    fn test_key_name_and_duplicates() {
        let mut input = buildings_type();
        input.add_property(Property::new("NUM_OBJ", DataType::Int32, ""));

        let grouping = vec!["region".to_string(), "name".to_string()];
        let plan = ColumnPlan::resolve(&input, &grouping, &StatisticsRequest::new()).unwrap();
        assert_eq!("region_name", plan.key_column_name());

        let mut req = StatisticsRequest::new();
        req.add("NUM_OBJ", &[StatisticKind::Sum]);
        let plan = ColumnPlan::resolve(&input, &["NUM_OBJ".to_string()], &req).unwrap();

        let schema = OutputSchema::build("out", &plan, &ModeWidths::default());
        assert_eq!("NUM_OBJ", schema.key_column());
        assert_eq!(vec!["NUM_OBJ", "NUM_OBJ_1", "NUM_OBJ_SUM", "geom"], schema.dataset_type.column_names());
    }

    #[test]
    fn test_mode_has_one_column() {
        let mut req = StatisticsRequest::new();
        req.add("pop", &[StatisticKind::Mode]);
        let plan = ColumnPlan::resolve(&buildings_type(), &["region".to_string()], &req).unwrap();
        let schema = OutputSchema::build("out", &plan, &ModeWidths::default());
        assert_eq!(vec!["region", "NUM_OBJ", "pop_MODE_1", "geom"], schema.dataset_type.column_names());
    }

    #[test]
    fn test_invalid_grouping() {
        let req = StatisticsRequest::new();
        let input = buildings_type();

        let err = ColumnPlan::resolve(&input, &[], &req).unwrap_err();
        assert_eq!(Some(&ErrorKind::NoGroupingProperty), err.downcast_ref::<ErrorKind>());

        let err = ColumnPlan::resolve(&input, &["geom".to_string()], &req).unwrap_err();
        assert_eq!(Some(&ErrorKind::InvalidGroupingProperty {
            property_name: "geom".to_string(),
            data_type: DataType::Geometry,
        }), err.downcast_ref::<ErrorKind>());

        let err = ColumnPlan::resolve(&input, &["height".to_string()], &req).unwrap_err();
        assert!(matches!(err.downcast_ref::<ErrorKind>(), Some(ErrorKind::InvalidPropertyName { .. })));
    }

    #[test]
    fn test_unsupported_property_skipped() {
        let mut req = StatisticsRequest::new();
        req.add("geom", &[StatisticKind::Count]);
        req.add("name", &[StatisticKind::Median]);
        let plan = ColumnPlan::resolve(&buildings_type(), &["region".to_string()], &req).unwrap();
        assert!(plan.statistics.is_empty());
    }

    #[test]
    fn test_row_builder() {
        let mut dataset_type = DataSetType::new("out");
        dataset_type.add_property(Property::new("NUM_OBJ", DataType::Int32, ""));
        dataset_type.add_property(Property::new("pop_SUM", DataType::Double, ""));
        dataset_type.add_property(Property::new("name_COUNT", DataType::String, ""));

        let mut builder = RowBuilder::new(&dataset_type);
        builder.set("NUM_OBJ", Value::Int64(2)).unwrap();
        builder.set("pop_SUM", Value::Numeric("300".to_string())).unwrap();
        assert!(builder.set("NUM_OBJ", Value::Double(2.5)).is_err());
        assert!(builder.set("missing", Value::Null).is_err());

        assert_eq!(vec![Value::Int32(2), Value::Double(300.0), Value::Null], builder.finish());
    }
}
