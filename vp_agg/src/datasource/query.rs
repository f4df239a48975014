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
use itertools::Itertools;

use crate::schema::{DataSetType, GeometryInfo, Property};
use crate::value::DataType;

/// Aggregate functions a spatial SQL store computes for us
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AggregateFunction {
    /// COUNT(*), rows in the group including nulls
    CountAll,
    /// COUNT(attr), non null values
    Count,
    Min,
    Max,
    Sum,
    Avg,
    StdDevPop,
    VarPop,
    /// MAX - MIN
    Amplitude,
    /// STDDEV_POP / AVG, 0 when the average is 0
    VarCoeff,
    /// ST_Union, always returned as a multi geometry
    Union,
}

impl AggregateFunction {
    /// Result is a double whatever the input type
    pub fn is_numeric_result(&self) -> bool {
        match self {
            AggregateFunction::Sum | AggregateFunction::Avg |
            AggregateFunction::StdDevPop | AggregateFunction::VarPop |
            AggregateFunction::Amplitude | AggregateFunction::VarCoeff => true,
            AggregateFunction::CountAll | AggregateFunction::Count |
            AggregateFunction::Min | AggregateFunction::Max |
            AggregateFunction::Union => false,
        }
    }

    fn sql_expr(&self, attr: &str) -> String {
        match self {
            AggregateFunction::CountAll => "COUNT(*)".to_string(),
            AggregateFunction::Count => format!("COUNT({})", attr),
            AggregateFunction::Min => format!("MIN({})", attr),
            AggregateFunction::Max => format!("MAX({})", attr),
            AggregateFunction::Sum => format!("SUM({})", attr),
            AggregateFunction::Avg => format!("AVG({})", attr),
            AggregateFunction::StdDevPop => format!("STDDEV_POP({})", attr),
            AggregateFunction::VarPop => format!("VAR_POP({})", attr),
            AggregateFunction::Amplitude => format!("MAX({a}) - MIN({a})", a = attr),
            AggregateFunction::VarCoeff => format!("STDDEV_POP({a}) / NULLIF(AVG({a}), 0)", a = attr),
            AggregateFunction::Union => format!("ST_AsText(ST_Multi(ST_Union({})))", attr),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AggregateColumn {
    pub function: AggregateFunction,
    /// None only for CountAll
    pub property: Option<String>,
    pub alias: String,
    /// Numeric aggregates of a group without any valid value give 0 instead of null
    pub zero_if_empty: bool,
}

/// `SELECT <group_by>, <aggregates> FROM <dataset> GROUP BY <group_by>`
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateQuery {
    pub dataset: String,
    pub group_by: Vec<String>,
    pub columns: Vec<AggregateColumn>,
}

pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes each part of a possibly schema qualified name
pub fn quote_qualified_name(name: &str) -> String {
    name.split('.').map(quote_identifier).join(".")
}

impl AggregateQuery {
    pub fn new(dataset: &str) -> Self {
        AggregateQuery {
            dataset: dataset.to_string(),
            group_by: Vec::new(),
            columns: Vec::new(),
        }
    }

    pub fn add_group_by(&mut self, property: &str) {
        self.group_by.push(property.to_string());
    }

    pub fn add_column(&mut self, function: AggregateFunction, property: Option<&str>, alias: &str, zero_if_empty: bool) {
        self.columns.push(AggregateColumn {
            function,
            property: property.map(|p| p.to_string()),
            alias: alias.to_string(),
            zero_if_empty,
        });
    }

    /// PostgreSQL / PostGIS rendering of the query
    pub fn to_sql(&self) -> String {
        let mut select_list: Vec<String> = self.group_by.iter().map(|g| quote_identifier(g)).collect();

        for column in &self.columns {
            let attr = column.property.as_deref().map(quote_identifier).unwrap_or_default();
            let mut expr = column.function.sql_expr(&attr);

            if column.zero_if_empty {
                expr = format!("COALESCE({}, 0)", expr);
            }
            if column.zero_if_empty || column.function.is_numeric_result() {
                expr = format!("CAST({} AS DOUBLE PRECISION)", expr);
            }

            select_list.push(format!("{} AS {}", expr, quote_identifier(&column.alias)));
        }

        let mut sql = format!("SELECT {} FROM {}",
                              select_list.join(", "),
                              quote_qualified_name(&self.dataset));

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.iter().map(|g| quote_identifier(g)).join(", "));
        }

        sql
    }

    /// Type of the rows the query returns, given the schema of the queried dataset
    pub fn result_type(&self, input: &DataSetType) -> anyhow::Result<DataSetType> {
        let mut result = DataSetType::new(&format!("{}_aggregate", self.dataset));

        for g in &self.group_by {
            result.add_property(input.property(g)?.clone());
        }

        for column in &self.columns {
            let input_property = match &column.property {
                Some(p) => Some(input.property(p)?),
                None => None
            };

            let property = match column.function {
                AggregateFunction::CountAll | AggregateFunction::Count =>
                    Property::new(&column.alias, DataType::Int64, ""),
                AggregateFunction::Union => {
                    let info = input_property.and_then(|p| p.geometry);
                    let mut p = Property::new(&column.alias, DataType::Geometry, "");
                    p.geometry = Some(GeometryInfo {
                        geom_type: info.map(|i| i.geom_type).unwrap_or_default().collection_type(),
                        srid: info.map(|i| i.srid).unwrap_or(0),
                    });
                    p
                }
                AggregateFunction::Min | AggregateFunction::Max if !column.zero_if_empty => {
                    let data_type = input_property.map(|p| p.data_type).unwrap_or(DataType::String);
                    Property::new(&column.alias, data_type, "")
                }
                _ => Property::new(&column.alias, DataType::Double, ""),
            };
            result.add_property(property);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_sql() {
        let mut q = AggregateQuery::new("public.buildings");
        q.add_group_by("region");
        q.add_column(AggregateFunction::CountAll, None, "NUM_OBJ", false);
        q.add_column(AggregateFunction::Sum, Some("pop"), "pop_SUM", true);
        q.add_column(AggregateFunction::Min, Some("name"), "name_MIN", false);
        q.add_column(AggregateFunction::Union, Some("geom"), "geom", false);

        assert_eq!(
            "SELECT \"region\", COUNT(*) AS \"NUM_OBJ\", \
             CAST(COALESCE(SUM(\"pop\"), 0) AS DOUBLE PRECISION) AS \"pop_SUM\", \
             MIN(\"name\") AS \"name_MIN\", \
             ST_AsText(ST_Multi(ST_Union(\"geom\"))) AS \"geom\" \
             FROM \"public\".\"buildings\" GROUP BY \"region\"",
            q.to_sql());
    }

    #[test]
    fn test_var_coeff_sql() {
        let mut q = AggregateQuery::new("t");
        q.add_group_by("a");
        q.add_group_by("b");
        q.add_column(AggregateFunction::VarCoeff, Some("x"), "x_VAR_COEFF", true);

        assert_eq!(
            "SELECT \"a\", \"b\", CAST(COALESCE(STDDEV_POP(\"x\") / NULLIF(AVG(\"x\"), 0), 0) AS DOUBLE PRECISION) AS \"x_VAR_COEFF\" \
             FROM \"t\" GROUP BY \"a\", \"b\"",
            q.to_sql());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!("\"we\"\"ird\"", quote_identifier("we\"ird"));
    }
}
