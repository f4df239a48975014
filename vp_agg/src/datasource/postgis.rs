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
//! PostGIS data source, the store the pushdown strategy is written for

use std::cell::RefCell;
use anyhow::{bail, Result};
use chrono::NaiveDateTime;
use log::{debug, warn};
use postgres::types::{ToSql, Type};
use postgres::{Client, NoTls, Row};

use geo_util::vector::GeomType;

use crate::datasource::{quote_identifier, quote_qualified_name, AddOptions, AggregateQuery, Capabilities, DataSet, DataSource, MemoryDataSet};
use crate::errors::ErrorKind;
use crate::schema::{DataSetType, GeometryInfo, Property};
use crate::value::{DataType, Value};

pub struct PostgisDataSource {
    client: RefCell<Client>,
    /// Database schema the datasets are tables of
    schema: String,
}

/// Our type for a column of information_schema.columns, None if not supported
fn data_type_of(pg_data_type: &str, udt_name: &str) -> Option<DataType> {
    let t = match pg_data_type {
        "smallint" => DataType::Int16,
        "integer" => DataType::Int32,
        "bigint" => DataType::Int64,
        "real" => DataType::Float,
        "double precision" => DataType::Double,
        "numeric" => DataType::Numeric,
        "text" | "character varying" | "character" => DataType::String,
        "timestamp without time zone" => DataType::DateTime,
        "bytea" => DataType::ByteArray,
        "USER-DEFINED" => match udt_name {
            "geometry" => DataType::Geometry,
            "raster" => DataType::Raster,
            _ => return None,
        },
        _ => return None,
    };
    Some(t)
}

fn column_definition(property: &Property) -> Result<String> {
    let sql_type = match property.data_type {
        DataType::Int16 => "smallint".to_string(),
        DataType::Int32 => "integer".to_string(),
        DataType::Int64 => "bigint".to_string(),
        DataType::Float => "real".to_string(),
        DataType::Double => "double precision".to_string(),
        DataType::Numeric => "numeric".to_string(),
        DataType::String => "text".to_string(),
        DataType::DateTime => "timestamp".to_string(),
        DataType::ByteArray => "bytea".to_string(),
        DataType::Geometry => {
            let info = property.geometry.unwrap_or(GeometryInfo { geom_type: GeomType::Unknown, srid: 0 });
            format!("geometry({}, {})", info.geom_type.name(), info.srid)
        }
        DataType::Raster => bail!("Can not create raster column {}", property.name),
    };
    Ok(format!("{} {}", quote_identifier(&property.name), sql_type))
}

/// Select list item, numeric and geometry values are read as text
fn select_expr(property: &Property) -> String {
    let col = quote_identifier(&property.name);
    match property.data_type {
        DataType::Numeric => format!("CAST({} AS TEXT)", col),
        DataType::Geometry => format!("ST_AsText({})", col),
        _ => col,
    }
}

/// Placeholder of an insert, `n` 1 based
fn insert_placeholder(property: &Property, n: usize) -> String {
    match property.data_type {
        DataType::Numeric => format!("CAST(CAST(${} AS TEXT) AS NUMERIC)", n),
        DataType::Geometry => {
            let srid = property.geometry.map(|g| g.srid).unwrap_or(0);
            format!("ST_GeomFromText(CAST(${} AS TEXT), {})", n, srid)
        }
        _ => format!("${}", n),
    }
}

/// Nulls are typed after the column, postgres checks parameter types even for nulls
fn sql_param(value: Value, data_type: DataType) -> Box<dyn ToSql + Sync> {
    match value {
        Value::Null => match data_type {
            DataType::Int16 => Box::new(Option::<i16>::None),
            DataType::Int32 => Box::new(Option::<i32>::None),
            DataType::Int64 => Box::new(Option::<i64>::None),
            DataType::Float => Box::new(Option::<f32>::None),
            DataType::Double => Box::new(Option::<f64>::None),
            DataType::DateTime => Box::new(Option::<NaiveDateTime>::None),
            DataType::ByteArray => Box::new(Option::<Vec<u8>>::None),
            DataType::Numeric | DataType::String | DataType::Geometry | DataType::Raster =>
                Box::new(Option::<String>::None),
        },
        Value::Int16(v) => Box::new(v),
        Value::Int32(v) => Box::new(v),
        Value::Int64(v) => Box::new(v),
        Value::Float(v) => Box::new(v),
        Value::Double(v) => Box::new(v),
        Value::Numeric(s) => Box::new(s),
        Value::String(s) => Box::new(s),
        Value::DateTime(dt) => Box::new(dt),
        v @ Value::Geometry(_) => Box::new(v.to_canonical_string()),
        Value::ByteArray(b) => Box::new(b),
    }
}

/// Value of a result column, decoded by its postgres type
fn row_value(row: &Row, idx: usize) -> Result<Value> {
    let ty = row.columns()[idx].type_().clone();
    let value = if ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx)?.map(Value::Int16)
    } else if ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx)?.map(Value::Int32)
    } else if ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx)?.map(Value::Int64)
    } else if ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx)?.map(Value::Float)
    } else if ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx)?.map(Value::Double)
    } else if ty == Type::TEXT || ty == Type::VARCHAR || ty == Type::BPCHAR || ty == Type::NAME {
        row.try_get::<_, Option<String>>(idx)?.map(Value::String)
    } else if ty == Type::TIMESTAMP {
        row.try_get::<_, Option<NaiveDateTime>>(idx)?.map(Value::DateTime)
    } else if ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(idx)?.map(Value::ByteArray)
    } else {
        bail!("Unsupported column type {} for column {}", ty, row.columns()[idx].name());
    };
    Ok(value.unwrap_or(Value::Null))
}

impl PostgisDataSource {
    /// `params` is a libpq style connection string
    pub fn connect(params: &str, schema: &str) -> Result<PostgisDataSource> {
        let client = Client::connect(params, NoTls)?;
        Ok(PostgisDataSource {
            client: RefCell::new(client),
            schema: schema.to_string(),
        })
    }

    fn table_name(&self, name: &str) -> String {
        quote_qualified_name(&format!("{}.{}", self.schema, name))
    }

    fn rows_to_dataset(&self, dataset_type: DataSetType, rows: Vec<Row>) -> Result<MemoryDataSet> {
        let mut ds = MemoryDataSet::new(dataset_type);
        for row in rows {
            let mut values = Vec::with_capacity(row.len());
            for (idx, property) in ds.schema().properties.iter().enumerate() {
                values.push(row_value(&row, idx)?.coerce_to(property.data_type, &property.name)?);
            }
            ds.push_row(values)?;
        }
        Ok(ds)
    }
}

impl DataSource for PostgisDataSource {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            prepared_queries: true,
            spatial_sql: true,
            primary_keys: true,
        }
    }

    fn dataset_exists(&self, name: &str) -> Result<bool> {
        let rows = self.client.borrow_mut().query(
            "SELECT 1 FROM information_schema.tables WHERE table_schema = $1 AND table_name = $2",
            &[&self.schema, &name])?;
        Ok(!rows.is_empty())
    }

    fn dataset_type(&self, name: &str) -> Result<DataSetType> {
        let mut client = self.client.borrow_mut();
        let columns = client.query(
            "SELECT column_name, data_type, udt_name FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 ORDER BY ordinal_position",
            &[&self.schema, &name])?;

        if columns.is_empty() {
            Err(ErrorKind::DatasetNotFound(name.to_string()))?;
        }

        let mut dataset_type = DataSetType::new(name);
        for col in columns {
            let col_name: String = col.try_get(0)?;
            let pg_type: String = col.try_get(1)?;
            let udt_name: String = col.try_get(2)?;

            let data_type = match data_type_of(&pg_type, &udt_name) {
                Some(DataType::Raster) | None => {
                    warn!("Skipping column {} of {} with type {}", col_name, name, pg_type);
                    continue;
                }
                Some(t) => t,
            };

            if data_type != DataType::Geometry {
                dataset_type.add_property(Property::new(&col_name, data_type, name));
                continue;
            }

            let geom = client.query(
                "SELECT type, srid FROM geometry_columns \
                 WHERE f_table_schema = $1 AND f_table_name = $2 AND f_geometry_column = $3",
                &[&self.schema, &name, &col_name])?;
            let (geom_type, srid) = match geom.first() {
                Some(g) => {
                    let type_name: String = g.try_get(0)?;
                    (type_name.parse().unwrap_or(GeomType::Unknown), g.try_get::<_, i32>(1)?)
                }
                None => (GeomType::Unknown, 0),
            };
            dataset_type.add_property(Property::geometry(&col_name, geom_type, srid, name));
        }

        Ok(dataset_type)
    }

    fn get_dataset<'a>(&'a self, name: &str) -> Result<Box<dyn DataSet + 'a>> {
        let dataset_type = self.dataset_type(name)?;
        let sql = format!("SELECT {} FROM {}",
                          dataset_type.properties.iter().map(select_expr).collect::<Vec<_>>().join(", "),
                          self.table_name(name));
        debug!("{}", sql);

        let rows = self.client.borrow_mut().query(sql.as_str(), &[])?;
        Ok(Box::new(self.rows_to_dataset(dataset_type, rows)?))
    }

    fn query<'a>(&'a self, query: &AggregateQuery) -> Result<Box<dyn DataSet + 'a>> {
        let input_type = self.dataset_type(&query.dataset)?;
        let result_type = query.result_type(&input_type)?;

        let mut qualified = query.clone();
        qualified.dataset = format!("{}.{}", self.schema, query.dataset);
        let sql = qualified.to_sql();
        debug!("{}", sql);

        let rows = self.client.borrow_mut().query(sql.as_str(), &[])?;
        Ok(Box::new(self.rows_to_dataset(result_type, rows)?))
    }

    fn create_dataset_type(&mut self, dataset_type: &DataSetType) -> Result<DataSetType> {
        if self.dataset_exists(&dataset_type.name)? {
            Err(ErrorKind::DatasetExists(dataset_type.name.clone()))?;
        }

        let columns = dataset_type.properties.iter()
            .map(column_definition)
            .collect::<Result<Vec<_>>>()?;
        let sql = format!("CREATE TABLE {} ({})", self.table_name(&dataset_type.name), columns.join(", "));
        debug!("{}", sql);
        self.client.get_mut().batch_execute(&sql)?;

        self.dataset_type(&dataset_type.name)
    }

    fn add(&mut self, name: &str, data: &mut dyn DataSet, options: &AddOptions) -> Result<()> {
        debug!("Adding to {} with options {:?}", name, options);
        let target = self.dataset_type(name)?;

        let mapping = target.properties.iter()
            .map(|p| data.schema().property_index(&p.name))
            .collect::<Result<Vec<_>>>()?;

        let sql = format!("INSERT INTO {} ({}) VALUES ({})",
                          self.table_name(name),
                          target.properties.iter().map(|p| quote_identifier(&p.name)).collect::<Vec<_>>().join(", "),
                          target.properties.iter().enumerate().map(|(i, p)| insert_placeholder(p, i + 1)).collect::<Vec<_>>().join(", "));

        let client = self.client.get_mut();
        let mut tx = client.transaction()?;
        let statement = tx.prepare(&sql)?;

        let mut num_rows = 0;
        while data.move_next()? {
            let mut params = Vec::with_capacity(mapping.len());
            for (&src_idx, property) in mapping.iter().zip(target.properties.iter()) {
                let value = data.value(src_idx)?.coerce_to(property.data_type, &property.name)?;
                params.push(sql_param(value, property.data_type));
            }
            let refs: Vec<&(dyn ToSql + Sync)> = params.iter().map(|p| p.as_ref()).collect();
            tx.execute(&statement, &refs)?;
            num_rows += 1;
        }

        tx.commit()?;
        debug!("Inserted {} rows in to {}", num_rows, name);
        Ok(())
    }

    fn add_primary_key(&mut self, name: &str, column: &str) -> Result<()> {
        let sql = format!("ALTER TABLE {} ADD PRIMARY KEY ({})", self.table_name(name), quote_identifier(column));
        self.client.get_mut().batch_execute(&sql)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mapping() {
        assert_eq!(Some(DataType::Int32), data_type_of("integer", "int4"));
        assert_eq!(Some(DataType::String), data_type_of("character varying", "varchar"));
        assert_eq!(Some(DataType::Geometry), data_type_of("USER-DEFINED", "geometry"));
        assert_eq!(None, data_type_of("USER-DEFINED", "hstore"));
        assert_eq!(None, data_type_of("json", "json"));
    }

    #[test]
    fn test_column_definition() {
        let geom = Property::geometry("geom", GeomType::MultiPolygon, 2056, "");
        assert_eq!("\"geom\" geometry(MultiPolygon, 2056)", column_definition(&geom).unwrap());
        assert_eq!("ST_GeomFromText(CAST($3 AS TEXT), 2056)", insert_placeholder(&geom, 3));
        assert_eq!("ST_AsText(\"geom\")", select_expr(&geom));

        let pop = Property::new("pop", DataType::Double, "");
        assert_eq!("\"pop\" double precision", column_definition(&pop).unwrap());
        assert!(column_definition(&Property::new("r", DataType::Raster, "")).is_err());
    }
}
