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
//! Layers stored as csv, geometry as WKT in one column

use std::io;
use std::path::Path;
use anyhow::{anyhow, bail, Result};
use csv::{ReaderBuilder, WriterBuilder};
use log::debug;

use geo_util::convert::geometry_from_wkt;
use geo_util::vector::GeomType;
use vp_agg::datasource::{DataSet, MemoryDataSet};
use vp_agg::schema::{DataSetType, Property};
use vp_agg::value::{DataType, Value};

pub struct CsvLayerOptions<'a> {
    pub layer_name: &'a str,
    pub geom_column: Option<&'a str>,
    /// Guessed from the first geometry if None
    pub geom_type: Option<GeomType>,
    pub srid: i32,
}

/// Int64 if every cell is an integer, Double if every cell is a number, String otherwise.
/// Empty cells are ignored
pub fn infer_column_type<'a, I>(cells: I) -> DataType
    where I: IntoIterator<Item=&'a str>
{
    let mut data_type = None;
    for cell in cells.into_iter().filter(|c| !c.is_empty()) {
        let cell_type = if cell.parse::<i64>().is_ok() {
            DataType::Int64
        } else if cell.parse::<f64>().is_ok() {
            DataType::Double
        } else {
            return DataType::String;
        };
        data_type = match (data_type, cell_type) {
            (None, t) => Some(t),
            (Some(DataType::Int64), DataType::Int64) => Some(DataType::Int64),
            _ => Some(DataType::Double),
        };
    }
    data_type.unwrap_or(DataType::String)
}

fn parse_cell(cell: &str, data_type: DataType, column: &str) -> Result<Value> {
    if cell.is_empty() {
        return Ok(Value::Null);
    }
    let value = match data_type {
        DataType::Int64 => cell.parse().ok().map(Value::Int64),
        DataType::Double => cell.parse().ok().map(Value::Double),
        DataType::Geometry => geometry_from_wkt(cell).ok().map(Value::Geometry),
        _ => Some(Value::String(cell.to_string())),
    };
    match value {
        Some(v) => Ok(v),
        None => bail!("Invalid {} value '{}' in column {}", data_type, cell, column)
    }
}

pub fn read_layer<R: io::Read>(reader: R, options: &CsvLayerOptions) -> Result<MemoryDataSet> {
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(|h| h.to_string()).collect();
    let records = csv_reader.records().collect::<Result<Vec<_>, _>>()?;

    let geom_idx = match options.geom_column {
        Some(name) => Some(headers.iter().position(|h| h == name)
            .ok_or_else(|| anyhow!("Geometry column {} not found in {:?}", name, headers))?),
        None => None,
    };

    let mut schema = DataSetType::new(options.layer_name);
    for (idx, name) in headers.iter().enumerate() {
        if Some(idx) == geom_idx {
            continue;
        }
        let data_type = infer_column_type(records.iter().map(|r| r.get(idx).unwrap_or("")));
        debug!("Column {} is {}", name, data_type);
        schema.add_property(Property::new(name, data_type, options.layer_name));
    }

    let mut geoms = Vec::with_capacity(records.len());
    if let Some(idx) = geom_idx {
        for r in &records {
            geoms.push(parse_cell(r.get(idx).unwrap_or(""), DataType::Geometry, &headers[idx])?);
        }
        let geom_type = match options.geom_type {
            Some(t) => t,
            None => geoms.iter().find_map(|g| g.as_geometry()).map(GeomType::of).unwrap_or_default(),
        };
        schema.add_property(Property::geometry(&headers[idx], geom_type, options.srid, options.layer_name));
    }

    let attr_columns: Vec<usize> = (0..headers.len()).filter(|i| Some(*i) != geom_idx).collect();

    let mut ds = MemoryDataSet::new(schema);
    for (row_idx, r) in records.iter().enumerate() {
        let mut row = Vec::with_capacity(headers.len());
        for (prop_idx, &col) in attr_columns.iter().enumerate() {
            let property = &ds.schema().properties[prop_idx];
            row.push(parse_cell(r.get(col).unwrap_or(""), property.data_type, &property.name)?);
        }
        if geom_idx.is_some() {
            row.push(std::mem::replace(&mut geoms[row_idx], Value::Null));
        }
        ds.push_row(row)?;
    }

    Ok(ds)
}

pub fn read_layer_from_path(path: &Path, options: &CsvLayerOptions) -> Result<MemoryDataSet> {
    let file = std::fs::File::open(path)
        .map_err(|e| anyhow!("Unable to open {:?}: {}", path, e))?;
    read_layer(file, options)
}

/// Header then one record per row, null is an empty cell
pub fn write_layer<W: io::Write>(ds: &MemoryDataSet, writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);

    csv_writer.write_record(ds.schema().column_names())?;
    for row in ds.rows() {
        csv_writer.write_record(row.iter().map(|v| v.to_canonical_string().unwrap_or_default()))?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn write_layer_to_path(ds: &MemoryDataSet, path: &Path) -> Result<()> {
    if path.exists() {
        bail!("{:?} already exists", path);
    }
    debug!("Creating csv at {:?}", path);
    let file = std::fs::File::create(path)?;
    write_layer(ds, file)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYER: &str = "region,pop,name,wkt
A,100,town hall,\"POLYGON((0 0,1 0,1 1,0 1,0 0))\"
A,200.5,,\"POLYGON((1 0,2 0,2 1,1 1,1 0))\"
B,,farm,
";

    fn options() -> CsvLayerOptions<'static> {
        CsvLayerOptions {
            layer_name: "buildings",
            geom_column: Some("wkt"),
            geom_type: None,
            srid: 4326,
        }
    }

    #[test]
    fn test_infer_column_type() {
        assert_eq!(DataType::Int64, infer_column_type(vec!["1", "", "-3"]));
        assert_eq!(DataType::Double, infer_column_type(vec!["1", "2.5"]));
        assert_eq!(DataType::String, infer_column_type(vec!["1", "x"]));
        assert_eq!(DataType::String, infer_column_type(vec!["", ""]));
    }

    #[test]
    fn test_read_layer() {
        let ds = read_layer(LAYER.as_bytes(), &options()).unwrap();

        assert_eq!(vec!["region", "pop", "name", "wkt"], ds.schema().column_names());
        assert_eq!(DataType::Double, ds.schema().properties[1].data_type);
        let geom = ds.schema().properties[3].geometry.unwrap();
        assert_eq!(GeomType::Polygon, geom.geom_type);
        assert_eq!(4326, geom.srid);

        assert_eq!(3, ds.len());
        assert_eq!(Value::Double(200.5), ds.rows()[1][1]);
        assert_eq!(Value::Null, ds.rows()[1][2]);
        assert_eq!(Value::Null, ds.rows()[2][3]);
    }

    #[test]
    fn test_geometry_column_last() {
        let text = "wkt,id\n\"POINT(1 2)\",7\n";
        let ds = read_layer(text.as_bytes(), &options()).unwrap();
        assert_eq!(vec!["id", "wkt"], ds.schema().column_names());
        assert_eq!(Value::Int64(7), ds.rows()[0][0]);
        assert_eq!(GeomType::Point, ds.schema().properties[1].geometry.unwrap().geom_type);
    }

    #[test]
    fn test_missing_geometry_column() {
        let options = CsvLayerOptions { geom_column: Some("geom"), ..options() };
        assert!(read_layer(LAYER.as_bytes(), &options).is_err());
    }

    #[test]
    fn test_write_layer() {
        let ds = read_layer("id,name\n1,a\n2,\n".as_bytes(), &CsvLayerOptions { geom_column: None, ..options() }).unwrap();

        let mut out = Vec::new();
        write_layer(&ds, &mut out).unwrap();
        assert_eq!("id,name\n1,a\n2,\n", String::from_utf8(out).unwrap());
    }
}
