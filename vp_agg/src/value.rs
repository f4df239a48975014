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
use std::fmt;
use anyhow::Result;
use chrono::NaiveDateTime;
use geo::Geometry;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use geo_util::convert::{geometry_from_wkt, geometry_to_wkt};

use crate::errors::ErrorKind;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Semantic type of a property
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    /// Arbitrary precision number stored as its string
    Numeric,
    String,
    DateTime,
    Geometry,
    ByteArray,
    Raster,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        match self {
            DataType::Int16 | DataType::Int32 | DataType::Int64 |
            DataType::Float | DataType::Double | DataType::Numeric => true,
            DataType::String | DataType::DateTime | DataType::Geometry |
            DataType::ByteArray | DataType::Raster => false,
        }
    }

    /// Summarized as strings, datetimes sort correctly in their canonical form
    pub fn is_textual(&self) -> bool {
        match self {
            DataType::String | DataType::DateTime => true,
            DataType::Int16 | DataType::Int32 | DataType::Int64 |
            DataType::Float | DataType::Double | DataType::Numeric |
            DataType::Geometry | DataType::ByteArray | DataType::Raster => false,
        }
    }

    /// Values that have a canonical string form, and so can be used in a group key
    pub fn is_groupable(&self) -> bool {
        self.is_numeric() || self.is_textual()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Numeric(String),
    String(String),
    DateTime(NaiveDateTime),
    Geometry(Geometry<f64>),
    ByteArray(Vec<u8>),
}

impl Value {
    /// None for Null
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Int16(_) => Some(DataType::Int16),
            Value::Int32(_) => Some(DataType::Int32),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float(_) => Some(DataType::Float),
            Value::Double(_) => Some(DataType::Double),
            Value::Numeric(_) => Some(DataType::Numeric),
            Value::String(_) => Some(DataType::String),
            Value::DateTime(_) => Some(DataType::DateTime),
            Value::Geometry(_) => Some(DataType::Geometry),
            Value::ByteArray(_) => Some(DataType::ByteArray),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value.  Numeric strings that do not parse are treated as null
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int16(v) => Some(*v as f64),
            Value::Int32(v) => Some(*v as f64),
            Value::Int64(v) => Some(*v as f64),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Numeric(s) => s.trim().parse::<f64>().ok(),
            Value::Null | Value::String(_) | Value::DateTime(_) |
            Value::Geometry(_) | Value::ByteArray(_) => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&Geometry<f64>> {
        match self {
            Value::Geometry(g) => Some(g),
            _ => None
        }
    }

    /// The string used in group keys and in textual outputs.  None for Null
    pub fn to_canonical_string(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Int16(v) => Some(v.to_string()),
            Value::Int32(v) => Some(v.to_string()),
            Value::Int64(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::Double(v) => Some(v.to_string()),
            Value::Numeric(s) => Some(s.clone()),
            Value::String(s) => Some(s.clone()),
            Value::DateTime(dt) => Some(dt.format(DATETIME_FORMAT).to_string()),
            Value::Geometry(g) => Some(geometry_to_wkt(g)),
            Value::ByteArray(b) => Some(hex::encode(b)),
        }
    }

    /// Converts the value so it can be stored in a column of `target` type.
    /// `column_name` is only used for the error message
    pub fn coerce_to(self, target: DataType, column_name: &str) -> Result<Value> {
        if self.is_null() || self.data_type() == Some(target) {
            return Ok(self);
        }

        let value_type = self.data_type();

        let coerced = match target {
            DataType::Double => self.as_f64().map(Value::Double).or_else(|| match &self {
                Value::String(s) => s.trim().parse::<f64>().ok().map(Value::Double),
                _ => None
            }),
            DataType::Float => self.as_f64().and_then(|v| v.to_f32()).map(Value::Float),
            DataType::Int16 => integral(&self).and_then(|v| v.to_i16()).map(Value::Int16),
            DataType::Int32 => integral(&self).and_then(|v| v.to_i32()).map(Value::Int32),
            DataType::Int64 => integral(&self).and_then(|v| v.to_i64()).map(Value::Int64),
            DataType::Numeric => match &self {
                Value::Geometry(_) | Value::ByteArray(_) | Value::DateTime(_) => None,
                _ => self.as_f64().or_else(|| match &self {
                        Value::String(s) => s.trim().parse::<f64>().ok(),
                        _ => None
                    }).and_then(|_| self.to_canonical_string()).map(Value::Numeric),
            },
            DataType::String => self.to_canonical_string().map(Value::String),
            DataType::DateTime => match &self {
                Value::String(s) => NaiveDateTime::parse_from_str(s.trim(), DATETIME_FORMAT).ok().map(Value::DateTime),
                _ => None
            },
            DataType::Geometry => match &self {
                Value::String(s) => geometry_from_wkt(s).ok().map(Value::Geometry),
                _ => None
            },
            DataType::ByteArray => match &self {
                Value::String(s) => hex::decode(s.trim()).ok().map(Value::ByteArray),
                _ => None
            },
            DataType::Raster => None,
        };

        match coerced {
            Some(v) => Ok(v),
            None => Err(ErrorKind::TypeMismatch {
                //checked for null above
                value_type: value_type.unwrap_or(target),
                column_name: column_name.to_string(),
                column_type: target,
            })?,
        }
    }
}

/// Integer view, doubles are only accepted without a fractional part
fn integral(value: &Value) -> Option<i64> {
    match value {
        Value::Int16(v) => Some(*v as i64),
        Value::Int32(v) => Some(*v as i64),
        Value::Int64(v) => Some(*v),
        Value::String(s) | Value::Numeric(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| s.parse::<f64>().ok().and_then(whole_f64))
        }
        Value::Float(v) => whole_f64(*v as f64),
        Value::Double(v) => whole_f64(*v),
        Value::Null | Value::DateTime(_) | Value::Geometry(_) | Value::ByteArray(_) => None,
    }
}

fn whole_f64(v: f64) -> Option<i64> {
    if v.fract() == 0.0 {
        v.to_i64()
    } else {
        None
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.to_canonical_string() {
            Some(s) => write!(f, "{}", s),
            None => write!(f, "NULL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Geometry};
    use chrono::NaiveDate;

    #[test]
    fn test_as_f64() {
        assert_eq!(Some(3.0), Value::Int16(3).as_f64());
        assert_eq!(Some(-7.0), Value::Int64(-7).as_f64());
        assert_eq!(Some(2.5), Value::Numeric(" 2.5".to_string()).as_f64());
        assert_eq!(None, Value::Numeric("abc".to_string()).as_f64());
        assert_eq!(None, Value::String("2.5".to_string()).as_f64());
        assert_eq!(None, Value::Null.as_f64());
    }

    #[test]
    fn test_canonical_string() {
        assert_eq!(Some("4".to_string()), Value::Double(4.0).to_canonical_string());
        assert_eq!(Some("4.5".to_string()), Value::Double(4.5).to_canonical_string());
        assert_eq!(Some("0a0b".to_string()), Value::ByteArray(vec![10, 11]).to_canonical_string());

        let dt = NaiveDate::from_ymd_opt(2021, 3, 4).unwrap().and_hms_opt(5, 6, 7).unwrap();
        assert_eq!(Some("2021-03-04 05:06:07".to_string()), Value::DateTime(dt).to_canonical_string());
        assert_eq!(None, Value::Null.to_canonical_string());
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(Value::Double(300.0), Value::Int64(300).coerce_to(DataType::Double, "c").unwrap());
        assert_eq!(Value::Double(1.5), Value::String("1.5".to_string()).coerce_to(DataType::Double, "c").unwrap());
        assert_eq!(Value::Int32(2), Value::Int64(2).coerce_to(DataType::Int32, "c").unwrap());
        assert_eq!(Value::Int32(2), Value::Double(2.0).coerce_to(DataType::Int32, "c").unwrap());
        assert_eq!(Value::Null, Value::Null.coerce_to(DataType::Double, "c").unwrap());

        //large values representable in a double keep their value
        let big = 1_i64 << 52;
        assert_eq!(Value::Double(big as f64), Value::Int64(big).coerce_to(DataType::Double, "c").unwrap());
    }

    #[test]
    fn test_coerce_to_string() {
        assert_eq!(Value::String("3".to_string()), Value::Int64(3).coerce_to(DataType::String, "c").unwrap());
        assert_eq!(Value::String("abc".to_string()), Value::String("abc".to_string()).coerce_to(DataType::String, "c").unwrap());
    }

    #[test]
    fn test_coerce_mismatch() {
        let err = Value::Int64(i64::MAX).coerce_to(DataType::Int32, "NUM_OBJ").unwrap_err();
        match err.downcast_ref::<ErrorKind>() {
            Some(ErrorKind::TypeMismatch { column_name, column_type, value_type }) => {
                assert_eq!("NUM_OBJ", column_name);
                assert_eq!(DataType::Int32, *column_type);
                assert_eq!(DataType::Int64, *value_type);
            }
            _ => panic!("Expected a type mismatch, got {}", err)
        }

        assert!(Value::Double(2.5).coerce_to(DataType::Int32, "c").is_err());
        assert!(Value::String("x".to_string()).coerce_to(DataType::Double, "c").is_err());
    }

    #[test]
    fn test_coerce_geometry_from_wkt() {
        let v = Value::String("POLYGON ((0 0,1 0,1 1,0 0))".to_string()).coerce_to(DataType::Geometry, "geom").unwrap();
        let expected: Geometry<f64> = polygon![(x: 0., y: 0.), (x: 1., y: 0.), (x: 1., y: 1.), (x: 0., y: 0.)].into();
        assert_eq!(Value::Geometry(expected), v);
    }
}
