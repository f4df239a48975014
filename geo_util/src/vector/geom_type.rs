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
use std::str::FromStr;
use anyhow::{bail, Result};
use geo::Geometry;
use serde::{Deserialize, Serialize};

/// Geometry kind of a geometry column or value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeomType {
    Unknown,
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl Default for GeomType {
    fn default() -> Self {
        GeomType::Unknown
    }
}

impl GeomType {
    pub fn of(geom: &Geometry<f64>) -> GeomType {
        match geom {
            Geometry::Point(_) => GeomType::Point,
            Geometry::Line(_) => GeomType::LineString,
            Geometry::LineString(_) => GeomType::LineString,
            Geometry::Polygon(_) => GeomType::Polygon,
            Geometry::Rect(_) => GeomType::Polygon,
            Geometry::Triangle(_) => GeomType::Polygon,
            Geometry::MultiPoint(_) => GeomType::MultiPoint,
            Geometry::MultiLineString(_) => GeomType::MultiLineString,
            Geometry::MultiPolygon(_) => GeomType::MultiPolygon,
            Geometry::GeometryCollection(_) => GeomType::GeometryCollection,
        }
    }

    /// The multi part variant, used so every output row has the same geometry type
    pub fn collection_type(&self) -> GeomType {
        match self {
            GeomType::Point | GeomType::MultiPoint => GeomType::MultiPoint,
            GeomType::LineString | GeomType::MultiLineString => GeomType::MultiLineString,
            GeomType::Polygon | GeomType::MultiPolygon => GeomType::MultiPolygon,
            GeomType::GeometryCollection | GeomType::Unknown => GeomType::GeometryCollection,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GeomType::Unknown => "Geometry",
            GeomType::Point => "Point",
            GeomType::LineString => "LineString",
            GeomType::Polygon => "Polygon",
            GeomType::MultiPoint => "MultiPoint",
            GeomType::MultiLineString => "MultiLineString",
            GeomType::MultiPolygon => "MultiPolygon",
            GeomType::GeometryCollection => "GeometryCollection",
        }
    }
}

impl fmt::Display for GeomType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for GeomType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let geom_type = match s.to_ascii_lowercase().as_str() {
            "geometry" | "unknown" => GeomType::Unknown,
            "point" => GeomType::Point,
            "linestring" | "line" => GeomType::LineString,
            "polygon" => GeomType::Polygon,
            "multipoint" => GeomType::MultiPoint,
            "multilinestring" => GeomType::MultiLineString,
            "multipolygon" => GeomType::MultiPolygon,
            "geometrycollection" => GeomType::GeometryCollection,
            _ => bail!("Unknown geometry type {}", s)
        };
        Ok(geom_type)
    }
}
