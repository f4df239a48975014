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
use anyhow::Result;
use serde::{Deserialize, Serialize};

use geo_util::vector::GeomType;

use crate::errors::ErrorKind;
use crate::value::DataType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryInfo {
    pub geom_type: GeomType,
    pub srid: i32,
}

/// A column of a dataset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub data_type: DataType,
    /// Name of the dataset owning this property
    pub dataset_name: String,
    /// Only set for geometry properties
    pub geometry: Option<GeometryInfo>,
}

impl Property {
    pub fn new(name: &str, data_type: DataType, dataset_name: &str) -> Self {
        Property {
            name: name.to_string(),
            data_type,
            dataset_name: dataset_name.to_string(),
            geometry: None,
        }
    }

    pub fn geometry(name: &str, geom_type: GeomType, srid: i32, dataset_name: &str) -> Self {
        Property {
            name: name.to_string(),
            data_type: DataType::Geometry,
            dataset_name: dataset_name.to_string(),
            geometry: Some(GeometryInfo { geom_type, srid }),
        }
    }
}

/// Schema of a dataset
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataSetType {
    pub name: String,
    pub properties: Vec<Property>,
    pub primary_key: Option<String>,
}

impl DataSetType {
    pub fn new(name: &str) -> Self {
        DataSetType {
            name: name.to_string(),
            properties: Vec::new(),
            primary_key: None,
        }
    }

    /// Adds a property, owned by this dataset
    pub fn add_property(&mut self, mut property: Property) {
        property.dataset_name = self.name.clone();
        self.properties.push(property);
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.add_property(property);
        self
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    pub fn property_index(&self, name: &str) -> Result<usize> {
        match self.properties.iter().position(|p| p.name == name) {
            Some(idx) => Ok(idx),
            None => Err(ErrorKind::InvalidPropertyName {
                property_name: name.to_string(),
                dataset_name: self.name.clone(),
            })?,
        }
    }

    pub fn property(&self, name: &str) -> Result<&Property> {
        let idx = self.property_index(name)?;
        Ok(&self.properties[idx])
    }

    /// First geometry property, with its index
    pub fn geometry_property(&self) -> Option<(usize, &Property)> {
        self.properties.iter().enumerate().find(|(_, p)| p.data_type == DataType::Geometry)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.properties.iter().map(|p| p.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> DataSetType {
        DataSetType::new("buildings")
            .with_property(Property::new("region", DataType::String, ""))
            .with_property(Property::new("pop", DataType::Int32, ""))
            .with_property(Property::geometry("geom", GeomType::Polygon, 4326, ""))
    }

    #[test]
    fn test_property_lookup() {
        let s = schema();
        assert_eq!(1, s.property_index("pop").unwrap());
        assert_eq!("buildings", s.property("pop").unwrap().dataset_name);

        let (geom_idx, geom) = s.geometry_property().unwrap();
        assert_eq!(2, geom_idx);
        assert_eq!(4326, geom.geometry.unwrap().srid);

        assert_eq!(vec!["region", "pop", "geom"], s.column_names());
    }

    #[test]
    fn test_invalid_property() {
        let err = schema().property_index("height").unwrap_err();
        assert_eq!(Some(&ErrorKind::InvalidPropertyName {
            property_name: "height".to_string(),
            dataset_name: "buildings".to_string(),
        }), err.downcast_ref::<ErrorKind>());
    }
}
