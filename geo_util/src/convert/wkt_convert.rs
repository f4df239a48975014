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
use anyhow::{anyhow, Result};
use geo::Geometry;
use wkt::{ToWkt, TryFromWkt};

pub fn geometry_from_wkt(wkt_str: &str) -> Result<Geometry<f64>> {
    Geometry::<f64>::try_from_wkt_str(wkt_str.trim())
        .map_err(|e| anyhow!("Invalid WKT '{}': {}", wkt_str, e))
}

pub fn geometry_to_wkt(geom: &Geometry<f64>) -> String {
    geom.wkt_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, Point, polygon};

    #[test]
    fn test_import_export_point() {
        let geom = geometry_from_wkt("POINT (1 2)").unwrap();
        assert_eq!(geom, Geometry::Point(Point(Coord { x: 1., y: 2. })));

        let back = geometry_from_wkt(&geometry_to_wkt(&geom)).unwrap();
        assert_eq!(geom, back);
    }

    #[test]
    fn test_import_polygon() {
        let geom = geometry_from_wkt("POLYGON ((0 0,1 0,1 1,0 0))").unwrap();
        let expected: Geometry<f64> = polygon![(x: 0., y: 0.), (x: 1., y: 0.), (x: 1., y: 1.), (x: 0., y: 0.)].into();
        assert_eq!(expected, geom);
    }

    #[test]
    fn test_invalid() {
        assert!(geometry_from_wkt("POLYGON ((0 0").is_err());
    }
}
