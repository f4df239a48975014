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
use geo::Geometry;
use log::warn;

use geo_util::vector::{flatten_collection, lines_of, points_of, polygons_of, union_lines, union_points, union_polygons, GeomType};

/// Merges the non null geometries of a group in to one geometry of the collection type
/// of `target`.
///
/// Returns None if there is nothing to merge.  Members that are not of the target
/// family are skipped.
///
/// Lines are merged on shared segments only, see [union_lines].
pub fn merge_geometries<I>(geoms: I, target: GeomType) -> Option<Geometry<f64>>
    where I: IntoIterator<Item=Geometry<f64>>
{
    let geoms: Vec<_> = geoms.into_iter().collect();
    if geoms.is_empty() {
        return None;
    }

    let target = target.collection_type();
    let mut skipped = 0;

    let merged = match target {
        GeomType::MultiPolygon => {
            let polygons = geoms.into_iter()
                .filter_map(|g| polygons_of(g).or_else(|| { skipped += 1; None }))
                .flatten()
                .collect::<Vec<_>>();
            Geometry::MultiPolygon(union_polygons(polygons))
        }
        GeomType::MultiLineString => {
            let lines = geoms.into_iter()
                .filter_map(|g| lines_of(g).or_else(|| { skipped += 1; None }))
                .flatten()
                .collect::<Vec<_>>();
            Geometry::MultiLineString(union_lines(lines))
        }
        GeomType::MultiPoint => {
            let points = geoms.into_iter()
                .filter_map(|g| points_of(g).or_else(|| { skipped += 1; None }))
                .flatten()
                .collect::<Vec<_>>();
            Geometry::MultiPoint(union_points(points))
        }
        _ => Geometry::GeometryCollection(flatten_collection(geoms)),
    };

    if skipped > 0 {
        warn!("Skipped {} geometries that can not be merged in to a {}", skipped, target);
    }

    Some(merged)
}
