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
use std::collections::HashSet;
use geo::{BooleanOps, Coord, Geometry, GeometryCollection, LineString, LinesIter, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};

/// Polygons making up a polygonal geometry, None if the geometry is not polygonal
pub fn polygons_of(geom: Geometry<f64>) -> Option<Vec<Polygon<f64>>> {
    match geom {
        Geometry::Polygon(p) => Some(vec![p]),
        Geometry::MultiPolygon(mp) => Some(mp.0),
        Geometry::Rect(r) => Some(vec![r.to_polygon()]),
        Geometry::Triangle(t) => Some(vec![t.to_polygon()]),
        Geometry::GeometryCollection(gc) => {
            let mut polygons = Vec::new();
            for g in gc.0 {
                polygons.extend(polygons_of(g)?);
            }
            Some(polygons)
        }
        Geometry::Point(_) | Geometry::MultiPoint(_) |
        Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => None,
    }
}

pub fn lines_of(geom: Geometry<f64>) -> Option<Vec<LineString<f64>>> {
    match geom {
        Geometry::Line(l) => Some(vec![LineString::from(vec![l.start, l.end])]),
        Geometry::LineString(ls) => Some(vec![ls]),
        Geometry::MultiLineString(mls) => Some(mls.0),
        Geometry::GeometryCollection(gc) => {
            let mut lines = Vec::new();
            for g in gc.0 {
                lines.extend(lines_of(g)?);
            }
            Some(lines)
        }
        Geometry::Point(_) | Geometry::MultiPoint(_) |
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) |
        Geometry::Rect(_) | Geometry::Triangle(_) => None,
    }
}

pub fn points_of(geom: Geometry<f64>) -> Option<Vec<Point<f64>>> {
    match geom {
        Geometry::Point(p) => Some(vec![p]),
        Geometry::MultiPoint(mp) => Some(mp.0),
        Geometry::GeometryCollection(gc) => {
            let mut points = Vec::new();
            for g in gc.0 {
                points.extend(points_of(g)?);
            }
            Some(points)
        }
        Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) |
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) |
        Geometry::Rect(_) | Geometry::Triangle(_) => None,
    }
}

/// Progressively unions the polygons, the result is always a multipolygon even if
/// everything merged in to 1 shape
pub fn union_polygons<I>(polygons: I) -> MultiPolygon<f64>
    where I: IntoIterator<Item=Polygon<f64>>
{
    let mut merged: Option<MultiPolygon<f64>> = None;

    for polygon in polygons {
        let next = MultiPolygon::new(vec![polygon]);
        merged = Some(match merged {
            None => next,
            Some(m) => m.union(&next),
        });
    }

    merged.unwrap_or_else(|| MultiPolygon::new(Vec::new()))
}

/// Exact duplicates are only kept once
pub fn union_points<I>(points: I) -> MultiPoint<f64>
    where I: IntoIterator<Item=Point<f64>>
{
    let mut unique: Vec<Point<f64>> = Vec::new();
    for p in points {
        if !unique.contains(&p) {
            unique.push(p);
        }
    }
    MultiPoint::new(unique)
}

type SegmentKey = ((u64, u64), (u64, u64));

fn coord_key(c: Coord<f64>) -> (u64, u64) {
    (c.x.to_bits(), c.y.to_bits())
}

//same key in both directions
fn segment_key(start: Coord<f64>, end: Coord<f64>) -> SegmentKey {
    let (a, b) = (coord_key(start), coord_key(end));
    if a <= b { (a, b) } else { (b, a) }
}

/// Merges lines segment by segment, a segment already covered by an earlier line is
/// dropped and what remains of each line is chained back together.
///
/// Lines are not noded, so overlaps that do not share vertices are kept twice.
pub fn union_lines<I>(lines: I) -> MultiLineString<f64>
    where I: IntoIterator<Item=LineString<f64>>
{
    let mut seen: HashSet<SegmentKey> = HashSet::new();
    let mut merged: Vec<LineString<f64>> = Vec::new();

    for line in lines {
        let mut current: Vec<Coord<f64>> = Vec::new();

        for segment in line.lines_iter() {
            if !seen.insert(segment_key(segment.start, segment.end)) {
                if current.len() > 1 {
                    merged.push(LineString::new(std::mem::take(&mut current)));
                }
                current.clear();
                continue;
            }
            if current.last() != Some(&segment.start) {
                if current.len() > 1 {
                    merged.push(LineString::new(std::mem::take(&mut current)));
                }
                current = vec![segment.start];
            }
            current.push(segment.end);
        }

        if current.len() > 1 {
            merged.push(LineString::new(current));
        }
    }

    MultiLineString::new(merged)
}

fn flatten_into(geom: Geometry<f64>, out: &mut Vec<Geometry<f64>>) {
    match geom {
        Geometry::GeometryCollection(gc) => {
            for g in gc.0 {
                flatten_into(g, out);
            }
        }
        g => out.push(g),
    }
}

pub fn flatten_collection<I>(geoms: I) -> GeometryCollection<f64>
    where I: IntoIterator<Item=Geometry<f64>>
{
    let mut out = Vec::new();
    for g in geoms {
        flatten_into(g, &mut out);
    }
    GeometryCollection(out)
}
