use super::{distance, distance2, vector_norm, GeometryError, Point, Vec2};

/// Where a point sits relative to a segment or polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolylineDistance {
    /// Square of the distance from the point to the closest point on the line.
    pub squared_distance: f64,
    /// Distance along the line. Negative before the start, past the length after the end
    /// (single segments only).
    pub distance_along_line: f64,
    /// Signed distance from the line. Positive means right of the line's direction.
    pub perpendicular_distance: f64,
}

/// Closest point on the segment a->b, its distance along the segment and perpendicular to it.
///
/// Works in the basis formed by the direction of (b - a) and its perpendicular, so the
/// perpendicular coordinate is the distance to the infinite line. The endpoints only matter
/// when the projection falls outside the segment.
pub fn closest_point_on_segment(a: &Point, b: &Point, pt: &Point) -> PolylineDistance {
    let b_minus_a: Vec2 = b - a;
    let ba_norm = vector_norm(&b_minus_a);
    if ba_norm == 0.0 {
        // Zero-length segment: behaves like the point a.
        return PolylineDistance {
            squared_distance: distance2(a, pt),
            distance_along_line: 0.0,
            perpendicular_distance: 0.0,
        };
    }

    let ab = b_minus_a * (1.0 / ba_norm);
    let (dx, dy) = (ab.x, ab.y);
    let pt_a = pt - a;

    let distance_along_line = dx * pt_a.x + dy * pt_a.y;
    let perpendicular_distance = dx * pt_a.y - dy * pt_a.x;

    let squared_distance = if distance_along_line < 0.0 {
        distance2(a, pt)
    } else if distance_along_line > ba_norm {
        distance2(pt, b)
    } else {
        perpendicular_distance * perpendicular_distance
    };

    PolylineDistance {
        squared_distance,
        distance_along_line,
        perpendicular_distance,
    }
}

fn segment_count(vertices: &[Point], is_closed: bool) -> usize {
    if is_closed {
        vertices.len()
    } else {
        vertices.len().saturating_sub(1)
    }
}

/// Distance from a point to the closest point on a polyline.
///
/// `distance_along_line` of the result is measured from the first vertex, accumulating the
/// full length of every segment before the closest one.
pub fn polyline_distance(
    vertices: &[Point],
    pt: &Point,
    is_closed: bool,
) -> Result<PolylineDistance, GeometryError> {
    if vertices.len() < 2 {
        return Err(GeometryError::TooFewVertices(vertices.len()));
    }

    let mut total_d = 0.0;
    let mut closest: Option<PolylineDistance> = None;

    for i in 0..segment_count(vertices, is_closed) {
        let a = &vertices[i];
        let b = &vertices[(i + 1) % vertices.len()];
        let mut this_d = closest_point_on_segment(a, b, pt);
        let is_closer = closest
            .map(|c| this_d.squared_distance < c.squared_distance)
            .unwrap_or(true);
        if is_closer {
            this_d.distance_along_line += total_d;
            closest = Some(this_d);
        }
        total_d += distance(a, b);
    }

    closest.ok_or(GeometryError::TooFewVertices(vertices.len()))
}

/// Total arc length of a polyline.
pub fn polyline_length(vertices: &[Point], is_closed: bool) -> f64 {
    (0..segment_count(vertices, is_closed))
        .map(|i| distance(&vertices[i], &vertices[(i + 1) % vertices.len()]))
        .sum()
}

/// The point at distance `d` along a polyline.
pub fn point_along_polyline(
    vertices: &[Point],
    d: f64,
    is_closed: bool,
) -> Result<Point, GeometryError> {
    if vertices.len() < 2 {
        return Err(GeometryError::TooFewVertices(vertices.len()));
    }

    let mut total_d = 0.0;
    for i in 0..segment_count(vertices, is_closed) {
        let a = &vertices[i];
        let b = &vertices[(i + 1) % vertices.len()];
        let len = distance(a, b);
        if total_d + len >= d {
            if len == 0.0 {
                return Ok(*a);
            }
            let frac = (d - total_d) / len;
            return Ok(Point::new(
                a.x * (1.0 - frac) + b.x * frac,
                a.y * (1.0 - frac) + b.y * frac,
            ));
        }
        total_d += len;
    }

    Err(GeometryError::DistanceTooGreat {
        distance: d,
        length: total_d,
    })
}

/// Parallel offset of a single segment. A positive amount offsets to the right.
pub fn offset_line_segment(vertices: &[Point], amount: f64) -> Result<[Point; 2], GeometryError> {
    let (a, b) = match vertices {
        [a, b] => (a, b),
        _ => return Err(GeometryError::NotASegment(vertices.len())),
    };

    let v = b - a;
    let v_norm = v * (1.0 / vector_norm(&v));
    let v_offset = Vec2::new(v_norm.y, -v_norm.x) * amount;
    Ok([a + v_offset, b + v_offset])
}
