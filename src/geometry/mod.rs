use nalgebra::{Point2, Vector2};
use thiserror::Error;

pub mod polyline;

pub use polyline::*;

pub type Vec2 = Vector2<f64>;
pub type Point = Point2<f64>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("polylines must have 2+ vertices, got {0}")]
    TooFewVertices(usize),
    #[error("distance {distance} is too great for polyline of length {length}")]
    DistanceTooGreat { distance: f64, length: f64 },
    #[error("offset is only implemented for simple line segments, got {0} vertices")]
    NotASegment(usize),
}

pub fn vector_norm(v: &Vec2) -> f64 {
    v.dot(v).sqrt()
}

fn distance2(a: &Point, b: &Point) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

fn distance(a: &Point, b: &Point) -> f64 {
    distance2(a, b).sqrt()
}

/// Return the candidate closest to `point`. The first of several equally close candidates wins.
pub fn find_closest_point<'a>(point: &Point, candidates: &'a [Point]) -> Option<&'a Point> {
    let mut best: Option<(&Point, f64)> = None;
    for candidate in candidates {
        let d = distance(candidate, point);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((candidate, d)),
        }
    }
    best.map(|(p, _)| p)
}
