//! Resolve what a user typed into the search box.

use crate::coords::LatLng;
use crate::geometry::Point;
use crate::registry::EntityRegistry;
use crate::session::Session;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchTarget {
    /// Planar "x, y" coordinates and where they land in the render frame.
    Planar { planar: Point, render: Point },
    /// "lat, lng" coordinates and where they land in the render frame.
    Geographic { lat_lng: LatLng, render: Point },
    /// The id of a live vehicle.
    Vehicle(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    #[error("Invalid x, y coordinates, {left} < x < {right}, {top} < y < {bottom}.")]
    OutOfBounds { left: f64, right: f64, top: f64, bottom: f64 },
    #[error("Invalid latitude and longitude coordinates, {south} < lat < {north}, {west} < lng < {east}.")]
    OutOfGeoBounds { south: f64, north: f64, west: f64, east: f64 },
    #[error("Search input not found.")]
    NotFound,
}

fn is_unsigned_integer(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_decimal(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    match s.split_once('.') {
        Some((whole, fraction)) => is_unsigned_integer(whole) && is_unsigned_integer(fraction),
        None => false,
    }
}

/// Split "a, b": no space before the comma, any amount after it.
fn split_pair(input: &str) -> Option<(&str, &str)> {
    let (a, b) = input.split_once(',')?;
    Some((a, b.trim_start()))
}

pub fn resolve_search(input: &str, session: &Session) -> Result<SearchTarget, SearchError> {
    let transform = session.transform();

    if let Some((x, y)) = split_pair(input).filter(|(x, y)| is_unsigned_integer(x) && is_unsigned_integer(y)) {
        let (x, y) = match (x.parse::<f64>(), y.parse::<f64>()) {
            (Ok(x), Ok(y)) => (x, y),
            _ => return Err(SearchError::NotFound),
        };
        if !transform.boundary().contains(x, y) {
            return Err(SearchError::OutOfBounds {
                left: transform.left,
                right: transform.right,
                top: transform.top,
                bottom: transform.bottom,
            });
        }
        let planar = Point::new(x, y);
        return Ok(SearchTarget::Planar { planar, render: transform.planar_to_render(&planar) });
    }

    if transform.has_projection() {
        if let Some((lat, lng)) = split_pair(input).filter(|(lat, lng)| is_decimal(lat) && is_decimal(lng)) {
            let lat_lng = match (lat.parse::<f64>(), lng.parse::<f64>()) {
                (Ok(lat), Ok(lng)) => LatLng { lat, lng },
                _ => return Err(SearchError::NotFound),
            };
            if let Some(bounds) = session.geo_boundary() {
                if !bounds.contains_lat(lat_lng.lat) || !bounds.contains_lng(lat_lng.lng) {
                    return Err(SearchError::OutOfGeoBounds {
                        south: bounds.south,
                        north: bounds.north,
                        west: bounds.west,
                        east: bounds.east,
                    });
                }
            }
            return transform
                .geo_to_render(lat_lng)
                .map(|render| SearchTarget::Geographic { lat_lng, render })
                .ok_or(SearchError::NotFound);
        }
    }

    if session.vehicles().contains(input) {
        return Ok(SearchTarget::Vehicle(input.to_string()));
    }

    Err(SearchError::NotFound)
}
