//! Coordinate transformations between the simulation's planar frame and the render frame.
//!
//! SUMO's ground is the xy-plane with z pointing up. The render frame puts the ground in the
//! xz-plane with y up. Converting flips the planar y axis around the bottom of the network
//! bounding box (`z = bottom - y`, which keeps values positive) and swaps y and z.
//!
//! When the network carries a projection, geographic coordinates go through it and the
//! network offset before entering the planar frame.

use crate::config::{Boundary, Location, NetOffset, ParseError};
use crate::geometry::Point;
use nalgebra::Point3;

pub mod projection;

pub use projection::*;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Immutable transform built once per loaded network.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    offset: NetOffset,
    projection: Option<Projection>,
}

impl Transform {
    pub fn new(boundary: Boundary, offset: NetOffset, projection: Option<Projection>) -> Self {
        Self {
            left: boundary.left,
            top: boundary.top,
            right: boundary.right,
            bottom: boundary.bottom,
            offset,
            projection,
        }
    }

    pub fn from_location(location: &Location) -> Result<Self, ParseError> {
        Ok(Self::new(
            location.boundary()?,
            location.offset()?,
            location.projection()?,
        ))
    }

    pub fn boundary(&self) -> Boundary {
        Boundary {
            left: self.left,
            top: self.top,
            right: self.right,
            bottom: self.bottom,
        }
    }

    pub fn has_projection(&self) -> bool {
        self.projection.is_some()
    }

    pub fn width(&self) -> f64 {
        (self.right - self.left).abs()
    }

    pub fn height(&self) -> f64 {
        (self.bottom - self.top).abs()
    }

    /// Bounding box midpoint in the planar frame.
    pub fn center(&self) -> Point {
        Point::new((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }

    /// Planar (x, y) to render (x, z).
    pub fn planar_to_render(&self, planar: &Point) -> Point {
        Point::new(planar.x, self.bottom - planar.y)
    }

    /// Planar (x, y) to a render-frame point on the ground.
    pub fn planar_to_render3(&self, planar: &Point) -> Point3<f64> {
        Point3::new(planar.x, 0.0, self.bottom - planar.y)
    }

    /// Planar (x, y, height) to render (x, height, z).
    pub fn planar_xyz_to_render_xyz(&self, planar: &Point3<f64>) -> Point3<f64> {
        let ground = self.planar_to_render3(&planar.xy());
        Point3::new(ground.x, planar.z, ground.z)
    }

    /// Render (x, z) back to planar (x, y).
    pub fn render_xz_to_planar(&self, render: &Point) -> Point {
        Point::new(render.x, self.bottom - render.y)
    }

    /// Geographic position to render (x, z). `None` when the network has no projection.
    pub fn geo_to_render(&self, lat_lng: LatLng) -> Option<Point> {
        let projection = self.projection.as_ref()?;
        let (x, y) = projection.forward(lat_lng.lng, lat_lng.lat);
        Some(self.planar_to_render(&Point::new(x + self.offset.dx, y + self.offset.dy)))
    }

    /// Render (x, z) to a geographic position. `None` when the network has no projection.
    pub fn render_to_geo(&self, render: &Point) -> Option<LatLng> {
        let projection = self.projection.as_ref()?;
        let planar = self.render_xz_to_planar(render);
        let (lng, lat) = projection.inverse(planar.x - self.offset.dx, planar.y - self.offset.dy);
        Some(LatLng { lat, lng })
    }
}
