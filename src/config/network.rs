use serde::{Deserialize, Deserializer, Serialize};
use anyhow::{Result, anyhow};
use super::{ParseError, Validate};
use crate::coords::Projection;
use nalgebra::Point3;

/// Static network metadata: where the network sits and which light programs it runs.
///
/// Decodes from the viewer's TOML files as well as from the backend's JSON network
/// description, which uses camelCase keys and collapses one-element lists.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    pub location: Location,
    #[serde(default, alias = "tlLogic", deserialize_with = "one_or_many")]
    pub tl_logic: Vec<TlLogic>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Location {
    /// "left,top,right,bottom" in planar coordinates.
    #[serde(alias = "convBoundary")]
    pub conv_boundary: String,
    /// "dx,dy" added to projected coordinates.
    #[serde(alias = "netOffset")]
    pub net_offset: String,
    /// "west,south,east,north" in degrees, empty without a projection.
    #[serde(default, alias = "origBoundary")]
    pub orig_boundary: String,
    /// proj4-style parameters, "!" for non-geographic networks.
    #[serde(default = "no_projection", alias = "projParameter")]
    pub proj_parameter: String,
}

fn no_projection() -> String {
    "!".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlLogic {
    pub id: String,
    #[serde(alias = "programID")]
    pub program_id: String,
    #[serde(default)]
    pub offset: String,
    #[serde(rename = "type", default)]
    pub logic_type: String,
    #[serde(rename = "phase", deserialize_with = "one_or_many")]
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Phase {
    #[serde(default)]
    pub duration: String,
    /// One signal character per controlled link, e.g. "rrGGyy".
    pub state: String,
}

#[derive(Deserialize)]
struct NetworkDocument {
    net: NetworkConfig,
}

impl NetworkConfig {
    /// Decode the backend's `{"net": {...}}` network description.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let document: NetworkDocument = serde_json::from_str(json)?;
        document.net.validate()?;
        Ok(document.net)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(ts) => ts,
        OneOrMany::One(t) => vec![t],
    })
}

fn parse_numbers(input: &str, expected: usize) -> std::result::Result<Vec<f64>, ParseError> {
    let numbers = input
        .split(',')
        .map(|s| s.trim().parse::<f64>().map_err(|_| ParseError::Number(s.trim().to_string())))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if numbers.len() != expected {
        return Err(ParseError::Arity { expected, input: input.to_string() });
    }
    Ok(numbers)
}

/// Planar bounding box. `bottom` is the axis the render frame flips around.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Boundary {
    pub fn parse(input: &str) -> std::result::Result<Self, ParseError> {
        let n = parse_numbers(input, 4)?;
        Ok(Self { left: n[0], top: n[1], right: n[2], bottom: n[3] })
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left.min(self.right)
            && x <= self.left.max(self.right)
            && y >= self.top.min(self.bottom)
            && y <= self.top.max(self.bottom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NetOffset {
    pub dx: f64,
    pub dy: f64,
}

impl NetOffset {
    pub fn parse(input: &str) -> std::result::Result<Self, ParseError> {
        let n = parse_numbers(input, 2)?;
        Ok(Self { dx: n[0], dy: n[1] })
    }
}

/// Geographic extent of the network in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBoundary {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl GeoBoundary {
    pub fn parse(input: &str) -> std::result::Result<Self, ParseError> {
        let n = parse_numbers(input, 4)?;
        Ok(Self { west: n[0], south: n[1], east: n[2], north: n[3] })
    }

    pub fn contains_lat(&self, lat: f64) -> bool {
        lat >= self.south && lat <= self.north
    }

    /// Handles boxes that straddle the antimeridian (west > east).
    pub fn contains_lng(&self, lng: f64) -> bool {
        if self.west > self.east {
            lng >= self.west || lng <= self.east
        } else {
            lng >= self.west && lng <= self.east
        }
    }
}

impl Location {
    pub fn boundary(&self) -> std::result::Result<Boundary, ParseError> {
        Boundary::parse(&self.conv_boundary)
    }

    pub fn offset(&self) -> std::result::Result<NetOffset, ParseError> {
        NetOffset::parse(&self.net_offset)
    }

    pub fn geo_boundary(&self) -> std::result::Result<Option<GeoBoundary>, ParseError> {
        if self.orig_boundary.trim().is_empty() {
            return Ok(None);
        }
        GeoBoundary::parse(&self.orig_boundary).map(Some)
    }

    pub fn projection(&self) -> std::result::Result<Option<Projection>, ParseError> {
        Projection::parse(&self.proj_parameter)
    }
}

/// Parse a SUMO shape string "x1,y1 x2,y2,z2 ...". Missing heights are 0.
pub fn parse_shape(shape: &str) -> std::result::Result<Vec<Point3<f64>>, ParseError> {
    shape
        .split_whitespace()
        .map(|coord| {
            let n = coord
                .split(',')
                .map(|s| s.parse::<f64>().map_err(|_| ParseError::Number(s.to_string())))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            match n.as_slice() {
                [x, y] => Ok(Point3::new(*x, *y, 0.0)),
                [x, y, z] => Ok(Point3::new(*x, *y, *z)),
                _ => Err(ParseError::Arity { expected: 2, input: coord.to_string() }),
            }
        })
        .collect()
}

impl Validate for NetworkConfig {
    fn validate(&self) -> Result<()> {
        // Validate location strings
        let location = &self.location;
        location.boundary()?;
        location.offset()?;
        location.geo_boundary()?;
        let projection = location.projection()?;

        if projection.is_some() && location.geo_boundary()?.is_none() {
            log::warn!("Projected network has no geographic boundary; lat/lng search disabled");
        }

        // Validate traffic light programs
        for logic in &self.tl_logic {
            if logic.phases.is_empty() {
                return Err(anyhow!("Program '{}' of light '{}' has no phases", logic.program_id, logic.id));
            }

            let links = logic.phases[0].state.len();
            for (i, phase) in logic.phases.iter().enumerate() {
                if phase.state.len() != links {
                    return Err(anyhow!(
                        "Phase {} of light '{}' controls {} links, expected {}",
                        i, logic.id, phase.state.len(), links
                    ));
                }
            }
        }

        Ok(())
    }
}
