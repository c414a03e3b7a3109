use crate::config::ParseError;
use std::collections::HashMap;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

const WGS84_A: f64 = 6_378_137.0;
const WGS84_INV_F: f64 = 298.257_223_563;
const GRS80_INV_F: f64 = 298.257_222_101;

const UTM_SCALE: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Reference ellipsoid. A sphere has zero eccentricity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub a: f64,
    pub f: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid { a: WGS84_A, f: 1.0 / WGS84_INV_F };

    pub fn eccentricity(&self) -> f64 {
        (self.f * (2.0 - self.f)).sqrt()
    }
}

/// A cartographic projection parsed from a proj4-style parameter string.
///
/// Only the projections SUMO networks are commonly built with are supported: UTM,
/// generic transverse Mercator and Mercator.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    TransverseMercator(TransverseMercator),
    Mercator(Mercator),
}

impl Projection {
    /// `"!"` and the empty string mean the network has no geographic reference.
    pub fn parse(param: &str) -> Result<Option<Projection>, ParseError> {
        let param = param.trim();
        if param.is_empty() || param == "!" {
            return Ok(None);
        }

        let params = ProjParams::parse(param)?;
        let ellipsoid = params.ellipsoid()?;
        let projection = match params.get("proj") {
            Some("utm") => {
                let zone = params.get("zone").ok_or_else(|| {
                    ParseError::Projection(format!("utm requires +zone: '{}'", param))
                })?;
                let zone: u32 = zone.parse().map_err(|_| {
                    ParseError::Projection(format!("+zone={} is not a zone number", zone))
                })?;
                if !(1..=60).contains(&zone) {
                    return Err(ParseError::Projection(format!("utm zone {} out of range", zone)));
                }
                let false_northing = if params.flag("south") { UTM_FALSE_NORTHING_SOUTH } else { 0.0 };
                Projection::TransverseMercator(TransverseMercator::new(
                    ellipsoid,
                    (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0,
                    UTM_SCALE,
                    UTM_FALSE_EASTING,
                    false_northing,
                ))
            }
            Some("tmerc") => {
                if params.number("lat_0")?.unwrap_or(0.0) != 0.0 {
                    return Err(ParseError::Projection("tmerc with +lat_0 != 0 is not supported".into()));
                }
                Projection::TransverseMercator(TransverseMercator::new(
                    ellipsoid,
                    params.number("lon_0")?.unwrap_or(0.0),
                    params.scale_factor()?,
                    params.number("x_0")?.unwrap_or(0.0),
                    params.number("y_0")?.unwrap_or(0.0),
                ))
            }
            Some("merc") => Projection::Mercator(Mercator {
                ellipsoid,
                lon_0: params.number("lon_0")?.unwrap_or(0.0),
                k_0: params.scale_factor()?,
                x_0: params.number("x_0")?.unwrap_or(0.0),
                y_0: params.number("y_0")?.unwrap_or(0.0),
            }),
            Some(other) => {
                return Err(ParseError::Projection(format!("unsupported projection '{}'", other)))
            }
            None => return Err(ParseError::Projection(format!("missing +proj in '{}'", param))),
        };
        Ok(Some(projection))
    }

    /// (lng, lat) in degrees to projected metres.
    pub fn forward(&self, lng: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::TransverseMercator(p) => p.forward(lng, lat),
            Projection::Mercator(p) => p.forward(lng, lat),
        }
    }

    /// Projected metres back to (lng, lat) in degrees.
    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::TransverseMercator(p) => p.inverse(x, y),
            Projection::Mercator(p) => p.inverse(x, y),
        }
    }
}

struct ProjParams<'a> {
    values: HashMap<&'a str, Option<&'a str>>,
}

impl<'a> ProjParams<'a> {
    fn parse(param: &'a str) -> Result<Self, ParseError> {
        let mut values = HashMap::new();
        for token in param.split_whitespace() {
            let token = token.strip_prefix('+').ok_or_else(|| {
                ParseError::Projection(format!("expected +key[=value], got '{}'", token))
            })?;
            match token.split_once('=') {
                Some((key, value)) => values.insert(key, Some(value)),
                None => values.insert(token, None),
            };
        }
        Ok(Self { values })
    }

    fn get(&self, key: &str) -> Option<&'a str> {
        self.values.get(key).copied().flatten()
    }

    fn flag(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn number(&self, key: &str) -> Result<Option<f64>, ParseError> {
        self.get(key)
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|_| ParseError::Projection(format!("+{}={} is not a number", key, v)))
            })
            .transpose()
    }

    fn scale_factor(&self) -> Result<f64, ParseError> {
        Ok(match self.number("k_0")? {
            Some(k) => k,
            None => self.number("k")?.unwrap_or(1.0),
        })
    }

    fn ellipsoid(&self) -> Result<Ellipsoid, ParseError> {
        if let Some(a) = self.number("a")? {
            let b = self.number("b")?.unwrap_or(a);
            return Ok(Ellipsoid { a, f: (a - b) / a });
        }
        match self.get("ellps").or_else(|| self.get("datum")) {
            None | Some("WGS84") => Ok(Ellipsoid::WGS84),
            Some("GRS80") | Some("NAD83") => Ok(Ellipsoid { a: WGS84_A, f: 1.0 / GRS80_INV_F }),
            Some(other) => Err(ParseError::Projection(format!("unsupported ellipsoid '{}'", other))),
        }
    }
}

/// Transverse Mercator using the sixth-order Krüger series.
#[derive(Debug, Clone, PartialEq)]
pub struct TransverseMercator {
    e: f64,
    lon_0: f64,
    k_0: f64,
    x_0: f64,
    y_0: f64,
    rectifying_radius: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
}

impl TransverseMercator {
    pub fn new(ellipsoid: Ellipsoid, lon_0: f64, k_0: f64, x_0: f64, y_0: f64) -> Self {
        let n = ellipsoid.f / (2.0 - ellipsoid.f);
        let n2 = n * n;
        let n3 = n2 * n;
        let n4 = n3 * n;
        let n5 = n4 * n;
        let n6 = n5 * n;

        let rectifying_radius =
            ellipsoid.a / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);

        let alpha = [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0 + 41.0 * n4 / 180.0 - 127.0 * n5 / 288.0
                + 7891.0 * n6 / 37800.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0 + 557.0 * n4 / 1440.0 + 281.0 * n5 / 630.0
                - 1983433.0 * n6 / 1935360.0,
            61.0 * n3 / 240.0 - 103.0 * n4 / 140.0 + 15061.0 * n5 / 26880.0
                + 167603.0 * n6 / 181440.0,
            49561.0 * n4 / 161280.0 - 179.0 * n5 / 168.0 + 6601661.0 * n6 / 7257600.0,
            34729.0 * n5 / 80640.0 - 3418889.0 * n6 / 1995840.0,
            212378941.0 * n6 / 319334400.0,
        ];
        let beta = [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0 - n4 / 360.0 - 81.0 * n5 / 512.0
                + 96199.0 * n6 / 604800.0,
            n2 / 48.0 + n3 / 15.0 - 437.0 * n4 / 1440.0 + 46.0 * n5 / 105.0
                - 1118711.0 * n6 / 3870720.0,
            17.0 * n3 / 480.0 - 37.0 * n4 / 840.0 - 209.0 * n5 / 4480.0 + 5569.0 * n6 / 90720.0,
            4397.0 * n4 / 161280.0 - 11.0 * n5 / 504.0 - 830251.0 * n6 / 7257600.0,
            4583.0 * n5 / 161280.0 - 108847.0 * n6 / 3991680.0,
            20648693.0 * n6 / 638668800.0,
        ];

        Self {
            e: ellipsoid.eccentricity(),
            lon_0,
            k_0,
            x_0,
            y_0,
            rectifying_radius,
            alpha,
            beta,
        }
    }

    pub fn forward(&self, lng: f64, lat: f64) -> (f64, f64) {
        let lambda = (lng - self.lon_0).to_radians();
        let tau_prime = conformal_tan(lat.to_radians().tan(), self.e);

        let cos_lambda = lambda.cos();
        let xi_prime = tau_prime.atan2(cos_lambda);
        let eta_prime = (lambda.sin() / (tau_prime * tau_prime + cos_lambda * cos_lambda).sqrt()).asinh();

        let mut xi = xi_prime;
        let mut eta = eta_prime;
        for (j, alpha) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi += alpha * (k * xi_prime).sin() * (k * eta_prime).cosh();
            eta += alpha * (k * xi_prime).cos() * (k * eta_prime).sinh();
        }

        let scale = self.k_0 * self.rectifying_radius;
        (scale * eta + self.x_0, scale * xi + self.y_0)
    }

    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let scale = self.k_0 * self.rectifying_radius;
        let eta = (x - self.x_0) / scale;
        let xi = (y - self.y_0) / scale;

        let mut xi_prime = xi;
        let mut eta_prime = eta;
        for (j, beta) in self.beta.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi_prime -= beta * (k * xi).sin() * (k * eta).cosh();
            eta_prime -= beta * (k * xi).cos() * (k * eta).sinh();
        }

        let sinh_eta_prime = eta_prime.sinh();
        let sin_xi_prime = xi_prime.sin();
        let cos_xi_prime = xi_prime.cos();

        let tau_prime = sin_xi_prime / (sinh_eta_prime * sinh_eta_prime + cos_xi_prime * cos_xi_prime).sqrt();
        let tau = geodetic_tan(tau_prime, self.e);

        let lat = tau.atan().to_degrees();
        let lng = self.lon_0 + sinh_eta_prime.atan2(cos_xi_prime).to_degrees();
        (lng, lat)
    }
}

/// Mercator on an ellipsoid (a sphere when flattening is zero).
#[derive(Debug, Clone, PartialEq)]
pub struct Mercator {
    ellipsoid: Ellipsoid,
    lon_0: f64,
    k_0: f64,
    x_0: f64,
    y_0: f64,
}

impl Mercator {
    pub fn forward(&self, lng: f64, lat: f64) -> (f64, f64) {
        let scale = self.ellipsoid.a * self.k_0;
        let e = self.ellipsoid.eccentricity();
        let phi = lat.to_radians();
        let e_sin = e * phi.sin();
        let y = ((FRAC_PI_4 + phi / 2.0).tan() * ((1.0 - e_sin) / (1.0 + e_sin)).powf(e / 2.0)).ln();
        (
            scale * (lng - self.lon_0).to_radians() + self.x_0,
            scale * y + self.y_0,
        )
    }

    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let scale = self.ellipsoid.a * self.k_0;
        let e = self.ellipsoid.eccentricity();
        let t = (-(y - self.y_0) / scale).exp();

        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..15 {
            let e_sin = e * phi.sin();
            let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - e_sin) / (1.0 + e_sin)).powf(e / 2.0)).atan();
            let converged = (next - phi).abs() < 1e-14;
            phi = next;
            if converged {
                break;
            }
        }

        (self.lon_0 + ((x - self.x_0) / scale).to_degrees(), phi.to_degrees())
    }
}

/// tan of the conformal latitude for a geodetic latitude with tangent `tau`.
fn conformal_tan(tau: f64, e: f64) -> f64 {
    let sigma = (e * (e * tau / (1.0 + tau * tau).sqrt()).atanh()).sinh();
    tau * (1.0 + sigma * sigma).sqrt() - sigma * (1.0 + tau * tau).sqrt()
}

/// Newton iteration inverting `conformal_tan`.
fn geodetic_tan(tau_prime: f64, e: f64) -> f64 {
    let one_minus_e2 = 1.0 - e * e;
    let mut tau = tau_prime;
    for _ in 0..10 {
        let tau_i_prime = conformal_tan(tau, e);
        let delta = (tau_prime - tau_i_prime) / (1.0 + tau_i_prime * tau_i_prime).sqrt()
            * (1.0 + one_minus_e2 * tau * tau)
            / (one_minus_e2 * (1.0 + tau * tau).sqrt());
        tau += delta;
        if delta.abs() < 1e-12 {
            break;
        }
    }
    tau
}
