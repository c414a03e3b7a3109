//! Pick the direction a freshly placed camera should face.
//!
//! The camera starts looking straight down. Tilting it is fixed at 60° from vertical, but the
//! heading depends on the scene: count how much content lies at each degree around the
//! camera, smooth those counts with a Gaussian as wide as the field of view, and face the
//! busiest heading.

use nalgebra::Point3;

pub const HISTOGRAM_BUCKETS: usize = 360;

/// Camera tilt from vertical when orbiting toward the busiest heading.
const ORBIT_POLAR_DEGREES: f64 = 60.0;

/// Kernel taps as (offset, coefficient) pairs.
pub type Kernel = Vec<(i64, f64)>;

/// Symmetric Gaussian over offsets `ceil(-width/2) .. ceil(width/2)`. Not normalized.
pub fn make_gaussian_kernel(width: f64, sigma: f64) -> Kernel {
    let start = (-width / 2.0).ceil() as i64;
    let end = (width / 2.0).ceil() as i64;
    (start..end)
        .map(|dx| {
            let d = dx as f64;
            (dx, (-d * d / (2.0 * sigma * sigma)).exp())
        })
        .collect()
}

/// Circular convolution: indices wrap around the ends of `xs`.
pub fn convolve(xs: &[f64], kernel: &[(i64, f64)]) -> Vec<f64> {
    let n = xs.len() as i64;
    (0..n)
        .map(|i| {
            let mut value = 0.0;
            for &(dx, coeff) in kernel {
                value += coeff * xs[(i + dx).rem_euclid(n) as usize];
            }
            value
        })
        .collect()
}

/// Heading (bucket index) with the most smoothed content. Ties go to the lowest index.
pub fn find_busiest_angle(histogram: &[f64], field_of_view: f64) -> Option<usize> {
    let kernel = make_gaussian_kernel(field_of_view, field_of_view / 2.0);
    let windowed = convolve(histogram, &kernel);

    let mut best: Option<(usize, f64)> = None;
    for (i, &value) in windowed.iter().enumerate() {
        match best {
            Some((_, best_value)) if !(value > best_value) => {}
            _ => best = Some((i, value)),
        }
    }
    best.map(|(i, _)| i)
}

/// Count points by the whole-degree direction they lie in, seen from above the camera.
///
/// Directions are measured in the render ground plane (x, z) from the +x axis.
pub fn angle_histogram<I>(points: I, camera: &Point3<f64>) -> Vec<f64>
where
    I: IntoIterator<Item = Point3<f64>>,
{
    let mut counts = vec![0.0; HISTOGRAM_BUCKETS];
    for point in points {
        let degrees = (point.z - camera.z).atan2(point.x - camera.x).to_degrees();
        let bucket = ((360.0 + degrees) % 360.0).floor() as usize;
        counts[bucket.min(HISTOGRAM_BUCKETS - 1)] += 1.0;
    }
    counts
}

/// Swing the camera onto a sphere around the ground point beneath it so it looks toward
/// `heading_degrees`, 30° above the ground.
pub fn orbit_camera(camera: &Point3<f64>, heading_degrees: f64) -> Point3<f64> {
    let ground = Point3::new(camera.x, 0.0, camera.z);
    let theta = (180.0 + heading_degrees).to_radians();
    let phi = ORBIT_POLAR_DEGREES.to_radians();
    let radius = camera.y;

    Point3::new(
        ground.x + radius * phi.sin() * theta.cos(),
        ground.y + radius * phi.cos(),
        ground.z + radius * phi.sin() * theta.sin(),
    )
}
