use nalgebra::Point3;
use sumo_viewer::scene::{
    angle_histogram, convolve, find_busiest_angle, make_gaussian_kernel, orbit_camera,
    HISTOGRAM_BUCKETS,
};

#[test]
fn test_circular_convolution_wraps() {
    let kernel = vec![(-1, 0.25), (0, 0.5), (1, 0.25)];
    let result = convolve(&[1.0, 2.0, 3.0, 4.0], &kernel);
    assert_eq!(
        result,
        vec![
            0.25 * 4.0 + 0.5 * 1.0 + 0.25 * 2.0,
            0.25 * 1.0 + 0.5 * 2.0 + 0.25 * 3.0,
            0.25 * 2.0 + 0.5 * 3.0 + 0.25 * 4.0,
            0.25 * 3.0 + 0.5 * 4.0 + 0.25 * 1.0,
        ]
    );
}

#[test]
fn test_gaussian_kernel_shape() {
    let kernel = make_gaussian_kernel(4.0, 2.0);
    let offsets: Vec<i64> = kernel.iter().map(|(dx, _)| *dx).collect();
    assert_eq!(offsets, vec![-2, -1, 0, 1]);
    assert_eq!(kernel[2].1, 1.0);
    assert_eq!(kernel[1].1, kernel[3].1);

    let odd = make_gaussian_kernel(5.0, 2.5);
    let offsets: Vec<i64> = odd.iter().map(|(dx, _)| *dx).collect();
    assert_eq!(offsets, vec![-2, -1, 0, 1, 2]);
}

#[test]
fn test_busiest_angle_finds_cluster() {
    let mut histogram = vec![0.0; HISTOGRAM_BUCKETS];
    histogram[90] = 5.0;
    histogram[200] = 3.0;
    histogram[205] = 3.0;
    histogram[210] = 3.0;

    assert_eq!(find_busiest_angle(&histogram, 60.0), Some(205));
    assert_eq!(find_busiest_angle(&histogram, 2.0), Some(90));
}

#[test]
fn test_peaks_at_the_wrap_boundary() {
    let mut histogram = vec![0.0; HISTOGRAM_BUCKETS];
    histogram[0] = 10.0;
    assert_eq!(find_busiest_angle(&histogram, 60.0), Some(0));

    let mut histogram = vec![0.0; HISTOGRAM_BUCKETS];
    histogram[359] = 10.0;
    assert_eq!(find_busiest_angle(&histogram, 60.0), Some(359));

    // Content split across the boundary is only found by wrapping.
    let mut histogram = vec![0.0; HISTOGRAM_BUCKETS];
    for i in [355, 357, 359, 1, 3, 5] {
        histogram[i] = 4.0;
    }
    histogram[180] = 10.0;
    assert_eq!(find_busiest_angle(&histogram, 30.0), Some(0));
}

#[test]
fn test_ties_go_to_lowest_index() {
    let histogram = vec![1.0; HISTOGRAM_BUCKETS];
    assert_eq!(find_busiest_angle(&histogram, 45.0), Some(0));
    assert_eq!(find_busiest_angle(&[], 45.0), None);
}

#[test]
fn test_angle_histogram_buckets_by_direction() {
    let camera = Point3::new(10.0, 100.0, 10.0);
    let points = vec![
        Point3::new(20.0, 0.0, 10.0),
        Point3::new(10.0, 5.0, 20.0),
        Point3::new(0.0, 0.0, 10.0),
        Point3::new(10.0, 0.0, 0.0),
        Point3::new(10.0, 0.0, -5.0),
    ];
    let histogram = angle_histogram(points, &camera);

    assert_eq!(histogram.len(), HISTOGRAM_BUCKETS);
    assert_eq!(histogram[0], 1.0);
    assert_eq!(histogram[90], 1.0);
    assert_eq!(histogram[180], 1.0);
    assert_eq!(histogram[270], 2.0);
    assert_eq!(histogram.iter().sum::<f64>(), 5.0);
}

#[test]
fn test_orbit_camera_keeps_distance_and_tilt() {
    let camera = Point3::new(100.0, 50.0, 200.0);
    let orbited = orbit_camera(&camera, 90.0);

    let ground = Point3::new(camera.x, 0.0, camera.z);
    assert!(((orbited - ground).norm() - 50.0).abs() < 1e-9);
    assert!((orbited.y - 25.0).abs() < 1e-9);

    // Looking toward 90° puts the camera on the 270° side of the target.
    assert!((orbited.x - 100.0).abs() < 1e-9);
    assert!(orbited.z < camera.z);
}
