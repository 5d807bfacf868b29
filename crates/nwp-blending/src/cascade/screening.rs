use ndarray::ArrayView2;

/// Whether `field` is dry enough to skip blending.
///
/// A pixel is wet when it exceeds `precip_threshold` (NaN never is). The
/// field is dry when the wet fraction is at most `no_rain_fraction`. An empty
/// field is dry.
pub fn check_no_rain(field: ArrayView2<'_, f32>, precip_threshold: f32, no_rain_fraction: f32) -> bool {
    let total = field.len();
    if total == 0 {
        return true;
    }
    let wet = field.iter().filter(|v| **v > precip_threshold).count();
    (wet as f64 / total as f64) <= no_rain_fraction as f64
}
