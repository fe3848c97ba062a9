//! Focus quality scoring
//!
//! Sharpness is estimated as the variance of the Laplacian response of the
//! grayscale frame: a well-focused frame has strong high-frequency edge
//! content and therefore a wide response distribution.

use image::GrayImage;
use imageproc::filter::laplacian_filter;

/// Compute the focus score of a grayscale image.
///
/// Pure function of the pixel data; identical input always yields an
/// identical score. Higher is sharper.
pub fn sharpness(gray: &GrayImage) -> f64 {
    let response = laplacian_filter(gray);
    let samples = response.as_raw();

    if samples.is_empty() {
        return 0.0;
    }

    let n = samples.len() as f64;
    let mean = samples.iter().map(|&v| v as f64).sum::<f64>() / n;

    samples
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n
}
