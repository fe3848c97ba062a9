//! Document outline detection
//!
//! Finds the best quadrilateral contour candidate in a frame and tests it
//! against the alignment guide. The chain mirrors a classic card-detection
//! pipeline: blur to suppress sensor noise, Canny edges, external contours,
//! then a Douglas-Peucker approximation to pick out four-cornered shapes.

use image::GrayImage;
use imageproc::contours::find_contours;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use imageproc::rect::Rect;

/// Tuning for the document locator
#[derive(Debug, Clone)]
pub struct LocatorConfig {
    /// Gaussian blur sigma applied before edge detection (1.4 matches a
    /// 7x7 kernel)
    pub blur_sigma: f32,
    /// Canny hysteresis low threshold
    pub canny_low: f32,
    /// Canny hysteresis high threshold
    pub canny_high: f32,
    /// Polygon approximation tolerance as a fraction of contour perimeter
    pub approx_tolerance: f64,
    /// Margin in pixels by which the guide is shrunk for the containment
    /// test
    pub inset: i32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            blur_sigma: 1.4,
            canny_low: 50.0,
            canny_high: 150.0,
            approx_tolerance: 0.02,
            inset: 10,
        }
    }
}

/// The best four-cornered contour found in a frame
#[derive(Debug, Clone)]
pub struct DocumentCandidate {
    /// Corner points of the approximated quadrilateral
    pub corners: [Point<i32>; 4],
    /// Enclosed area of the detected contour, in square pixels
    pub area: f64,
}

/// Outcome of locating a document in one frame
#[derive(Debug, Clone)]
pub struct LocateResult {
    /// True when every candidate corner lies strictly inside the inset
    /// guide
    pub inside: bool,
    /// The best candidate, if any quadrilateral was found
    pub candidate: Option<DocumentCandidate>,
}

/// Detects document outlines in grayscale frames
pub struct DocumentLocator {
    config: LocatorConfig,
}

impl DocumentLocator {
    /// Create a locator with default tuning
    pub fn new() -> Self {
        Self::with_config(LocatorConfig::default())
    }

    /// Create a locator with custom tuning
    pub fn with_config(config: LocatorConfig) -> Self {
        Self { config }
    }

    /// Locate the best document candidate and test it against the guide.
    ///
    /// Runs once per frame and must stay well inside the inter-frame
    /// interval; every step is a single pass over the image.
    pub fn locate(&self, gray: &GrayImage, guide: Rect) -> LocateResult {
        let blurred = gaussian_blur_f32(gray, self.config.blur_sigma);
        let edges = canny(&blurred, self.config.canny_low, self.config.canny_high);

        let mut best: Option<DocumentCandidate> = None;

        for contour in find_contours::<i32>(&edges) {
            // External contours only, matching the outermost card outline
            if contour.parent.is_some() {
                continue;
            }
            if contour.points.len() < 4 {
                continue;
            }

            let perimeter = arc_length(&contour.points, true);
            let approx = approximate_polygon_dp(
                &contour.points,
                self.config.approx_tolerance * perimeter,
                true,
            );
            if approx.len() != 4 {
                continue;
            }

            let area = polygon_area(&contour.points);
            if best.as_ref().map_or(true, |b| area > b.area) {
                best = Some(DocumentCandidate {
                    corners: [approx[0], approx[1], approx[2], approx[3]],
                    area,
                });
            }
        }

        match best {
            Some(candidate) => {
                let inside = candidate
                    .corners
                    .iter()
                    .all(|&corner| self.inside_inset_guide(guide, corner));
                LocateResult {
                    inside,
                    candidate: Some(candidate),
                }
            }
            None => LocateResult {
                inside: false,
                candidate: None,
            },
        }
    }

    /// Strict containment against the guide shrunk by the configured inset
    fn inside_inset_guide(&self, guide: Rect, p: Point<i32>) -> bool {
        let x1 = guide.left() + self.config.inset;
        let y1 = guide.top() + self.config.inset;
        let x2 = guide.left() + guide.width() as i32 - self.config.inset;
        let y2 = guide.top() + guide.height() as i32 - self.config.inset;

        p.x > x1 && p.x < x2 && p.y > y1 && p.y < y2
    }
}

impl Default for DocumentLocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Shoelace area of a closed polygon
fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut doubled = 0i64;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        doubled += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
    }

    (doubled.abs() as f64) / 2.0
}
