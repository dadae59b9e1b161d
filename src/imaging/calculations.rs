//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//! Every resize in the crate derives its target size from [`fit_longest_edge`]
//! so the shorter edge is always computed from the *original* aspect ratio,
//! never from an already-rounded intermediate size.

/// Scale `original` so its longer edge equals `longest`, preserving aspect ratio.
///
/// Never upscales: a `longest` above the original's longer edge returns the
/// original unchanged. The shorter edge is rounded and never drops below 1.
///
/// # Examples
/// ```
/// # use proofmark::imaging::fit_longest_edge;
/// assert_eq!(fit_longest_edge((3000, 2000), 500), (500, 333));
/// assert_eq!(fit_longest_edge((2000, 3000), 500), (333, 500));
/// assert_eq!(fit_longest_edge((400, 400), 800), (400, 400));
/// ```
pub fn fit_longest_edge(original: (u32, u32), longest: u32) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    let longer = orig_w.max(orig_h);
    let longest = longest.max(1);

    if longest >= longer {
        return original;
    }

    if orig_w >= orig_h {
        // Landscape or square
        let h = (orig_h as f64 * longest as f64 / orig_w as f64).round() as u32;
        (longest, h.max(1))
    } else {
        // Portrait
        let w = (orig_w as f64 * longest as f64 / orig_h as f64).round() as u32;
        (w.max(1), longest)
    }
}

/// Cap an image so its longer edge is at most `max_dimension`.
pub fn calculate_capped_dimensions(original: (u32, u32), max_dimension: u32) -> (u32, u32) {
    fit_longest_edge(original, max_dimension)
}

/// Dimensions for one ladder rung.
///
/// `scale` shrinks the already-capped longer edge; the result is then fitted
/// back against the original so aspect ratio error stays below one pixel.
/// Scales at or above 1.0 leave the capped size untouched.
pub fn calculate_rung_dimensions(original: (u32, u32), capped: (u32, u32), scale: f32) -> (u32, u32) {
    if scale >= 1.0 {
        return capped;
    }
    let capped_longer = capped.0.max(capped.1);
    let longest = (capped_longer as f64 * scale.max(0.0) as f64).round() as u32;
    fit_longest_edge(original, longest.max(1))
}

/// Fit `original` inside a `bounds` box without enlarging.
///
/// Used for the blur placeholder, where both edges are bounded.
pub fn fit_inside(original: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    let (max_w, max_h) = bounds;
    if orig_w == 0 || orig_h == 0 {
        return (max_w.max(1), max_h.max(1));
    }

    let ratio = (max_w as f64 / orig_w as f64)
        .min(max_h as f64 / orig_h as f64)
        .min(1.0);
    (
        ((orig_w as f64 * ratio).round() as u32).max(1),
        ((orig_h as f64 * ratio).round() as u32).max(1),
    )
}

/// Represents a single responsive size to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsiveSize {
    /// Target size (longer edge).
    pub target: u32,
    /// Calculated output width.
    pub width: u32,
    /// Calculated output height.
    pub height: u32,
}

/// Calculate which fixed breakpoints to generate and their dimensions.
///
/// Breakpoints larger than the original's longer edge are skipped. If every
/// breakpoint exceeds the original, the original size is the only entry.
pub fn calculate_responsive_sizes(original: (u32, u32), sizes: &[u32]) -> Vec<ResponsiveSize> {
    let longer_edge = original.0.max(original.1);

    let mut result: Vec<ResponsiveSize> = sizes
        .iter()
        .filter(|&&size| size <= longer_edge)
        .map(|&target| {
            let (width, height) = fit_longest_edge(original, target);
            ResponsiveSize {
                target,
                width,
                height,
            }
        })
        .collect();

    if result.is_empty() {
        result.push(ResponsiveSize {
            target: longer_edge,
            width: original.0,
            height: original.1,
        });
    }

    result
}
