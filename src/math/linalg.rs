/// Straight line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least-squares fit of a line through `points` (x, y), solved from the
/// normal equations with centred x to keep large years well conditioned.
///
/// When every x is identical (a single point, or repeated years) the system is
/// singular; the fit then degenerates to a horizontal line through mean(y).
/// Returns `None` only for an empty slice.
pub fn least_squares_line(points: &[(f64, f64)]) -> Option<LinearFit> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (x, y) in points {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }

    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}
