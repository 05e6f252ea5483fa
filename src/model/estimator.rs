use serde::Serialize;

use crate::error::{PopError, Result};
use crate::io::population::{normalize_city, Dataset};
use crate::math::linalg::least_squares_line;

/// Population answer for a (city, year) pair.
///
/// `predicted` is false when the row was observed, true when it comes from the
/// trend line. Ratios are never predicted: on the trend path they are carried
/// over from the city's latest observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub city: String,
    pub year: i64,
    pub population: i64,
    pub male_ratio: f64,
    pub female_ratio: f64,
    pub voter_ratio: f64,
    pub predicted: bool,
}

/// Look up `year` for `city`, or extrapolate a least-squares population trend.
pub fn estimate(dataset: &Dataset, city: &str, year: i64) -> Result<Estimate> {
    let city = normalize_city(city);
    if city.is_empty() {
        return Err(PopError::InvalidRequest);
    }
    let rows = dataset
        .city_records(&city)
        .filter(|rows| !rows.is_empty())
        .ok_or_else(|| PopError::NotFound(city.clone()))?;

    if let Some(row) = rows.iter().find(|r| i64::from(r.year) == year) {
        tracing::debug!(city = %city, year, "exact-year hit");
        return Ok(Estimate {
            city,
            year,
            population: row.total_population as i64,
            male_ratio: row.male_ratio,
            female_ratio: row.female_ratio,
            voter_ratio: row.voter_ratio,
            predicted: false,
        });
    }

    let points: Vec<(f64, f64)> = rows
        .iter()
        .map(|r| (f64::from(r.year), r.total_population as f64))
        .collect();
    // rows is non-empty, so the fit always exists
    let fit = least_squares_line(&points).ok_or_else(|| PopError::NotFound(city.clone()))?;
    let population = fit.eval(year as f64).trunc() as i64;
    let latest = &rows[rows.len() - 1];

    tracing::debug!(
        city = %city,
        year,
        slope = fit.slope,
        population,
        observations = rows.len(),
        "extrapolated"
    );

    Ok(Estimate {
        city,
        year,
        population,
        male_ratio: latest.male_ratio,
        female_ratio: latest.female_ratio,
        voter_ratio: latest.voter_ratio,
        predicted: true,
    })
}
