use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{PopError, Result};

/// Columns every dataset must carry, matched case-insensitively.
const REQUIRED_COLUMNS: [&str; 6] = [
    "city",
    "year",
    "total_population",
    "male_ratio",
    "female_ratio",
    "voter_ratio",
];

/// One observed (city, year) row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemographicRecord {
    pub city: String,
    pub year: i32,
    pub total_population: u64,
    pub male_ratio: f64,
    pub female_ratio: f64,
    pub voter_ratio: f64,
}

/// One CSV row; the city is normalized on the way in. Unknown columns are ignored.
#[derive(Debug, Deserialize)]
struct PopRow {
    #[serde(deserialize_with = "de_city")]
    city: String,
    #[serde(deserialize_with = "de_year")]
    year: i32,
    #[serde(deserialize_with = "de_total_population")]
    total_population: u64,
    male_ratio: f64,
    female_ratio: f64,
    voter_ratio: f64,
}

/// Parse an integer that may be written as an integral float ("2020.0").
pub fn parse_integral(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(v) = value.parse::<i64>() {
        return Some(v);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(f as i64),
        _ => None,
    }
}

// csv reports no field index for custom errors, so the message leads with the column.
fn integral<'de, D, T>(deserializer: D, column: &str) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let raw = String::deserialize(deserializer)?;
    let v = parse_integral(&raw)
        .ok_or_else(|| D::Error::custom(format!("{column}: expected an integer, got {raw:?}")))?;
    T::try_from(v).map_err(|_| D::Error::custom(format!("{column}: {raw:?} is out of range")))
}

fn de_year<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i32, D::Error> {
    integral(deserializer, "year")
}

fn de_total_population<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<u64, D::Error> {
    integral(deserializer, "total_population")
}

fn de_city<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    let city = normalize_city(&String::deserialize(deserializer)?);
    if city.is_empty() {
        return Err(D::Error::custom("city: empty city name"));
    }
    Ok(city)
}

/// Trim and title-case a city name: the first cased letter of every word is
/// upper-cased and the rest lower-cased, so "  new DELHI " becomes "New Delhi".
pub fn normalize_city(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_cased = false;
    for c in raw.trim().chars() {
        if prev_cased {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        prev_cased = c.is_lowercase() || c.is_uppercase();
    }
    out
}

fn city_key(normalized: &str) -> String {
    normalized.to_lowercase()
}

/// Immutable, city-grouped demographic records.
///
/// Each city's rows are stable-sorted by year, so duplicate years keep file order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    by_city: BTreeMap<String, Vec<DemographicRecord>>,
    len: usize,
}

impl Dataset {
    pub fn from_records(records: impl IntoIterator<Item = DemographicRecord>) -> Self {
        let mut by_city: BTreeMap<String, Vec<DemographicRecord>> = BTreeMap::new();
        let mut len = 0;
        for mut rec in records {
            rec.city = normalize_city(&rec.city);
            by_city.entry(city_key(&rec.city)).or_default().push(rec);
            len += 1;
        }
        for rows in by_city.values_mut() {
            rows.sort_by_key(|r| r.year);
        }
        Self { by_city, len }
    }

    /// Parse a CSV stream with a header row. See [`load_dataset_csv`].
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: csv::StringRecord = rdr
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        let mut missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|col| !headers.iter().any(|h| h == **col))
            .map(|col| col.to_string())
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(PopError::Schema { missing });
        }
        rdr.set_headers(headers.clone());

        let mut records = Vec::new();
        for result in rdr.deserialize::<PopRow>() {
            let row = result.map_err(|e| row_error(e, &headers))?;
            records.push(DemographicRecord {
                city: row.city,
                year: row.year,
                total_population: row.total_population,
                male_ratio: row.male_ratio,
                female_ratio: row.female_ratio,
                voter_ratio: row.voter_ratio,
            });
        }
        Ok(Self::from_records(records))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Unique normalized city names, sorted.
    pub fn cities(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .by_city
            .values()
            .filter_map(|rows| rows.first().map(|r| r.city.clone()))
            .collect();
        names.sort();
        names
    }

    /// Rows for `city` (any casing or padding) sorted by year, or `None` if unknown.
    pub fn city_records(&self, city: &str) -> Option<&[DemographicRecord]> {
        self.by_city
            .get(&city_key(&normalize_city(city)))
            .map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DemographicRecord> {
        self.by_city.values().flatten()
    }
}

/// Deserialization failures become `Parse` with the offending line and column;
/// structural CSV errors pass through.
fn row_error(err: csv::Error, headers: &csv::StringRecord) -> PopError {
    if let csv::ErrorKind::Deserialize { pos, err: de } = err.kind() {
        let reason = de.kind().to_string();
        let column = match de.field().and_then(|i| headers.get(i as usize)) {
            Some(name) => name.to_string(),
            None => REQUIRED_COLUMNS
                .iter()
                .find(|col| reason.starts_with(&format!("{col}:")))
                .map_or("?", |col| *col)
                .to_string(),
        };
        return PopError::Parse {
            line: pos.as_ref().map(|p| p.line()).unwrap_or(0),
            column,
            reason,
        };
    }
    PopError::Csv(err)
}

/// Load the demographic dataset from a CSV file with columns
/// `city,year,total_population,male_ratio,female_ratio,voter_ratio` (any order,
/// case-insensitive, extra columns ignored).
pub fn load_dataset_csv(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let dataset = Dataset::from_reader(file)?;
    if dataset.is_empty() {
        tracing::warn!(path = %path.display(), "dataset has no records");
    }
    tracing::info!(
        path = %path.display(),
        records = dataset.len(),
        cities = dataset.by_city.len(),
        "dataset loaded"
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "city,year,total_population,male_ratio,female_ratio,voter_ratio\n";

    #[test]
    fn normalize_title_cases_words() {
        assert_eq!(normalize_city("  chennai "), "Chennai");
        assert_eq!(normalize_city("new DELHI"), "New Delhi");
        assert_eq!(normalize_city("navi-mumbai"), "Navi-Mumbai");
        assert_eq!(normalize_city("   "), "");
    }

    #[test]
    fn integral_accepts_whole_floats_only() {
        assert_eq!(parse_integral("2030"), Some(2030));
        assert_eq!(parse_integral(" 2030.0 "), Some(2030));
        assert_eq!(parse_integral("-12"), Some(-12));
        assert_eq!(parse_integral("2030.5"), None);
        assert_eq!(parse_integral("inf"), None);
        assert_eq!(parse_integral(""), None);
    }

    #[test]
    fn headers_are_case_and_space_insensitive() {
        let csv = " City ,YEAR, Total_Population ,male_ratio,Female_Ratio,VOTER_RATIO,notes\n\
                   madurai,2011,1017865,0.502,0.498,0.60,census\n";
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 1);
        assert!(!ds.is_empty());
        let rows = ds.city_records("MADURAI").unwrap();
        assert_eq!(rows[0].city, "Madurai");
        assert_eq!(rows[0].total_population, 1_017_865);
    }

    #[test]
    fn header_only_file_is_empty() {
        let ds = Dataset::from_reader(HEADER.as_bytes()).unwrap();
        assert!(ds.is_empty());
        assert!(ds.cities().is_empty());
    }

    #[test]
    fn missing_columns_are_reported_sorted() {
        let csv = "city,total_population,female_ratio\nChennai,1,0.5\n";
        match Dataset::from_reader(csv.as_bytes()) {
            Err(PopError::Schema { missing }) => {
                assert_eq!(missing, vec!["male_ratio", "voter_ratio", "year"]);
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn integral_floats_coerce_and_fractions_fail() {
        let ok = format!("{HEADER}Salem,2011.0,829267.0,0.5,0.5,0.6\n");
        let ds = Dataset::from_reader(ok.as_bytes()).unwrap();
        assert_eq!(ds.city_records("salem").unwrap()[0].year, 2011);

        let bad = format!("{HEADER}Salem,2011,829267,0.5,0.5,0.6\nSalem,2011.5,829267,0.5,0.5,0.6\n");
        match Dataset::from_reader(bad.as_bytes()) {
            Err(PopError::Parse { line, column, reason }) => {
                assert_eq!(line, 3);
                assert_eq!(column, "year");
                assert!(reason.contains("2011.5"), "{reason}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn blank_city_is_rejected() {
        let csv = format!("{HEADER}  ,2011,829267,0.5,0.5,0.6\n");
        match Dataset::from_reader(csv.as_bytes()) {
            Err(PopError::Parse { line, column, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(column, "city");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn bad_ratio_names_its_column() {
        let csv = format!("{HEADER}Salem,2011,829267,0.5,,0.6\n");
        match Dataset::from_reader(csv.as_bytes()) {
            Err(PopError::Parse { column, .. }) => assert_eq!(column, "female_ratio"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn negative_population_is_rejected() {
        let csv = format!("{HEADER}Salem,2011,-5,0.5,0.5,0.6\n");
        match Dataset::from_reader(csv.as_bytes()) {
            Err(PopError::Parse { column, .. }) => assert_eq!(column, "total_population"),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn cities_are_unique_and_sorted() {
        let csv = format!(
            "{HEADER}tirupur,2011,444352,0.5,0.5,0.6\n\
             Chennai,2011,4646732,0.5,0.5,0.6\n\
             TIRUPUR ,2001,344543,0.5,0.5,0.6\n"
        );
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.cities(), vec!["Chennai", "Tirupur"]);
        let years: Vec<i32> = ds.city_records("tirupur").unwrap().iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2001, 2011]);
    }
}
