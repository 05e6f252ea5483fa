use citypop::io::population::load_dataset_csv;
use citypop::model::estimator::estimate;
use citypop::model::growth::GrowthModel;

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/data/city_demographics.csv").to_string());
    let dataset = load_dataset_csv(&path)?;
    let growth = GrowthModel::default();

    println!("city,year,population,predicted,growth_model");
    for city in dataset.cities() {
        for year in (2001..=2041).step_by(5) {
            let e = estimate(&dataset, &city, year)?;
            println!(
                "{},{},{},{},{}",
                e.city,
                e.year,
                e.population,
                e.predicted,
                growth.predict(&city, year)
            );
        }
    }

    Ok(())
}
