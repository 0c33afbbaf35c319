use std::{fs::File, io::BufReader, path::Path};

use anyhow::Context;
use serde::de::DeserializeOwned;
use waymark_distance::{
    distance_calculation_service::PropertyLocation, interest_point::InterestPoint,
};

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    serde_json::from_reader(reader).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn read_interest_points(path: &Path) -> anyhow::Result<Vec<InterestPoint>> {
    read_json(path)
}

pub fn read_properties(path: &Path) -> anyhow::Result<Vec<PropertyLocation>> {
    read_json(path)
}
