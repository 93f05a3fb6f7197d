use std::{io::Read, path::Path};

use serde::Deserialize;
use snafu::ResultExt;
use tracing::warn;
use tracker_core::{Mmsi, Position};

use crate::{
    error::{Result, error::CatalogSnafu},
    normalizer::normalize_catalog_location,
};

/// A row of the `;` separated vessel catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogVessel {
    #[serde(rename = "MMSI", default)]
    pub mmsi: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Location", default)]
    pub location: Option<String>,
    #[serde(rename = "Delivered", default)]
    pub delivered: Option<String>,
}

pub fn read_catalog(path: &Path) -> Result<Vec<CatalogVessel>> {
    let reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .context(CatalogSnafu {
            path: path.display().to_string(),
        })?;
    Ok(deserialize_rows(reader))
}

pub fn read_catalog_from<R: Read>(source: R) -> Vec<CatalogVessel> {
    let reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);
    deserialize_rows(reader)
}

fn deserialize_rows<R: Read>(mut reader: csv::Reader<R>) -> Vec<CatalogVessel> {
    reader
        .deserialize::<CatalogVessel>()
        .filter_map(|row| match row {
            Ok(vessel) => Some(vessel),
            Err(e) => {
                warn!("skipping invalid catalog row: {e}");
                None
            }
        })
        .collect()
}

/// Seed positions for catalog vessels that carry a known location.
pub fn catalog_positions(vessels: &[CatalogVessel]) -> Vec<Position> {
    vessels
        .iter()
        .filter_map(|vessel| {
            let location = vessel.location.as_deref()?;
            let mmsi = vessel.mmsi.parse::<Mmsi>().ok()?;
            normalize_catalog_location(&mmsi, location, vessel.delivered.as_deref())
        })
        .collect()
}
