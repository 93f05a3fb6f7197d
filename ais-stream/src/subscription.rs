use std::collections::BTreeMap;

use tracing::debug;
use tracker_core::Mmsi;

use crate::{
    catalog::CatalogVessel,
    models::{BoundingBox, SubscribeMessage},
};

pub const DEFAULT_SUBSCRIPTION_BATCH_SIZE: usize = 50;

/// Vessels to request positions for, keyed by MMSI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionSet {
    vessels: BTreeMap<Mmsi, String>,
}

impl SubscriptionSet {
    /// Keeps vessels with a numeric MMSI, a later duplicate replaces the
    /// earlier vessel name.
    pub fn from_catalog(vessels: &[CatalogVessel]) -> Self {
        let mut set = Self::default();
        for vessel in vessels {
            match vessel.mmsi.parse::<Mmsi>() {
                Ok(mmsi) => {
                    set.vessels.insert(mmsi, vessel.name.clone());
                }
                Err(_) => debug!(name = %vessel.name, "vessel has no usable mmsi"),
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.vessels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty()
    }

    pub fn contains(&self, mmsi: &Mmsi) -> bool {
        self.vessels.contains_key(mmsi)
    }

    pub fn name(&self, mmsi: &Mmsi) -> Option<&str> {
        self.vessels.get(mmsi).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Mmsi, &str)> {
        self.vessels.iter().map(|(m, n)| (m, n.as_str()))
    }

    /// One subscribe message per `batch_size` vessels, empty when there is
    /// nothing to subscribe to.
    pub fn messages(
        &self,
        api_key: &str,
        bounding_boxes: &[BoundingBox],
        batch_size: usize,
    ) -> Vec<SubscribeMessage> {
        let mmsis: Vec<Mmsi> = self.vessels.keys().cloned().collect();
        mmsis
            .chunks(batch_size.max(1))
            .map(|chunk| SubscribeMessage::new(api_key, bounding_boxes, chunk.to_vec()))
            .collect()
    }
}
