use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde_repr::{Deserialize_repr, Serialize_repr};

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    FromPrimitive,
    Eq,
    Serialize_repr,
    Deserialize_repr,
    strum::Display,
)]
#[repr(u8)]
pub enum NavigationStatus {
    UnderWayUsingEngine = 0,
    AtAnchor = 1,
    NotUnderCommand = 2,
    RestrictedManoeuverability = 3,
    ConstrainedByDraught = 4,
    Moored = 5,
    Aground = 6,
    EngagedInFishing = 7,
    UnderWaySailing = 8,
    Reserved9 = 9,
    Reserved10 = 10,
    Reserved11 = 11,
    Reserved12 = 12,
    Reserved13 = 13,
    AisSartIsActive = 14,
    NotDefined = 15,
}

impl NavigationStatus {
    /// Maps a raw AIS status code, unknown codes yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::from_i64(code)
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn description(self) -> &'static str {
        use NavigationStatus::*;

        match self {
            UnderWayUsingEngine => "Under way using engine",
            AtAnchor => "At anchor",
            NotUnderCommand => "Not under command",
            RestrictedManoeuverability => "Restricted manoeuverability",
            ConstrainedByDraught => "Constrained by draught",
            Moored => "Moored",
            Aground => "Aground",
            EngagedInFishing => "Engaged in fishing",
            UnderWaySailing => "Under way sailing",
            Reserved9 | Reserved10 | Reserved11 | Reserved12 | Reserved13 => "Reserved",
            AisSartIsActive => "AIS-SART is active",
            NotDefined => "Not defined",
        }
    }
}
