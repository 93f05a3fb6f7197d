mod mmsi;
mod navigation_status;
mod position;

pub use mmsi::*;
pub use navigation_status::*;
pub use position::*;
