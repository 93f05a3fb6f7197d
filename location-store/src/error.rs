use snafu::{Location, Snafu};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Snafu, Debug)]
#[snafu(module, visibility(pub))]
pub enum Error {
    #[snafu(display("Rejected position for '{mmsi}'"))]
    InvalidPosition {
        #[snafu(implicit)]
        location: Location,
        mmsi: String,
        source: tracker_core::Error,
    },
    #[snafu(display("The location store worker has stopped"))]
    StoreClosed {
        #[snafu(implicit)]
        location: Location,
    },
}
