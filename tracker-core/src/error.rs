use snafu::{Location, Snafu};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Snafu, Debug)]
#[snafu(module, visibility(pub))]
pub enum Error {
    #[snafu(display("Invalid mmsi '{value}'"))]
    InvalidMmsi {
        #[snafu(implicit)]
        location: Location,
        value: String,
    },
    #[snafu(display("Coordinates out of range, latitude: '{latitude}', longitude: '{longitude}'"))]
    InvalidCoordinates {
        #[snafu(implicit)]
        location: Location,
        latitude: f64,
        longitude: f64,
    },
    #[snafu(display("Invalid environment '{value}'"))]
    InvalidEnvironment {
        #[snafu(implicit)]
        location: Location,
        value: String,
    },
    #[snafu(display("Storage operation failed on '{path}'"))]
    Storage {
        #[snafu(implicit)]
        location: Location,
        path: String,
        #[snafu(source)]
        error: std::io::Error,
    },
}
