use snafu::{Location, Snafu};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Snafu, Debug)]
#[snafu(module, visibility(pub))]
pub enum Error {
    #[snafu(display("Invalid stream url '{url}'"))]
    InvalidUrl {
        #[snafu(implicit)]
        location: Location,
        url: String,
        #[snafu(source)]
        error: url::ParseError,
    },
    #[snafu(display("Websocket operation failed"))]
    WebSocket {
        #[snafu(implicit)]
        location: Location,
        #[snafu(source)]
        error: tokio_tungstenite::tungstenite::Error,
    },
    #[snafu(display("Connection was refused: {reason}"))]
    ConnectionRefused {
        #[snafu(implicit)]
        location: Location,
        reason: String,
    },
    #[snafu(display("Failed to read vessel catalog '{path}'"))]
    Catalog {
        #[snafu(implicit)]
        location: Location,
        path: String,
        #[snafu(source)]
        error: csv::Error,
    },
}
