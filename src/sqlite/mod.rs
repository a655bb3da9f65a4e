// Embedded backend (SQLite).
//
// - params: parameter conversion between middleware values and storage classes
// - connection: connection lifecycle and execution

mod connection;
mod params;

pub use connection::SqliteConnection;
pub use params::Params;
