// Server backend (PostgreSQL).
//
// - codec: binary wire codecs for geometric, enumerated and composite values
// - params: parameter conversion between middleware values and driver types
// - connection: connection lifecycle, type-catalog loading, execution

pub(crate) mod codec;
mod connection;
mod params;

pub use connection::PgConnection;
pub use params::Params;
