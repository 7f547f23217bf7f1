pub mod connection;
pub mod net;
pub mod spec;
pub mod unit;

pub use connection::Connection;
pub use net::Net;
pub use spec::NetSpec;
pub use unit::{Unit, UnitId};
