pub mod command;
pub mod dispatcher;
pub mod event_bus;
pub mod metrics;

pub use command::*;
pub use dispatcher::*;
pub use event_bus::*;
pub use metrics::*;
