pub mod port;

pub use port::find_available_port;
