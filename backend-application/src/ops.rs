// Application-level operational facilities

pub mod kill_stream_hub;

pub use kill_stream_hub::*;
