pub mod allocator;
pub mod connection;
pub mod directory;
pub mod error;
pub mod model;
pub mod preset;
pub mod split;
