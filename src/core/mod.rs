pub mod codec;
pub mod config;
pub mod draw;
pub mod export;
pub mod id;
pub mod roster;
pub mod roster_file;
