pub mod config;
pub mod counter;
pub mod shard;
pub mod stdio;
