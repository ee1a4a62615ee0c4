pub mod memory;
pub mod redis;

pub use self::redis::RedisSessionCache;
pub use memory::InMemorySessionCache;
