mod postgre;

pub use postgre::{get_path, PoolOption, PoolType};
