pub use self::{
    path::get_path,
    types::{PoolOption, PoolType},
};

mod appointment;
mod notification_log;
mod path;
mod settings;
mod subscription;
mod types;
