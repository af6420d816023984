//! 配置模块
//!
//! 配置加载顺序：内置默认值 -> TOML 配置文件 -> `SYNCER_` 前缀的环境变量

pub mod models;

#[cfg(test)]
mod tests;

pub use models::*;
