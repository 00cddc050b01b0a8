//! Truvis 工具集
//!
//! 目前只提供日志初始化，frame graph 的各个 binary 共用同一套日志格式。

pub mod init_log;
