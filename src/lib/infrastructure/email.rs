pub mod aliyun;
pub mod config;
pub mod registry;
pub mod signing;
pub mod smtp;
pub mod tencent;
