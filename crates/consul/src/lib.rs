//! Consul 注册中心客户端
//!
//! 采集器只通过 [`RegistryClient`] trait 访问注册中心，
//! [`ConsulClient`] 是基于 Consul HTTP API 的实现。

pub mod client;
pub mod error;
pub mod types;

pub use client::{ClientConfig, ConsulClient, Endpoint, RegistryClient};
pub use error::{RegistryError, Result};
pub use types::{Check, CheckStatus, Instance, MEMBERSHIP_CHECK_ID};
