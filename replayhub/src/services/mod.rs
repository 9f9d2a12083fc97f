//! Service wiring.

mod container;
mod publish;
mod upload;

pub use container::{ContainerConfig, ContainerStats, ServiceContainer};
pub use publish::PublishService;
pub use upload::UploadService;
