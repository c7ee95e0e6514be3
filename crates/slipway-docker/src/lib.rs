pub mod client;
pub mod docker;
pub mod executor;

pub use client::{
    BuildError, CheckResult, ContainerError, DockerClient, DoctorReport, PlatformCheck,
    RegistryError, SetupError,
};
pub use executor::{DockerCli, SystemDocker};
