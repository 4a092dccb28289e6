//! # ecsmesh-discovery
//!
//! Everything between "a list of configured service references" and "a flat
//! set of reachable endpoints":
//!
//! - [`ClusterInventory`] - the capability trait over ECS/EC2 queries, with
//!   a live AWS implementation ([`AwsInventory`]) and an in-memory fixture
//!   implementation ([`StaticInventory`])
//! - [`PathRef`] - a configured route target with a stable identity
//! - [`TaskPort`] - one network endpoint exposed by a running container
//! - [`assemble`] - correlates services, deployments, tasks, bindings, and
//!   EC2 hosts into complete [`TaskPort`]s
//! - [`find_matches`] / [`claim`] - maps refs onto task ports, refusing
//!   ambiguous matches
//! - [`find_diffs`] - the add/remove delta between successive endpoint sets

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod assemble;
mod aws;
mod diff;
mod inventory;
mod matcher;
mod metadata;
mod path_ref;
mod task_port;

pub use assemble::assemble;
pub use aws::AwsInventory;
pub use diff::{find_diffs, TaskPortDiff};
pub use inventory::{
    ClusterInventory, ContainerRecord, DeploymentRecord, Ec2Instance, PortBinding, ServiceRecord,
    StaticInventory, TaskRecord,
};
pub use matcher::{claim, find_matches};
pub use metadata::instance_local_ip;
pub use path_ref::PathRef;
pub use task_port::TaskPort;
