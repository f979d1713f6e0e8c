#![allow(renamed_and_removed_lints)]

#[macro_use] extern crate serde_derive;
extern crate serde;
extern crate serde_json;
extern crate serde_yaml;

#[macro_use] extern crate log;
#[macro_use] extern crate failure;
#[macro_use] extern crate lazy_static;

use failure::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub mod model;
pub mod ingress;
pub mod probe;
pub mod history;
pub mod metrics;
pub mod evaluate;
pub mod fetcher;
pub mod config;
pub mod cluster;

pub use cluster::{
    demo::{spawn_fake_probe_server, DemoClusterInfoProvider},
    live::LiveClusterInfoProvider,
    ClusterInfoProvider,
};
pub use fetcher::StatusFetcher;
pub use model::{
    AppDeploymentInfo, AppStateInfo, DeclaredApplication, HealthCheckType, HistoryBuffer, Image,
    IngressRecord, ResultMap, State,
};
