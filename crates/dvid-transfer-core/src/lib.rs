//! dvid-transfer-core — copy datasets between data-service nodes over HTTP.
//!
//! Descriptors are resolved from each node's `/info` endpoint, the pair of
//! type names selects a strategy, and label volumes are moved one byte-bounded
//! strip at a time with the read body piped straight into the write request.

pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod plan;

pub use config::{BlockShapePolicy, ConfigError, StripCoverage, TransferConfig};
pub use descriptor::{resolve, DataType, DatasetDescriptor, Extension, VolumeGeometry};
pub use dispatch::{select_strategy, Dispatcher, Strategy, TransferReport};
pub use endpoint::DataUrl;
pub use engine::StreamingEngine;
pub use error::{Operation, TransferError};
pub use plan::{plan, LayerStrip, Plan, PlanOptions, StripPlan};
