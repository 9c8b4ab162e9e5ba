//! Type compatibility and strategy selection for a source → destination copy.

use std::fmt;

use crate::config::TransferConfig;
use crate::descriptor::{resolve, DataType, DatasetDescriptor, VolumeGeometry};
use crate::endpoint::DataUrl;
use crate::engine::StreamingEngine;
use crate::error::{Result, TransferError};
use crate::plan::{plan, StripPlan};

/// How a dataset is moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One read → write covering the whole volume.
    WholeBlob,
    /// Byte-bounded strips, one Z block-layer at a time.
    PartitionedVolume,
    /// One read → write of the region-of-interest record.
    Descriptor,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::WholeBlob => "whole-blob copy",
            Strategy::PartitionedVolume => "partitioned volume copy",
            Strategy::Descriptor => "descriptor copy",
        })
    }
}

/// Outcome of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReport {
    pub strategy: Strategy,
    pub source_type: DataType,
    /// Read → write exchanges performed (or planned, for a dry run).
    pub exchanges: u64,
    /// Bytes forwarded (or expected, for a dry run).
    pub bytes: u64,
    pub dry_run: bool,
}

/// Pick the strategy for a type pairing, rejecting anything outside the table.
pub fn select_strategy(src: &DataType, dst: &DataType) -> Result<Strategy> {
    let (required, strategy) = match src {
        DataType::Grayscale8 | DataType::Uint8Blk => (DataType::Uint8Blk, Strategy::WholeBlob),
        DataType::Labels64 => (DataType::LabelBlk, Strategy::PartitionedVolume),
        DataType::Roi => (DataType::Roi, Strategy::Descriptor),
        other => {
            return Err(TransferError::UnsupportedSource {
                type_name: other.to_string(),
            })
        }
    };
    if *dst != required {
        return Err(TransferError::Incompatible {
            source_type: src.to_string(),
            dest_type: dst.to_string(),
            required: required.to_string(),
        });
    }
    Ok(strategy)
}

pub struct Dispatcher {
    client: reqwest::Client,
    config: TransferConfig,
    dry_run: bool,
}

impl Dispatcher {
    pub fn new(config: TransferConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: TransferConfig) -> Self {
        Self {
            client,
            config,
            dry_run: false,
        }
    }

    /// Resolve and plan only; no raw or roi requests are issued.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Copy the dataset at `src` into the dataset at `dst`.
    pub async fn dispatch(&self, src: &str, dst: &str) -> Result<TransferReport> {
        let src_url = DataUrl::parse(src)?;
        let dst_url = DataUrl::parse(dst)?;

        let src_desc = resolve(&self.client, &src_url).await?;
        let dst_desc = resolve(&self.client, &dst_url).await?;
        let src_type = src_desc.data_type();
        let strategy = select_strategy(&src_type, &dst_desc.data_type())?;

        tracing::info!(
            src = %src_url,
            dst = %dst_url,
            source_type = %src_type,
            dest_type = dst_desc.type_name(),
            %strategy,
            "starting transfer"
        );

        let engine = StreamingEngine::new(self.client.clone(), self.config.axis_order.clone());
        let (exchanges, bytes) = match strategy {
            Strategy::WholeBlob => {
                let strip = whole_volume(&src_desc, &src_url)?;
                let expected = strip
                    .voxels()
                    .saturating_mul(src_type.bytes_per_voxel().unwrap_or(1));
                if self.dry_run {
                    (1, expected)
                } else {
                    (1, engine.transfer_strip(&src_url, &dst_url, &strip).await?)
                }
            }
            Strategy::PartitionedVolume => {
                let geometry = source_geometry(&src_desc, &src_url)?;
                tracing::info!(min_index = ?geometry.min_index, max_index = ?geometry.max_index, "source extents");

                let bytes_per_voxel = src_type.bytes_per_voxel().unwrap_or(8);
                let plan = plan(
                    geometry,
                    self.config.byte_ceiling,
                    bytes_per_voxel,
                    (&self.config).into(),
                )?;
                tracing::info!(
                    strips_per_layer = plan.strips_per_layer,
                    bands_per_layer = plan.bands_per_layer,
                    layers = plan.layers,
                    layer_bytes = plan.layer_bytes,
                    "partitioned volume"
                );

                if self.dry_run {
                    for item in plan.strips() {
                        tracing::info!(z = item.z, band = item.band, origin = ?item.strip.origin, size = ?item.strip.size, "planned strip");
                    }
                    (plan.total_strips(), plan.total_bytes())
                } else {
                    engine.transfer_plan(&src_url, &dst_url, &plan).await?
                }
            }
            Strategy::Descriptor => {
                if self.dry_run {
                    (1, 0)
                } else {
                    (1, engine.copy_roi(&src_url, &dst_url).await?)
                }
            }
        };

        tracing::info!(exchanges, bytes, dry_run = self.dry_run, "transfer complete");
        Ok(TransferReport {
            strategy,
            source_type: src_type,
            exchanges,
            bytes,
            dry_run: self.dry_run,
        })
    }
}

/// The source's geometry, validated before anything is planned from it.
fn source_geometry<'a>(desc: &'a DatasetDescriptor, url: &DataUrl) -> Result<&'a VolumeGeometry> {
    let malformed = |reason: String| TransferError::MalformedDescriptor {
        url: url.info(),
        reason,
    };
    let geometry = desc
        .geometry()
        .ok_or_else(|| malformed(format!("{} descriptor has no geometry", desc.type_name())))?;
    geometry.validate().map_err(malformed)?;
    Ok(geometry)
}

/// The full voxel box of a volume, every Z layer included.
fn whole_volume(desc: &DatasetDescriptor, url: &DataUrl) -> Result<StripPlan> {
    let geometry = source_geometry(desc, url)?;
    let overflow = || TransferError::MalformedDescriptor {
        url: url.info(),
        reason: format!("extent of {:?} overflows", geometry),
    };
    Ok(StripPlan {
        origin: geometry.voxel_origin().ok_or_else(overflow)?,
        size: geometry.voxel_extent().ok_or_else(overflow)?,
    })
}
