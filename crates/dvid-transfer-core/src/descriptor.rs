//! Dataset descriptors as reported by a node's `/info` endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::endpoint::DataUrl;
use crate::error::{Operation, Result, TransferError};

// ── Wire types ────────────────────────────────────────────────────────────────

/// Identity and typing shared by every dataset type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseMetadata {
    #[serde(rename = "TypeName")]
    pub type_name: String,
    #[serde(rename = "TypeURL")]
    pub type_url: String,
    #[serde(rename = "TypeVersion")]
    pub type_version: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "RepoUUID")]
    pub repo_uuid: String,
    #[serde(rename = "Compression")]
    pub compression: String,
    #[serde(rename = "Checksum")]
    pub checksum: String,
    #[serde(rename = "Persistence")]
    pub persistence: String,
    #[serde(rename = "Versioned")]
    pub versioned: bool,
}

#[derive(Deserialize)]
struct RawDescriptor {
    #[serde(rename = "Base")]
    base: BaseMetadata,
    #[serde(rename = "Extended", default)]
    extended: Option<serde_json::Value>,
}

/// Block layout of a block-structured volume, in block-grid coordinates.
/// Both index bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeGeometry {
    #[serde(rename = "BlockSize")]
    pub block_size: [i64; 3],
    #[serde(rename = "MinIndex")]
    pub min_index: [i64; 3],
    #[serde(rename = "MaxIndex")]
    pub max_index: [i64; 3],
}

/// Largest index or block edge the service stores; coordinates are 32-bit.
const COORD_LIMIT: i64 = i32::MAX as i64;

impl VolumeGeometry {
    /// Number of blocks along each axis, or `None` when the bounds are
    /// inverted or too far apart to count.
    pub fn block_extent(&self) -> Option<[u64; 3]> {
        let mut n = [0u64; 3];
        for (axis, count) in n.iter_mut().enumerate() {
            let span = self.max_index[axis]
                .checked_sub(self.min_index[axis])?
                .checked_add(1)?;
            *count = u64::try_from(span).ok()?;
        }
        Some(n)
    }

    /// Voxel extent of the full volume along each axis.
    pub fn voxel_extent(&self) -> Option<[u64; 3]> {
        let n = self.block_extent()?;
        let mut v = [0u64; 3];
        for (axis, voxels) in v.iter_mut().enumerate() {
            let edge = u64::try_from(self.block_size[axis]).ok()?;
            *voxels = n[axis].checked_mul(edge)?;
        }
        Some(v)
    }

    /// Voxel coordinate of the volume's first voxel.
    pub fn voxel_origin(&self) -> Option<[i64; 3]> {
        let mut origin = [0i64; 3];
        for (axis, coord) in origin.iter_mut().enumerate() {
            *coord = self.min_index[axis].checked_mul(self.block_size[axis])?;
        }
        Some(origin)
    }

    pub fn is_cubic(&self) -> bool {
        self.block_size[0] == self.block_size[1]
    }

    /// Check that this geometry can be planned: positive block edges,
    /// ordered bounds, and everything inside the 32-bit coordinate range.
    /// Once this passes, every extent and origin computation fits.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.block_size.iter().any(|&b| b <= 0 || b > COORD_LIMIT) {
            return Err(format!("block size out of range: {:?}", self.block_size));
        }
        let in_range = |i: &i64| (-COORD_LIMIT - 1..=COORD_LIMIT).contains(i);
        if !self.min_index.iter().chain(&self.max_index).all(in_range) {
            return Err(format!(
                "block index out of range: MinIndex {:?}, MaxIndex {:?}",
                self.min_index, self.max_index
            ));
        }
        for axis in 0..3 {
            if self.min_index[axis] > self.max_index[axis] {
                return Err(format!(
                    "MinIndex {:?} exceeds MaxIndex {:?} on axis {}",
                    self.min_index, self.max_index, axis
                ));
            }
        }
        Ok(())
    }
}

// ── Data types ────────────────────────────────────────────────────────────────

/// Dataset type names this tool distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    Grayscale8,
    Uint8Blk,
    Labels64,
    LabelBlk,
    Roi,
    Other(String),
}

impl DataType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "grayscale8" => DataType::Grayscale8,
            "uint8blk" => DataType::Uint8Blk,
            "labels64" => DataType::Labels64,
            "labelblk" => DataType::LabelBlk,
            "roi" => DataType::Roi,
            other => DataType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DataType::Grayscale8 => "grayscale8",
            DataType::Uint8Blk => "uint8blk",
            DataType::Labels64 => "labels64",
            DataType::LabelBlk => "labelblk",
            DataType::Roi => "roi",
            DataType::Other(name) => name,
        }
    }

    /// Bytes per voxel for block volume types; `None` for everything else.
    pub fn bytes_per_voxel(&self) -> Option<u64> {
        match self {
            DataType::Grayscale8 | DataType::Uint8Blk => Some(1),
            DataType::Labels64 | DataType::LabelBlk => Some(8),
            _ => None,
        }
    }

    pub fn is_volume(&self) -> bool {
        self.bytes_per_voxel().is_some()
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Descriptor ────────────────────────────────────────────────────────────────

/// Type-specific part of a descriptor, keyed by the base type name.
#[derive(Debug, Clone, PartialEq)]
pub enum Extension {
    Volume(VolumeGeometry),
    Opaque(serde_json::Value),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDescriptor {
    pub base: BaseMetadata,
    pub extension: Extension,
}

impl DatasetDescriptor {
    /// Decode an `/info` body. `url` is only used for error messages.
    ///
    /// Volume geometry is decoded but not validated: a freshly created
    /// destination reports null extents, and only the source geometry is
    /// ever planned. An extension that does not decode as geometry is kept
    /// as `Opaque`.
    pub fn from_json(url: &str, body: &[u8]) -> Result<Self> {
        let raw: RawDescriptor =
            serde_json::from_slice(body).map_err(|e| TransferError::MalformedDescriptor {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let data_type = DataType::from_name(&raw.base.type_name);

        let extension = match raw.extended {
            None | Some(serde_json::Value::Null) => Extension::None,
            Some(value) if data_type.is_volume() => {
                match VolumeGeometry::deserialize(&value) {
                    Ok(geometry) => Extension::Volume(geometry),
                    Err(e) => {
                        tracing::debug!(url, type_name = %data_type, error = %e, "extension carries no usable geometry");
                        Extension::Opaque(value)
                    }
                }
            }
            Some(value) => Extension::Opaque(value),
        };

        Ok(Self {
            base: raw.base,
            extension,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.base.type_name
    }

    pub fn data_type(&self) -> DataType {
        DataType::from_name(&self.base.type_name)
    }

    pub fn geometry(&self) -> Option<&VolumeGeometry> {
        match &self.extension {
            Extension::Volume(g) => Some(g),
            _ => None,
        }
    }
}

/// Fetch and decode the descriptor of the dataset at `url`.
pub async fn resolve(client: &reqwest::Client, url: &DataUrl) -> Result<DatasetDescriptor> {
    let info_url = url.info();
    let request_failed = |source| TransferError::Request {
        op: Operation::Metadata,
        url: info_url.clone(),
        source,
    };

    let resp = client.get(&info_url).send().await.map_err(request_failed)?;
    if resp.status() != reqwest::StatusCode::OK {
        return Err(TransferError::Status {
            op: Operation::Metadata,
            url: info_url.clone(),
            status: resp.status(),
        });
    }
    let body = resp.bytes().await.map_err(request_failed)?;
    let descriptor = DatasetDescriptor::from_json(&info_url, &body)?;

    tracing::debug!(
        url = %url,
        type_name = descriptor.type_name(),
        name = %descriptor.base.name,
        repo = %descriptor.base.repo_uuid,
        "resolved descriptor"
    );
    Ok(descriptor)
}
