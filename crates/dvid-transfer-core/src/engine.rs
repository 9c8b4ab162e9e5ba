//! Streaming read → write exchanges between two nodes.
//!
//! The body of each source response is handed to the destination request as
//! a stream, so memory use stays at one in-flight chunk regardless of strip size.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::TryStreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use crate::endpoint::DataUrl;
use crate::error::{Operation, Result, TransferError};
use crate::plan::{Plan, StripPlan};

const OCTET_STREAM: &str = "application/octet-stream";
const JSON: &str = "application/json";

/// One source → destination exchange.
struct Exchange<'a> {
    read_url: &'a str,
    write_url: &'a str,
    read_op: Operation,
    write_op: Operation,
    content_type: &'static str,
    read_ok: fn(StatusCode) -> bool,
}

fn only_ok(status: StatusCode) -> bool {
    status == StatusCode::OK
}

fn ok_or_partial(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::PARTIAL_CONTENT
}

pub struct StreamingEngine {
    client: reqwest::Client,
    axis_order: String,
}

impl StreamingEngine {
    pub fn new(client: reqwest::Client, axis_order: impl Into<String>) -> Self {
        Self {
            client,
            axis_order: axis_order.into(),
        }
    }

    /// Move one strip. Returns the number of bytes forwarded.
    pub async fn transfer_strip(
        &self,
        src: &DataUrl,
        dst: &DataUrl,
        strip: &StripPlan,
    ) -> Result<u64> {
        let read_url = src.raw(&self.axis_order, strip.size, strip.origin);
        let write_url = dst.raw(&self.axis_order, strip.size, strip.origin);
        tracing::info!(src = %read_url, dst = %write_url, "transferring");

        self.forward(Exchange {
            read_url: &read_url,
            write_url: &write_url,
            read_op: Operation::Read,
            write_op: Operation::Write,
            content_type: OCTET_STREAM,
            read_ok: only_ok,
        })
        .await
    }

    /// Move every strip of `plan` in order, stopping at the first failure.
    /// Returns `(strips, bytes)` transferred.
    pub async fn transfer_plan(&self, src: &DataUrl, dst: &DataUrl, plan: &Plan) -> Result<(u64, u64)> {
        let total = plan.total_strips();
        let mut strips = 0;
        let mut bytes = 0;
        for item in plan.strips() {
            tracing::debug!(
                z = item.z,
                band = item.band,
                strip = strips + 1,
                of = total,
                "strip"
            );
            bytes += self.transfer_strip(src, dst, &item.strip).await?;
            strips += 1;
        }
        Ok((strips, bytes))
    }

    /// Copy the region-of-interest record as-is.
    pub async fn copy_roi(&self, src: &DataUrl, dst: &DataUrl) -> Result<u64> {
        let read_url = src.roi();
        let write_url = dst.roi();
        tracing::info!(src = %read_url, dst = %write_url, "transferring");

        self.forward(Exchange {
            read_url: &read_url,
            write_url: &write_url,
            read_op: Operation::RoiRead,
            write_op: Operation::RoiWrite,
            content_type: JSON,
            read_ok: ok_or_partial,
        })
        .await
    }

    async fn forward(&self, ex: Exchange<'_>) -> Result<u64> {
        let resp = self
            .client
            .get(ex.read_url)
            .send()
            .await
            .map_err(|source| TransferError::Request {
                op: ex.read_op,
                url: ex.read_url.to_string(),
                source,
            })?;
        if !(ex.read_ok)(resp.status()) {
            return Err(TransferError::Status {
                op: ex.read_op,
                url: ex.read_url.to_string(),
                status: resp.status(),
            });
        }

        let forwarded = Arc::new(AtomicU64::new(0));
        let counter = forwarded.clone();
        let body = resp.bytes_stream().inspect_ok(move |chunk| {
            counter.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        });

        let resp = self
            .client
            .post(ex.write_url)
            .header(CONTENT_TYPE, ex.content_type)
            .body(reqwest::Body::wrap_stream(body))
            .send()
            .await
            .map_err(|source| TransferError::Request {
                op: ex.write_op,
                url: ex.write_url.to_string(),
                source,
            })?;
        if resp.status() != StatusCode::OK {
            return Err(TransferError::Status {
                op: ex.write_op,
                url: ex.write_url.to_string(),
                status: resp.status(),
            });
        }

        let bytes = forwarded.load(Ordering::Relaxed);
        tracing::debug!(bytes, dst = %ex.write_url, "forwarded");
        Ok(bytes)
    }
}
