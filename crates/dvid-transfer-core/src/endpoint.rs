//! URL construction for a dataset on a data-service node.

use std::fmt;

use reqwest::Url;

use crate::error::{Result, TransferError};

/// Base URL of one dataset instance, e.g. `http://host/api/node/<uuid>/<dataname>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    base: String,
}

impl DataUrl {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: String| TransferError::InvalidUrl {
            url: raw.to_string(),
            reason,
        };
        let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("query and fragment are not allowed".into()));
        }
        Ok(Self {
            base: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.base
    }

    pub fn info(&self) -> String {
        format!("{}/info", self.base)
    }

    pub fn roi(&self) -> String {
        format!("{}/roi", self.base)
    }

    /// `<base>/raw/<axes>/<sx>_<sy>_<sz>/<ox>_<oy>_<oz>`
    pub fn raw(&self, axes: &str, size: [u64; 3], origin: [i64; 3]) -> String {
        format!(
            "{}/raw/{}/{}_{}_{}/{}_{}_{}",
            self.base, axes, size[0], size[1], size[2], origin[0], origin[1], origin[2]
        )
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}
