//! `Content-Range` header parsing
//!
//! The backend answers ranged reads with `Content-Range: <first>-<last>/<total>`.
//! `*` stands for an unknown part: `0-999/*` when no count was requested,
//! `*/0` for an empty result.

use routehub_common::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    /// Inclusive row bounds, absent for an empty page
    pub rows: Option<(u64, u64)>,
    /// Total matching rows, when the server counted them
    pub total: Option<u64>,
}

impl ContentRange {
    pub fn parse(header: &str) -> Result<Self> {
        let header = header.trim();
        // Some proxies keep the RFC 7233 unit prefix
        let header = header.strip_prefix("items ").unwrap_or(header);

        let (range, total) = header
            .split_once('/')
            .ok_or_else(|| invalid(header))?;

        let total = match total.trim() {
            "*" => None,
            n => Some(n.parse().map_err(|_| invalid(header))?),
        };

        let rows = match range.trim() {
            "*" => None,
            r => {
                let (first, last) = r.split_once('-').ok_or_else(|| invalid(header))?;
                let first: u64 = first.parse().map_err(|_| invalid(header))?;
                let last: u64 = last.parse().map_err(|_| invalid(header))?;
                if last < first {
                    return Err(invalid(header));
                }
                Some((first, last))
            }
        };

        Ok(Self { rows, total })
    }

    /// More rows exist past this page, when the server says so
    pub fn has_more(&self) -> Option<bool> {
        match (self.rows, self.total) {
            (Some((_, last)), Some(total)) => Some(last + 1 < total),
            (None, Some(_)) => Some(false),
            _ => None,
        }
    }
}

fn invalid(header: &str) -> Error {
    Error::Decode(format!("invalid Content-Range '{}'", header))
}
