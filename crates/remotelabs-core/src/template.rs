//! Templates, source images and the resource triple they carry.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

const MIB_PER_GIB: u64 = 1024;

// ─── Resources ───────────────────────────────────────────────────────────────

/// vCPU / RAM / disk numbers shared by templates, instances and definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resources {
  #[serde(rename = "vcpuCount")]
  pub vcpu_count: u32,
  #[serde(rename = "vramMB")]
  pub vram_mb:    u64,
  #[serde(rename = "sizeMB")]
  pub size_mb:    u64,
}

impl Resources {
  /// Build from the textual form fields: RAM and storage in GiB, CPU count.
  ///
  /// ```
  /// # use remotelabs_core::template::Resources;
  /// let r = Resources::from_form("4", "4", "20").unwrap();
  /// assert_eq!((r.vram_mb, r.vcpu_count, r.size_mb), (4096, 4, 20480));
  /// ```
  pub fn from_form(ram_gib: &str, cpus: &str, storage_gib: &str) -> Result<Self> {
    let vram_mb = to_mib("vmRam", ram_gib)?;
    let size_mb = to_mib("vmStorage", storage_gib)?;
    let vcpu_count = u32::try_from(parse_positive("vmCpu", cpus)?)
      .map_err(|_| invalid("vmCpu", cpus))?;
    Ok(Self { vcpu_count, vram_mb, size_mb })
  }
}

fn invalid(field: &'static str, raw: &str) -> Error {
  Error::InvalidQuantity { field, value: raw.to_owned() }
}

fn parse_positive(field: &'static str, raw: &str) -> Result<u64> {
  match raw.trim().parse::<u64>() {
    Ok(n) if n > 0 => Ok(n),
    _ => Err(invalid(field, raw)),
  }
}

fn to_mib(field: &'static str, raw: &str) -> Result<u64> {
  parse_positive(field, raw)?
    .checked_mul(MIB_PER_GIB)
    .ok_or_else(|| invalid(field, raw))
}

// ─── Template ────────────────────────────────────────────────────────────────

/// A resource-and-image specification instances are created from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
  pub id:          Uuid,
  pub description: String,
  pub subject_id:  Uuid,
  #[serde(flatten)]
  pub resources:   Resources,
}

/// An immutable source image a template can start from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Base {
  pub id:          String,
  pub description: String,
}
