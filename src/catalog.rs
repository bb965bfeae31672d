//! Item catalog and variant generation.
//!
//! The catalog is a user-curated flat file of base item codes, one per
//! line. The scanner must never fail to run for lack of a catalog: a
//! missing or unreadable file falls back to a single built-in code.
//! An existing file that resolves to zero codes, however, is a fatal
//! configuration fault, since an empty scan would read as a clean market.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::types::{ScanError, Variant};

/// Fallback base code used when no catalog file is available.
pub const DEFAULT_BASE_CODE: &str = "BAG";

// ---------------------------------------------------------------------------
// Catalog file
// ---------------------------------------------------------------------------

/// Load base item codes from the catalog file.
///
/// Lines are trimmed; blanks and `#` comments are skipped; duplicates
/// are dropped while preserving first-seen order.
pub fn load_base_codes(path: &str) -> Result<Vec<String>, ScanError> {
    if !Path::new(path).exists() {
        warn!(path, fallback = DEFAULT_BASE_CODE, "Catalog file missing, using fallback code");
        return Ok(vec![DEFAULT_BASE_CODE.to_string()]);
    }

    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!(path, error = %e, fallback = DEFAULT_BASE_CODE, "Catalog file unreadable, using fallback code");
            return Ok(vec![DEFAULT_BASE_CODE.to_string()]);
        }
    };

    let mut seen = HashSet::new();
    let codes: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter(|l| seen.insert(l.to_uppercase()))
        .map(|l| l.to_uppercase())
        .collect();

    if codes.is_empty() {
        return Err(ScanError::EmptyCatalog);
    }

    info!(path, count = codes.len(), "Catalog loaded");
    Ok(codes)
}

// ---------------------------------------------------------------------------
// Variant generation
// ---------------------------------------------------------------------------

/// Expand base codes into the full combinatorial variant set.
///
/// Lazy and restartable: the returned iterator borrows the code list and
/// can be created again at no cost. Per base code, tiers iterate
/// ascending and enchantments ascending within each tier. Ids are unique
/// across the set because the (code, tier, enchantment) ranges are
/// disjoint per code.
pub fn generate_variants<'a>(
    base_codes: &'a [String],
    min_tier: u8,
    max_tier: u8,
    max_enchant: u8,
) -> Result<impl Iterator<Item = Variant> + 'a, ScanError> {
    if base_codes.is_empty() {
        return Err(ScanError::EmptyCatalog);
    }
    if min_tier > max_tier {
        return Err(ScanError::InvalidTierRange {
            min: min_tier,
            max: max_tier,
        });
    }

    Ok(base_codes.iter().flat_map(move |code| {
        (min_tier..=max_tier).flat_map(move |tier| {
            (0..=max_enchant).map(move |enchant| Variant::new(code, tier, enchant))
        })
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
