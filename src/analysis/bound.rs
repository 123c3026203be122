use serde::Serialize;
use crate::{ProbeError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedPayload {
    pub text: String,
    pub kept: usize,
    pub total: usize,
    pub truncated: bool,
}

/// Serializes `items` as a pretty JSON array no longer than `max_len` bytes.
///
/// When the full array is too large, whole trailing elements are dropped; the result is
/// always a complete JSON array. A first cut is estimated from the average element size
/// and then corrected by binary search over prefix lengths. Fails with
/// [`ProbeError::Budget`] when not even an empty array fits.
pub fn bound_list<T: Serialize>(items: &[T], max_len: usize) -> Result<BoundedPayload> {
    let total = items.len();
    let full = serde_json::to_string_pretty(items)?;
    
    if full.len() <= max_len {
        return Ok(BoundedPayload {
            text: full,
            kept: total,
            truncated: false,
            total,
        });
    }
    
    // Largest prefix length known to fit, and smallest known not to.
    let mut fits = 0;
    let mut fits_text = serde_json::to_string_pretty(&items[..0])?;
    if fits_text.len() > max_len {
        return Err(ProbeError::Budget(max_len));
    }
    let mut too_big = total;
    
    let estimate = (total * max_len) / full.len().max(1);
    if estimate > 0 && estimate < total {
        let text = serde_json::to_string_pretty(&items[..estimate])?;
        if text.len() <= max_len {
            fits = estimate;
            fits_text = text;
        } else {
            too_big = estimate;
        }
    }
    
    while too_big - fits > 1 {
        let mid = fits + (too_big - fits) / 2;
        let text = serde_json::to_string_pretty(&items[..mid])?;
        if text.len() <= max_len {
            fits = mid;
            fits_text = text;
        } else {
            too_big = mid;
        }
    }
    
    log::info!("Truncated payload from {} to {} elements to fit {} bytes", total, fits, max_len);
    
    Ok(BoundedPayload {
        text: fits_text,
        kept: fits,
        total,
        truncated: true,
    })
}

/// Joins whole `values` with `separator` while the text stays within `max_len` bytes.
pub fn bound_joined(values: &[String], separator: &str, max_len: usize) -> BoundedPayload {
    let mut text = String::new();
    let mut kept = 0;
    
    for value in values {
        let extra = if kept == 0 { value.len() } else { separator.len() + value.len() };
        if text.len() + extra > max_len {
            break;
        }
        if kept > 0 {
            text.push_str(separator);
        }
        text.push_str(value);
        kept += 1;
    }
    
    BoundedPayload {
        text,
        kept,
        total: values.len(),
        truncated: kept < values.len(),
    }
}
