//! Canonical digest of build settings.

use std::collections::BTreeMap;

use skein_common::{ContentHash, DigestBuilder};
use skein_graph::SettingValue;

/// Digests a settings table.
///
/// Keys are visited in sorted order; array values keep their declared order
/// since flag order can be significant. A scalar and a one-element array
/// with the same text digest differently.
pub fn settings_digest(settings: &BTreeMap<String, SettingValue>) -> ContentHash {
    let mut digest = DigestBuilder::new();
    digest.bytes(&(settings.len() as u64).to_le_bytes());
    for (key, value) in settings {
        digest.str(key);
        match value {
            SettingValue::String(s) => {
                digest.str("s").str(s);
            }
            SettingValue::Array(items) => {
                digest.str("a").bytes(&(items.len() as u64).to_le_bytes());
                for item in items {
                    digest.str(item);
                }
            }
        }
    }
    digest.finish()
}
