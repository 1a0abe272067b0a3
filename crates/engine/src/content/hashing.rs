use sha2::{Digest, Sha256};

use super::discovery::PackInfo;

/// SHA-256 over the ordered pack folder names. Changes whenever a pack is
/// added, removed or reordered.
pub(crate) fn pack_fingerprint(packs: &[PackInfo]) -> String {
    let mut hasher = Sha256::new();
    for pack in packs {
        hasher.update(pack.internal_name.as_bytes());
        hasher.update([0u8]);
        hasher.update(pack.metadata.version.as_bytes());
        hasher.update([0u8]);
    }
    to_hex_lower(&hasher.finalize())
}

fn to_hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write as _;

    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
