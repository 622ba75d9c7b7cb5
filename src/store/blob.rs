// BLOB version prefix helpers. [version: u8][payload].
// audit_log.payload: version 1 = wincode AuditEntry.

pub(super) const AUDIT_BLOB_VERSION: u8 = 1;

pub(super) fn with_version_prefix(version: u8, payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(version);
    out.extend_from_slice(&payload);
    out
}

/// Split a stored blob into (version, payload). An empty blob is version 0 with no payload.
pub(super) fn split_version(bytes: &[u8]) -> (u8, &[u8]) {
    match bytes.split_first() {
        Some((version, payload)) => (*version, payload),
        None => (0, bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_then_split_returns_payload() {
        let blob = with_version_prefix(AUDIT_BLOB_VERSION, vec![7, 8, 9]);
        assert_eq!(split_version(&blob), (AUDIT_BLOB_VERSION, &[7u8, 8, 9][..]));
    }

    #[test]
    fn empty_blob_is_version_zero() {
        assert_eq!(split_version(&[]), (0, &[][..]));
    }
}
