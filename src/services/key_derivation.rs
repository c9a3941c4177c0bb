//! HKDF-SHA256 derivation of per-project content-encryption keys.

use hkdf::Hkdf;
use sha2::Sha256;
use uuid::Uuid;
use zeroize::Zeroizing;

const INFO_LABEL: &[u8] = b"file-encryption";
const KEY_LEN: usize = 32;

/// Derives the 32-byte AES-256 key for a project's content envelope.
/// Deterministic: the same `(master, project_id)` pair always yields the same key.
pub fn derive_project_key(master: &[u8; 32], project_id: Uuid) -> Zeroizing<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(Some(project_id.to_string().as_bytes()), master);
    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(INFO_LABEL, okm.as_mut())
        .expect("32 is a valid HKDF-SHA256 output length");
    okm
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_same_project() {
        let master = [7u8; 32];
        let project = Uuid::now_v7();
        let a = derive_project_key(&master, project);
        let b = derive_project_key(&master, project);
        assert_eq!(*a, *b);
    }

    #[test]
    fn distinct_for_distinct_projects() {
        let master = [7u8; 32];
        let a = derive_project_key(&master, Uuid::now_v7());
        let b = derive_project_key(&master, Uuid::now_v7());
        assert_ne!(*a, *b);
    }
}
