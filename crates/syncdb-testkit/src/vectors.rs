//! Golden test vectors for deterministic verification: fixed
//! `(local_key, sync_file_id)` -> `ObjectID` pairs for the squeeze/unsqueeze
//! mapping (C4), and a structural check of the sync-changeset framing
//! header (spec §6.1).
//!
//! The squeeze vectors below were derived by hand from the bit operations
//! in `syncdb_core::objid::ObjectID::squeeze`, not by running the
//! implementation, so a regression in that function's arithmetic shows up
//! here as a mismatch rather than as two wrongs agreeing with each other.

use syncdb_core::{ObjKey, ObjectID};
use syncdb_sync::messages::framing;

/// One `(local_key, sync_file_id) -> (hi, lo)` squeeze vector.
#[derive(Debug, Clone, Copy)]
pub struct SqueezeVector {
    pub name: &'static str,
    pub local_key: i64,
    pub sync_file_id: u64,
    pub expected_hi: u64,
    pub expected_lo: u64,
}

/// All golden squeeze vectors.
pub fn all_squeeze_vectors() -> Vec<SqueezeVector> {
    vec![
        SqueezeVector {
            name: "small key, upper bits zero, file-ident substituted",
            local_key: 42,
            sync_file_id: 5,
            expected_hi: 0x5,
            expected_lo: 0x2a,
        },
        SqueezeVector {
            name: "zero key, upper bits zero, file-ident substituted",
            local_key: 0,
            sync_file_id: 9,
            expected_hi: 0x9,
            expected_lo: 0x0,
        },
        SqueezeVector {
            name: "max 62-bit key, bits spread across both halves",
            local_key: 0x3fff_ffff,
            sync_file_id: 9,
            expected_hi: 0xff,
            expected_lo: 0x3f_ffff,
        },
        SqueezeVector {
            name: "mid-range key",
            local_key: 0xabcd,
            sync_file_id: 9,
            expected_hi: 0xab,
            expected_lo: 0xcd,
        },
        SqueezeVector {
            name: "wide key exercising every mask",
            local_key: 0x1234_5678_9abc,
            sync_file_id: 3,
            expected_hi: 0x129a,
            expected_lo: 0x3456_78bc,
        },
    ]
}

/// Verify every golden vector's expected `(hi, lo)` and its round trip back
/// to the original local key.
pub fn verify_all_squeeze_vectors() -> Vec<(&'static str, bool)> {
    all_squeeze_vectors()
        .into_iter()
        .map(|v| {
            let oid = ObjectID::squeeze(ObjKey(v.local_key), v.sync_file_id);
            let matches_expected = oid.hi() == v.expected_hi && oid.lo() == v.expected_lo;
            let round_trips = oid.get_local_key(v.sync_file_id).map(|k| k.value()) == Ok(v.local_key);
            (v.name, matches_expected && round_trips)
        })
        .collect()
}

/// Structural golden vector for the changeset framing header (spec §6.1):
/// the first 8 bytes of `framing::compress`'s output are always the
/// little-endian length of the *uncompressed* input, regardless of how the
/// compressor encodes the body.
pub fn framing_header_vectors() -> Vec<(&'static str, &'static [u8])> {
    vec![
        ("empty changeset", b""),
        ("short changeset", b"hello, sync"),
    ]
}
