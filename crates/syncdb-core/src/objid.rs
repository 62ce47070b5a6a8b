//! 128-bit `ObjectID` <-> 63-bit `ObjKey` mapping (C4).

use std::sync::atomic::{AtomicI64, Ordering};

use crate::error::{Error, ErrorCode};
use crate::value::Value;

/// A row identifier local to the current peer's file. Valid range is
/// `0..=0x7fff_ffff_ffff_ffff` (63 bits); bit 62 is the collision flag used
/// by primary-key derivation rule (c).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjKey(pub i64);

impl ObjKey {
    pub const COLLISION_BIT: i64 = 1 << 62;

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn has_collision_bit(self) -> bool {
        self.0 & Self::COLLISION_BIT != 0
    }
}

/// A 128-bit cross-peer identifier, represented as two 64-bit halves for
/// on-wire compressibility, matching the original's `m_lo`/`m_hi` layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectID {
    lo: u64,
    hi: u64,
}

impl ObjectID {
    pub fn new(hi: u64, lo: u64) -> Self {
        ObjectID { hi, lo }
    }

    pub fn lo(self) -> u64 {
        self.lo
    }

    pub fn hi(self) -> u64 {
        self.hi
    }

    /// Derivation rule (b): integer primary key occupies the low 64 bits;
    /// the high 64 bits are zero.
    pub fn from_int_primary_key(pk: i64) -> Self {
        ObjectID {
            hi: 0,
            lo: pk as u64,
        }
    }

    /// Derivation rule (c): a 128-bit hash of the primary-key value.
    pub fn from_hashed_primary_key(pk: &Value) -> Self {
        let bytes = pk.canonical_bytes();
        let digest = blake3::hash(&bytes);
        let raw = digest.as_bytes();
        let hi = u64::from_le_bytes(raw[0..8].try_into().unwrap());
        let lo = u64::from_le_bytes(raw[8..16].try_into().unwrap());
        ObjectID { hi, lo }
    }

    /// Dispatches on the value kind per §3.3 rules (b)/(c). Rule (a) (no
    /// primary key) is not reachable through this constructor: it requires
    /// a peer-local sequence number, produced by [`squeeze`].
    pub fn from_primary_key(pk: &Value) -> Self {
        match pk {
            Value::Int(i) => ObjectID::from_int_primary_key(*i),
            other => ObjectID::from_hashed_primary_key(other),
        }
    }

    /// Rule (a): maps a squeezed local key plus this peer's sync file
    /// identity into the 128-bit wire form. Bit-for-bit mirror of the
    /// original `ObjectID(ObjKey squeezed, uint64_t sync_file_id)`
    /// constructor.
    pub fn squeeze(local_key: ObjKey, sync_file_id: u64) -> Self {
        let u = local_key.0 as u64;
        let mut lo = (u & 0xff) | ((u & 0xffff_ff00_00) >> 8);
        let mut hi = ((u & 0xff00) >> 8) | ((u & 0xffff_ff00_0000_0000) >> 32);
        if hi == 0 {
            hi = sync_file_id;
        }
        // `lo` as computed above only ever uses bits already present in `u`;
        // kept as a separate statement to mirror the original two-line form.
        lo &= !0u64;
        ObjectID { hi, lo }
    }

    /// Inverse of [`squeeze`]. Fatal precondition (returns
    /// `ErrorCode::LogicError`): `hi <= 0x3fff_ffff` and `lo <= u32::MAX`,
    /// i.e. this ID could not have been produced by this peer's squeeze.
    pub fn get_local_key(self, sync_file_id: u64) -> Result<ObjKey, Error> {
        if self.hi > 0x3fff_ffff {
            tracing::warn!(hi = %format!("{:#x}", self.hi), "object id exceeds 30-bit precondition for get_local_key");
            return Err(Error::Assertion(format!(
                "ObjectID hi={:#x} exceeds 30-bit precondition for get_local_key",
                self.hi
            )));
        }
        if self.lo > u32::MAX as u64 {
            tracing::warn!(lo = %format!("{:#x}", self.lo), "object id exceeds 32-bit precondition for get_local_key");
            return Err(Error::Assertion(format!(
                "ObjectID lo={:#x} exceeds 32-bit precondition for get_local_key",
                self.lo
            )));
        }

        let mut hi = self.hi;
        if hi == sync_file_id {
            hi = 0;
        }
        let a = self.lo & 0xff;
        let b = (hi & 0xff) << 8;
        let c = (self.lo & 0xffff_ff00) << 8;
        let d = (hi & 0x3fff_ff00) << 32;

        Ok(ObjKey((a | b | c | d) as i64))
    }
}

/// Per-table monotonically increasing counter used to break collisions for
/// primary-key derivation rule (c): when the optimistic low-62-bit local key
/// is already taken, bit 62 is set and the low bits are replaced by the next
/// value from this counter.
#[derive(Debug, Default)]
pub struct CollisionCounter {
    next: AtomicI64,
}

impl CollisionCounter {
    pub fn new() -> Self {
        CollisionCounter {
            next: AtomicI64::new(0),
        }
    }

    /// Produces the next locally-generated key with the collision bit set.
    pub fn next_colliding_key(&self) -> ObjKey {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        ObjKey(ObjKey::COLLISION_BIT | (seq & (ObjKey::COLLISION_BIT - 1)))
    }
}

/// Derives the optimistic (pre-collision-check) local key for rule (c): the
/// low 62 bits of the 128-bit hashed object ID.
pub fn optimistic_local_key(oid: ObjectID) -> ObjKey {
    let combined = ((oid.hi() as u128) << 64) | oid.lo() as u128;
    ObjKey((combined & 0x3fff_ffff_ffff_ffff) as i64)
}

pub fn status_limit_exceeded(reason: impl Into<String>) -> Error {
    Error::status(ErrorCode::LimitExceeded, reason)
}
