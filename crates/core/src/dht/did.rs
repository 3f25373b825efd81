#![warn(missing_docs)]

//! Identifier space of the ring.
//!
//! A [Did] is a point on a cyclic group of order 2^160 wrapping [H160]. Peers get their
//! [Did] by hashing `"host:port"` with SHA-1, application keys by hashing the key itself,
//! so every node of a ring agrees on positions without coordination.
//!
//! Dids have no total order that is meaningful on a circle. Two tools cover the
//! comparisons the protocol needs:
//!
//! * [Did::is_between] tests membership in a clockwise arc, open or left-open, with
//!   wraparound. It is the only place ring-position decisions are made.
//! * [BiasId] fixes an origin and orders Dids by their clockwise distance from it,
//!   which is what sorting successor lists and fingers requires.

use std::ops::Add;
use std::ops::Deref;
use std::ops::Neg;
use std::ops::Sub;
use std::str::FromStr;

use ethereum_types::H160;
use num_bigint::BigUint;
use serde::Deserialize;
use serde::Serialize;
use sha1::Digest;
use sha1::Sha1;

use crate::consts::RING_BITS;
use crate::error::Error;
use crate::error::Result;

/// Did is a finite ring R(P) where P = 2^160, wrap H160.
#[derive(Copy, Clone, Eq, Ord, PartialEq, PartialOrd, Debug, Serialize, Deserialize, Hash)]
pub struct Did(H160);

/// Shape of a clockwise arc tested by [Did::is_between].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Interval {
    /// `(lower, upper)`. When both bounds are equal the arc is the whole ring but `lower`.
    Open,
    /// `(lower, upper]`. When both bounds are equal the arc is the whole ring.
    LeftOpen,
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let inner = &self.0;
        write!(f, "0x{inner:x}")
    }
}

/// A Did observed from a chosen origin.
/// Ordering two BiasIds compares their clockwise distance from the origin.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct BiasId {
    /// the zero point for determine order of Did.
    bias: Did,
    /// did data without bias.
    did: Did,
}

impl BiasId {
    /// Wrap a Did into BiasId with given bias.
    pub fn new(bias: Did, did: Did) -> BiasId {
        BiasId {
            bias,
            did: did - bias,
        }
    }

    /// Get the original Did back.
    pub fn to_did(self) -> Did {
        self.did + self.bias
    }

    /// Clockwise distance from the origin.
    pub fn pos(&self) -> Did {
        self.did
    }
}

impl PartialOrd for BiasId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BiasId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if other.bias != self.bias {
            let rebased = BiasId::new(self.bias, other.to_did());
            self.did.cmp(&rebased.did)
        } else {
            self.did.cmp(&other.did)
        }
    }
}

impl From<BiasId> for Did {
    fn from(id: BiasId) -> Did {
        id.to_did()
    }
}

impl Did {
    /// Position of a peer listening on `host:port`.
    pub fn from_address(host: &str, port: u16) -> Self {
        Self::from_key(&format!("{host}:{port}"))
    }

    /// Position of an arbitrary application key.
    pub fn from_key(key: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();
        Self(H160::from_slice(&digest[..]))
    }

    /// Test whether self lies on the clockwise arc from `lower` to `upper`.
    pub fn is_between(&self, lower: Did, upper: Did, interval: Interval) -> bool {
        let offset = *self - lower;
        let span = upper - lower;
        match (interval, span.is_zero()) {
            (Interval::Open, true) => !offset.is_zero(),
            (Interval::Open, false) => !offset.is_zero() && offset < span,
            (Interval::LeftOpen, true) => true,
            (Interval::LeftOpen, false) => !offset.is_zero() && offset <= span,
        }
    }

    /// Observe self from the origin `did`.
    pub fn bias(&self, did: Self) -> BiasId {
        BiasId::new(did, *self)
    }

    /// Start of the finger `index`, that is `self + 2^index`.
    pub fn finger_start(&self, index: usize) -> Self {
        *self + Did::from(BigUint::from(2u16).pow((index % RING_BITS) as u32))
    }
}

/// Ordering with a did reference.
pub trait SortRing {
    /// Sort clockwise starting from `did`.
    fn sort(&mut self, did: Did);
}

impl SortRing for Vec<Did> {
    fn sort(&mut self, did: Did) {
        self.sort_by_key(|x| x.bias(did));
    }
}

impl Deref for Did {
    type Target = H160;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Did> for H160 {
    fn from(a: Did) -> Self {
        a.0
    }
}

impl From<H160> for Did {
    fn from(addr: H160) -> Self {
        Self(addr)
    }
}

impl From<u32> for Did {
    fn from(id: u32) -> Did {
        Self::from(BigUint::from(id))
    }
}

impl From<Did> for BigUint {
    fn from(did: Did) -> BigUint {
        BigUint::from_bytes_be(did.as_bytes())
    }
}

impl From<BigUint> for Did {
    fn from(a: BigUint) -> Self {
        let reduced = a % BigUint::from(2u16).pow(RING_BITS as u32);
        let bytes = reduced.to_bytes_be();
        let mut padded = [0u8; 20];
        padded[20 - bytes.len()..].copy_from_slice(&bytes);
        Self(H160::from(padded))
    }
}

impl FromStr for Did {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(Self(H160::from_str(s).map_err(|_| Error::BadDid)?))
    }
}

impl Neg for Did {
    type Output = Self;
    fn neg(self) -> Self {
        let ret = BigUint::from(2u16).pow(RING_BITS as u32) - BigUint::from(self);
        ret.into()
    }
}

impl Add for Did {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        (BigUint::from(self) + BigUint::from(rhs)).into()
    }
}

impl Sub for Did {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}
