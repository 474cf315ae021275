//! Hashing primitives and request key policies for consistent hashing.

use std::fmt;
use std::hash::Hasher;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// 64-bit FNV-1a.
#[derive(Debug, Clone, Copy)]
pub struct Fnv1a(u64);

impl Default for Fnv1a {
    fn default() -> Self {
        Self(FNV_OFFSET_BASIS)
    }
}

impl Hasher for Fnv1a {
    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= u64::from(*byte);
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

/// FNV-1a of `bytes` followed by a 64-bit avalanche finalizer.
///
/// FNV alone clusters badly for inputs that differ only in a trailing
/// counter, which is exactly what virtual node labels look like.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hasher = Fnv1a::default();
    hasher.write(bytes);
    mix64(hasher.finish())
}

fn mix64(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^= h >> 33;
    h
}

/// Which request attributes feed the consistent-hash key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPolicy {
    /// `"{service_path}/{service_method}"`.
    #[default]
    PathMethod,
    /// Path and method plus the encoded argument payload.
    PathMethodArgs,
}

/// Signature of a request key derivation function.
pub type KeyFn = dyn Fn(&str, &str, Option<&[u8]>) -> u64 + Send + Sync;

/// A shareable key derivation function.
#[derive(Clone)]
pub struct RequestKey(Arc<KeyFn>);

impl RequestKey {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, &str, Option<&[u8]>) -> u64 + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn from_policy(policy: KeyPolicy) -> Self {
        match policy {
            KeyPolicy::PathMethod => Self::new(|path, method, _| path_method_key(path, method)),
            KeyPolicy::PathMethodArgs => Self::new(path_method_args_key),
        }
    }

    pub fn derive(&self, service_path: &str, service_method: &str, args: Option<&[u8]>) -> u64 {
        (self.0)(service_path, service_method, args)
    }
}

impl Default for RequestKey {
    fn default() -> Self {
        Self::from_policy(KeyPolicy::default())
    }
}

impl fmt::Debug for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestKey(..)")
    }
}

fn path_method_key(service_path: &str, service_method: &str) -> u64 {
    let mut hasher = Fnv1a::default();
    hasher.write(service_path.as_bytes());
    hasher.write(b"/");
    hasher.write(service_method.as_bytes());
    mix64(hasher.finish())
}

fn path_method_args_key(service_path: &str, service_method: &str, args: Option<&[u8]>) -> u64 {
    let mut hasher = Fnv1a::default();
    hasher.write(service_path.as_bytes());
    hasher.write(b"/");
    hasher.write(service_method.as_bytes());
    if let Some(args) = args {
        hasher.write(b"/");
        hasher.write(args);
    }
    mix64(hasher.finish())
}
