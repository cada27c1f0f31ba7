//! Index-mapping functions.
//!
//! An [`Imf`] is a pure map from a finite logical index range into another
//! logical index range. Views install one IMF per coordinate axis; chained
//! views compose their IMFs. Compositions of affine maps fuse into a single
//! affine map (and from there into the storage polynomial), while anything
//! involving an explicit index vector degrades to [`Imf::Select`] and is
//! carried unfused.

use alloc::sync::Arc;
use assert2::debug_assert;

/// A pure map `[0, len) → N` installed by a view on one coordinate axis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Imf {
    /// `k ↦ k`.
    Id(usize),
    /// `k ↦ 0`; turns a matrix coordinate pair into a vector coordinate.
    Zero(usize),
    /// `k ↦ offset + stride · k`.
    Strided {
        len: usize,
        offset: usize,
        stride: usize,
    },
    /// `k ↦ value`.
    Constant { len: usize, value: usize },
    /// `k ↦ indices[k]`; the permutation/gather map.
    Select(Arc<[usize]>),
}

impl Imf {
    /// Gather map over an explicit index vector.
    pub fn select(indices: impl Into<Arc<[usize]>>) -> Self {
        Imf::Select(indices.into())
    }

    /// Domain length.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Imf::Id(n) | Imf::Zero(n) => *n,
            Imf::Strided { len, .. } | Imf::Constant { len, .. } => *len,
            Imf::Select(indices) => indices.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies the map.
    #[inline]
    pub fn map(&self, k: usize) -> usize {
        debug_assert!(k < self.len());
        match self {
            Imf::Id(_) => k,
            Imf::Zero(_) => 0,
            Imf::Strided { offset, stride, .. } => offset + stride * k,
            Imf::Constant { value, .. } => *value,
            Imf::Select(indices) => indices[k],
        }
    }

    /// The affine normal form `(offset, stride, len)`, if this map has one.
    ///
    /// `Select` has none; every other variant is a degenerate strided map.
    #[inline]
    pub fn as_affine(&self) -> Option<(usize, usize, usize)> {
        match self {
            Imf::Id(n) => Some((0, 1, *n)),
            Imf::Zero(n) => Some((0, 0, *n)),
            Imf::Strided {
                len,
                offset,
                stride,
            } => Some((*offset, *stride, *len)),
            Imf::Constant { len, value } => Some((*value, 0, *len)),
            Imf::Select(_) => None,
        }
    }

    /// Whether the map can be fused into a storage polynomial.
    #[inline]
    pub fn is_fusible(&self) -> bool {
        !matches!(self, Imf::Select(_))
    }

    /// Composition `f ∘ g`: first `g`, then `f`. The result has `g`'s domain
    /// length. Affine pairs fuse into a single strided map; any composition
    /// involving `Select` materializes a `Select`.
    pub fn compose(f: &Imf, g: &Imf) -> Imf {
        match (f.as_affine(), g.as_affine()) {
            (Some((bf, sf, _)), Some((bg, sg, ng))) => {
                Imf::from_affine(bf + sf * bg, sf * sg, ng)
            }
            _ => Imf::Select(
                (0..g.len())
                    .map(|k| f.map(g.map(k)))
                    .collect::<Arc<[usize]>>(),
            ),
        }
    }

    /// Builds the canonical variant for an affine map.
    pub fn from_affine(offset: usize, stride: usize, len: usize) -> Imf {
        match (offset, stride) {
            (0, 1) => Imf::Id(len),
            (0, 0) => Imf::Zero(len),
            (value, 0) => Imf::Constant { len, value },
            (offset, stride) => Imf::Strided {
                len,
                offset,
                stride,
            },
        }
    }
}
