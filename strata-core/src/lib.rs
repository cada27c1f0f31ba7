//! `strata` core module.
//!
//! This module contains:
//! - structure tags describing the algebraic class of a container
//!   ([`Structure`]),
//! - index-mapping functions and storage polynomials ([`imf`], [`amf`]),
//! - matrix and vector containers and their non-owning views ([`Mat`],
//!   [`Vector`], [`MatRef`], [`MatMut`], [`VecRef`], [`VecMut`]),
//! - algebraic objects (semirings, monoids, operators) and the element-wise,
//!   reduction and multiplication primitives written against them,
//! - the sequential and 2.5D replicated-grid matrix multiplication backends,
//! - triangular substitution, permutations and Givens rotations.
//!
//! Every primitive returns a [`Result`]; shape and grid incompatibilities
//! surface as [`Error::Mismatch`], value-level precondition violations as
//! [`Error::Illegal`], algorithm-detected failures as [`Error::Failed`], and
//! unrecoverable conditions as [`Error::Panic`]. Outputs are left untouched
//! whenever an error is returned.

#![warn(rust_2018_idioms)]
#![allow(clippy::too_many_arguments)]

extern crate alloc;

use alloc::sync::Arc;
use alloc::vec::Vec;
use assert2::assert as fancy_assert;
use core::fmt;
use core::ops::{Add, Div, Mul, Neg, Range, Sub};
use core::sync::atomic::{AtomicBool, Ordering};
use num_complex::Complex;
use reborrow::*;

pub mod algebra;
pub mod amf;
pub mod givens;
pub mod householder;
pub mod imf;
pub mod launcher;
pub mod mul;
pub mod ops;
pub mod permutation;
pub mod solve;
pub mod structure;

pub use crate::amf::Amf;
pub use crate::imf::Imf;
pub use crate::structure::{StorageScheme, Structure};

/// Complex floating point number type, where the real and imaginary parts
/// each occupy 32 bits.
#[allow(non_camel_case_types)]
pub type c32 = Complex<f32>;
/// Complex floating point number type, where the real and imaginary parts
/// each occupy 64 bits.
#[allow(non_camel_case_types)]
pub type c64 = Complex<f64>;

/// Indicates whether the corresponding operand should be conjugated or not.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Conj {
    /// Do not conjugate.
    No,
    /// Do conjugate.
    Yes,
}

impl Conj {
    /// Composes two conjugation flags: conjugating twice is a no-op.
    #[inline]
    pub fn compose(self, other: Conj) -> Conj {
        if self == other {
            Conj::No
        } else {
            Conj::Yes
        }
    }
}

/// Shape of the cooperating thread grid used by the replicated-grid matrix
/// multiply: a `tr × tc` compute face replicated over `rt` layers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ThreadGrid {
    pub tr: usize,
    pub tc: usize,
    pub rt: usize,
}

impl ThreadGrid {
    pub const fn new(tr: usize, tc: usize, rt: usize) -> Self {
        Self { tr, tc, rt }
    }

    #[inline]
    pub fn num_threads(&self) -> usize {
        self.tr * self.tc * self.rt
    }
}

/// Process-wide configuration for the parallel backend: the thread grid and
/// the fixed logical tile dimensions. Threaded explicitly through the
/// launcher and the primitives; there is no file-scope mutable state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GridConfig {
    pub grid: ThreadGrid,
    pub block_nrows: usize,
    pub block_ncols: usize,
}

impl GridConfig {
    pub const fn new(grid: ThreadGrid, block_nrows: usize, block_ncols: usize) -> Self {
        Self {
            grid,
            block_nrows,
            block_ncols,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self::new(ThreadGrid::new(1, 1, 1), 32, 32)
    }
}

/// Parallelism strategy that can be passed to the multiplication routines.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Parallelism {
    /// No parallelism: the code executes sequentially on the calling thread.
    None,
    /// Replicated-grid parallelism over a rayon thread pool, with the given
    /// grid and tile configuration.
    Grid(GridConfig),
}

/// Error half of the uniform return-code convention.
///
/// `Ok(())` is the success code; the four values below classify failures.
/// Once an operation has returned an error, callers propagate it unchanged
/// (`?`); no operation upgrades an existing error to a worse one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Shape or grid incompatibility, detected before any side effect.
    Mismatch,
    /// A precondition on values is violated: uninitialized input,
    /// out-of-range block size, element-count mismatch.
    Illegal,
    /// Recoverable algorithmic failure detected at runtime.
    Failed,
    /// Unrecoverable; library state may be undefined.
    Panic,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Mismatch => f.write_str("shape or grid mismatch"),
            Error::Illegal => f.write_str("illegal argument"),
            Error::Failed => f.write_str("algorithm failed"),
            Error::Panic => f.write_str("unrecoverable error"),
        }
    }
}

impl std::error::Error for Error {}

/// Result alias carrying the library's uniform return codes.
pub type Result<T = ()> = core::result::Result<T, Error>;

/// Trait that describes a complex number field.
///
/// Real numbers are complex numbers whose imaginary part is always zero.
pub trait ComplexField:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + PartialEq
    + Send
    + Sync
    + fmt::Debug
    + 'static
{
    type Real: RealField;

    /// Returns a complex number whose real part is equal to `real`, and a
    /// zero imaginary part.
    fn from_real(real: Self::Real) -> Self;
    /// Returns the real and imaginary parts.
    fn into_real_imag(self) -> (Self::Real, Self::Real);
    /// Returns the real part.
    #[inline(always)]
    fn real(self) -> Self::Real {
        self.into_real_imag().0
    }
    /// Returns the imaginary part.
    #[inline(always)]
    fn imag(self) -> Self::Real {
        self.into_real_imag().1
    }

    /// Returns the value representing `0.0`.
    fn zero() -> Self;
    /// Returns the value representing `1.0`.
    fn one() -> Self;

    /// Returns the inverse of the number.
    fn inv(self) -> Self;
    /// Returns the conjugate of the number.
    fn conj(self) -> Self;
    /// Returns the square root of the number.
    fn sqrt(self) -> Self;

    /// Returns the input, scaled by `factor`.
    #[inline(always)]
    fn scale(self, factor: Self::Real) -> Self {
        self * Self::from_real(factor)
    }

    /// Returns the squared modulus `x·conj(x)`.
    #[inline(always)]
    fn abs2(self) -> Self::Real {
        (self * self.conj()).real()
    }

    /// Returns the modulus.
    #[inline(always)]
    fn abs(self) -> Self::Real {
        self.abs2().sqrt()
    }

    /// Returns a value usable for magnitude comparisons, e.g. during pivot
    /// selection. An implementation may return either the modulus or the
    /// squared modulus, so long as it chooses consistently.
    #[inline(always)]
    fn score(self) -> Self::Real {
        self.abs2()
    }
}

/// Trait that describes a real number field.
pub trait RealField: ComplexField<Real = Self> + PartialOrd {
    /// Conversion from a literal constant, used for tolerances and iteration
    /// thresholds.
    fn from_f64(value: f64) -> Self;
}

impl RealField for f32 {
    #[inline(always)]
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}
impl ComplexField for f32 {
    type Real = f32;

    #[inline(always)]
    fn from_real(real: Self::Real) -> Self {
        real
    }
    #[inline(always)]
    fn into_real_imag(self) -> (Self::Real, Self::Real) {
        (self, 0.0)
    }
    #[inline(always)]
    fn zero() -> Self {
        0.0
    }
    #[inline(always)]
    fn one() -> Self {
        1.0
    }
    #[inline(always)]
    fn inv(self) -> Self {
        1.0 / self
    }
    #[inline(always)]
    fn conj(self) -> Self {
        self
    }
    #[inline(always)]
    fn sqrt(self) -> Self {
        self.sqrt()
    }
}

impl RealField for f64 {
    #[inline(always)]
    fn from_f64(value: f64) -> Self {
        value
    }
}
impl ComplexField for f64 {
    type Real = f64;

    #[inline(always)]
    fn from_real(real: Self::Real) -> Self {
        real
    }
    #[inline(always)]
    fn into_real_imag(self) -> (Self::Real, Self::Real) {
        (self, 0.0)
    }
    #[inline(always)]
    fn zero() -> Self {
        0.0
    }
    #[inline(always)]
    fn one() -> Self {
        1.0
    }
    #[inline(always)]
    fn inv(self) -> Self {
        1.0 / self
    }
    #[inline(always)]
    fn conj(self) -> Self {
        self
    }
    #[inline(always)]
    fn sqrt(self) -> Self {
        self.sqrt()
    }
}

impl ComplexField for c32 {
    type Real = f32;

    #[inline(always)]
    fn from_real(real: Self::Real) -> Self {
        Self::new(real, 0.0)
    }
    #[inline(always)]
    fn into_real_imag(self) -> (Self::Real, Self::Real) {
        (self.re, self.im)
    }
    #[inline(always)]
    fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
    #[inline(always)]
    fn one() -> Self {
        Self::new(1.0, 0.0)
    }
    #[inline(always)]
    fn inv(self) -> Self {
        Self::one() / self
    }
    #[inline(always)]
    fn conj(self) -> Self {
        Complex::conj(&self)
    }
    #[inline(always)]
    fn sqrt(self) -> Self {
        Complex::sqrt(self)
    }
}

impl ComplexField for c64 {
    type Real = f64;

    #[inline(always)]
    fn from_real(real: Self::Real) -> Self {
        Self::new(real, 0.0)
    }
    #[inline(always)]
    fn into_real_imag(self) -> (Self::Real, Self::Real) {
        (self.re, self.im)
    }
    #[inline(always)]
    fn zero() -> Self {
        Self::new(0.0, 0.0)
    }
    #[inline(always)]
    fn one() -> Self {
        Self::new(1.0, 0.0)
    }
    #[inline(always)]
    fn inv(self) -> Self {
        Self::one() / self
    }
    #[inline(always)]
    fn conj(self) -> Self {
        Complex::conj(&self)
    }
    #[inline(always)]
    fn sqrt(self) -> Self {
        Complex::sqrt(self)
    }
}

/// Columns of row `i` that a view with the given structure visits when
/// iterating its stored positions: the non-forced-zero positions, restricted
/// to the canonical half for reflecting structures so that every physical
/// cell is visited exactly once.
#[inline]
pub(crate) fn stored_row_range(structure: Structure, i: usize, ncols: usize) -> Range<usize> {
    let support = structure.row_support(i, ncols);
    if structure.reflects() {
        support.start.max(i)..support.end
    } else {
        support
    }
}

/// Checks that every position of the rectangle `(i, j) + nrows × ncols` is
/// backed by a physical cell of the origin layout; required whenever a
/// sub-view abandons the origin's reflection or zero pattern.
fn assert_sub_readable(
    scheme: StorageScheme,
    i: usize,
    j: usize,
    nrows: usize,
    ncols: usize,
) {
    if nrows == 0 || ncols == 0 {
        return;
    }
    match scheme {
        StorageScheme::Full => (),
        StorageScheme::PackedUpper => {
            fancy_assert!(
                i + nrows <= j + 1,
                "sub-view of a packed upper layout must lie in the stored half",
            );
        }
        StorageScheme::PackedLower => {
            fancy_assert!(
                j + ncols <= i + 1,
                "sub-view of a packed lower layout must lie in the stored half",
            );
        }
        StorageScheme::TridiagBand => {
            let within = |r: usize, c: usize| r.abs_diff(c) <= 1;
            fancy_assert!(
                within(i, j)
                    && within(i, j + ncols - 1)
                    && within(i + nrows - 1, j)
                    && within(i + nrows - 1, j + ncols - 1),
                "sub-view of a band layout must lie in the stored band",
            );
        }
        StorageScheme::DiagArray => {
            fancy_assert!(i == j && nrows == 1 && ncols == 1);
        }
    }
}

/// Pattern of the stored half after transposition, used by containment
/// checks on views of views.
fn transposed_scheme(scheme: StorageScheme) -> StorageScheme {
    match scheme {
        StorageScheme::PackedUpper => StorageScheme::PackedLower,
        StorageScheme::PackedLower => StorageScheme::PackedUpper,
        other => other,
    }
}

#[inline]
fn read_raw<T: ComplexField>(
    buf: &[T],
    amf: &Amf,
    structure: Structure,
    conj: Conj,
    i: usize,
    j: usize,
) -> T {
    let v = if structure.is_forced_zero(i, j) {
        T::zero()
    } else if structure.reflects() && i > j {
        let raw = buf[amf.storage_index(j, i)];
        if structure.conjugate_on_reflect() {
            raw.conj()
        } else {
            raw
        }
    } else {
        buf[amf.storage_index(i, j)]
    };
    match conj {
        Conj::No => v,
        Conj::Yes => v.conj(),
    }
}

/// Matrix view over an origin's buffer, with its own access-mapping function
/// and structure tag.
pub struct MatRef<'a, T> {
    buf: &'a [T],
    amf: Amf,
    structure: Structure,
    scheme: StorageScheme,
    conj: Conj,
    init: bool,
}

// not derived: the view is cloneable for any element type
impl<'a, T> Clone for MatRef<'a, T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            buf: self.buf,
            amf: self.amf.clone(),
            structure: self.structure,
            scheme: self.scheme,
            conj: self.conj,
            init: self.init,
        }
    }
}

/// Mutable matrix view over an origin's buffer.
///
/// For usage examples, see [`MatRef`].
pub struct MatMut<'a, T> {
    buf: &'a mut [T],
    amf: Amf,
    structure: Structure,
    scheme: StorageScheme,
    init: &'a AtomicBool,
}

/// Vector view over an origin's buffer.
pub struct VecRef<'a, T> {
    buf: &'a [T],
    amf: Amf,
    conj: Conj,
    init: bool,
}

impl<'a, T> Clone for VecRef<'a, T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            buf: self.buf,
            amf: self.amf.clone(),
            conj: self.conj,
            init: self.init,
        }
    }
}

/// Mutable vector view over an origin's buffer.
pub struct VecMut<'a, T> {
    buf: &'a mut [T],
    amf: Amf,
    init: &'a AtomicBool,
}

impl<'b, 'a, T> Reborrow<'b> for MatRef<'a, T> {
    type Target = MatRef<'b, T>;
    #[inline]
    fn rb(&'b self) -> Self::Target {
        self.clone()
    }
}
impl<'b, 'a, T> ReborrowMut<'b> for MatRef<'a, T> {
    type Target = MatRef<'b, T>;
    #[inline]
    fn rb_mut(&'b mut self) -> Self::Target {
        self.clone()
    }
}
impl<'a, T> IntoConst for MatRef<'a, T> {
    type Target = MatRef<'a, T>;
    #[inline]
    fn into_const(self) -> Self::Target {
        self
    }
}

impl<'b, 'a, T> Reborrow<'b> for MatMut<'a, T> {
    type Target = MatRef<'b, T>;
    #[inline]
    fn rb(&'b self) -> Self::Target {
        MatRef {
            buf: self.buf,
            amf: self.amf.clone(),
            structure: self.structure,
            scheme: self.scheme,
            conj: Conj::No,
            init: self.init.load(Ordering::Relaxed),
        }
    }
}
impl<'b, 'a, T> ReborrowMut<'b> for MatMut<'a, T> {
    type Target = MatMut<'b, T>;
    #[inline]
    fn rb_mut(&'b mut self) -> Self::Target {
        MatMut {
            buf: self.buf,
            amf: self.amf.clone(),
            structure: self.structure,
            scheme: self.scheme,
            init: self.init,
        }
    }
}
impl<'a, T> IntoConst for MatMut<'a, T> {
    type Target = MatRef<'a, T>;
    #[inline]
    fn into_const(self) -> Self::Target {
        MatRef {
            buf: self.buf,
            amf: self.amf,
            structure: self.structure,
            scheme: self.scheme,
            conj: Conj::No,
            init: self.init.load(Ordering::Relaxed),
        }
    }
}

impl<'b, 'a, T> Reborrow<'b> for VecRef<'a, T> {
    type Target = VecRef<'b, T>;
    #[inline]
    fn rb(&'b self) -> Self::Target {
        self.clone()
    }
}
impl<'b, 'a, T> ReborrowMut<'b> for VecRef<'a, T> {
    type Target = VecRef<'b, T>;
    #[inline]
    fn rb_mut(&'b mut self) -> Self::Target {
        self.clone()
    }
}
impl<'a, T> IntoConst for VecRef<'a, T> {
    type Target = VecRef<'a, T>;
    #[inline]
    fn into_const(self) -> Self::Target {
        self
    }
}

impl<'b, 'a, T> Reborrow<'b> for VecMut<'a, T> {
    type Target = VecRef<'b, T>;
    #[inline]
    fn rb(&'b self) -> Self::Target {
        VecRef {
            buf: self.buf,
            amf: self.amf.clone(),
            conj: Conj::No,
            init: self.init.load(Ordering::Relaxed),
        }
    }
}
impl<'b, 'a, T> ReborrowMut<'b> for VecMut<'a, T> {
    type Target = VecMut<'b, T>;
    #[inline]
    fn rb_mut(&'b mut self) -> Self::Target {
        VecMut {
            buf: self.buf,
            amf: self.amf.clone(),
            init: self.init,
        }
    }
}
impl<'a, T> IntoConst for VecMut<'a, T> {
    type Target = VecRef<'a, T>;
    #[inline]
    fn into_const(self) -> Self::Target {
        VecRef {
            buf: self.buf,
            amf: self.amf,
            conj: Conj::No,
            init: self.init.load(Ordering::Relaxed),
        }
    }
}

impl<'a, T> MatRef<'a, T> {
    /// View over a row-major slice, as a `General` matrix.
    #[track_caller]
    pub fn from_major_slice(slice: &'a [T], nrows: usize, ncols: usize) -> Self {
        fancy_assert!(slice.len() == nrows * ncols);
        Self {
            buf: slice,
            amf: Amf::matrix(StorageScheme::Full, nrows, ncols),
            structure: Structure::General,
            scheme: StorageScheme::Full,
            conj: Conj::No,
            init: true,
        }
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.amf.nrows()
    }
    #[inline]
    pub fn ncols(&self) -> usize {
        self.amf.ncols()
    }
    #[inline]
    pub fn structure(&self) -> Structure {
        self.structure
    }
    #[inline]
    pub fn amf(&self) -> &Amf {
        &self.amf
    }
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.init
    }
    #[inline]
    pub fn conj_flag(&self) -> Conj {
        self.conj
    }

    /// Contiguous sub-view anchored at `(i, j)`.
    ///
    /// Diagonal-aligned square blocks keep the origin structure; other blocks
    /// degrade to `Square`/`General` and must then lie entirely within the
    /// origin's stored half.
    #[track_caller]
    pub fn submatrix(self, i: usize, j: usize, nrows: usize, ncols: usize) -> Self {
        fancy_assert!(i + nrows <= self.nrows());
        fancy_assert!(j + ncols <= self.ncols());
        let structure = self.structure.submatrix(i, j, nrows, ncols);
        if structure != self.structure {
            assert_sub_readable(self.scheme, i, j, nrows, ncols);
        }
        Self {
            amf: self.amf.submatrix(i, j, nrows, ncols),
            structure,
            ..self
        }
    }

    /// Transpose view. Swaps the roles of the row and column maps and
    /// adjusts the structure tag. A symmetric view is its own transpose and a
    /// Hermitian view transposes to its conjugate, so the reflecting kinds
    /// keep their address map and only the conjugation flag changes.
    pub fn transpose(self) -> Self {
        if self.structure.reflects() {
            let conj = if self.structure.conjugate_on_reflect() {
                self.conj.compose(Conj::Yes)
            } else {
                self.conj
            };
            return Self { conj, ..self };
        }
        Self {
            amf: self.amf.transpose(),
            structure: self.structure.transposed(),
            scheme: transposed_scheme(self.scheme),
            ..self
        }
    }

    /// Lazy conjugate view: negates the imaginary part on read.
    pub fn conjugate(self) -> Self {
        Self {
            conj: self.conj.compose(Conj::Yes),
            ..self
        }
    }

    /// Conjugate-transpose view.
    pub fn adjoint(self) -> Self {
        self.conjugate().transpose()
    }

    /// Gather view over explicit row and column index vectors.
    #[track_caller]
    pub fn select(self, rows: &[usize], cols: &[usize]) -> Self {
        fancy_assert!(self.scheme == StorageScheme::Full);
        Self {
            amf: self.amf.select(rows, cols),
            structure: if rows.len() == cols.len() && self.structure.requires_square() {
                Structure::Square
            } else {
                Structure::General
            },
            ..self
        }
    }

    /// Structural retype: a view that agrees with this one wherever the
    /// target structure stores, and masks (or reflects) elsewhere.
    #[track_caller]
    pub fn retype(self, target: Structure) -> Self {
        fancy_assert!(self.structure.retype_allowed(target));
        if target.requires_square() {
            fancy_assert!(self.nrows() == self.ncols());
        }
        Self {
            structure: target,
            ..self
        }
    }

    /// Vector view of the main diagonal.
    #[track_caller]
    pub fn diagonal(self) -> VecRef<'a, T> {
        fancy_assert!(self.nrows() == self.ncols());
        VecRef {
            buf: self.buf,
            amf: self.amf.diagonal(),
            conj: self.conj,
            init: self.init,
        }
    }

    /// Vector view of the columns `range` of row `i`.
    #[track_caller]
    pub fn row_range(self, i: usize, range: Range<usize>) -> VecRef<'a, T> {
        fancy_assert!(i < self.nrows());
        fancy_assert!(range.end <= self.ncols());
        assert_sub_readable(self.scheme, i, range.start, 1, range.len().max(1));
        VecRef {
            buf: self.buf,
            amf: self.amf.row_vector(i).subvector(range.start, range.len()),
            conj: self.conj,
            init: self.init,
        }
    }

    /// Vector view of row `i`.
    #[track_caller]
    pub fn row(self, i: usize) -> VecRef<'a, T> {
        let ncols = self.ncols();
        self.row_range(i, 0..ncols)
    }

    /// Vector view of the rows `range` of column `j`.
    #[track_caller]
    pub fn col_range(self, range: Range<usize>, j: usize) -> VecRef<'a, T> {
        fancy_assert!(j < self.ncols());
        fancy_assert!(range.end <= self.nrows());
        assert_sub_readable(self.scheme, range.start, j, range.len().max(1), 1);
        VecRef {
            buf: self.buf,
            amf: self.amf.col_vector(j).subvector(range.start, range.len()),
            conj: self.conj,
            init: self.init,
        }
    }

    /// Vector view of column `j`.
    #[track_caller]
    pub fn col(self, j: usize) -> VecRef<'a, T> {
        let nrows = self.nrows();
        self.col_range(0..nrows, j)
    }
}

impl<'a, T: ComplexField> MatRef<'a, T> {
    /// Reads the element at `(i, j)`, applying the zero pattern, the
    /// reflection rule, and the conjugation flag.
    #[track_caller]
    #[inline]
    pub fn read(&self, i: usize, j: usize) -> T {
        fancy_assert!(i < self.nrows());
        fancy_assert!(j < self.ncols());
        read_raw(self.buf, &self.amf, self.structure, self.conj, i, j)
    }
}

impl<'a, T> MatMut<'a, T> {
    /// Mutable view over a row-major slice, as a `General` matrix. The
    /// initialization flag is borrowed from the caller so that stack-carved
    /// temporaries can participate in the initialization protocol.
    #[track_caller]
    pub fn from_major_slice(
        slice: &'a mut [T],
        nrows: usize,
        ncols: usize,
        init: &'a AtomicBool,
    ) -> Self {
        fancy_assert!(slice.len() == nrows * ncols);
        Self {
            buf: slice,
            amf: Amf::matrix(StorageScheme::Full, nrows, ncols),
            structure: Structure::General,
            scheme: StorageScheme::Full,
            init,
        }
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.amf.nrows()
    }
    #[inline]
    pub fn ncols(&self) -> usize {
        self.amf.ncols()
    }
    #[inline]
    pub fn structure(&self) -> Structure {
        self.structure
    }
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.init.load(Ordering::Relaxed)
    }

    /// Publishes (or retracts) the origin's initialization flag.
    #[inline]
    pub fn set_initialized(&mut self, initialized: bool) {
        self.init.store(initialized, Ordering::Relaxed);
    }

    /// See [`MatRef::submatrix`].
    #[track_caller]
    pub fn submatrix(self, i: usize, j: usize, nrows: usize, ncols: usize) -> Self {
        fancy_assert!(i + nrows <= self.nrows());
        fancy_assert!(j + ncols <= self.ncols());
        let structure = self.structure.submatrix(i, j, nrows, ncols);
        if structure != self.structure {
            assert_sub_readable(self.scheme, i, j, nrows, ncols);
        }
        Self {
            amf: self.amf.submatrix(i, j, nrows, ncols),
            structure,
            ..self
        }
    }

    /// See [`MatRef::transpose`]. A mutable transpose of a Hermitian view is
    /// not representable: writes would need a conjugating path.
    #[track_caller]
    pub fn transpose(self) -> Self {
        if self.structure.reflects() {
            fancy_assert!(!self.structure.conjugate_on_reflect());
            return self;
        }
        Self {
            amf: self.amf.transpose(),
            structure: self.structure.transposed(),
            scheme: transposed_scheme(self.scheme),
            ..self
        }
    }

    /// See [`MatRef::retype`].
    #[track_caller]
    pub fn retype(self, target: Structure) -> Self {
        fancy_assert!(self.structure.retype_allowed(target));
        if target.requires_square() {
            fancy_assert!(self.nrows() == self.ncols());
        }
        Self {
            structure: target,
            ..self
        }
    }

    /// Mutable vector view of the main diagonal.
    #[track_caller]
    pub fn diagonal(self) -> VecMut<'a, T> {
        fancy_assert!(self.nrows() == self.ncols());
        VecMut {
            buf: self.buf,
            amf: self.amf.diagonal(),
            init: self.init,
        }
    }

    /// Mutable vector view of the columns `range` of row `i`.
    #[track_caller]
    pub fn row_range(self, i: usize, range: Range<usize>) -> VecMut<'a, T> {
        fancy_assert!(i < self.nrows());
        fancy_assert!(range.end <= self.ncols());
        assert_sub_readable(self.scheme, i, range.start, 1, range.len().max(1));
        VecMut {
            buf: self.buf,
            amf: self.amf.row_vector(i).subvector(range.start, range.len()),
            init: self.init,
        }
    }

    /// Mutable vector view of the rows `range` of column `j`.
    #[track_caller]
    pub fn col_range(self, range: Range<usize>, j: usize) -> VecMut<'a, T> {
        fancy_assert!(j < self.ncols());
        fancy_assert!(range.end <= self.nrows());
        assert_sub_readable(self.scheme, range.start, j, range.len().max(1), 1);
        VecMut {
            buf: self.buf,
            amf: self.amf.col_vector(j).subvector(range.start, range.len()),
            init: self.init,
        }
    }
}

impl<'a, T: ComplexField> MatMut<'a, T> {
    /// See [`MatRef::read`].
    #[track_caller]
    #[inline]
    pub fn read(&self, i: usize, j: usize) -> T {
        fancy_assert!(i < self.nrows());
        fancy_assert!(j < self.ncols());
        read_raw(self.buf, &self.amf, self.structure, Conj::No, i, j)
    }

    /// Writes the element at `(i, j)`, routing through the reflection rule
    /// for the symmetric and Hermitian kinds. Writing a forced-zero position
    /// is a programming error.
    #[track_caller]
    #[inline]
    pub fn write(&mut self, i: usize, j: usize, value: T) {
        fancy_assert!(i < self.nrows());
        fancy_assert!(j < self.ncols());
        fancy_assert!(!self.structure.is_forced_zero(i, j));
        if self.structure.reflects() && i > j {
            let idx = self.amf.storage_index(j, i);
            self.buf[idx] = if self.structure.conjugate_on_reflect() {
                value.conj()
            } else {
                value
            };
        } else {
            let idx = self.amf.storage_index(i, j);
            self.buf[idx] = value;
        }
    }

    /// Applies `f(i, j, &mut value)` to every stored position.
    pub(crate) fn update_stored(&mut self, mut f: impl FnMut(usize, usize, &mut T)) {
        let (m, n) = (self.nrows(), self.ncols());
        for i in 0..m {
            for j in stored_row_range(self.structure, i, n) {
                let idx = self.amf.storage_index(i, j);
                f(i, j, &mut self.buf[idx]);
            }
        }
    }
}

impl<'a, T> VecRef<'a, T> {
    /// View over a contiguous slice.
    pub fn from_slice(slice: &'a [T]) -> Self {
        Self {
            buf: slice,
            amf: Amf::vector(slice.len()),
            conj: Conj::No,
            init: true,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.amf.nrows()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.init
    }
    #[inline]
    pub fn conj_flag(&self) -> Conj {
        self.conj
    }

    /// Contiguous sub-range view.
    #[track_caller]
    pub fn subvector(self, start: usize, len: usize) -> Self {
        Self {
            amf: self.amf.subvector(start, len),
            ..self
        }
    }

    /// Gather view over an explicit index vector.
    pub fn select(self, indices: &[usize]) -> Self {
        Self {
            amf: self.amf.select_vector(indices),
            ..self
        }
    }

    /// Lazy conjugate view.
    pub fn conjugate(self) -> Self {
        Self {
            conj: self.conj.compose(Conj::Yes),
            ..self
        }
    }

    /// The `len × 1` matrix view over this vector: upgrades the `Zero`
    /// column map to `Id(1)`.
    pub fn as_mat(self) -> MatRef<'a, T> {
        MatRef {
            buf: self.buf,
            amf: self.amf.vector_as_matrix(),
            structure: Structure::General,
            scheme: StorageScheme::Full,
            conj: self.conj,
            init: self.init,
        }
    }
}

impl<'a, T: ComplexField> VecRef<'a, T> {
    #[track_caller]
    #[inline]
    pub fn read(&self, k: usize) -> T {
        fancy_assert!(k < self.len());
        let v = self.buf[self.amf.storage_index(k, 0)];
        match self.conj {
            Conj::No => v,
            Conj::Yes => v.conj(),
        }
    }
}

impl<'a, T> VecMut<'a, T> {
    /// Mutable view over a contiguous slice, with a caller-provided
    /// initialization flag.
    pub fn from_slice(slice: &'a mut [T], init: &'a AtomicBool) -> Self {
        let amf = Amf::vector(slice.len());
        Self {
            buf: slice,
            amf,
            init,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.amf.nrows()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.init.load(Ordering::Relaxed)
    }
    #[inline]
    pub fn set_initialized(&mut self, initialized: bool) {
        self.init.store(initialized, Ordering::Relaxed);
    }

    /// Contiguous sub-range view.
    #[track_caller]
    pub fn subvector(self, start: usize, len: usize) -> Self {
        Self {
            amf: self.amf.subvector(start, len),
            ..self
        }
    }

    /// The `len × 1` mutable matrix view over this vector.
    pub fn as_mat_mut(self) -> MatMut<'a, T> {
        MatMut {
            buf: self.buf,
            amf: self.amf.vector_as_matrix(),
            structure: Structure::General,
            scheme: StorageScheme::Full,
            init: self.init,
        }
    }
}

impl<'a, T: ComplexField> VecMut<'a, T> {
    #[track_caller]
    #[inline]
    pub fn read(&self, k: usize) -> T {
        fancy_assert!(k < self.len());
        self.buf[self.amf.storage_index(k, 0)]
    }

    #[track_caller]
    #[inline]
    pub fn write(&mut self, k: usize, value: T) {
        fancy_assert!(k < self.len());
        let idx = self.amf.storage_index(k, 0);
        self.buf[idx] = value;
    }
}

/// Owning matrix container.
///
/// An original container allocates exactly the number of cells its storage
/// polynomial addresses; it is created sized and uninitialized, filled by
/// [`ops::build_matrix`] or [`ops::set`], and releases its buffer when
/// dropped.
pub struct Mat<T> {
    buf: Vec<T>,
    amf: Amf,
    structure: Structure,
    scheme: StorageScheme,
    initialized: AtomicBool,
}

impl<T: ComplexField> Mat<T> {
    /// New uninitialized container.
    #[track_caller]
    pub fn new(structure: Structure, nrows: usize, ncols: usize) -> Self {
        if structure.requires_square() {
            fancy_assert!(nrows == ncols);
        }
        let scheme = structure.storage();
        let amf = Amf::matrix(scheme, nrows, ncols);
        Self {
            buf: alloc::vec![T::zero(); amf.storage_len()],
            amf,
            structure,
            scheme,
            initialized: AtomicBool::new(false),
        }
    }

    /// New container with every stored position set to zero.
    pub fn zeros(structure: Structure, nrows: usize, ncols: usize) -> Self {
        let mat = Self::new(structure, nrows, ncols);
        mat.initialized.store(true, Ordering::Relaxed);
        mat
    }

    /// New container filled from `f(i, j)` over the stored positions.
    pub fn from_fn(
        structure: Structure,
        nrows: usize,
        ncols: usize,
        mut f: impl FnMut(usize, usize) -> T,
    ) -> Self {
        let mut mat = Self::new(structure, nrows, ncols);
        for i in 0..nrows {
            for j in stored_row_range(structure, i, ncols) {
                let idx = mat.amf.storage_index(i, j);
                mat.buf[idx] = f(i, j);
            }
        }
        mat.initialized.store(true, Ordering::Relaxed);
        mat
    }

    /// Identity, stored in the given square structure.
    #[track_caller]
    pub fn identity(structure: Structure, n: usize) -> Self {
        Self::from_fn(structure, n, n, |i, j| {
            if i == j {
                T::one()
            } else {
                T::zero()
            }
        })
    }

    #[inline]
    pub fn nrows(&self) -> usize {
        self.amf.nrows()
    }
    #[inline]
    pub fn ncols(&self) -> usize {
        self.amf.ncols()
    }
    #[inline]
    pub fn structure(&self) -> Structure {
        self.structure
    }
    #[inline]
    pub fn storage_len(&self) -> usize {
        self.amf.storage_len()
    }
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }
    #[inline]
    pub fn set_initialized(&self, initialized: bool) {
        self.initialized.store(initialized, Ordering::Relaxed);
    }

    /// Immutable view over the whole container.
    #[inline]
    pub fn as_ref(&self) -> MatRef<'_, T> {
        MatRef {
            buf: &self.buf,
            amf: self.amf.clone(),
            structure: self.structure,
            scheme: self.scheme,
            conj: Conj::No,
            init: self.is_initialized(),
        }
    }

    /// Mutable view over the whole container.
    #[inline]
    pub fn as_mut(&mut self) -> MatMut<'_, T> {
        MatMut {
            buf: &mut self.buf,
            amf: self.amf.clone(),
            structure: self.structure,
            scheme: self.scheme,
            init: &self.initialized,
        }
    }

    #[track_caller]
    #[inline]
    pub fn read(&self, i: usize, j: usize) -> T {
        self.as_ref().read(i, j)
    }

    #[track_caller]
    #[inline]
    pub fn write(&mut self, i: usize, j: usize, value: T) {
        self.as_mut().write(i, j, value);
    }

    /// Fills the container in storage order from an iterator, consuming
    /// exactly `storage_len` elements. Used by [`ops::build_matrix`].
    pub(crate) fn fill_from_iter(&mut self, iter: impl IntoIterator<Item = T>) -> Result {
        let mut iter = iter.into_iter();
        let (nrows, ncols) = (self.nrows(), self.ncols());
        for i in 0..nrows {
            for j in stored_row_range(self.structure, i, ncols) {
                match iter.next() {
                    Some(v) => {
                        let idx = self.amf.storage_index(i, j);
                        self.buf[idx] = v;
                    }
                    None => {
                        self.initialized.store(false, Ordering::Relaxed);
                        return Err(Error::Illegal);
                    }
                }
            }
        }
        if iter.next().is_some() {
            self.initialized.store(false, Ordering::Relaxed);
            return Err(Error::Illegal);
        }
        self.initialized.store(true, Ordering::Relaxed);
        Ok(())
    }
}

impl<T: ComplexField> Clone for Mat<T> {
    fn clone(&self) -> Self {
        Self {
            buf: self.buf.clone(),
            amf: self.amf.clone(),
            structure: self.structure,
            scheme: self.scheme,
            initialized: AtomicBool::new(self.is_initialized()),
        }
    }
}

impl<T: ComplexField> fmt::Debug for Mat<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mat")
            .field("nrows", &self.nrows())
            .field("ncols", &self.ncols())
            .field("structure", &self.structure)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Owning vector container: a matrix whose column map is `Zero(1)`.
pub struct Vector<T> {
    buf: Vec<T>,
    amf: Amf,
    initialized: AtomicBool,
}

impl<T: ComplexField> Vector<T> {
    /// New uninitialized container.
    pub fn new(len: usize) -> Self {
        Self {
            buf: alloc::vec![T::zero(); len],
            amf: Amf::vector(len),
            initialized: AtomicBool::new(false),
        }
    }

    /// New container with every position set to zero.
    pub fn zeros(len: usize) -> Self {
        let v = Self::new(len);
        v.initialized.store(true, Ordering::Relaxed);
        v
    }

    /// New container filled from `f(k)`.
    pub fn from_fn(len: usize, mut f: impl FnMut(usize) -> T) -> Self {
        let mut v = Self::new(len);
        for (k, slot) in v.buf.iter_mut().enumerate() {
            *slot = f(k);
        }
        v.initialized.store(true, Ordering::Relaxed);
        v
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.amf.nrows()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }
    #[inline]
    pub fn set_initialized(&self, initialized: bool) {
        self.initialized.store(initialized, Ordering::Relaxed);
    }

    #[inline]
    pub fn as_ref(&self) -> VecRef<'_, T> {
        VecRef {
            buf: &self.buf,
            amf: self.amf.clone(),
            conj: Conj::No,
            init: self.is_initialized(),
        }
    }

    #[inline]
    pub fn as_mut(&mut self) -> VecMut<'_, T> {
        VecMut {
            buf: &mut self.buf,
            amf: self.amf.clone(),
            init: &self.initialized,
        }
    }

    #[track_caller]
    #[inline]
    pub fn read(&self, k: usize) -> T {
        self.as_ref().read(k)
    }

    #[track_caller]
    #[inline]
    pub fn write(&mut self, k: usize, value: T) {
        self.as_mut().write(k, value);
    }

    pub(crate) fn fill_from_iter(&mut self, iter: impl IntoIterator<Item = T>) -> Result {
        let mut iter = iter.into_iter();
        for slot in self.buf.iter_mut() {
            match iter.next() {
                Some(v) => *slot = v,
                None => {
                    self.initialized.store(false, Ordering::Relaxed);
                    return Err(Error::Illegal);
                }
            }
        }
        if iter.next().is_some() {
            self.initialized.store(false, Ordering::Relaxed);
            return Err(Error::Illegal);
        }
        self.initialized.store(true, Ordering::Relaxed);
        Ok(())
    }
}

impl<T: ComplexField> Clone for Vector<T> {
    fn clone(&self) -> Self {
        Self {
            buf: self.buf.clone(),
            amf: self.amf.clone(),
            initialized: AtomicBool::new(self.is_initialized()),
        }
    }
}

impl<T: ComplexField> fmt::Debug for Vector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vector")
            .field("len", &self.len())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Lazy rank-1 expression `x ⊗ x` (or `x ⊗ conj(x)`) under a multiplicative
/// operator, materialized on read. Built by [`ops::outer`] and
/// [`ops::outer_conj`].
pub struct Outer<'a, T, M> {
    pub(crate) x: VecRef<'a, T>,
    pub(crate) conj_rhs: Conj,
    pub(crate) op: M,
}

/// Read-only access shared by matrix views and lazy matrix expressions; the
/// seam that lets the element-wise primitives consume either uniformly.
pub trait MatRead<T> {
    fn nrows(&self) -> usize;
    fn ncols(&self) -> usize;
    fn is_initialized(&self) -> bool;
    fn read(&self, i: usize, j: usize) -> T;
}

impl<T: ComplexField> MatRead<T> for MatRef<'_, T> {
    #[inline]
    fn nrows(&self) -> usize {
        (*self).nrows()
    }
    #[inline]
    fn ncols(&self) -> usize {
        (*self).ncols()
    }
    #[inline]
    fn is_initialized(&self) -> bool {
        self.init
    }
    #[inline]
    fn read(&self, i: usize, j: usize) -> T {
        (*self).read(i, j)
    }
}

impl<T: ComplexField, M: algebra::BinaryOp<T>> MatRead<T> for Outer<'_, T, M> {
    #[inline]
    fn nrows(&self) -> usize {
        self.x.len()
    }
    #[inline]
    fn ncols(&self) -> usize {
        self.x.len()
    }
    #[inline]
    fn is_initialized(&self) -> bool {
        self.x.is_initialized()
    }
    #[inline]
    fn read(&self, i: usize, j: usize) -> T {
        let rhs = match self.conj_rhs {
            Conj::No => self.x.read(j),
            Conj::Yes => self.x.read(j).conj(),
        };
        self.op.apply(self.x.read(i), rhs)
    }
}

/// Arc re-export used by gather views.
pub type IndexVec = Arc<[usize]>;
