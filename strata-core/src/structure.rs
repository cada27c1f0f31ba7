//! Matrix structure tags.
//!
//! A [`Structure`] describes the algebraic and shape properties that a
//! container guarantees: which positions are forced to zero, whether reads of
//! one half are reflected onto the other (with conjugation for the Hermitian
//! kinds), and which packed storage layout backs the container.
//!
//! Structures form a lattice under [`Structure::is_a`]; operations use the
//! lattice to reject incompatible combinations and to pick specialized paths.

use core::ops::Range;

/// Algebraic/shape class of a matrix container or view.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Structure {
    General,
    Square,
    Symmetric,
    SymmetricPositiveDefinite,
    Hermitian,
    HermitianPositiveDefinite,
    UpperTriangular,
    LowerTriangular,
    UpperTrapezoidal,
    LowerTrapezoidal,
    Orthogonal,
    OrthogonalColumns,
    SymmetricTridiagonal,
    HermitianTridiagonal,
    RectangularDiagonal,
}

/// Physical layout family selected by a structure.
///
/// Each scheme corresponds to one storage polynomial shape, so that a single
/// polynomial evaluation addresses packed triangular, symmetric, band, full
/// and diagonal-array layouts alike.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StorageScheme {
    /// Row-major `nrows × ncols` array.
    Full,
    /// Row-major packed upper half, `Σ_i (ncols - i)` cells.
    PackedUpper,
    /// Column-major packed lower half, `Σ_j (nrows - j)` cells.
    PackedLower,
    /// Interleaved diagonal/super-diagonal band, `2n - 1` cells.
    TridiagBand,
    /// Main diagonal only, `min(nrows, ncols)` cells.
    DiagArray,
}

use Structure::*;

impl Structure {
    fn parents(self) -> &'static [Structure] {
        match self {
            General => &[],
            Square => &[General],
            Symmetric => &[Square],
            SymmetricPositiveDefinite => &[Symmetric],
            Hermitian => &[Square],
            HermitianPositiveDefinite => &[Hermitian],
            UpperTriangular => &[Square, UpperTrapezoidal],
            LowerTriangular => &[Square, LowerTrapezoidal],
            UpperTrapezoidal => &[General],
            LowerTrapezoidal => &[General],
            Orthogonal => &[Square, OrthogonalColumns],
            OrthogonalColumns => &[General],
            SymmetricTridiagonal => &[Symmetric],
            HermitianTridiagonal => &[Hermitian],
            RectangularDiagonal => &[General],
        }
    }

    /// Reflexive-transitive closure of the structure lattice.
    pub fn is_a(self, other: Structure) -> bool {
        self == other || self.parents().iter().any(|&p| p.is_a(other))
    }

    /// Whether the logical shape is constrained to `nrows == ncols`.
    pub fn requires_square(self) -> bool {
        self.is_a(Square)
    }

    /// Zero-pattern predicate: true iff position `(i, j)` is algebraically
    /// forced to zero and is not backed by storage.
    #[inline]
    pub fn is_forced_zero(self, i: usize, j: usize) -> bool {
        match self {
            UpperTriangular | UpperTrapezoidal => i > j,
            LowerTriangular | LowerTrapezoidal => i < j,
            SymmetricTridiagonal | HermitianTridiagonal => i.abs_diff(j) > 1,
            RectangularDiagonal => i != j,
            _ => false,
        }
    }

    /// Whether reads of `(i, j)` with `i > j` are answered by the canonical
    /// stored half at `(j, i)`.
    #[inline]
    pub fn reflects(self) -> bool {
        matches!(
            self,
            Symmetric
                | SymmetricPositiveDefinite
                | Hermitian
                | HermitianPositiveDefinite
                | SymmetricTridiagonal
                | HermitianTridiagonal
        )
    }

    /// Whether the reflection rule conjugates the stored value.
    #[inline]
    pub fn conjugate_on_reflect(self) -> bool {
        matches!(
            self,
            Hermitian | HermitianPositiveDefinite | HermitianTridiagonal
        )
    }

    /// Storage layout family of an original container with this structure.
    pub fn storage(self) -> StorageScheme {
        match self {
            Symmetric | SymmetricPositiveDefinite | Hermitian | HermitianPositiveDefinite
            | UpperTriangular => StorageScheme::PackedUpper,
            LowerTriangular => StorageScheme::PackedLower,
            SymmetricTridiagonal | HermitianTridiagonal => StorageScheme::TridiagBand,
            RectangularDiagonal => StorageScheme::DiagArray,
            General | Square | Orthogonal | OrthogonalColumns | UpperTrapezoidal
            | LowerTrapezoidal => StorageScheme::Full,
        }
    }

    /// Columns of row `i` that may hold a nonzero value.
    #[inline]
    pub fn row_support(self, i: usize, ncols: usize) -> Range<usize> {
        match self {
            UpperTriangular | UpperTrapezoidal => i.min(ncols)..ncols,
            LowerTriangular | LowerTrapezoidal => 0..(i + 1).min(ncols),
            SymmetricTridiagonal | HermitianTridiagonal => {
                i.saturating_sub(1)..(i + 2).min(ncols)
            }
            RectangularDiagonal => i.min(ncols)..(i + 1).min(ncols),
            _ => 0..ncols,
        }
    }

    /// Rows of column `j` that may hold a nonzero value.
    #[inline]
    pub fn col_support(self, j: usize, nrows: usize) -> Range<usize> {
        match self {
            UpperTriangular | UpperTrapezoidal => 0..(j + 1).min(nrows),
            LowerTriangular | LowerTrapezoidal => j.min(nrows)..nrows,
            SymmetricTridiagonal | HermitianTridiagonal => {
                j.saturating_sub(1)..(j + 2).min(nrows)
            }
            RectangularDiagonal => j.min(nrows)..(j + 1).min(nrows),
            _ => 0..nrows,
        }
    }

    /// Structure of the transpose view.
    pub fn transposed(self) -> Structure {
        match self {
            UpperTriangular => LowerTriangular,
            LowerTriangular => UpperTriangular,
            UpperTrapezoidal => LowerTrapezoidal,
            LowerTrapezoidal => UpperTrapezoidal,
            OrthogonalColumns => General,
            other => other,
        }
    }

    /// Structure of a contiguous sub-view anchored at `(i, j)` with shape
    /// `sub_nrows × sub_ncols`.
    ///
    /// Diagonal-aligned square blocks keep the origin structure (a principal
    /// submatrix of a symmetric, positive-definite, triangular or tridiagonal
    /// matrix is again one); everything else degrades to `Square`/`General`.
    pub fn submatrix(self, i: usize, j: usize, sub_nrows: usize, sub_ncols: usize) -> Structure {
        let diag_aligned = i == j && sub_nrows == sub_ncols;
        if diag_aligned {
            match self {
                Symmetric | SymmetricPositiveDefinite | Hermitian
                | HermitianPositiveDefinite | UpperTriangular | LowerTriangular
                | SymmetricTridiagonal | HermitianTridiagonal => return self,
                Orthogonal | Square => return Square,
                _ => (),
            }
        }
        if sub_nrows == sub_ncols && self.requires_square() {
            Square
        } else {
            General
        }
    }

    /// Whether a view of structure `self` may be retyped as `target`: every
    /// position `target` stores must be readable from `self`'s storage.
    pub fn retype_allowed(self, target: Structure) -> bool {
        if self == target {
            return true;
        }
        match self.storage() {
            // All cells exist, and reflecting structures answer reads of
            // either half, so any pattern can be carved out.
            StorageScheme::Full => true,
            StorageScheme::PackedUpper => {
                self.reflects()
                    || matches!(
                        target.storage(),
                        StorageScheme::PackedUpper
                            | StorageScheme::TridiagBand
                            | StorageScheme::DiagArray
                    )
            }
            StorageScheme::PackedLower => {
                matches!(target.storage(), StorageScheme::DiagArray)
                    || matches!(target, LowerTrapezoidal)
            }
            StorageScheme::TridiagBand => matches!(
                target,
                SymmetricTridiagonal | HermitianTridiagonal | RectangularDiagonal
            ),
            StorageScheme::DiagArray => matches!(target, RectangularDiagonal),
        }
    }

    /// Structure of the product `A · B` derivable from the factors alone.
    pub fn product(self, rhs: Structure) -> Structure {
        if self.is_a(UpperTrapezoidal) && rhs.is_a(UpperTrapezoidal) {
            if self == UpperTriangular && rhs == UpperTriangular {
                UpperTriangular
            } else {
                UpperTrapezoidal
            }
        } else if self.is_a(LowerTrapezoidal) && rhs.is_a(LowerTrapezoidal) {
            if self == LowerTriangular && rhs == LowerTriangular {
                LowerTriangular
            } else {
                LowerTrapezoidal
            }
        } else if self == RectangularDiagonal && rhs == RectangularDiagonal {
            RectangularDiagonal
        } else if self.is_a(Square) && rhs.is_a(Square) {
            Square
        } else {
            General
        }
    }

    /// Whether an output of structure `self` can hold every nonzero of a
    /// product with structure `product`.
    pub fn absorbs(self, product: Structure) -> bool {
        // A position forced to zero in the output must be forced to zero in
        // the product. Reflecting outputs accept anything; correctness of the
        // symmetry itself is the caller's contract.
        if self.reflects() && !matches!(self, SymmetricTridiagonal | HermitianTridiagonal) {
            return true;
        }
        match self {
            UpperTriangular | UpperTrapezoidal => {
                product.is_a(UpperTrapezoidal) || product == RectangularDiagonal
            }
            LowerTriangular | LowerTrapezoidal => {
                product.is_a(LowerTrapezoidal) || product == RectangularDiagonal
            }
            SymmetricTridiagonal | HermitianTridiagonal | RectangularDiagonal => {
                product == RectangularDiagonal
            }
            _ => true,
        }
    }
}

impl StorageScheme {
    /// Number of cells an original `nrows × ncols` container allocates.
    pub fn storage_len(self, nrows: usize, ncols: usize) -> usize {
        match self {
            StorageScheme::Full => nrows * ncols,
            StorageScheme::PackedUpper => {
                let d = nrows.min(ncols);
                d * ncols - d * (d - 1) / 2
            }
            StorageScheme::PackedLower => {
                let d = nrows.min(ncols);
                d * nrows - d * (d - 1) / 2
            }
            StorageScheme::TridiagBand => (2 * nrows.min(ncols)).saturating_sub(1),
            StorageScheme::DiagArray => nrows.min(ncols),
        }
    }
}
