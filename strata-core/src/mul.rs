//! Matrix multiplication module.
//!
//! [`mxm`] computes `C ← C ⊕ (A ⊗ B)` under an arbitrary semiring and
//! dispatches on the selected backend: the sequential kernel runs on the
//! calling thread, the replicated-grid backend distributes logical tiles
//! block-cyclically over a `Tr × Tc` thread face replicated across `Rt`
//! layers and trades memory for less communication.
//!
//! Structure contracts are verified before any compute: the dimension
//! contract `A.ncols == B.nrows`, `C.nrows == A.nrows`, `C.ncols == B.ncols`,
//! and the output-structure contract (an `UpperTriangular × UpperTriangular`
//! product may be stored into an `UpperTriangular` output, a `General`
//! product may not).

use crate::algebra::Semiring;
use crate::{
    ComplexField, Error, GridConfig, MatMut, MatRef, Parallelism, Result, VecMut, VecRef,
};

/// Computes `C ← C ⊕ (A ⊗ B)` with the given semiring.
#[inline]
pub fn mxm<T: ComplexField>(
    c: MatMut<'_, T>,
    a: MatRef<'_, T>,
    b: MatRef<'_, T>,
    ring: impl Semiring<T> + Send + Sync,
    parallelism: Parallelism,
) -> Result {
    match parallelism {
        Parallelism::None => mxm_seq(c, a, b, ring),
        Parallelism::Grid(config) => parallel::mxm(c, a, b, ring, &config),
    }
}

fn mxm_checks<T: ComplexField>(
    c: &MatMut<'_, T>,
    a: &MatRef<'_, T>,
    b: &MatRef<'_, T>,
) -> Result {
    if a.ncols() != b.nrows() || c.nrows() != a.nrows() || c.ncols() != b.ncols() {
        return Err(Error::Mismatch);
    }
    let product = a.structure().product(b.structure());
    if !c.structure().absorbs(product) {
        return Err(Error::Mismatch);
    }
    Ok(())
}

/// Sequential kernel; also the per-tile implementation the replicated-grid
/// backend delegates to.
pub(crate) fn mxm_seq<T: ComplexField>(
    mut c: MatMut<'_, T>,
    a: MatRef<'_, T>,
    b: MatRef<'_, T>,
    ring: impl Semiring<T>,
) -> Result {
    mxm_checks(&c, &a, &b)?;
    if !a.is_initialized() || !b.is_initialized() || !c.is_initialized() {
        c.set_initialized(false);
        return Ok(());
    }

    let k_dim = a.ncols();
    let a_structure = a.structure();
    let b_structure = b.structure();
    c.update_stored(|i, j, v| {
        // structure-aware inner bounds: only the support overlap contributes
        let ra = a_structure.row_support(i, k_dim);
        let rb = b_structure.col_support(j, k_dim);
        let mut acc = *v;
        for k in ra.start.max(rb.start)..ra.end.min(rb.end) {
            acc = ring.add(acc, ring.mul(a.read(i, k), b.read(k, j)));
        }
        *v = acc;
    });
    Ok(())
}

/// Computes `y ← y ⊕ (A ⊗ x)` with the given semiring.
pub fn mxv<T: ComplexField>(
    mut y: VecMut<'_, T>,
    a: MatRef<'_, T>,
    x: VecRef<'_, T>,
    ring: impl Semiring<T>,
) -> Result {
    if a.ncols() != x.len() || a.nrows() != y.len() {
        return Err(Error::Mismatch);
    }
    if !a.is_initialized() || !x.is_initialized() || !y.is_initialized() {
        y.set_initialized(false);
        return Ok(());
    }
    let n = a.ncols();
    let a_structure = a.structure();
    for i in 0..y.len() {
        let mut acc = y.read(i);
        for j in a_structure.row_support(i, n) {
            acc = ring.add(acc, ring.mul(a.read(i, j), x.read(j)));
        }
        y.write(i, acc);
    }
    Ok(())
}

/// The replicated-grid parallel backend.
pub mod parallel {
    use super::*;
    use crate::Mat;
    use crate::Structure;
    use rayon::prelude::*;

    #[inline]
    fn div_ceil(a: usize, b: usize) -> usize {
        (a + b - 1) / b
    }

    /// Block-cyclic tile grid of one matrix operand: tile `(I, J)` belongs to
    /// thread `(I mod Tr, J mod Tc)` of every replication layer.
    struct TileGrid<T> {
        tiles: Vec<Mat<T>>,
        tiles_r: usize,
        tiles_c: usize,
    }

    impl<T: ComplexField> TileGrid<T> {
        /// Allocates the grid and fills it from the source view; the
        /// distribution step of the layer-0 copy.
        fn gather(
            src: MatRef<'_, T>,
            block_nrows: usize,
            block_ncols: usize,
        ) -> Self {
            let tiles_r = div_ceil(src.nrows(), block_nrows);
            let tiles_c = div_ceil(src.ncols(), block_ncols);
            let mut tiles = Vec::with_capacity(tiles_r * tiles_c);
            for ti in 0..tiles_r {
                for tj in 0..tiles_c {
                    let i0 = ti * block_nrows;
                    let j0 = tj * block_ncols;
                    let h = block_nrows.min(src.nrows() - i0);
                    let w = block_ncols.min(src.ncols() - j0);
                    tiles.push(Mat::from_fn(Structure::General, h, w, |i, j| {
                        src.read(i0 + i, j0 + j)
                    }));
                }
            }
            Self {
                tiles,
                tiles_r,
                tiles_c,
            }
        }

        /// Allocates an uninitialized grid of the same shape, for the
        /// replication layers filled by the broadcast phase.
        fn like(other: &Self) -> Self {
            Self {
                tiles: other
                    .tiles
                    .iter()
                    .map(|t| Mat::new(Structure::General, t.nrows(), t.ncols()))
                    .collect(),
                tiles_r: other.tiles_r,
                tiles_c: other.tiles_c,
            }
        }

        #[inline]
        fn at(&self, ti: usize, tj: usize) -> &Mat<T> {
            &self.tiles[ti * self.tiles_c + tj]
        }
    }

    /// `C ← C ⊕ (A ⊗ B)` over the `Tr × Tc × Rt` grid.
    ///
    /// Phases, with a barrier (a rayon pass join) between each:
    /// 1. every layer `rt > 0` copies its `(tr, tc, 0)` tiles of `A` and `B`
    ///    into its own layer;
    /// 2. every active `C` tile of every layer is set to the additive
    ///    identity;
    /// 3. Cannon-style local compute: each thread starts at the circularly
    ///    shifted column `c_a = (tc + tr + rt·Tc/Rt) mod Tc` and performs
    ///    `Tc/Rt` sequential per-tile multiplications, advancing the shift by
    ///    one column each step;
    /// 4. threads of layer 0 fold the tiles of every layer `rt ≥ 1` into
    ///    their own `C` tiles with the ring's additive monoid.
    ///
    /// Any grid or shape inconsistency is reported as `Mismatch` before the
    /// parallel region opens and leaves `C` untouched.
    pub fn mxm<T: ComplexField>(
        mut c: MatMut<'_, T>,
        a: MatRef<'_, T>,
        b: MatRef<'_, T>,
        ring: impl Semiring<T> + Send + Sync,
        config: &GridConfig,
    ) -> Result {
        super::mxm_checks(&c, &a, &b)?;
        let grid = config.grid;
        if grid.tr == 0 || grid.tc == 0 || grid.rt == 0 {
            return Err(Error::Mismatch);
        }
        if grid.tc % grid.rt != 0 {
            return Err(Error::Mismatch);
        }
        if config.block_nrows == 0 || config.block_ncols == 0 {
            return Err(Error::Mismatch);
        }
        if !a.is_initialized() || !b.is_initialized() || !c.is_initialized() {
            c.set_initialized(false);
            return Ok(());
        }

        let (tr, tc, rt) = (grid.tr, grid.tc, grid.rt);
        let (br, bc) = (config.block_nrows, config.block_ncols);

        // The middle dimension is tiled by `bc` on both sides so the local
        // tile grids of A and B agree on it.
        let a0 = TileGrid::gather(a, br, bc);
        let b0 = TileGrid::gather(b, bc, bc);
        let kt = a0.tiles_c;
        debug_assert!(kt == b0.tiles_r);

        let mut a_layers = Vec::with_capacity(rt);
        let mut b_layers = Vec::with_capacity(rt);
        a_layers.push(a0);
        b_layers.push(b0);
        for _ in 1..rt {
            a_layers.push(TileGrid::like(&a_layers[0]));
            b_layers.push(TileGrid::like(&b_layers[0]));
        }

        // Phase 1: broadcast the layer-0 tiles into every other layer.
        {
            let (a0, a_rest) = a_layers.split_first_mut().unwrap();
            a_rest.par_iter_mut().try_for_each(|layer| -> Result {
                for (dst, src) in layer.tiles.iter_mut().zip(a0.tiles.iter()) {
                    crate::ops::set(dst.as_mut(), &src.as_ref())?;
                }
                Ok(())
            })?;
            let (b0, b_rest) = b_layers.split_first_mut().unwrap();
            b_rest.par_iter_mut().try_for_each(|layer| -> Result {
                for (dst, src) in layer.tiles.iter_mut().zip(b0.tiles.iter()) {
                    crate::ops::set(dst.as_mut(), &src.as_ref())?;
                }
                Ok(())
            })?;
        }
        // barrier

        // Phase 2: zero every C tile of every layer.
        let mut c_layers: Vec<TileGrid<T>> = Vec::with_capacity(rt);
        for _ in 0..rt {
            let tiles_r = div_ceil(c.nrows(), br);
            let tiles_c = div_ceil(c.ncols(), bc);
            let mut tiles = Vec::with_capacity(tiles_r * tiles_c);
            for ti in 0..tiles_r {
                for tj in 0..tiles_c {
                    let h = br.min(c.nrows() - ti * br);
                    let w = bc.min(c.ncols() - tj * bc);
                    tiles.push(Mat::new(Structure::General, h, w));
                }
            }
            c_layers.push(TileGrid {
                tiles,
                tiles_r,
                tiles_c,
            });
        }
        c_layers
            .par_iter_mut()
            .try_for_each(|layer| -> Result {
                for tile in layer.tiles.iter_mut() {
                    crate::ops::set_scalar(tile.as_mut(), ring.zero())?;
                }
                Ok(())
            })?;
        // barrier

        // Phase 3: local compute. Each C tile follows the circular-shift
        // schedule of its owner thread; layer rt covers the k-tile columns
        // whose owner column is reached in its Tc/Rt steps, so the layers
        // partition the middle dimension.
        let steps = tc / rt;
        let nt = c_layers[0].tiles_c;
        c_layers
            .par_iter_mut()
            .enumerate()
            .try_for_each(|(layer_idx, layer)| -> Result {
                let a_layer = &a_layers[layer_idx];
                let b_layer = &b_layers[layer_idx];
                layer
                    .tiles
                    .par_iter_mut()
                    .enumerate()
                    .try_for_each(|(t, tile)| -> Result {
                        let ti = t / nt;
                        let tj = t % nt;
                        let owner_tr = ti % tr;
                        let owner_tc = tj % tc;
                        let c_a = (owner_tc + owner_tr + layer_idx * steps) % tc;
                        for s in 0..steps {
                            let col = (c_a + s) % tc;
                            let mut ktile = col;
                            while ktile < kt {
                                super::mxm_seq(
                                    tile.as_mut(),
                                    a_layer.at(ti, ktile).as_ref(),
                                    b_layer.at(ktile, tj).as_ref(),
                                    ring,
                                )?;
                                ktile += tc;
                            }
                        }
                        Ok(())
                    })
            })?;
        // barrier

        // Phase 4: fold the replication layers into layer 0.
        {
            let (c0, c_rest) = c_layers.split_first_mut().unwrap();
            c0.tiles
                .par_iter_mut()
                .enumerate()
                .try_for_each(|(t, tile)| -> Result {
                    for layer in c_rest.iter() {
                        crate::ops::foldl(
                            tile.as_mut(),
                            &layer.tiles[t].as_ref(),
                            ring.add_monoid(),
                        )?;
                    }
                    Ok(())
                })?;
        }

        // Accumulate the layer-0 tiles into C over its stored positions.
        let c0 = &c_layers[0];
        c.update_stored(|i, j, v| {
            let tile = c0.at(i / br, j / bc);
            *v = ring.add(*v, tile.read(i % br, j % bc));
        });
        Ok(())
    }
}
