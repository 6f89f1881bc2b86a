//! Gene-level operations on [`StrategyParams`] vectors.
//!
//! Every function here upholds the same contract: the vector it returns (or
//! leaves behind) lies inside the declared [`GeneBounds`] and satisfies the
//! rule's pairwise invariants. Mutation clamps rather than resamples; the
//! clamp policy is applied uniformly across sampling, crossover, and
//! mutation so out-of-range vectors cannot exist anywhere in the search.

use configuration::{GENE_COUNT, GeneBounds, StrategyParams};
use rand::Rng;
use rand::seq::index;

/// Draws a uniform random vector from the bounds box.
pub fn sample(bounds: &GeneBounds, rng: &mut impl Rng) -> StrategyParams {
    let mut genes = [0u32; GENE_COUNT];
    for (gene, range) in genes.iter_mut().zip(bounds.as_ranges()) {
        *gene = rng.random_range(range.min..=range.max);
    }
    let mut params = StrategyParams::from_genes(genes);
    repair(&mut params, bounds);
    params
}

/// Uniform crossover: each gene is taken from either parent with equal
/// probability.
pub fn crossover(
    a: &StrategyParams,
    b: &StrategyParams,
    bounds: &GeneBounds,
    rng: &mut impl Rng,
) -> StrategyParams {
    let genes_a = a.as_genes();
    let genes_b = b.as_genes();
    let mut genes = [0u32; GENE_COUNT];
    for i in 0..GENE_COUNT {
        genes[i] = if rng.random_bool(0.5) { genes_a[i] } else { genes_b[i] };
    }
    let mut child = StrategyParams::from_genes(genes);
    repair(&mut child, bounds);
    child
}

/// Perturbs `num_genes` distinct genes by a step of up to a quarter of each
/// gene's range, clamping the result back into bounds.
pub fn mutate(
    params: &mut StrategyParams,
    bounds: &GeneBounds,
    num_genes: usize,
    rng: &mut impl Rng,
) {
    let ranges = bounds.as_ranges();
    let mut genes = params.as_genes();

    for i in index::sample(rng, GENE_COUNT, num_genes.min(GENE_COUNT)) {
        let range = ranges[i];
        let step = i64::from((range.max - range.min) / 4).max(1);
        let delta = rng.random_range(-step..=step);
        let shifted = (i64::from(genes[i]) + delta).clamp(0, i64::from(u32::MAX));
        genes[i] = range.clamp(shifted as u32);
    }

    *params = StrategyParams::from_genes(genes);
    repair(params, bounds);
}

/// Restores the pairwise invariants a gene-wise operation can break.
///
/// Only the RSI pair needs work: the MACD ordering holds because the two
/// ranges are validated not to overlap, and the slow SMA exceeds the fast
/// one by construction. Bounds validation guarantees the clamp target stays
/// inside the oversold range.
pub fn repair(params: &mut StrategyParams, bounds: &GeneBounds) {
    if params.rsi_oversold >= params.rsi_overbought {
        params.rsi_oversold = bounds.rsi_oversold.clamp(params.rsi_overbought - 1);
    }

    debug_assert!(bounds.contains(params), "repaired vector escaped its bounds");
    debug_assert!(params.validate().is_ok(), "repaired vector violates an invariant");
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use configuration::GeneRange;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// The original system's parameter space.
    pub(crate) fn bounds() -> GeneBounds {
        GeneBounds {
            macd_short_period: GeneRange { min: 12, max: 25 },
            macd_long_period: GeneRange { min: 26, max: 29 },
            macd_signal_period: GeneRange { min: 9, max: 20 },
            sma_fast_period: GeneRange { min: 10, max: 29 },
            sma_slow_offset: GeneRange { min: 10, max: 99 },
            rsi_period: GeneRange { min: 14, max: 27 },
            rsi_oversold: GeneRange { min: 20, max: 79 },
            rsi_overbought: GeneRange { min: 70, max: 89 },
            bb_period: GeneRange { min: 5, max: 49 },
        }
    }

    fn assert_well_formed(params: &StrategyParams, bounds: &GeneBounds) {
        assert!(bounds.contains(params), "out of bounds: {params:?}");
        assert!(params.validate().is_ok(), "invariant violated: {params:?}");
    }

    #[test]
    fn sampling_stays_in_bounds() {
        let bounds = bounds();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            assert_well_formed(&sample(&bounds, &mut rng), &bounds);
        }
    }

    #[test]
    fn crossover_and_mutation_stay_in_bounds() {
        let bounds = bounds();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..500 {
            let a = sample(&bounds, &mut rng);
            let b = sample(&bounds, &mut rng);
            let mut child = crossover(&a, &b, &bounds, &mut rng);
            mutate(&mut child, &bounds, 4, &mut rng);
            assert_well_formed(&child, &bounds);
        }
    }

    #[test]
    fn mutating_every_gene_stays_in_bounds() {
        let bounds = bounds();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let mut params = sample(&bounds, &mut rng);
            mutate(&mut params, &bounds, GENE_COUNT, &mut rng);
            assert_well_formed(&params, &bounds);
        }
    }

    #[test]
    fn repair_clamps_oversold_below_overbought() {
        let bounds = bounds();
        let mut params = sample(&bounds, &mut StdRng::seed_from_u64(4));
        params.rsi_oversold = 79;
        params.rsi_overbought = 70;
        repair(&mut params, &bounds);
        assert_eq!(params.rsi_oversold, 69);
        assert_well_formed(&params, &bounds);
    }
}
