//! Deterministic shuffled train/test split.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::table::EventTable;

/// Build the RNG used for splitting and pseudo-data: seeded when the
/// configuration fixes a seed, entropy-seeded otherwise.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Split a table into (train, test) by row, holding out `test_fraction`
/// of the rows. Rows are shuffled so the two samples interleave processes.
pub fn train_test_split(
    table: &EventTable,
    test_fraction: f64,
    rng: &mut StdRng,
) -> (EventTable, EventTable) {
    let mut indices: Vec<usize> = (0..table.len()).collect();
    indices.shuffle(rng);

    let n_test = (table.len() as f64 * test_fraction).round() as usize;
    let (test_idx, train_idx) = indices.split_at(n_test.min(table.len()));
    (table.select_rows(train_idx), table.select_rows(test_idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(n: usize) -> EventTable {
        let mut t = EventTable::new(vec!["x".to_string()]);
        for i in 0..n {
            t.columns[0].push(i as f64);
            t.weight.push(1.0);
            t.mva_weight.push(1.0);
            t.process.push("p".to_string());
            t.label.push((i % 2) as u8);
        }
        t
    }

    #[test]
    fn split_sizes() {
        let t = table(10);
        let mut rng = rng_from_seed(Some(7));
        let (train, test) = train_test_split(&t, 0.3, &mut rng);
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 7);
    }

    #[test]
    fn split_is_a_partition() {
        let t = table(20);
        let mut rng = rng_from_seed(Some(1));
        let (train, test) = train_test_split(&t, 0.5, &mut rng);
        let mut all: Vec<f64> = train.columns[0].iter().chain(&test.columns[0]).copied().collect();
        all.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(all, (0..20).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn same_seed_same_split() {
        let t = table(30);
        let (a_train, _) = train_test_split(&t, 0.5, &mut rng_from_seed(Some(42)));
        let (b_train, _) = train_test_split(&t, 0.5, &mut rng_from_seed(Some(42)));
        assert_eq!(a_train.columns[0], b_train.columns[0]);
    }
}
