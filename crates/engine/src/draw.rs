//! Weighted random draw over a card pool.
//!
//! Every card carries a `pull_rate` weight. A draw sums the eligible weights
//! to `T`, picks `x` uniformly in `[0, T)` and walks the cumulative sum,
//! returning the first card whose cumulative rate meets or exceeds `x`.
//!
//! Weights that are not finite or not strictly positive are never selected.
//! Pack opening, battles and the simulation CLI all go through this module.

use rand::Rng;

/// Anything that can be drawn from a weighted pool.
pub trait Weighted {
    fn weight(&self) -> f64;
}

impl Weighted for f64 {
    fn weight(&self) -> f64 {
        *self
    }
}

fn eligible(weight: f64) -> bool {
    weight.is_finite() && weight > 0.0
}

/// Sum of the eligible weights of `items`.
pub fn total_weight<T: Weighted>(items: &[T]) -> f64 {
    items
        .iter()
        .map(|item| item.weight())
        .filter(|w| eligible(*w))
        .sum()
}

/// Draw one item, or `None` when nothing in `items` can be drawn.
pub fn draw<'a, T, R>(items: &'a [T], rng: &mut R) -> Option<&'a T>
where
    T: Weighted,
    R: Rng + ?Sized,
{
    draw_index(items, rng).map(|index| &items[index])
}

/// Same as [`draw`], returning the position of the drawn item.
pub fn draw_index<T, R>(items: &[T], rng: &mut R) -> Option<usize>
where
    T: Weighted,
    R: Rng + ?Sized,
{
    let total = total_weight(items);
    if !(total.is_finite() && total > 0.0) {
        return None;
    }

    let target = rng.random_range(0.0..total);
    let mut cumulative = 0.0;
    let mut last = None;
    for (index, item) in items.iter().enumerate() {
        let weight = item.weight();
        if !eligible(weight) {
            continue;
        }
        cumulative += weight;
        if cumulative >= target {
            return Some(index);
        }
        last = Some(index);
    }

    // Rounding can leave `cumulative` a hair below `target`.
    last
}

/// Draw `count` items independently.
///
/// Returns `None` when the pool is empty, so callers never get a short batch.
pub fn draw_many<'a, T, R>(items: &'a [T], count: usize, rng: &mut R) -> Option<Vec<&'a T>>
where
    T: Weighted,
    R: Rng + ?Sized,
{
    (0..count).map(|_| draw(items, rng)).collect()
}

/// The probability of drawing each item (`r_i / T`), in input order.
pub fn expected_distribution<T: Weighted>(items: &[T]) -> Vec<f64> {
    let total = total_weight(items);
    items
        .iter()
        .map(|item| {
            let weight = item.weight();
            if eligible(weight) && total > 0.0 {
                weight / total
            } else {
                0.0
            }
        })
        .collect()
}

/// Draw `trials` times and count the hits per item index.
pub fn simulate<T, R>(items: &[T], trials: u64, rng: &mut R) -> Vec<u64>
where
    T: Weighted,
    R: Rng + ?Sized,
{
    let mut hits = vec![0u64; items.len()];
    for _ in 0..trials {
        let Some(index) = draw_index(items, rng) else {
            break;
        };
        hits[index] += 1;
    }
    hits
}
