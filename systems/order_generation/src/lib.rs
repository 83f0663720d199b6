#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that draws a fresh order for every session.

use flower_rush_core::{Catalog, DifficultyConfig, Order, OrderError, OrderLine};
use rand::{seq::index, Rng};

/// Draws orders of distinct flower kinds from a catalog.
#[derive(Debug, Default)]
pub struct OrderGeneration;

impl OrderGeneration {
    /// Generates an order for the provided difficulty parameters.
    ///
    /// The line count is drawn from `config.order_items` after clamping both
    /// ends to the catalog size, kinds are sampled without replacement, and
    /// each line's quantity is drawn from `config.item_quantity`. The same
    /// random state always yields the same order.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        config: &DifficultyConfig,
        catalog: &Catalog,
        rng: &mut R,
    ) -> Result<Order, OrderError> {
        if catalog.is_empty() {
            return Err(OrderError::EmptyCatalog);
        }

        let available = u32::try_from(catalog.len()).unwrap_or(u32::MAX);
        let count = config.order_items.clamped_to(available).sample(rng) as usize;

        let kinds = catalog.kinds();
        let lines = index::sample(&mut *rng, kinds.len(), count)
            .into_iter()
            .map(|position| {
                let required = config.item_quantity.sample(rng).max(1);
                OrderLine::new(kinds[position].clone(), required)
            })
            .collect();

        Order::new(lines)
    }
}
