//! Merging several technosphere exchanges for the same product into one.
use crate::flow::{FlowQuery, locate_technosphere, require_uniform_name};
use crate::inventory::{ActivityKey, Exchange, ExchangeKind, InventoryStore, NewExchange};
use anyhow::{Context, Result};
use log::{debug, info};

/// Comment attached to exchanges created by [`aggregate_technosphere`]
pub const AGGREGATION_COMMENT: &str = "aggregation of fuels, uncertainty lost";

/// Pick the exchange with the largest amount. The first one wins ties.
fn dominant_exchange(exchanges: &[Exchange]) -> Option<&Exchange> {
    let (first, rest) = exchanges.split_first()?;
    Some(rest.iter().fold(first, |best, ex| {
        if ex.amount > best.amount { ex } else { best }
    }))
}

/// Replace several technosphere exchanges with the same name by a single one.
///
/// This is used where an activity buys the same product from several providers (e.g. markets in
/// different regions). The new exchange takes its provider, unit, type and name from the match
/// with the largest amount and its amount is the sum over all matches. All the original exchanges
/// are then deleted, including the dominant one. Uncertainty information of the originals is not
/// carried over.
///
/// Does nothing if only one exchange matches. Returns the new exchange, if one was created.
pub fn aggregate_technosphere<S>(
    store: &mut S,
    key: &ActivityKey,
    query: &FlowQuery,
) -> Result<Option<Exchange>>
where
    S: InventoryStore + ?Sized,
{
    let matches = locate_technosphere(store, key, query)?;
    require_uniform_name(&matches, key, ExchangeKind::Technosphere, query)?;
    if matches.len() == 1 {
        return Ok(None);
    }

    let total: f64 = matches.iter().map(|ex| ex.amount).sum();
    for ex in &matches {
        debug!("  {} {} from {}", ex.name, ex.amount, ex.input);
    }
    let dominant = dominant_exchange(&matches).context("No exchanges to aggregate")?;
    info!(
        "Aggregating {} \"{}\" flows of activity {key} into one from {} (total {total})",
        matches.len(),
        dominant.name,
        dominant.input
    );

    let new_exchange = NewExchange {
        amount: total,
        comment: Some(AGGREGATION_COMMENT.to_string()),
        ..NewExchange::from(dominant)
    };
    let created = store.create_exchange(key, new_exchange)?;
    for ex in &matches {
        store.delete_exchange(ex.id)?;
    }

    Ok(Some(created))
}
