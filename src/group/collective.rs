//! Collective operations
//!
//! Every function here must be called by all ranks of the group, in the same
//! order. The coordinator supplies the inputs that only it owns (`Some`),
//! other ranks pass `None`. Each call is a synchronization point: the
//! coordinator does not return until it has heard from or delivered to every
//! rank, and other ranks block until the coordinator reaches the same step.
//!
//! # Operations
//!
//! | Operation        | Coordinator gets        | Other ranks get      |
//! |------------------|-------------------------|----------------------|
//! | `broadcast`      | its own value           | coordinator's value  |
//! | `scatter`        | item 0                  | item `rank`          |
//! | `gather`         | `Some(all items)`       | `None`               |
//! | `reduce`         | `Some(folded value)`    | `None`               |
//! | `exclusive_scan` | identity                | fold of ranks `0..r` |
//! | `barrier`        | -                       | -                    |

use crate::group::{decode, encode, Transport, COORDINATOR};
use crate::reduce::{self, Combine};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

/// Publish the coordinator's value to every rank
pub fn broadcast<T, G>(group: &mut G, value: Option<T>) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    G: Transport + ?Sized,
{
    if group.is_coordinator() {
        let value = value.ok_or_else(|| anyhow::anyhow!("Coordinator must supply the broadcast value"))?;
        let frame = encode(&value)?;
        for rank in 1..group.size() {
            group.send(rank, frame.clone())?;
        }
        trace!(ranks = group.size(), "broadcast sent");
        Ok(value)
    } else {
        decode(&group.recv(COORDINATOR)?)
    }
}

/// Hand item `r` of the coordinator's list to rank `r`
pub fn scatter<T, G>(group: &mut G, items: Option<Vec<T>>) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    G: Transport + ?Sized,
{
    if group.is_coordinator() {
        let items = items.ok_or_else(|| anyhow::anyhow!("Coordinator must supply the scatter items"))?;
        if items.len() != group.size() {
            anyhow::bail!(
                "Scatter needs exactly one item per rank (got {}, group size {})",
                items.len(),
                group.size()
            );
        }

        let mut items = items.into_iter();
        let own = items
            .next()
            .ok_or_else(|| anyhow::anyhow!("Scatter item list is empty"))?;
        for (rank, item) in (1..).zip(items) {
            group.send(rank, encode(&item)?)?;
        }
        Ok(own)
    } else {
        decode(&group.recv(COORDINATOR)?)
    }
}

/// Collect one item from every rank at the coordinator, in rank order
pub fn gather<T, G>(group: &mut G, item: T) -> Result<Option<Vec<T>>>
where
    T: Serialize + DeserializeOwned,
    G: Transport + ?Sized,
{
    if group.is_coordinator() {
        let mut items = Vec::with_capacity(group.size());
        items.push(item);
        for rank in 1..group.size() {
            items.push(decode(&group.recv(rank)?)?);
        }
        Ok(Some(items))
    } else {
        group.send(COORDINATOR, encode(&item)?)?;
        Ok(None)
    }
}

/// Fold every rank's value at the coordinator in ascending rank order
pub fn reduce<C, G>(group: &mut G, value: C) -> Result<Option<C>>
where
    C: Combine + Serialize + DeserializeOwned,
    G: Transport + ?Sized,
{
    Ok(gather(group, value)?.map(reduce::fold_ranked))
}

/// Exclusive prefix scan: rank `r` receives the fold of ranks `0..r`
pub fn exclusive_scan<C, G>(group: &mut G, value: C) -> Result<C>
where
    C: Combine + Clone + Serialize + DeserializeOwned,
    G: Transport + ?Sized,
{
    let prefixes = gather(group, value)?.map(reduce::exclusive_scan);
    scatter(group, prefixes)
}

/// Block until every rank has reached this point
pub fn barrier<G: Transport + ?Sized>(group: &mut G) -> Result<()> {
    let arrived = gather(group, ())?;
    broadcast(group, arrived.map(|_| ()))
}
