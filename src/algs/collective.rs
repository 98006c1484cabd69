//! Blocking all-gathers built on point-to-point messages.
//!
//! Every rank posts a receive for each peer, then sends its own payload to every
//! peer. All receive and send handles are drained before returning, even when a
//! payload turns out to be malformed, so a failed gather never leaves messages
//! behind for a later stage.
//!
//! Both gathers are collective: every rank of the communicator must call them in
//! the same order with the same tag.

use crate::algs::communicator::{CommTag, Communicator, Wait};
use crate::algs::wire::{WireIndex, cast_slice, decode_indices, encode_indices};
use crate::grid_error::GridError;
use std::mem::size_of;

/// Fixed-size all-gather: one `u64` per rank, result indexed by rank.
pub fn all_gather_p2p<C>(comm: &C, tag: CommTag, value: u64) -> Result<Vec<u64>, GridError>
where
    C: Communicator + ?Sized,
{
    let counts = vec![1; comm.size()];
    all_gather_varcount_p2p(comm, tag, &[value], &counts)
}

/// Fail when this rank's payload disagrees with the advertised counts.
pub fn check_local_count(rank: usize, local: &[u64], counts: &[usize]) -> Result<(), GridError> {
    match counts.get(rank) {
        Some(&n) if n == local.len() => Ok(()),
        Some(&n) => Err(GridError::InvalidArgument(format!(
            "rank {rank} contributes {} values but {n} were advertised",
            local.len()
        ))),
        None => Err(GridError::InvalidArgument(format!(
            "no count advertised for rank {rank} ({} counts)",
            counts.len()
        ))),
    }
}

/// Variable-size all-gather: rank `r` contributes `counts[r]` values; the result
/// is the concatenation in rank order.
pub fn all_gather_varcount_p2p<C>(
    comm: &C,
    tag: CommTag,
    local: &[u64],
    counts: &[usize],
) -> Result<Vec<u64>, GridError>
where
    C: Communicator + ?Sized,
{
    let me = comm.rank();
    let size = comm.size();
    if counts.len() != size {
        return Err(GridError::InvalidArgument(format!(
            "expected {size} counts, got {}",
            counts.len()
        )));
    }
    check_local_count(me, local, counts)?;

    // 1) post all receives; backends cut messages to the posted length, so one
    // spare record keeps an over-long payload from passing the exact-length check
    let mut pending_recvs = Vec::with_capacity(size.saturating_sub(1));
    for peer in (0..size).filter(|&p| p != me) {
        let mut buf = vec![0u8; (counts[peer] + 1) * size_of::<WireIndex>()];
        let h = comm.irecv(peer, tag.as_u16(), &mut buf);
        pending_recvs.push((peer, h));
    }

    // 2) post all sends; the encoded buffer outlives every send handle
    let payload = encode_indices(local);
    let mut pending_sends = Vec::with_capacity(size.saturating_sub(1));
    for peer in (0..size).filter(|&p| p != me) {
        pending_sends.push(comm.isend(peer, tag.as_u16(), cast_slice(&payload)));
    }

    // 3) wait for all recvs (but do not early-return)
    let mut parts: Vec<Option<Vec<u64>>> = vec![None; size];
    parts[me] = Some(local.to_vec());
    let mut maybe_err = None;
    for (peer, h) in pending_recvs {
        match h.wait() {
            Some(data) if maybe_err.is_none() => match decode_indices(&data, counts[peer]) {
                Ok(values) => parts[peer] = Some(values),
                Err(message) => {
                    maybe_err = Some(GridError::CommError {
                        neighbor: peer,
                        message,
                    })
                }
            },
            None if maybe_err.is_none() => {
                maybe_err = Some(GridError::CommError {
                    neighbor: peer,
                    message: format!("failed to receive payload from rank {peer}"),
                });
            }
            _ => {} // already have an error; just drain
        }
    }

    // 4) always drain all send handles before returning
    for send in pending_sends {
        let _ = send.wait();
    }

    if let Some(err) = maybe_err {
        return Err(err);
    }
    log::trace!(
        "rank {me}: all-gather on tag {:#06x} collected {} values",
        tag.as_u16(),
        counts.iter().sum::<usize>()
    );
    Ok(parts.into_iter().flatten().flatten().collect())
}
