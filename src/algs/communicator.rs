//! Thin façade over intra-process (threads) or inter-process (MPI) message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees).
//! Point-to-point handles are **waitable**; the collectives used during grid
//! construction are provided methods built on top of them, which a backend with
//! native collectives may override.

use crate::algs::collective;
use crate::grid_error::GridError;
use bytes::Bytes;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;

/// Typed message tag. Each construction stage uses its own tag so stages never
/// consume each other's messages.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(pub u16);

impl CommTag {
    pub const fn new(tag: u16) -> Self {
        Self(tag)
    }

    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Tag `n` slots after this one.
    pub const fn offset(self, n: u16) -> Self {
        Self(self.0.wrapping_add(n))
    }
}

/// Tags used by the two collectives of grid construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GridCommTags {
    /// All-gather of the owned volume of every rank.
    pub volumes: CommTag,
    /// All-gather of the natural indices of every owned entry.
    pub natural: CommTag,
}

impl GridCommTags {
    /// Consecutive tags starting at `base`.
    pub const fn from_base(base: CommTag) -> Self {
        Self {
            volumes: base,
            natural: base.offset(1),
        }
    }
}

impl Default for GridCommTags {
    fn default() -> Self {
        Self::from_base(CommTag::new(0xDA30))
    }
}

/// Message passing interface used by the construction collectives.
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// Rank of this process.
    fn rank(&self) -> usize;
    /// Number of participating processes.
    fn size(&self) -> usize;

    /// Blocking all-gather of one value per rank, indexed by rank.
    fn all_gather(&self, tag: CommTag, value: u64) -> Result<Vec<u64>, GridError> {
        collective::all_gather_p2p(self, tag, value)
    }

    /// Blocking all-gather of `counts[r]` values from every rank `r`,
    /// concatenated in rank order.
    fn all_gather_varcount(
        &self,
        tag: CommTag,
        local: &[u64],
        counts: &[usize],
    ) -> Result<Vec<u64>, GridError> {
        collective::all_gather_varcount_p2p(self, tag, local, counts)
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

/// Compile-time no-op comm for pure serial use: a world of one rank.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) -> Self::SendHandle {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) -> Self::RecvHandle {}

    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }
}

// --- RayonComm: intra-process / multi-thread ---
type Key = (usize, usize, u16); // (src, dst, tag)
type Mailbox = DashMap<Key, VecDeque<Bytes>>;

/// Receive handle for [`RayonComm`]; the message is pulled from the shared
/// mailbox on `wait` and cut to the length of the posted buffer.
pub struct LocalHandle {
    mailbox: Arc<Mailbox>,
    key: Key,
    len: usize,
}

impl Wait for LocalHandle {
    fn wait(self) -> Option<Vec<u8>> {
        loop {
            if let Some(mut queue) = self.mailbox.get_mut(&self.key) {
                if let Some(bytes) = queue.pop_front() {
                    let n = self.len.min(bytes.len());
                    return Some(bytes[..n].to_vec());
                }
            }
            std::thread::yield_now();
        }
    }
}

/// One rank of an in-process world. Every rank of the world shares a mailbox;
/// messages between a pair of ranks on a tag are delivered in FIFO order.
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
    mailbox: Arc<Mailbox>,
}

impl RayonComm {
    /// Create all `size` ranks of a fresh world.
    pub fn world(size: usize) -> Vec<RayonComm> {
        let mailbox = Arc::new(Mailbox::new());
        (0..size)
            .map(|rank| RayonComm {
                rank,
                size,
                mailbox: Arc::clone(&mailbox),
            })
            .collect()
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        let key = (self.rank, peer, tag);
        self.mailbox
            .entry(key)
            .or_default()
            .push_back(Bytes::copy_from_slice(buf));
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle {
        LocalHandle {
            mailbox: Arc::clone(&self.mailbox),
            key: (peer, self.rank, tag),
            len: buf.len(),
        }
    }

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{CommTag, Communicator, GridError, Wait, collective};
    use mpi::Count;
    use mpi::datatype::PartitionMut;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::Communicator as _;
    use mpi::traits::{CommunicatorCollectives, Destination, Source};

    /// World communicator backend. MPI must be initialized before construction.
    ///
    /// Point-to-point sends are eager (blocking); the collectives go straight to
    /// the native MPI all-gathers.
    #[derive(Clone, Debug)]
    pub struct MpiComm {
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        pub fn new() -> Self {
            let world = SimpleCommunicator::world();
            Self {
                rank: world.rank() as usize,
                size: world.size() as usize,
            }
        }
    }

    impl Default for MpiComm {
        fn default() -> Self {
            Self::new()
        }
    }

    pub struct MpiRecvHandle {
        peer: usize,
        tag: u16,
        len: usize,
    }

    impl Wait for MpiRecvHandle {
        fn wait(self) -> Option<Vec<u8>> {
            let world = SimpleCommunicator::world();
            let (mut msg, _status) = world
                .process_at_rank(self.peer as i32)
                .receive_vec_with_tag::<u8>(self.tag as i32);
            msg.truncate(self.len);
            Some(msg)
        }
    }

    impl Communicator for MpiComm {
        type SendHandle = ();
        type RecvHandle = MpiRecvHandle;

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
            let world = SimpleCommunicator::world();
            world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, tag as i32);
        }

        fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> MpiRecvHandle {
            MpiRecvHandle {
                peer,
                tag,
                len: buf.len(),
            }
        }

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn all_gather(&self, _tag: CommTag, value: u64) -> Result<Vec<u64>, GridError> {
            let world = SimpleCommunicator::world();
            let mut out = vec![0u64; self.size];
            world.all_gather_into(&value, &mut out[..]);
            Ok(out)
        }

        fn all_gather_varcount(
            &self,
            _tag: CommTag,
            local: &[u64],
            counts: &[usize],
        ) -> Result<Vec<u64>, GridError> {
            collective::check_local_count(self.rank, local, counts)?;
            let world = SimpleCommunicator::world();
            let counts_c: Vec<Count> = counts.iter().map(|&c| c as Count).collect();
            let displs: Vec<Count> = counts_c
                .iter()
                .scan(0 as Count, |acc, &c| {
                    let d = *acc;
                    *acc += c;
                    Some(d)
                })
                .collect();
            let mut out = vec![0u64; counts.iter().sum()];
            {
                let mut partition = PartitionMut::new(&mut out[..], &counts_c[..], &displs[..]);
                world.all_gather_varcount_into(local, &mut partition);
            }
            Ok(out)
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rayon_roundtrip_two_ranks() {
        let world = RayonComm::world(2);
        let (comm0, comm1) = (&world[0], &world[1]);

        let mut recv_buf = [0u8; 4];
        let recv_handle = comm1.irecv(0, 7, &mut recv_buf);
        let send_handle = comm0.isend(1, 7, &[1, 2, 3, 4]);
        send_handle.wait();

        let data = recv_handle
            .wait()
            .expect("Expected to receive data from rank 0");
        recv_buf.copy_from_slice(&data);
        assert_eq!(&recv_buf, &[1, 2, 3, 4]);
    }

    #[test]
    fn rayon_fifo_order() {
        let world = RayonComm::world(2);
        for i in 0..10u8 {
            world[0].isend(1, 3, &[i]);
        }
        let mut out = Vec::new();
        for _ in 0..10 {
            let mut b = [0u8; 1];
            let h = world[1].irecv(0, 3, &mut b);
            out.push(h.wait().unwrap()[0]);
        }
        assert_eq!(out, (0u8..10u8).collect::<Vec<_>>());
    }

    #[test]
    fn worlds_do_not_share_mailboxes() {
        let a = RayonComm::world(2);
        let b = RayonComm::world(2);
        a[0].isend(1, 1, &[9]);
        b[0].isend(1, 1, &[5]);
        let mut buf = [0u8; 1];
        assert_eq!(b[1].irecv(0, 1, &mut buf).wait().unwrap(), vec![5]);
        assert_eq!(a[1].irecv(0, 1, &mut buf).wait().unwrap(), vec![9]);
    }

    #[test]
    fn no_comm_is_a_world_of_one() {
        let comm = NoComm;
        assert_eq!(comm.rank(), 0);
        assert_eq!(comm.size(), 1);
        assert_eq!(comm.all_gather(CommTag::new(1), 42).unwrap(), vec![42]);
    }

    #[test]
    fn grid_tags_are_distinct() {
        let tags = GridCommTags::from_base(CommTag::new(0x100));
        assert_eq!(tags.volumes.as_u16(), 0x100);
        assert_eq!(tags.natural.as_u16(), 0x101);
        assert_ne!(GridCommTags::default().volumes, GridCommTags::default().natural);
    }

    #[test]
    fn commtag_offsets() {
        let t = CommTag::new(0xABCD);
        assert_eq!(t.as_u16(), 0xABCD);
        assert_eq!(t.offset(2).as_u16(), 0xABCF);
    }
}
