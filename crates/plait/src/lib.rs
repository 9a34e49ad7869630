//! # Plait
//!
//! Index-chain toolkit for intrusive linked lists threaded through arenas.
//!
//! A plait chain is any sequence of arena slots connected by a "next index"
//! relation: the caller supplies the head and an accessor closure, and this
//! crate supplies the traversal machinery. Because the chains live inside
//! fixed arenas that are persisted and exchanged between machines, they can
//! arrive damaged — a slot pointing back into the chain, two chains sharing
//! a tail. Everything here is written to survive that:
//!
//! - [`scan`]: Floyd's tortoise/hare cycle detection in constant extra space
//! - [`collect`]: bounded materialization of a chain into a `Vec`
//! - [`reachable`]: membership bitmap of every slot a head can reach
//!
//! The accessor-closure seam keeps the toolkit independent of any particular
//! link representation: a doubly linked list, a singly linked bucket chain,
//! and a free list all repair through the same three functions.
//!
//! ## Example
//!
//! ```
//! use plait::{scan, Scan};
//!
//! // 0 -> 1 -> 2 -> (end)
//! let next = [Some(1), Some(2), None];
//! assert_eq!(scan(Some(0), |i| next[i]), Scan::Clean { len: 3 });
//!
//! // 0 -> 1 -> 2 -> 1 ... the hare laps the tortoise inside the loop
//! let next = [Some(1), Some(2), Some(1)];
//! assert!(matches!(scan(Some(0), |i| next[i]), Scan::Cyclic { .. }));
//! ```

/// Outcome of scanning a chain for structural soundness.
///
/// A chain is either a simple linear run ending at a terminator, or it
/// eventually re-enters itself. For cyclic chains the reported slot is the
/// meeting point of the two cursors, which is guaranteed to lie on the
/// cycle — cutting that slot's next link breaks the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// The chain terminates; `len` slots were traversed.
    Clean {
        /// Number of slots between the head and the terminator, inclusive.
        len: usize,
    },
    /// The chain re-enters itself.
    Cyclic {
        /// A slot known to lie on the cycle.
        meet: usize,
    },
}

/// Detects whether the chain starting at `head` is acyclic.
///
/// Classic two-cursor detection: the fast cursor advances two links per
/// step, the slow cursor one. If the fast cursor reaches the terminator the
/// chain is clean; if the cursors ever collide, the collision slot lies on
/// a cycle. Runs in O(n) time and O(1) space regardless of chain shape.
///
/// The accessor must be pure for the duration of the scan. Out-of-range
/// protection is the caller's job: the closure is the place to map a
/// corrupt index to `None`.
#[must_use]
pub fn scan<F>(head: Option<usize>, next: F) -> Scan
where
    F: Fn(usize) -> Option<usize>,
{
    let Some(start) = head else {
        return Scan::Clean { len: 0 };
    };

    let mut slow = start;
    let mut fast = start;
    loop {
        let Some(step) = next(fast) else { break };
        let Some(leap) = next(step) else { break };
        // The fast cursor is ahead, so the slow cursor's next always exists.
        slow = next(slow).expect("slow cursor fell off a chain the fast cursor traversed");
        fast = leap;
        if slow == fast {
            return Scan::Cyclic { meet: slow };
        }
    }

    let mut len = 1;
    let mut cursor = start;
    while let Some(n) = next(cursor) {
        cursor = n;
        len += 1;
    }
    Scan::Clean { len }
}

/// Materializes up to `limit` slots of the chain starting at `head`.
///
/// Stops at the terminator or after `limit` slots, whichever comes first,
/// so it is safe to call on a chain that has not been scanned yet: a cyclic
/// chain simply fills the budget and stops.
#[must_use]
pub fn collect<F>(head: Option<usize>, next: F, limit: usize) -> Vec<usize>
where
    F: Fn(usize) -> Option<usize>,
{
    let mut out = Vec::new();
    let mut cursor = head;
    while let Some(slot) = cursor {
        if out.len() >= limit {
            break;
        }
        out.push(slot);
        cursor = next(slot);
    }
    out
}

/// Marks every slot reachable from `head` in a bitmap of `universe` slots.
///
/// Traversal stops on the terminator, on a slot outside the universe, or on
/// a slot already marked — the last rule makes the walk terminate even on a
/// cyclic chain, so this does not require a prior [`scan`].
#[must_use]
pub fn reachable<F>(head: Option<usize>, next: F, universe: usize) -> Vec<bool>
where
    F: Fn(usize) -> Option<usize>,
{
    let mut marked = vec![false; universe];
    let mut cursor = head;
    while let Some(slot) = cursor {
        if slot >= universe || marked[slot] {
            break;
        }
        marked[slot] = true;
        cursor = next(slot);
    }
    marked
}
