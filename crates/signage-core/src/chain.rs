//! Proposal chains and their integrity rules.
//!
//! A proposal is an author arena plus a list of frames. [`validate_chain`]
//! orders the frames by walking parent links from the genesis hash and then
//! checks every rule, collecting all violations instead of stopping at the
//! first.

use std::collections::{HashMap, HashSet};

use crate::error::Issue;
use crate::frame::{Frame, GENESIS_TIMESTAMP};
use crate::identity::{same_principal, Author, Principal};
use crate::types::FrameHash;

/// Authors and frames of one proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proposal {
    /// Author arena. Frames refer to authors by position.
    pub authors: Vec<Author>,
    /// Frames in chain order.
    pub frames: Vec<Frame>,
}

impl Proposal {
    pub fn new(authors: Vec<Author>) -> Self {
        Self {
            authors,
            frames: Vec::new(),
        }
    }

    /// Hash of the last frame, or `genesis` for an empty chain.
    pub fn tip(&self, genesis: FrameHash) -> FrameHash {
        self.frames.last().map_or(genesis, |f| f.hash)
    }

    /// The most recent addendum.
    pub fn last_addendum(&self) -> Option<&Frame> {
        self.frames.iter().rev().find(|f| f.is_addendum())
    }

    /// Arena index of the author matching `principal`.
    pub fn author_index(&self, principal: &(impl Principal + ?Sized)) -> Option<u16> {
        self.authors
            .iter()
            .position(|a| same_principal(a, principal))
            .and_then(|i| u16::try_from(i).ok())
    }

    pub fn author(&self, index: u16) -> Option<&Author> {
        self.authors.get(index as usize)
    }
}

/// Ordered frames plus every rule violation found.
#[derive(Debug, Clone, Default)]
pub struct ChainReport {
    pub frames: Vec<Frame>,
    pub issues: Vec<Issue>,
}

impl ChainReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Order frames by parent linkage.
///
/// Walks from `genesis`, at each step taking the first not-yet-visited frame
/// (in input order) whose `prev` is the current tip. Frames the walk never
/// reaches are appended in input order. Returns the ordering and the number of
/// frames reached by the walk.
pub fn order_frames(genesis: FrameHash, frames: Vec<Frame>) -> (Vec<Frame>, usize) {
    let mut children: HashMap<FrameHash, Vec<usize>> = HashMap::new();
    for (i, f) in frames.iter().enumerate() {
        children.entry(f.prev).or_default().push(i);
    }

    let mut visited = vec![false; frames.len()];
    let mut order = Vec::with_capacity(frames.len());
    let mut tip = genesis;

    loop {
        let next = children
            .get(&tip)
            .and_then(|c| c.iter().copied().find(|&i| !visited[i]));
        match next {
            Some(i) => {
                visited[i] = true;
                order.push(i);
                tip = frames[i].hash;
            }
            None => break,
        }
    }

    let reached = order.len();
    order.extend((0..frames.len()).filter(|&i| !visited[i]));

    let mut slots: Vec<Option<Frame>> = frames.into_iter().map(Some).collect();
    let ordered = order.into_iter().filter_map(|i| slots[i].take()).collect();
    (ordered, reached)
}

/// Order `frames` and run every integrity rule against them.
///
/// `authors` is the arena the frames index into; `now` is the current time in
/// milliseconds.
pub fn validate_chain(
    genesis: FrameHash,
    authors: &[Author],
    frames: Vec<Frame>,
    now: i64,
) -> ChainReport {
    let (frames, reached) = order_frames(genesis, frames);
    let mut issues = Vec::new();

    if !is_linear(genesis, &frames) || reached != frames.len() {
        issues.push(Issue::ChainNotLinear);
    }

    check_timestamps(&frames, now, &mut issues);
    check_votes(&frames, authors, &mut issues);
    check_vote_counts(&frames, authors, &mut issues);
    check_finality(&frames, authors.len(), &mut issues);

    ChainReport { frames, issues }
}

/// No self-links, distinct hashes, and exactly one hash (the tip) left
/// unclaimed as someone's predecessor.
fn is_linear(genesis: FrameHash, frames: &[Frame]) -> bool {
    if frames.iter().any(|f| f.prev == f.hash) {
        return false;
    }

    let mut unclaimed: HashSet<FrameHash> = HashSet::with_capacity(frames.len() + 1);
    unclaimed.insert(genesis);
    for f in frames {
        if !unclaimed.insert(f.hash) {
            return false;
        }
    }

    for f in frames {
        unclaimed.remove(&f.prev);
    }
    unclaimed.len() == 1
}

fn check_timestamps(frames: &[Frame], now: i64, issues: &mut Vec<Issue>) {
    let mut last = GENESIS_TIMESTAMP;
    for f in frames {
        if f.timestamp < last {
            issues.push(Issue::TimestampsNotAscending { frame: f.hash });
        } else {
            last = f.timestamp;
        }
    }

    if let Some(tip) = frames.last() {
        if tip.timestamp >= now {
            issues.push(Issue::ChainEndsInFuture {
                timestamp: tip.timestamp,
                now,
            });
        }
    }
}

fn check_votes(frames: &[Frame], authors: &[Author], issues: &mut Vec<Issue>) {
    let addenda: HashSet<FrameHash> = frames
        .iter()
        .filter(|f| f.is_addendum())
        .map(|f| f.hash)
        .collect();
    let mut voted: HashSet<FrameHash> = HashSet::new();
    let mut ballots = HashSet::new();

    for f in frames {
        let Some(target) = f.vote_target() else {
            continue;
        };
        if !addenda.contains(&target) {
            issues.push(Issue::VoteTargetMissing {
                vote: f.hash,
                target,
            });
        }
        voted.insert(target);

        let voter = authors
            .get(f.author as usize)
            .map(|a| a.signing_public_key());
        if !ballots.insert((target, voter)) {
            issues.push(Issue::DoubleVote {
                target,
                author: f.author,
            });
        }
    }

    for f in frames.iter().filter(|f| f.is_addendum()) {
        if !voted.contains(&f.hash) {
            issues.push(Issue::AddendumNotVoted { addendum: f.hash });
        }
    }
}

fn check_vote_counts(frames: &[Frame], authors: &[Author], issues: &mut Vec<Issue>) {
    let mut actual = vec![0u32; authors.len()];
    for f in frames.iter().filter(|f| f.is_vote()) {
        if let Some(n) = actual.get_mut(f.author as usize) {
            *n += 1;
        }
    }

    for (i, (author, &actual)) in authors.iter().zip(&actual).enumerate() {
        if author.vote_count() != actual {
            issues.push(Issue::VoteCountMismatch {
                author: i as u16,
                declared: author.vote_count(),
                actual,
            });
        }
    }
}

/// Once every author has accepted the current addendum the chain is closed.
fn check_finality(frames: &[Frame], author_count: usize, issues: &mut Vec<Issue>) {
    let mut accepts = 0usize;
    let mut current = None;
    for (i, f) in frames.iter().enumerate() {
        if f.is_addendum() {
            accepts = 0;
            current = Some(f.hash);
        } else if f.is_accept() {
            accepts += 1;
            if accepts == author_count && i + 1 != frames.len() {
                issues.push(Issue::FrameAfterFinality {
                    addendum: current.unwrap_or(FrameHash::ZERO),
                });
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SigningKeypair;
    use crate::frame::genesis_hash;
    use crate::identity::Identity;

    const NOW: i64 = 1_700_000_100_000;
    const T0: i64 = 1_700_000_000_000;

    struct Fixture {
        genesis: FrameHash,
        ids: Vec<Identity>,
        authors: Vec<Author>,
    }

    impl Fixture {
        fn new(n: usize) -> Self {
            let ids: Vec<Identity> = (0..n)
                .map(|i| Identity::create(format!("p{i}"), format!("p{i}@example.org"), None))
                .collect();
            let authors = ids.iter().map(|id| id.to_author().unwrap()).collect();
            Self {
                genesis: genesis_hash(&[9u8; 32]),
                ids,
                authors,
            }
        }

        fn signer(&self, author: u16) -> &SigningKeypair {
            self.ids[author as usize].signing()
        }

        fn addendum(&self, prev: FrameHash, ts: i64, author: u16, title: &str) -> Frame {
            Frame::addendum(prev, ts, author, title, "text/plain", &b"body"[..]).unwrap()
        }

        fn vote(&mut self, prev: FrameHash, ts: i64, author: u16, target: FrameHash, accept: bool) -> Frame {
            self.authors[author as usize].record_vote().unwrap();
            Frame::vote(prev, ts, author, target, accept, self.signer(author)).unwrap()
        }
    }

    #[test]
    fn test_valid_chain_reordered() {
        let mut fx = Fixture::new(2);
        let a = fx.addendum(fx.genesis, T0, 0, "first");
        let v1 = fx.vote(a.hash, T0 + 1, 0, a.hash, true);
        let v2 = fx.vote(v1.hash, T0 + 2, 1, a.hash, false);
        let b = fx.addendum(v2.hash, T0 + 3, 1, "second");
        let v3 = fx.vote(b.hash, T0 + 4, 1, b.hash, true);

        let shuffled = vec![v3.clone(), b.clone(), v1.clone(), a.clone(), v2.clone()];
        let report = validate_chain(fx.genesis, &fx.authors, shuffled, NOW);
        assert!(report.is_clean(), "{:?}", report.issues);
        assert_eq!(report.frames, vec![a, v1, v2, b, v3]);
    }

    #[test]
    fn test_fork_not_linear() {
        let mut fx = Fixture::new(2);
        let a = fx.addendum(fx.genesis, T0, 0, "first");
        let v1 = fx.vote(a.hash, T0 + 1, 0, a.hash, false);
        let v2 = fx.vote(a.hash, T0 + 1, 1, a.hash, false);

        let report = validate_chain(fx.genesis, &fx.authors, vec![a, v1, v2], NOW);
        assert!(report.issues.contains(&Issue::ChainNotLinear));
    }

    #[test]
    fn test_detached_cycle_not_linear() {
        let mut fx = Fixture::new(1);
        let a = fx.addendum(fx.genesis, T0, 0, "first");
        let v = fx.vote(a.hash, T0 + 1, 0, a.hash, true);
        // Two frames whose prev links point at each other's hash cannot be
        // produced honestly, so forge them directly.
        let x = FrameHash::from_bytes([1u8; 32]);
        let y = FrameHash::from_bytes([2u8; 32]);
        let mut fx_frame = fx.addendum(y, T0, 0, "x");
        fx_frame.hash = x;
        let mut fy_frame = fx.addendum(x, T0, 0, "y");
        fy_frame.hash = y;

        let (_, reached) = order_frames(fx.genesis, vec![a.clone(), v.clone(), fx_frame.clone(), fy_frame.clone()]);
        assert_eq!(reached, 2);

        let report = validate_chain(fx.genesis, &fx.authors, vec![a, v, fx_frame, fy_frame], NOW);
        assert!(report.issues.contains(&Issue::ChainNotLinear));
    }

    #[test]
    fn test_timestamps_and_future() {
        let mut fx = Fixture::new(2);
        let a = fx.addendum(fx.genesis, T0, 0, "first");
        let v1 = fx.vote(a.hash, T0 - 5, 0, a.hash, true);
        let v2 = fx.vote(v1.hash, NOW + 10, 1, a.hash, true);

        let report = validate_chain(fx.genesis, &fx.authors, vec![a, v1.clone(), v2], NOW);
        assert!(report
            .issues
            .contains(&Issue::TimestampsNotAscending { frame: v1.hash }));
        assert!(report.issues.contains(&Issue::ChainEndsInFuture {
            timestamp: NOW + 10,
            now: NOW
        }));
    }

    #[test]
    fn test_equal_timestamps_allowed() {
        let mut fx = Fixture::new(1);
        let a = fx.addendum(fx.genesis, T0, 0, "first");
        let v = fx.vote(a.hash, T0, 0, a.hash, true);
        let report = validate_chain(fx.genesis, &fx.authors, vec![a, v], NOW);
        assert!(report.is_clean(), "{:?}", report.issues);
    }

    #[test]
    fn test_double_vote_and_count_mismatch() {
        let mut fx = Fixture::new(3);
        let a = fx.addendum(fx.genesis, T0, 0, "first");
        let v1 = fx.vote(a.hash, T0 + 1, 0, a.hash, true);
        let v2 = fx.vote(v1.hash, T0 + 2, 0, a.hash, false);
        // Author 1 claims a vote that is not in the chain
        fx.authors[1].record_vote().unwrap();

        let report = validate_chain(fx.genesis, &fx.authors, vec![a.clone(), v1, v2], NOW);
        assert!(report.issues.contains(&Issue::DoubleVote {
            target: a.hash,
            author: 0
        }));
        assert!(report.issues.contains(&Issue::VoteCountMismatch {
            author: 1,
            declared: 1,
            actual: 0
        }));
    }

    #[test]
    fn test_unvoted_addendum_and_missing_target() {
        let mut fx = Fixture::new(2);
        let a = fx.addendum(fx.genesis, T0, 0, "first");
        let bogus = FrameHash::from_bytes([0xee; 32]);
        let v = fx.vote(a.hash, T0 + 1, 1, bogus, true);

        let report = validate_chain(fx.genesis, &fx.authors, vec![a.clone(), v.clone()], NOW);
        assert!(report
            .issues
            .contains(&Issue::AddendumNotVoted { addendum: a.hash }));
        assert!(report.issues.contains(&Issue::VoteTargetMissing {
            vote: v.hash,
            target: bogus
        }));
    }

    #[test]
    fn test_frame_after_finality() {
        let mut fx = Fixture::new(2);
        let a = fx.addendum(fx.genesis, T0, 0, "first");
        let v1 = fx.vote(a.hash, T0 + 1, 0, a.hash, true);
        let v2 = fx.vote(v1.hash, T0 + 2, 1, a.hash, true);

        let closed = validate_chain(fx.genesis, &fx.authors, vec![a.clone(), v1.clone(), v2.clone()], NOW);
        assert!(closed.is_clean(), "{:?}", closed.issues);

        let b = fx.addendum(v2.hash, T0 + 3, 1, "late");
        let v3 = fx.vote(b.hash, T0 + 4, 1, b.hash, true);
        let report = validate_chain(fx.genesis, &fx.authors, vec![a.clone(), v1, v2, b, v3], NOW);
        assert_eq!(report.issues, vec![Issue::FrameAfterFinality { addendum: a.hash }]);
    }

    #[test]
    fn test_rejection_keeps_chain_open() {
        let mut fx = Fixture::new(2);
        let a = fx.addendum(fx.genesis, T0, 0, "first");
        let v1 = fx.vote(a.hash, T0 + 1, 0, a.hash, true);
        let v2 = fx.vote(v1.hash, T0 + 2, 1, a.hash, false);
        let b = fx.addendum(v2.hash, T0 + 3, 1, "revised");
        let v3 = fx.vote(b.hash, T0 + 4, 1, b.hash, true);

        let report = validate_chain(fx.genesis, &fx.authors, vec![a, v1, v2, b, v3], NOW);
        assert!(report.is_clean(), "{:?}", report.issues);
    }

    #[test]
    fn test_proposal_helpers() {
        let mut fx = Fixture::new(2);
        let mut proposal = Proposal::new(fx.authors.clone());
        assert_eq!(proposal.tip(fx.genesis), fx.genesis);
        assert!(proposal.last_addendum().is_none());
        assert_eq!(proposal.author_index(&fx.ids[1]), Some(1));

        let a = fx.addendum(fx.genesis, T0, 0, "first");
        let v = fx.vote(a.hash, T0 + 1, 0, a.hash, true);
        proposal.frames = vec![a.clone(), v.clone()];
        assert_eq!(proposal.tip(fx.genesis), v.hash);
        assert_eq!(proposal.last_addendum(), Some(&a));
    }
}
