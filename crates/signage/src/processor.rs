//! The file processor: the only holder of mutable proposal state.
//!
//! A [`FileProcessor`] is bound to one local [`Identity`]. It creates, loads
//! and saves proposal files, appends addenda and votes on behalf of that
//! identity, and exchanges patches with co-authors.
//!
//! Content anomalies never abort a load or merge. They are collected as
//! [`Issue`]s, logged, passed to the optional issue handler, and the proposal
//! stays loaded but untrusted.

use std::sync::Arc;

use bytes::Bytes;
use signage_core::frame::GENESIS_VALUE_BYTES;
use signage_core::{
    genesis_hash, random_array, same_principal, validate_chain, Author, Clock, Frame, FrameHash,
    Identity, Issue, Principal, Proposal, Reader, SystemClock,
};
use signage_crypt::ProposalKey;

use crate::config::ProcessorConfig;
use crate::error::{Result, SignageError};
use crate::format;

/// Callback receiving each issue as it is found.
pub type IssueHandler = Box<dyn FnMut(&Issue) + Send>;

struct LoadedProposal {
    proposal: Proposal,
    /// Arena index of the local identity, if it is an author.
    local: Option<u16>,
    genesis_value: [u8; GENESIS_VALUE_BYTES],
    genesis: FrameHash,
    key: ProposalKey,
    /// Arena index of each on-wire author index.
    wire_to_arena: Vec<Option<u16>>,
    /// Author records dropped on load.
    dropped: usize,
    /// Frames appended locally since the last save point.
    pending: Vec<Frame>,
    issues: Vec<Issue>,
}

impl LoadedProposal {
    fn local(&self) -> Result<u16> {
        self.local.ok_or(SignageError::IdentityNotAnAuthor)
    }

    /// The local author index, if the proposal may be written.
    fn writable(&self) -> Result<u16> {
        if self.dropped > 0 {
            return Err(SignageError::AuthorsDropped(self.dropped));
        }
        self.local()
    }

    fn arena_index(&self, wire: u16) -> Option<u16> {
        self.wire_to_arena.get(wire as usize).copied().flatten()
    }
}

/// Creates, reads, modifies and merges proposal files.
pub struct FileProcessor {
    identity: Identity,
    config: ProcessorConfig,
    clock: Arc<dyn Clock>,
    on_issue: Option<IssueHandler>,
    loaded: Option<LoadedProposal>,
}

impl FileProcessor {
    /// Create a processor for `identity` using the system clock.
    pub fn new(identity: Identity, config: ProcessorConfig) -> Self {
        Self {
            identity,
            config,
            clock: Arc::new(SystemClock),
            on_issue: None,
            loaded: None,
        }
    }

    /// Replace the clock used for frame timestamps and the future check.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Install a callback that receives every issue.
    pub fn with_issue_handler(mut self, handler: IssueHandler) -> Self {
        self.on_issue = Some(handler);
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Start a new proposal with the given authors.
    ///
    /// The local identity must be one of them.
    pub fn create_file(&mut self, authors: Vec<Author>) -> Result<()> {
        if authors.len() > u16::MAX as usize {
            return Err(SignageError::TooManyAuthors(authors.len()));
        }
        let proposal = Proposal::new(authors);
        let local = proposal
            .author_index(&self.identity)
            .ok_or(SignageError::IdentityNotAnAuthor)?;

        let genesis_value = random_array();
        tracing::info!(authors = proposal.authors.len(), "created proposal");
        let wire_to_arena = (0..proposal.authors.len() as u16).map(Some).collect();
        self.loaded = Some(LoadedProposal {
            proposal,
            local: Some(local),
            genesis: genesis_hash(&genesis_value),
            genesis_value,
            key: ProposalKey::generate(),
            wire_to_arena,
            dropped: 0,
            pending: Vec::new(),
            issues: Vec::new(),
        });
        Ok(())
    }

    /// Load a proposal file, replacing any loaded state.
    ///
    /// Fatal errors leave the previous state untouched.
    pub fn load_file(&mut self, bytes: &[u8]) -> Result<()> {
        let opened = format::open_file(&self.config.suite, bytes, &self.identity)?;
        let body = format::read_body(&opened.body, opened.author_count)?;
        let dropped = body.dropped_authors();

        let mut issues = body.issues;
        let authors = body.authors;
        let local = authors
            .iter()
            .position(|a| same_principal(a, &self.identity))
            .map(|i| i as u16);
        if local.is_none() {
            issues.push(Issue::LocalAuthorMissing);
        }

        let genesis = genesis_hash(&body.genesis_value);
        let report = validate_chain(genesis, &authors, body.frames, self.clock.now_millis());
        issues.extend(report.issues);

        tracing::info!(
            authors = authors.len(),
            dropped,
            frames = report.frames.len(),
            issues = issues.len(),
            "loaded proposal"
        );
        self.report(&issues);

        self.loaded = Some(LoadedProposal {
            proposal: Proposal {
                authors,
                frames: report.frames,
            },
            local,
            genesis_value: body.genesis_value,
            genesis,
            key: opened.key,
            wire_to_arena: body.wire_to_arena,
            dropped,
            pending: Vec::new(),
            issues,
        });
        Ok(())
    }

    /// Serialize and encrypt the loaded proposal.
    ///
    /// A proposal that dropped authors on load is read-only.
    pub fn save_file(&mut self) -> Result<Vec<u8>> {
        let loaded = self.loaded.as_mut().ok_or(SignageError::NotLoaded)?;
        let local = loaded.writable()?;

        let body = format::write_body(
            &mut loaded.proposal.authors,
            local as usize,
            &self.identity,
            &loaded.genesis_value,
            &loaded.proposal.frames,
        )?;
        let file = format::write_file(
            &self.config.suite,
            &loaded.key,
            &loaded.proposal.authors,
            &body,
        )?;
        tracing::debug!(bytes = file.len(), frames = loaded.proposal.frames.len(), "saved proposal");
        Ok(file)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Modification
    // ─────────────────────────────────────────────────────────────────────────

    /// Append an addendum followed by the author's implicit accept vote.
    ///
    /// Returns the addendum's hash.
    pub fn add_addendum(
        &mut self,
        title: &str,
        mime_type: &str,
        content: impl Into<Bytes>,
    ) -> Result<FrameHash> {
        let loaded = self.loaded.as_mut().ok_or(SignageError::NotLoaded)?;
        let local = loaded.writable()?;

        let prev = loaded.proposal.tip(loaded.genesis);
        let frame = Frame::addendum(
            prev,
            self.clock.now_millis(),
            local,
            title,
            mime_type,
            content,
        )?;
        let hash = frame.hash;
        tracing::debug!(%hash, title, "added addendum");
        loaded.proposal.frames.push(frame.clone());
        loaded.pending.push(frame);

        self.add_vote(true)?;
        Ok(hash)
    }

    /// Vote on the most recent addendum. Returns the vote's hash.
    pub fn add_vote(&mut self, accept: bool) -> Result<FrameHash> {
        let loaded = self.loaded.as_mut().ok_or(SignageError::NotLoaded)?;
        let local = loaded.writable()?;

        let target = loaded
            .proposal
            .last_addendum()
            .map(|f| f.hash)
            .ok_or(SignageError::NoAddendum)?;
        let already = loaded
            .proposal
            .frames
            .iter()
            .any(|f| f.author == local && f.vote_target() == Some(target));
        if already {
            return Err(SignageError::AlreadyVoted);
        }

        let frame = Frame::vote(
            loaded.proposal.tip(loaded.genesis),
            self.clock.now_millis(),
            local,
            target,
            accept,
            self.identity.signing(),
        )?;

        let mut author = loaded.proposal.authors[local as usize].clone();
        author.record_vote()?;
        author.attest(&self.identity)?;
        loaded.proposal.authors[local as usize] = author;

        let hash = frame.hash;
        tracing::debug!(%hash, %target, accept, "added vote");
        loaded.proposal.frames.push(frame.clone());
        loaded.pending.push(frame);
        Ok(hash)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Patches
    // ─────────────────────────────────────────────────────────────────────────

    /// Export the local author and every pending frame as a patch.
    pub fn export_changes(&mut self) -> Result<Vec<u8>> {
        let loaded = self.loaded.as_mut().ok_or(SignageError::NotLoaded)?;
        let local = loaded.writable()? as usize;
        format::write_patch(
            &loaded.key,
            &mut loaded.proposal.authors[local],
            &self.identity,
            &loaded.pending,
        )
    }

    /// Export the local author and the last `count` frames as a patch.
    pub fn export_frames(&mut self, count: usize) -> Result<Vec<u8>> {
        let loaded = self.loaded.as_mut().ok_or(SignageError::NotLoaded)?;
        let local = loaded.writable()? as usize;
        let frames = &loaded.proposal.frames;
        let tail = &frames[frames.len().saturating_sub(count)..];
        format::write_patch(
            &loaded.key,
            &mut loaded.proposal.authors[local],
            &self.identity,
            tail,
        )
    }

    /// Merge a co-author's patch into the loaded proposal.
    ///
    /// The patch author must already be an author (matched by signing key);
    /// its record replaces the stored one when the attestation is valid. The
    /// union of old and new frames is re-validated.
    ///
    /// Nothing changes until the whole patch has been decoded, so a fatal
    /// error leaves the loaded proposal untouched.
    pub fn import_patch_set(&mut self, bytes: &[u8]) -> Result<()> {
        let loaded = self.loaded.as_mut().ok_or(SignageError::NotLoaded)?;
        let plain = loaded
            .key
            .decrypt(bytes)
            .map_err(|_| SignageError::PatchDecryption)?;

        let mut r = Reader::new(&plain);
        let unverified = Author::read_unverified(&mut r)?;
        let signing_key = unverified.author().signing_public_key();
        let index = loaded
            .proposal
            .authors
            .iter()
            .position(|a| a.signing_public_key() == signing_key)
            .ok_or(SignageError::UnknownPatchAuthor)?;

        let mut issues = Vec::new();
        let replacement = match unverified.verify() {
            Ok(()) => Some(unverified.into_author()),
            Err(_) => {
                let a = unverified.author();
                issues.push(Issue::InvalidAuthor {
                    name: a.name().to_owned(),
                    mail: a.mail().to_owned(),
                });
                None
            }
        };

        // The replacement keeps the signing key, so frames verify against
        // the stored arena
        let incoming = format::read_frames(
            &mut r,
            &loaded.proposal.authors,
            |wire| loaded.arena_index(wire),
            &mut issues,
        )?;
        let received = incoming.len();

        if let Some(author) = replacement {
            loaded.proposal.authors[index] = author;
        }

        let mut candidates = std::mem::take(&mut loaded.proposal.frames);
        candidates.extend(incoming);
        let report = validate_chain(
            loaded.genesis,
            &loaded.proposal.authors,
            candidates,
            self.clock.now_millis(),
        );
        loaded.proposal.frames = report.frames;
        issues.extend(report.issues);

        tracing::info!(
            author = index,
            frames = received,
            issues = issues.len(),
            "imported patch"
        );
        loaded.issues.extend(issues.iter().cloned());
        self.report(&issues);
        Ok(())
    }

    /// Number of frames appended locally since the last [`clear_changes`](Self::clear_changes).
    pub fn changes_count(&self) -> usize {
        self.loaded.as_ref().map_or(0, |l| l.pending.len())
    }

    /// Forget the pending frames, marking the current state as a save point.
    pub fn clear_changes(&mut self) {
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.pending.clear();
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn proposal(&self) -> Option<&Proposal> {
        self.loaded.as_ref().map(|l| &l.proposal)
    }

    /// The local identity's author record in the loaded proposal.
    pub fn local_author(&self) -> Option<&Author> {
        let loaded = self.loaded.as_ref()?;
        loaded.proposal.author(loaded.local?)
    }

    /// Genesis hash of the loaded proposal.
    pub fn genesis(&self) -> Option<FrameHash> {
        self.loaded.as_ref().map(|l| l.genesis)
    }

    /// Issues found since the proposal was created or loaded.
    pub fn issues(&self) -> &[Issue] {
        self.loaded.as_ref().map_or(&[][..], |l| l.issues.as_slice())
    }

    /// Whether a proposal is loaded without any issue.
    pub fn is_trusted(&self) -> bool {
        self.loaded.as_ref().is_some_and(|l| l.issues.is_empty())
    }

    fn report(&mut self, issues: &[Issue]) {
        for issue in issues {
            tracing::warn!(%issue, "proposal issue");
            if let Some(handler) = self.on_issue.as_mut() {
                handler(issue);
            }
        }
    }
}
