use crate::rt::vv::VersionVec;

/// The kind of a shared-memory access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// The object was read.
    Read,
    /// The object was written.
    Write,
}

impl AccessKind {
    pub(crate) fn is_write(self) -> bool {
        matches!(self, AccessKind::Write)
    }
}

/// One recorded access: where on the path it happened, which thread performed
/// it, and the clocks observed at that point. Immutable once recorded.
#[derive(Debug, Clone)]
pub(crate) struct Access {
    path_id: usize,
    thread_id: usize,
    kind: AccessKind,
    dpor: VersionVec,
    causality: VersionVec,
}

impl Access {
    pub(crate) fn new(
        path_id: usize,
        thread_id: usize,
        kind: AccessKind,
        dpor: VersionVec,
        causality: VersionVec,
    ) -> Access {
        Access {
            path_id,
            thread_id,
            kind,
            dpor,
            causality,
        }
    }

    /// Index of the branch at which the access occurred.
    pub(crate) fn path_id(&self) -> usize {
        self.path_id
    }

    pub(crate) fn thread_id(&self) -> usize {
        self.thread_id
    }

    pub(crate) fn kind(&self) -> AccessKind {
        self.kind
    }

    pub(crate) fn dpor(&self) -> &VersionVec {
        &self.dpor
    }

    /// The access is ordered before `version` in scheduling causality.
    pub(crate) fn happens_before(&self, version: &VersionVec) -> bool {
        self.dpor <= *version
    }

    /// The access is ordered before `causality` by synchronization.
    pub(crate) fn synchronized_before(&self, causality: &VersionVec) -> bool {
        self.causality <= *causality
    }
}
