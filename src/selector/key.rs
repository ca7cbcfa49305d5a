use std::fmt;

/// What an operation does to the data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    Read,
    /// Safe to replay: the server applies it at most once per generation
    WriteRetryable,
    WriteNonRetryable,
}

/// How many records an operation addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationShape {
    /// Selector wildcard, never part of a concrete key
    Any,
    Point,
    Batch,
    Query,
}

/// Namespace consistency regime the operation runs under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConsistencyMode {
    /// Selector wildcard, never part of a concrete key
    Any,
    /// AP
    Availability,
    /// CP
    Consistency,
}

impl OperationKind {
    pub fn is_write(self) -> bool {
        !matches!(self, OperationKind::Read)
    }
}

/// Fully concrete (kind, shape, mode) triple addressing one row of a
/// resolution matrix. Only valid combinations can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationKey {
    kind: OperationKind,
    shape: OperationShape,
    mode: ConsistencyMode,
}

/// Number of rows in every resolution matrix
pub const KEY_COUNT: usize = 14;

impl OperationKey {
    /// The fixed key space: reads over point/batch/query, writes over
    /// point/batch, each under both consistency modes.
    pub const ALL: [OperationKey; KEY_COUNT] = [
        OperationKey::raw(OperationKind::Read, OperationShape::Point, ConsistencyMode::Availability),
        OperationKey::raw(OperationKind::Read, OperationShape::Point, ConsistencyMode::Consistency),
        OperationKey::raw(OperationKind::Read, OperationShape::Batch, ConsistencyMode::Availability),
        OperationKey::raw(OperationKind::Read, OperationShape::Batch, ConsistencyMode::Consistency),
        OperationKey::raw(OperationKind::Read, OperationShape::Query, ConsistencyMode::Availability),
        OperationKey::raw(OperationKind::Read, OperationShape::Query, ConsistencyMode::Consistency),
        OperationKey::raw(OperationKind::WriteRetryable, OperationShape::Point, ConsistencyMode::Availability),
        OperationKey::raw(OperationKind::WriteRetryable, OperationShape::Point, ConsistencyMode::Consistency),
        OperationKey::raw(OperationKind::WriteRetryable, OperationShape::Batch, ConsistencyMode::Availability),
        OperationKey::raw(OperationKind::WriteRetryable, OperationShape::Batch, ConsistencyMode::Consistency),
        OperationKey::raw(OperationKind::WriteNonRetryable, OperationShape::Point, ConsistencyMode::Availability),
        OperationKey::raw(OperationKind::WriteNonRetryable, OperationShape::Point, ConsistencyMode::Consistency),
        OperationKey::raw(OperationKind::WriteNonRetryable, OperationShape::Batch, ConsistencyMode::Availability),
        OperationKey::raw(OperationKind::WriteNonRetryable, OperationShape::Batch, ConsistencyMode::Consistency),
    ];

    const fn raw(
        kind: OperationKind,
        shape: OperationShape,
        mode: ConsistencyMode,
    ) -> Self {
        Self { kind, shape, mode }
    }

    /// Returns `None` for wildcards and for combinations outside the key
    /// space (e.g. a write query).
    pub fn new(
        kind: OperationKind,
        shape: OperationShape,
        mode: ConsistencyMode,
    ) -> Option<Self> {
        let key = Self::raw(kind, shape, mode);
        key.index().map(|_| key)
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn shape(&self) -> OperationShape {
        self.shape
    }

    pub fn mode(&self) -> ConsistencyMode {
        self.mode
    }

    /// Row of this key in a resolution matrix
    pub fn index(&self) -> Option<usize> {
        let kind_base = match self.kind {
            OperationKind::Read => 0,
            OperationKind::WriteRetryable => 6,
            OperationKind::WriteNonRetryable => 10,
        };
        let shape_offset = match (self.kind, self.shape) {
            (_, OperationShape::Point) => 0,
            (_, OperationShape::Batch) => 2,
            (OperationKind::Read, OperationShape::Query) => 4,
            _ => return None,
        };
        let mode_offset = match self.mode {
            ConsistencyMode::Availability => 0,
            ConsistencyMode::Consistency => 1,
            ConsistencyMode::Any => return None,
        };
        Some(kind_base + shape_offset + mode_offset)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            OperationKind::Read => f.write_str("read"),
            OperationKind::WriteRetryable => f.write_str("write_retryable"),
            OperationKind::WriteNonRetryable => f.write_str("write_non_retryable"),
        }
    }
}

impl fmt::Display for OperationShape {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            OperationShape::Any => f.write_str("any"),
            OperationShape::Point => f.write_str("point"),
            OperationShape::Batch => f.write_str("batch"),
            OperationShape::Query => f.write_str("query"),
        }
    }
}

impl fmt::Display for ConsistencyMode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ConsistencyMode::Any => f.write_str("any"),
            ConsistencyMode::Availability => f.write_str("ap"),
            ConsistencyMode::Consistency => f.write_str("cp"),
        }
    }
}

impl fmt::Display for OperationKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.shape, self.mode)
    }
}
