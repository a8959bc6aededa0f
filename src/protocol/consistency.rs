//! Consistency levels: the agreement threshold of a distributed request.
//!
//! On the wire a level is a terminal numeric element plus an optional
//! companion discriminant element in the surrounding message context.
//! An absent discriminant means quorum, whose value must be exactly
//! zero; that constraint is enforced at construction and validated again
//! on decode.

use crate::error::{ProtocolError, Result};
use crate::protocol::schema;
use crate::stream::format::UintFormat;
use crate::stream::writer::StreamingWriter;
use serde::{Deserialize, Serialize};
use std::io::Write;

const KIND_QUORUM: u64 = 0;
const KIND_COUNT: u64 = 1;
const KIND_PERCENT: u64 = 2;

/// Required agreement threshold for a distributed request.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    /// A majority of responsible nodes must agree.
    Quorum,
    /// At least this many nodes must agree.
    Count(u64),
    /// At least this percentage of nodes must agree.
    Percent(u64),
}

impl ConsistencyLevel {
    /// Reconstruct a level from its wire discriminant and value.
    ///
    /// The quorum discriminant must carry the literal value zero.
    pub fn from_parts(kind: u64, value: u64) -> Result<Self> {
        match kind {
            KIND_QUORUM if value == 0 => Ok(ConsistencyLevel::Quorum),
            KIND_QUORUM => Err(ProtocolError::InvalidConsistency(format!(
                "quorum must carry the value 0, got {value}"
            ))),
            KIND_COUNT => Ok(ConsistencyLevel::Count(value)),
            KIND_PERCENT => Ok(ConsistencyLevel::Percent(value)),
            other => Err(ProtocolError::InvalidConsistency(format!(
                "unknown consistency kind {other}"
            ))),
        }
    }

    pub fn kind(&self) -> u64 {
        match self {
            ConsistencyLevel::Quorum => KIND_QUORUM,
            ConsistencyLevel::Count(_) => KIND_COUNT,
            ConsistencyLevel::Percent(_) => KIND_PERCENT,
        }
    }

    pub fn value(&self) -> u64 {
        match self {
            ConsistencyLevel::Quorum => 0,
            ConsistencyLevel::Count(n) => *n,
            ConsistencyLevel::Percent(p) => *p,
        }
    }
}

/// Emit a level into the current message frame. The quorum discriminant
/// is left implicit.
pub(crate) fn encode_consistency<W: Write>(
    writer: &mut StreamingWriter<W>,
    level: ConsistencyLevel,
) -> Result<()> {
    if level.kind() != KIND_QUORUM {
        writer.write_value::<UintFormat>(&schema::CONSISTENCY_KIND, &level.kind())?;
    }
    writer.write_value::<UintFormat>(&schema::CONSISTENCY, &level.value())
}

/// Decode-side accumulator for the two consistency elements of a message.
#[derive(Default)]
pub(crate) struct ConsistencyParts {
    kind: Option<u64>,
    value: Option<u64>,
}

impl ConsistencyParts {
    pub fn set_kind(&mut self, kind: u64) {
        self.kind = Some(kind);
    }

    pub fn set_value(&mut self, value: u64) {
        self.value = Some(value);
    }

    pub fn finish(self, context: &'static str) -> Result<ConsistencyLevel> {
        let value = self.value.ok_or(ProtocolError::MissingElement {
            context,
            element: schema::CONSISTENCY.name,
        })?;
        ConsistencyLevel::from_parts(self.kind.unwrap_or(KIND_QUORUM), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quorum_must_be_zero() {
        assert_eq!(
            ConsistencyLevel::from_parts(0, 0).expect("quorum"),
            ConsistencyLevel::Quorum
        );
        assert!(matches!(
            ConsistencyLevel::from_parts(0, 3),
            Err(ProtocolError::InvalidConsistency(_))
        ));
    }

    #[test]
    fn count_and_percent_carry_any_value() {
        assert_eq!(
            ConsistencyLevel::from_parts(1, u64::MAX).expect("count"),
            ConsistencyLevel::Count(u64::MAX)
        );
        assert_eq!(
            ConsistencyLevel::from_parts(2, 250).expect("percent"),
            ConsistencyLevel::Percent(250)
        );
    }

    #[test]
    fn unknown_kind_rejected() {
        assert!(ConsistencyLevel::from_parts(9, 1).is_err());
    }

    #[test]
    fn missing_value_is_an_error() {
        let parts = ConsistencyParts::default();
        assert!(matches!(
            parts.finish("test"),
            Err(ProtocolError::MissingElement { .. })
        ));
    }
}
