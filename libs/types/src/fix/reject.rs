//! Typed reject results returned to the engine from inbound callbacks

use super::Tag;
use thiserror::Error;

/// Why an inbound message was rejected, as SessionRejectReason (373)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// 373=1
    RequiredTagMissing,
    /// 373=5
    ValueIsIncorrect,
    /// 373=6
    IncorrectDataFormat,
}

impl RejectReason {
    /// Numeric code carried on the wire
    pub fn code(self) -> u32 {
        match self {
            RejectReason::RequiredTagMissing => 1,
            RejectReason::ValueIsIncorrect => 5,
            RejectReason::IncorrectDataFormat => 6,
        }
    }
}

/// Reject result handed back to the engine's standard reject mechanism
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{text} (reason {code}, tag {ref_tag:?})", code = .reason.code())]
pub struct MessageRejectError {
    /// Reject category
    pub reason: RejectReason,
    /// Offending tag, when one can be named
    pub ref_tag: Option<Tag>,
    /// Human readable explanation (sent as Text (58))
    pub text: String,
}

impl MessageRejectError {
    pub fn new(reason: RejectReason, ref_tag: Option<Tag>, text: impl Into<String>) -> Self {
        Self {
            reason,
            ref_tag,
            text: text.into(),
        }
    }

    pub fn required_tag_missing(tag: Tag) -> Self {
        Self::new(
            RejectReason::RequiredTagMissing,
            Some(tag),
            "Required tag missing",
        )
    }

    pub fn value_is_incorrect(tag: Tag, text: impl Into<String>) -> Self {
        Self::new(RejectReason::ValueIsIncorrect, Some(tag), text)
    }

    pub fn incorrect_data_format(tag: Tag, value: &str) -> Self {
        Self::new(
            RejectReason::IncorrectDataFormat,
            Some(tag),
            format!("Incorrect data format for value '{}'", value),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fix::tags;

    #[test]
    fn test_reject_codes() {
        let missing = MessageRejectError::required_tag_missing(tags::SYMBOL);
        assert_eq!(missing.reason.code(), 1);
        assert_eq!(missing.ref_tag, Some(55));

        let incorrect = MessageRejectError::value_is_incorrect(tags::MD_ENTRY_PX, "crossed");
        assert_eq!(incorrect.reason.code(), 5);
        assert_eq!(incorrect.text, "crossed");
    }

    #[test]
    fn test_display_names_tag() {
        let err = MessageRejectError::incorrect_data_format(tags::MD_ENTRY_PX, "abc");
        let rendered = err.to_string();
        assert!(rendered.contains("'abc'"));
        assert!(rendered.contains("270"));
    }
}
