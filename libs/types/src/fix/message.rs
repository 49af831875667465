//! Decoded FIX message representation
//!
//! Messages are field maps plus repeating groups keyed by their NoXxx count
//! tag. Field order is not preserved: encoding to the wire is the engine's
//! job, the rendering here is only for logs.

use super::{tags, MessageRejectError, MsgType, Tag};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Tag/value fields with nested repeating groups
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    fields: BTreeMap<Tag, String>,
    groups: BTreeMap<Tag, Vec<FieldMap>>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value
    pub fn set(&mut self, tag: Tag, value: impl Into<String>) -> &mut Self {
        self.fields.insert(tag, value.into());
        self
    }

    /// Builder form of [`FieldMap::set`]
    pub fn with(mut self, tag: Tag, value: impl Into<String>) -> Self {
        self.set(tag, value);
        self
    }

    pub fn get(&self, tag: Tag) -> Option<&str> {
        self.fields.get(&tag).map(String::as_str)
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.fields.contains_key(&tag)
    }

    pub fn remove(&mut self, tag: Tag) -> Option<String> {
        self.fields.remove(&tag)
    }

    /// Get a field that must be present and non-empty
    pub fn require(&self, tag: Tag) -> Result<&str, MessageRejectError> {
        match self.get(tag) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(MessageRejectError::required_tag_missing(tag)),
        }
    }

    /// Parse an optional field
    ///
    /// Absent fields yield `Ok(None)`; present but unparseable fields are an
    /// IncorrectDataFormat reject.
    pub fn parse<T: FromStr>(&self, tag: Tag) -> Result<Option<T>, MessageRejectError> {
        match self.get(tag) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|_| MessageRejectError::incorrect_data_format(tag, raw)),
        }
    }

    /// Append one entry to the repeating group counted by `count_tag`
    pub fn add_group(&mut self, count_tag: Tag, entry: FieldMap) -> &mut Self {
        self.groups.entry(count_tag).or_default().push(entry);
        self
    }

    /// Builder form of [`FieldMap::add_group`]
    pub fn with_group(mut self, count_tag: Tag, entry: FieldMap) -> Self {
        self.add_group(count_tag, entry);
        self
    }

    /// Entries of a repeating group; empty when the group is absent
    pub fn group(&self, count_tag: Tag) -> &[FieldMap] {
        self.groups
            .get(&count_tag)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.groups.is_empty()
    }

    fn write_fields(&self, f: &mut fmt::Formatter<'_>, first: &mut bool) -> fmt::Result {
        for (tag, value) in &self.fields {
            write_separator(f, first)?;
            write!(f, "{}={}", tag, value)?;
        }
        for (count_tag, entries) in &self.groups {
            write_separator(f, first)?;
            write!(f, "{}={}", count_tag, entries.len())?;
            for entry in entries {
                entry.write_fields(f, first)?;
            }
        }
        Ok(())
    }
}

fn write_separator(f: &mut fmt::Formatter<'_>, first: &mut bool) -> fmt::Result {
    if *first {
        *first = false;
        Ok(())
    } else {
        f.write_str("|")
    }
}

/// A FIX message as seen at the engine callback boundary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    pub header: FieldMap,
    pub body: FieldMap,
}

impl Message {
    /// Create an empty message of the given type
    pub fn new(msg_type: MsgType) -> Self {
        let mut header = FieldMap::new();
        header.set(tags::MSG_TYPE, msg_type.as_str());
        Self {
            header,
            body: FieldMap::new(),
        }
    }

    /// MsgType (35) from the header
    pub fn msg_type(&self) -> MsgType {
        MsgType::from(self.header.get(tags::MSG_TYPE).unwrap_or_default())
    }

    pub fn is_admin(&self) -> bool {
        self.msg_type().is_admin()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        self.header.write_fields(f, &mut first)?;
        self.body.write_fields(f, &mut first)
    }
}
