//! # Relational Edit Commands
//!
//! One-to-many and many-to-many fields are written with ordered command
//! lists. This crate stages two of them locally:
//!
//! | Opcode | Command | Meaning |
//! |---|---|---|
//! | 3 | [`Command::Unlink`] | drop the link to an existing record |
//! | 4 | [`Command::Link`] | link an existing record |
//!
//! A [`CommandList`] never holds both a link and an unlink for the same id,
//! nor the same command twice: linking cancels a pending unlink and the
//! other way around.

use crate::ids::RecordId;
use serde::ser::SerializeTuple;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// A staged edit of a to-many field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Unlink(RecordId),
    Link(RecordId),
}

impl Command {
    pub fn opcode(self) -> u8 {
        match self {
            Command::Unlink(_) => 3,
            Command::Link(_) => 4,
        }
    }

    pub fn id(self) -> RecordId {
        match self {
            Command::Unlink(id) | Command::Link(id) => id,
        }
    }
}

/// Serialized as the `[opcode, id]` pair the server expects.
impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(&self.opcode())?;
        pair.serialize_element(&self.id())?;
        pair.end()
    }
}

/// Ordered list of staged link/unlink commands for one field of one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommandList(Vec<Command>);

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a link of `id`, cancelling a pending unlink of it.
    pub fn link(&mut self, id: RecordId) {
        self.0.retain(|&c| c != Command::Unlink(id));
        if !self.0.contains(&Command::Link(id)) {
            self.0.push(Command::Link(id));
        }
    }

    /// Stages an unlink of `id`, cancelling a pending link of it.
    pub fn unlink(&mut self, id: RecordId) {
        self.0.retain(|&c| c != Command::Link(id));
        if !self.0.contains(&Command::Unlink(id)) {
            self.0.push(Command::Unlink(id));
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `[[op, id], ...]` as sent in a `write` or `create` payload.
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.0
                .iter()
                .map(|c| Value::from(vec![Value::from(c.opcode()), Value::from(c.id())]))
                .collect(),
        )
    }
}

impl From<Vec<Command>> for CommandList {
    fn from(commands: Vec<Command>) -> Self {
        let mut list = CommandList::new();
        for command in commands {
            match command {
                Command::Link(id) => list.link(id),
                Command::Unlink(id) => list.unlink(id),
            }
        }
        list
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a Command;
    type IntoIter = std::slice::Iter<'a, Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
