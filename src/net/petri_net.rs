use std::fmt;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::net::ids::ObjectId;

/// The three net grammars understood by the exchange format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetFormat {
    HighLevel,
    Symmetric,
    PlaceTransition,
}

impl NetFormat {
    pub const ALL: [NetFormat; 3] = [
        NetFormat::HighLevel,
        NetFormat::Symmetric,
        NetFormat::PlaceTransition,
    ];

    pub fn uri(self) -> &'static str {
        match self {
            NetFormat::HighLevel => "http://www.pnml.org/version-2009/grammar/highlevelnet",
            NetFormat::Symmetric => "http://www.pnml.org/version-2009/grammar/symmetricnet",
            NetFormat::PlaceTransition => "http://www.pnml.org/version-2009/grammar/ptnet",
        }
    }
}

impl fmt::Display for NetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownNetFormat(pub String);

impl fmt::Display for UnknownNetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown net type '{}'", self.0)
    }
}

impl std::error::Error for UnknownNetFormat {}

impl FromStr for NetFormat {
    type Err = UnknownNetFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        NetFormat::ALL
            .into_iter()
            .find(|format| format.uri().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownNetFormat(s.to_owned()))
    }
}

/// 顶层 Petri 网：只能直接包含页面。
#[derive(Debug, Clone)]
pub struct PetriNet {
    pub(crate) id: ObjectId,
    pub(crate) name: Option<String>,
    pub format: NetFormat,
    pub(crate) names: IndexMap<String, ObjectId>,
    pub(crate) pages: IndexSet<ObjectId>,
}

impl PetriNet {
    pub fn new(id: impl Into<ObjectId>, format: NetFormat) -> Self {
        Self {
            id: id.into(),
            name: None,
            format,
            names: IndexMap::new(),
            pages: IndexSet::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn pages(&self) -> impl Iterator<Item = &ObjectId> {
        self.pages.iter()
    }

    pub fn count_name(&self, name: &str) -> usize {
        usize::from(self.names.contains_key(name))
    }

    pub(crate) fn insert_page(&mut self, id: ObjectId, name: Option<&str>) {
        if let Some(name) = name {
            self.names.insert(name.to_owned(), id.clone());
        }
        self.pages.insert(id);
    }
}
