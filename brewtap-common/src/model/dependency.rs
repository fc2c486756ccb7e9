use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DependencyTag: u8 {
        const RUNTIME     = 0b00000001;
        const BUILD       = 0b00000010;
        const TEST        = 0b00000100;
        const OPTIONAL    = 0b00001000;
        const RECOMMENDED = 0b00010000;
    }
}

const TAG_NAMES: [(&str, DependencyTag); 5] = [
    ("runtime", DependencyTag::RUNTIME),
    ("build", DependencyTag::BUILD),
    ("test", DependencyTag::TEST),
    ("optional", DependencyTag::OPTIONAL),
    ("recommended", DependencyTag::RECOMMENDED),
];

impl Default for DependencyTag {
    fn default() -> Self {
        Self::RUNTIME
    }
}

impl DependencyTag {
    pub fn names(&self) -> Vec<&'static str> {
        TAG_NAMES
            .iter()
            .filter(|(_, tag)| self.contains(*tag))
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn from_tag_name(name: &str) -> Option<Self> {
        TAG_NAMES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, tag)| *tag)
    }
}

impl fmt::Display for DependencyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(", "))
    }
}

// Formula files spell tags the way Homebrew's `depends_on "go" => :build` does: a list of names.
impl Serialize for DependencyTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.names().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DependencyTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        let mut tags = DependencyTag::empty();
        for name in &names {
            let tag = DependencyTag::from_tag_name(name).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown dependency tag '{name}'"))
            })?;
            tags |= tag;
        }
        if tags.is_empty() {
            tags = DependencyTag::RUNTIME;
        }
        Ok(tags)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    #[serde(default)]
    pub tags: DependencyTag,
}

impl Dependency {
    pub fn new_runtime(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: DependencyTag::RUNTIME,
        }
    }

    pub fn new_with_tags(name: impl Into<String>, tags: DependencyTag) -> Self {
        Self {
            name: name.into(),
            tags,
        }
    }
}

pub trait DependencyExt {
    fn filter_by_tags(&self, include: DependencyTag, exclude: DependencyTag) -> Vec<&Dependency>;
    fn runtime(&self) -> Vec<&Dependency>;
    fn build_time(&self) -> Vec<&Dependency>;
}

impl DependencyExt for [Dependency] {
    fn filter_by_tags(&self, include: DependencyTag, exclude: DependencyTag) -> Vec<&Dependency> {
        self.iter()
            .filter(|dep| dep.tags.contains(include) && !dep.tags.intersects(exclude))
            .collect()
    }

    fn runtime(&self) -> Vec<&Dependency> {
        // Build-only and test-only dependencies are gone once the keg exists.
        self.iter()
            .filter(|dep| {
                dep.tags.intersects(
                    DependencyTag::RUNTIME | DependencyTag::RECOMMENDED | DependencyTag::OPTIONAL,
                )
            })
            .collect()
    }

    fn build_time(&self) -> Vec<&Dependency> {
        self.filter_by_tags(DependencyTag::BUILD, DependencyTag::empty())
    }
}
