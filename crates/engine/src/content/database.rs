use std::collections::BTreeMap;

/// Per-level id namespace: which gates, chests and breakables a level owns,
/// and which enemies are tracked individually across saves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelDescriptor {
    pub level: u32,
    pub gates: Vec<String>,
    pub chests: Vec<String>,
    pub breakables: Vec<String>,
    pub unique_actors: Vec<String>,
}

impl LevelDescriptor {
    pub fn empty(level: u32) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn is_unique_actor(&self, vn_id: &str) -> bool {
        self.unique_actors.iter().any(|id| id == vn_id)
    }
}

#[derive(Debug, Default, Clone)]
pub struct LevelDescriptorDatabase {
    descriptors: BTreeMap<u32, LevelDescriptor>,
}

impl LevelDescriptorDatabase {
    pub(crate) fn from_descriptors(descriptors: impl IntoIterator<Item = LevelDescriptor>) -> Self {
        Self {
            descriptors: descriptors
                .into_iter()
                .map(|descriptor| (descriptor.level, descriptor))
                .collect(),
        }
    }

    pub fn descriptor(&self, level: u32) -> Option<&LevelDescriptor> {
        self.descriptors.get(&level)
    }

    pub fn levels(&self) -> impl Iterator<Item = u32> + '_ {
        self.descriptors.keys().copied()
    }

    pub fn is_unique_actor(&self, level: u32, vn_id: &str) -> bool {
        self.descriptor(level)
            .is_some_and(|descriptor| descriptor.is_unique_actor(vn_id))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
