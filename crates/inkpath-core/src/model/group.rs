//! Groups of entities.

use super::{EntityId, EntityRef};
use kurbo::{Affine, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A member of a group, looked up in the matching document collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupChild {
    Path(EntityId),
    Text(EntityId),
    Image(EntityId),
    SymbolUse(EntityId),
    Group(EntityId),
}

impl GroupChild {
    pub fn id(self) -> EntityId {
        match self {
            GroupChild::Path(id)
            | GroupChild::Text(id)
            | GroupChild::Image(id)
            | GroupChild::SymbolUse(id)
            | GroupChild::Group(id) => id,
        }
    }

    /// The selectable entity this child corresponds to. Paths are selected
    /// through their subpaths, so they have none.
    pub fn entity_ref(self) -> Option<EntityRef> {
        match self {
            GroupChild::Path(_) => None,
            GroupChild::Text(id) => Some(EntityRef::text(id)),
            GroupChild::Image(id) => Some(EntityRef::image(id)),
            GroupChild::SymbolUse(id) => Some(EntityRef::symbol_use(id)),
            GroupChild::Group(id) => Some(EntityRef::group(id)),
        }
    }
}

/// A group of entities sharing a transform.
///
/// Children are references into the document collections, so the same entity
/// may in principle appear in several groups. Bounds depend on the children
/// and are computed by the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub(crate) id: EntityId,
    pub children: Vec<GroupChild>,
    #[serde(default = "identity")]
    pub transform: Affine,
}

fn identity() -> Affine {
    Affine::IDENTITY
}

impl Group {
    pub fn new(children: Vec<GroupChild>) -> Self {
        Self {
            id: Uuid::new_v4(),
            children,
            transform: Affine::IDENTITY,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Whether `child` is a direct member of this group.
    pub fn contains(&self, child: GroupChild) -> bool {
        self.children.contains(&child)
    }

    /// Direct child groups.
    pub fn child_groups(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.children.iter().filter_map(|c| match c {
            GroupChild::Group(id) => Some(*id),
            _ => None,
        })
    }

    /// Compose a translation on top of the current transform.
    pub fn translate(&mut self, delta: Vec2) {
        self.transform = Affine::translate(delta) * self.transform;
    }
}
