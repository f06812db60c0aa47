//! In-memory property graph
//!
//! Backs the CLI and the test-suite. Relationship endpoints are typed by the
//! relationship label, so a user and an interest may share an id.

use anyhow::{Context, Result};
use async_trait::async_trait;
use recommender_core::{
    AdapterError, AdapterResult, EntityId, EntityKind, EntityRef, GraphStore, RelationshipFeature,
    RelationshipKind, StoreKind,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

/// `blocker` never sees `blocked`, and the other way round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub blocker: EntityId,
    pub blocked: EntityId,
}

/// Serializable dump of the social graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub users: Vec<EntityId>,
    #[serde(default)]
    pub posts: Vec<EntityId>,
    #[serde(default)]
    pub threads: Vec<EntityId>,
    #[serde(default)]
    pub relationships: Vec<RelationshipFeature>,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl GraphSnapshot {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read graph snapshot: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid graph snapshot JSON in {}", path.display()))
    }

    pub fn entity(mut self, kind: EntityKind, id: &str) -> Self {
        let id = EntityId::from(id);
        let list = match kind {
            EntityKind::User => &mut self.users,
            EntityKind::Post => &mut self.posts,
            EntityKind::Thread => &mut self.threads,
        };
        if !list.contains(&id) {
            list.push(id);
        }
        self
    }

    pub fn users(self, ids: &[&str]) -> Self {
        ids.iter().fold(self, |snapshot, id| snapshot.entity(EntityKind::User, id))
    }

    pub fn posts(self, ids: &[&str]) -> Self {
        ids.iter().fold(self, |snapshot, id| snapshot.entity(EntityKind::Post, id))
    }

    pub fn threads(self, ids: &[&str]) -> Self {
        ids.iter().fold(self, |snapshot, id| snapshot.entity(EntityKind::Thread, id))
    }

    pub fn relate(mut self, source: &str, target: &str, kind: RelationshipKind) -> Self {
        self.relationships
            .push(RelationshipFeature::new(source, target, kind));
        self
    }

    pub fn block(mut self, blocker: &str, blocked: &str) -> Self {
        self.blocks.push(Block {
            blocker: blocker.into(),
            blocked: blocked.into(),
        });
        self
    }
}

/// Read-only graph store over a [`GraphSnapshot`]
#[derive(Debug)]
pub struct InMemoryGraphStore {
    relationships: Vec<RelationshipFeature>,
    incident: HashMap<EntityRef, Vec<usize>>,
    entities: HashMap<EntityKind, BTreeSet<EntityId>>,
    blocked: HashMap<EntityId, HashSet<EntityId>>,
}

impl InMemoryGraphStore {
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Self {
        let mut entities: HashMap<EntityKind, BTreeSet<EntityId>> = HashMap::new();
        entities.insert(EntityKind::User, snapshot.users.into_iter().collect());
        entities.insert(EntityKind::Post, snapshot.posts.into_iter().collect());
        entities.insert(EntityKind::Thread, snapshot.threads.into_iter().collect());

        let mut incident: HashMap<EntityRef, Vec<usize>> = HashMap::new();
        for (index, edge) in snapshot.relationships.iter().enumerate() {
            for kind in edge.kind.source_kinds() {
                incident
                    .entry(EntityRef::new(*kind, edge.source.clone()))
                    .or_default()
                    .push(index);
            }
            for kind in edge.kind.target_kinds() {
                incident
                    .entry(EntityRef::new(*kind, edge.target.clone()))
                    .or_default()
                    .push(index);
            }
        }

        let mut blocked: HashMap<EntityId, HashSet<EntityId>> = HashMap::new();
        for block in snapshot.blocks {
            blocked
                .entry(block.blocker.clone())
                .or_default()
                .insert(block.blocked.clone());
            blocked.entry(block.blocked).or_default().insert(block.blocker);
        }

        Self {
            relationships: snapshot.relationships,
            incident,
            entities,
            blocked,
        }
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.entities
            .get(&entity.kind)
            .map(|ids| ids.contains(&entity.id))
            .unwrap_or(false)
    }

    pub fn entity_count(&self, kind: EntityKind) -> usize {
        self.entities.get(&kind).map(BTreeSet::len).unwrap_or(0)
    }

    fn outgoing(&self, entity: &EntityRef, kinds: &[RelationshipKind]) -> HashSet<EntityId> {
        self.incident
            .get(entity)
            .into_iter()
            .flatten()
            .map(|index| &self.relationships[*index])
            .filter(|edge| kinds.contains(&edge.kind) && edge.source == entity.id)
            .map(|edge| edge.target.clone())
            .collect()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn query_relationships(
        &self,
        entity: &EntityRef,
        kinds: &HashSet<RelationshipKind>,
    ) -> AdapterResult<HashSet<RelationshipFeature>> {
        if !self.contains(entity) {
            return Err(AdapterError::not_found(
                StoreKind::Graph,
                entity.kind,
                &entity.id,
            ));
        }

        Ok(self
            .incident
            .get(entity)
            .into_iter()
            .flatten()
            .map(|index| &self.relationships[*index])
            .filter(|edge| kinds.contains(&edge.kind))
            .cloned()
            .collect())
    }

    async fn query_exclusions(
        &self,
        requester: &EntityRef,
        target_kind: EntityKind,
    ) -> AdapterResult<HashSet<EntityId>> {
        if !self.contains(requester) {
            return Err(AdapterError::not_found(
                StoreKind::Graph,
                requester.kind,
                &requester.id,
            ));
        }

        let mut excluded = match target_kind {
            EntityKind::User => {
                let mut ids = self.outgoing(requester, &[RelationshipKind::Follows]);
                if let Some(blocked) = self.blocked.get(&requester.id) {
                    ids.extend(blocked.iter().cloned());
                }
                ids
            }
            EntityKind::Post => self.outgoing(
                requester,
                &[RelationshipKind::Likes, RelationshipKind::CommentedOn],
            ),
            EntityKind::Thread => self.outgoing(requester, &[RelationshipKind::MemberOf]),
        };

        if requester.kind == target_kind {
            excluded.insert(requester.id.clone());
        }

        Ok(excluded)
    }

    async fn list_candidates(
        &self,
        target_kind: EntityKind,
        limit: Option<usize>,
    ) -> AdapterResult<Vec<EntityId>> {
        let ids = self.entities.get(&target_kind).into_iter().flatten().cloned();
        Ok(match limit {
            Some(limit) => ids.take(limit).collect(),
            None => ids.collect(),
        })
    }
}
