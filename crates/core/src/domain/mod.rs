//! Domain models for the recommender

use crate::errors::{RecommendError, RecommendResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identifier of an entity, unique within its kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "validation", derive(schemars::JsonSchema))]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Kinds of entities the engine can recommend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "validation", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Post,
    Thread,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::User, EntityKind::Post, EntityKind::Thread];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Post => "post",
            EntityKind::Thread => "thread",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = RecommendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "users" => Ok(EntityKind::User),
            "post" | "posts" => Ok(EntityKind::Post),
            "thread" | "threads" => Ok(EntityKind::Thread),
            other => Err(RecommendError::configuration(format!(
                "unknown entity kind '{}'",
                other
            ))),
        }
    }
}

/// Reference to one entity in the graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: EntityId,
}

impl EntityRef {
    pub fn new(kind: EntityKind, id: impl Into<EntityId>) -> Self {
        Self { kind, id: id.into() }
    }

    pub fn user(id: impl Into<EntityId>) -> Self {
        Self::new(EntityKind::User, id)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Relationship labels of the social property graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "validation", derive(schemars::JsonSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipKind {
    Follows,
    InterestedBy,
    HasKey,
    Likes,
    CommentedOn,
    MemberOf,
}

impl RelationshipKind {
    pub const ALL: [RelationshipKind; 6] = [
        RelationshipKind::Follows,
        RelationshipKind::InterestedBy,
        RelationshipKind::HasKey,
        RelationshipKind::Likes,
        RelationshipKind::CommentedOn,
        RelationshipKind::MemberOf,
    ];

    /// Label as stored in the graph
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipKind::Follows => "FOLLOWS",
            RelationshipKind::InterestedBy => "INTERESTED_BY",
            RelationshipKind::HasKey => "HAS_KEY",
            RelationshipKind::Likes => "LIKES",
            RelationshipKind::CommentedOn => "COMMENTED_ON",
            RelationshipKind::MemberOf => "MEMBER_OF",
        }
    }

    /// Entity kinds allowed as the source of this relationship
    pub fn source_kinds(&self) -> &'static [EntityKind] {
        match self {
            RelationshipKind::HasKey => &[EntityKind::Post, EntityKind::Thread],
            _ => &[EntityKind::User],
        }
    }

    /// Entity kinds allowed as the target; empty when the target is an interest/key node
    pub fn target_kinds(&self) -> &'static [EntityKind] {
        match self {
            RelationshipKind::Follows => &[EntityKind::User],
            RelationshipKind::Likes | RelationshipKind::CommentedOn => &[EntityKind::Post],
            RelationshipKind::MemberOf => &[EntityKind::Thread],
            RelationshipKind::InterestedBy | RelationshipKind::HasKey => &[],
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipKind {
    type Err = RecommendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        RelationshipKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| {
                RecommendError::configuration(format!("unknown relationship kind '{}'", s))
            })
    }
}

/// Which endpoint of a relationship is collected relative to the queried entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "validation", derive(schemars::JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Entity is the source, collect targets
    Outgoing,
    /// Entity is the target, collect sources
    Incoming,
}

/// One typed edge of the graph, produced per query and never persisted
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipFeature {
    pub source: EntityId,
    pub target: EntityId,
    pub kind: RelationshipKind,
}

impl RelationshipFeature {
    pub fn new(
        source: impl Into<EntityId>,
        target: impl Into<EntityId>,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }

    /// Opposite endpoint when `entity` sits on the side described by `direction`
    pub fn other_end(&self, entity: &EntityId, direction: Direction) -> Option<&EntityId> {
        match direction {
            Direction::Outgoing if &self.source == entity => Some(&self.target),
            Direction::Incoming if &self.target == entity => Some(&self.source),
            _ => None,
        }
    }
}

/// Non-negative weights per relationship kind or subscore name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "validation", derive(schemars::JsonSchema))]
#[serde(transparent)]
pub struct WeightVector(BTreeMap<String, f64>);

impl WeightVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.0.insert(name.into(), weight);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, weight: f64) -> Option<f64> {
        self.0.insert(name.into(), weight)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, weight)| (name.as_str(), *weight))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// At least one strictly positive weight, none negative or non-finite
    pub fn validate(&self) -> RecommendResult<()> {
        for (name, weight) in self.iter() {
            if !weight.is_finite() {
                return Err(RecommendError::configuration(format!(
                    "weight '{}' is not finite ({})",
                    name, weight
                )));
            }
            if weight < 0.0 {
                return Err(RecommendError::configuration(format!(
                    "weight '{}' is negative ({})",
                    name, weight
                )));
            }
        }

        if !self.iter().any(|(_, weight)| weight > 0.0) {
            return Err(RecommendError::configuration(
                "weight vector has no strictly positive entry",
            ));
        }

        Ok(())
    }
}

impl FromIterator<(String, f64)> for WeightVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<(&'a str, f64)> for WeightVector {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, weight)| (name.to_string(), weight))
                .collect(),
        )
    }
}

/// Fixed-length numeric representation of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn zeros(dimension: usize) -> Self {
        Self(vec![0.0; dimension])
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    pub fn magnitude(&self) -> f64 {
        self.0
            .iter()
            .map(|v| f64::from(*v) * f64::from(*v))
            .sum::<f64>()
            .sqrt()
    }

    /// No NaN or infinite component
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// One ranked candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEntity {
    pub id: EntityId,
    pub score: f64,
}

/// Candidates sorted by descending score, ties by ascending id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    items: Vec<ScoredEntity>,
}

impl RankedResult {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Order `scores`, skip `offset` entries and keep at most `top_k`
    pub fn rank(scores: Vec<(EntityId, f64)>, offset: usize, top_k: usize) -> Self {
        let mut items: Vec<ScoredEntity> = scores
            .into_iter()
            .map(|(id, score)| ScoredEntity { id, score })
            .collect();

        items.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));

        let items = items.into_iter().skip(offset).take(top_k).collect();
        Self { items }
    }

    pub fn items(&self) -> &[ScoredEntity] {
        &self.items
    }

    pub fn ids(&self) -> Vec<&EntityId> {
        self.items.iter().map(|item| &item.id).collect()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.items.iter().any(|item| &item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<ScoredEntity> {
        self.items
    }
}

impl IntoIterator for RankedResult {
    type Item = ScoredEntity;
    type IntoIter = std::vec::IntoIter<ScoredEntity>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Per-request knobs supplied by the API layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendOptions {
    /// Maximum number of results; configured default when absent
    pub top_k: Option<usize>,
    /// Number of ranked entries skipped before `top_k` is applied
    #[serde(default)]
    pub offset: usize,
    /// Replaces the strategy's default weights for this request
    pub weights: Option<WeightVector>,
}

impl RecommendOptions {
    pub fn top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn weights(mut self, weights: WeightVector) -> Self {
        self.weights = Some(weights);
        self
    }
}
