//! Association edges between tables.

use super::TableId;

/// Target side of a has-one / has-many association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependent {
    pub target: TableId,
    /// Column on the target holding the owner id. For polymorphic
    /// associations this is `parent_id`.
    pub foreign_key: String,
    /// The target records the owner's type in `parent_type`.
    pub polymorphic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Association {
    /// The owner holds `foreign_key` pointing at the target. Never cascades.
    BelongsTo { target: TableId, foreign_key: String },
    HasOne(Dependent),
    HasMany(Dependent),
    /// Many-to-many through the join table `through`.
    HasAndBelongsToMany {
        target: TableId,
        through: String,
        /// Join column referencing the owner.
        foreign_key: String,
        /// Join column referencing the target.
        association_key: String,
    },
}

impl Association {
    pub fn kind(&self) -> &'static str {
        match self {
            Association::BelongsTo { .. } => "belongsTo",
            Association::HasOne(_) => "hasOne",
            Association::HasMany(_) => "hasMany",
            Association::HasAndBelongsToMany { .. } => "hasAndBelongsToMany",
        }
    }

    pub fn target(&self) -> TableId {
        match self {
            Association::BelongsTo { target, .. } | Association::HasAndBelongsToMany { target, .. } => *target,
            Association::HasOne(dep) | Association::HasMany(dep) => dep.target,
        }
    }

    /// The dependent side, for associations whose targets are deleted with the owner.
    pub fn dependent(&self) -> Option<&Dependent> {
        match self {
            Association::HasOne(dep) | Association::HasMany(dep) => Some(dep),
            _ => None,
        }
    }
}
