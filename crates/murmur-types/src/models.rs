use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The four reaction kinds a user can attach to a post or comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Like,
    Haha,
    Love,
    Angry,
}

impl ReactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Haha => "haha",
            Self::Love => "love",
            Self::Angry => "angry",
        }
    }
}

impl FromStr for ReactionKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "haha" => Ok(Self::Haha),
            "love" => Ok(Self::Love),
            "angry" => Ok(Self::Angry),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for ReactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a reaction is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Post,
    Comment,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }

    /// Capitalised noun for user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Post => "Post",
            Self::Comment => "Comment",
        }
    }
}

impl FromStr for TargetKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "post" => Ok(Self::Post),
            "comment" => Ok(Self::Comment),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Public,
    Private,
}

impl Privacy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

impl FromStr for Privacy {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

/// Returned when a stored or submitted string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

/// Result of toggling a reaction on a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Added,
    Removed,
    Changed,
}

impl ToggleAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
        }
    }
}

/// Decide what a reaction request does given the user's current reaction on the target.
///
/// No reaction yet adds one, the same kind again removes it, and a different
/// kind overwrites it. A user holds at most one reaction per target.
pub fn decide_toggle(existing: Option<ReactionKind>, requested: ReactionKind) -> ToggleAction {
    match existing {
        None => ToggleAction::Added,
        Some(kind) if kind == requested => ToggleAction::Removed,
        Some(_) => ToggleAction::Changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reaction_is_added() {
        assert_eq!(decide_toggle(None, ReactionKind::Love), ToggleAction::Added);
    }

    #[test]
    fn same_kind_twice_removes() {
        assert_eq!(
            decide_toggle(Some(ReactionKind::Like), ReactionKind::Like),
            ToggleAction::Removed
        );
    }

    #[test]
    fn different_kind_changes() {
        assert_eq!(
            decide_toggle(Some(ReactionKind::Like), ReactionKind::Angry),
            ToggleAction::Changed
        );
    }

    #[test]
    fn reaction_kind_parses_wire_names() {
        for kind in [ReactionKind::Like, ReactionKind::Haha, ReactionKind::Love, ReactionKind::Angry] {
            assert_eq!(kind.as_str().parse::<ReactionKind>().unwrap(), kind);
        }
        assert!("wow".parse::<ReactionKind>().is_err());
        assert_eq!(
            serde_json::to_string(&ReactionKind::Haha).unwrap(),
            "\"haha\""
        );
    }

    #[test]
    fn target_kind_rejects_unknown() {
        assert_eq!("comment".parse::<TargetKind>().unwrap(), TargetKind::Comment);
        assert_eq!(
            "user".parse::<TargetKind>(),
            Err(UnknownVariant("user".into()))
        );
    }
}
