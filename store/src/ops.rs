//! Block operations accepted by the `batch-actions` write endpoint.

use serde::Serialize;

/// One item of a `batch-actions` write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum BlockOp {
    /// Rewrite an existing block's text, keeping its uid.
    UpdateBlock { block: BlockRef },
    /// Remove a block (and its children) by uid.
    DeleteBlock { block: BlockRef },
    /// Append a new block under a parent.
    CreateBlock {
        location: Location,
        block: NewBlock,
    },
}

impl BlockOp {
    pub fn update(uid: impl Into<String>, string: impl Into<String>) -> Self {
        Self::UpdateBlock {
            block: BlockRef {
                uid: uid.into(),
                string: Some(string.into()),
            },
        }
    }

    pub fn delete(uid: impl Into<String>) -> Self {
        Self::DeleteBlock {
            block: BlockRef {
                uid: uid.into(),
                string: None,
            },
        }
    }

    /// New blocks always go to the end of the parent, in call order.
    pub fn append(parent_uid: impl Into<String>, string: impl Into<String>) -> Self {
        Self::CreateBlock {
            location: Location {
                parent_uid: parent_uid.into(),
                order: "last".to_string(),
            },
            block: NewBlock {
                string: string.into(),
            },
        }
    }

    /// Wire name of this operation, as used in the `action` field.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdateBlock { .. } => "update-block",
            Self::DeleteBlock { .. } => "delete-block",
            Self::CreateBlock { .. } => "create-block",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockRef {
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    #[serde(rename = "parent-uid")]
    pub parent_uid: String,
    pub order: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewBlock {
    pub string: String,
}
