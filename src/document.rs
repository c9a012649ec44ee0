//! Ordered-block blog post body: authoring mutations, rendering
//! projection, and wire serialization.

use serde::{Deserialize, Serialize};

use crate::types::BlockId;

/// Block kind. Wire names follow the legacy editor payload, where a
/// bullet list is just `"list"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    /// Plain paragraph.
    #[serde(rename = "paragraph")]
    Paragraph,
    /// Section heading.
    #[serde(rename = "heading")]
    Heading,
    /// Bullet list, one item per content line.
    #[serde(rename = "list")]
    BulletList,
    /// Numbered list, one item per content line.
    #[serde(rename = "numbered-list")]
    NumberedList,
    /// Block quote.
    #[serde(rename = "quote")]
    Quote,
}

impl BlockKind {
    /// True for the two list kinds, which render per line.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::BulletList | Self::NumberedList)
    }
}

/// Direction for [`Document::move_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Swap with the previous block.
    Up,
    /// Swap with the next block.
    Down,
}

/// One unit of a blog post body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Identifier unique within the containing document; unaffected by
    /// reordering.
    pub id: BlockId,
    /// Block kind.
    pub kind: BlockKind,
    /// Raw text. For list kinds, newline-delimited items; blank lines
    /// are dropped at render time, not here.
    pub content: String,
}

/// Persisted block shape: the local editing `id` is dropped on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedBlock {
    /// Block kind.
    #[serde(rename = "type")]
    pub kind: BlockKind,
    /// Raw block text.
    pub content: String,
}

/// Wire form of a document body: legacy flat text plus structured blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedDocument {
    /// Block texts joined with blank-line separators.
    pub content: String,
    /// Structured blocks without ids.
    #[serde(rename = "formattedContent")]
    pub formatted_content: Vec<FormattedBlock>,
}

/// Presentational node produced by [`Document::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderNode {
    /// Paragraph text.
    Paragraph(String),
    /// Heading text.
    Heading(String),
    /// Quote text.
    Quote(String),
    /// List with pre-split items, one per non-blank content line.
    List {
        /// True for numbered lists.
        ordered: bool,
        /// List items in content order.
        items: Vec<String>,
    },
}

/// Document mutation failure. The document is left unchanged on error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// Refused removal of the last remaining block.
    MinOneBlock,
    /// No block with the given id.
    MissingBlock(BlockId),
}

impl DocumentError {
    /// Stable machine-readable code for the failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MinOneBlock => "min-one-block",
            Self::MissingBlock(_) => "missing-block",
        }
    }
}

/// Ordered sequence of typed blocks. Holds at least one block at all
/// times; insertion order is rendering order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
    next_block_id: BlockId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document with a single empty paragraph block.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block {
                id: 1,
                kind: BlockKind::Paragraph,
                content: String::new(),
            }],
            next_block_id: 2,
        }
    }

    /// Rebuilds a document from persisted blocks. Ids are reassigned
    /// positionally; an empty slice yields [`Document::new`].
    pub fn from_serialized(blocks: &[FormattedBlock]) -> Self {
        if blocks.is_empty() {
            return Self::new();
        }

        let blocks: Vec<Block> = blocks
            .iter()
            .enumerate()
            .map(|(idx, b)| Block {
                id: idx as BlockId + 1,
                kind: b.kind,
                content: b.content.clone(),
            })
            .collect();
        let next_block_id = blocks.len() as BlockId + 1;

        Self {
            blocks,
            next_block_id,
        }
    }

    /// Blocks in rendering order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks. Always at least one.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Looks up a block by id.
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Replaces a block's text, leaving kind and position alone.
    pub fn set_content(&mut self, id: BlockId, content: impl Into<String>) -> Result<(), DocumentError> {
        let block = self
            .blocks
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(DocumentError::MissingBlock(id))?;
        block.content = content.into();
        Ok(())
    }

    /// Inserts a new empty block of `kind` at `position` (clamped to the
    /// block count; `None` appends) and returns its fresh id.
    pub fn add_block(&mut self, kind: BlockKind, position: Option<usize>) -> BlockId {
        let id = self.next_block_id;
        self.next_block_id += 1;

        let at = position.unwrap_or(self.blocks.len()).min(self.blocks.len());
        self.blocks.insert(
            at,
            Block {
                id,
                kind,
                content: String::new(),
            },
        );
        id
    }

    /// Removes a block. Fails with [`DocumentError::MinOneBlock`] when
    /// only one block remains; the document is unchanged on failure.
    pub fn remove_block(&mut self, id: BlockId) -> Result<(), DocumentError> {
        let idx = self.index_of(id)?;
        if self.blocks.len() == 1 {
            return Err(DocumentError::MinOneBlock);
        }
        self.blocks.remove(idx);
        Ok(())
    }

    /// Changes a block's kind in place. Content is preserved verbatim.
    pub fn retype_block(&mut self, id: BlockId, kind: BlockKind) -> Result<(), DocumentError> {
        let idx = self.index_of(id)?;
        self.blocks[idx].kind = kind;
        Ok(())
    }

    /// Swaps a block with its immediate neighbor. Moving the first block
    /// up or the last block down is a silent no-op.
    pub fn move_block(&mut self, id: BlockId, direction: Direction) -> Result<(), DocumentError> {
        let idx = self.index_of(id)?;
        match direction {
            Direction::Up if idx > 0 => self.blocks.swap(idx - 1, idx),
            Direction::Down if idx + 1 < self.blocks.len() => self.blocks.swap(idx, idx + 1),
            _ => {}
        }
        Ok(())
    }

    /// Pure projection to presentational nodes. List blocks split their
    /// content on newlines and drop lines that are blank after trimming;
    /// every other kind emits one node per block.
    pub fn render(&self) -> Vec<RenderNode> {
        self.blocks
            .iter()
            .map(|block| match block.kind {
                BlockKind::Paragraph => RenderNode::Paragraph(block.content.clone()),
                BlockKind::Heading => RenderNode::Heading(block.content.clone()),
                BlockKind::Quote => RenderNode::Quote(block.content.clone()),
                BlockKind::BulletList | BlockKind::NumberedList => RenderNode::List {
                    ordered: block.kind == BlockKind::NumberedList,
                    items: split_list_items(&block.content),
                },
            })
            .collect()
    }

    /// Wire serialization: flat `content` joined with blank lines plus
    /// `formattedContent` with ids stripped.
    pub fn serialize(&self) -> SerializedDocument {
        let content = self
            .blocks
            .iter()
            .map(|b| b.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let formatted_content = self
            .blocks
            .iter()
            .map(|b| FormattedBlock {
                kind: b.kind,
                content: b.content.clone(),
            })
            .collect();

        SerializedDocument {
            content,
            formatted_content,
        }
    }

    fn index_of(&self, id: BlockId) -> Result<usize, DocumentError> {
        self.blocks
            .iter()
            .position(|b| b.id == id)
            .ok_or(DocumentError::MissingBlock(id))
    }
}

fn split_list_items(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.to_string())
        .collect()
}
