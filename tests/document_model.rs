use serde_json::json;
use sitekit::document::{
    BlockKind, Direction, Document, DocumentError, FormattedBlock, RenderNode,
};

fn three_block_doc() -> Document {
    let mut doc = Document::new();
    let first = doc.blocks()[0].id;
    doc.set_content(first, "intro").expect("set");
    let heading = doc.add_block(BlockKind::Heading, None);
    doc.set_content(heading, "Section").expect("set");
    let list = doc.add_block(BlockKind::BulletList, None);
    doc.set_content(list, "x\ny").expect("set");
    doc
}

#[test]
fn new_document_has_one_empty_paragraph() {
    let doc = Document::new();
    assert_eq!(doc.len(), 1);
    assert_eq!(doc.blocks()[0].kind, BlockKind::Paragraph);
    assert_eq!(doc.blocks()[0].content, "");
}

#[test]
fn remove_last_block_fails_and_leaves_document_unchanged() {
    let mut doc = Document::new();
    let id = doc.blocks()[0].id;
    doc.set_content(id, "only").expect("set");
    let before = doc.clone();

    assert_eq!(doc.remove_block(id), Err(DocumentError::MinOneBlock));
    assert_eq!(DocumentError::MinOneBlock.code(), "min-one-block");
    assert_eq!(doc, before);
}

#[test]
fn remove_block_preserves_remaining_ids_and_order() {
    let mut doc = three_block_doc();
    let ids: Vec<_> = doc.blocks().iter().map(|b| b.id).collect();

    doc.remove_block(ids[1]).expect("remove");

    assert_eq!(doc.len(), 2);
    let remaining: Vec<_> = doc.blocks().iter().map(|b| b.id).collect();
    assert_eq!(remaining, vec![ids[0], ids[2]]);
    assert_eq!(doc.blocks()[0].content, "intro");
    assert_eq!(doc.blocks()[1].content, "x\ny");
}

#[test]
fn remove_unknown_block_reports_missing() {
    let mut doc = three_block_doc();
    assert_eq!(doc.remove_block(999), Err(DocumentError::MissingBlock(999)));
}

#[test]
fn retype_preserves_content_verbatim() {
    let mut doc = Document::new();
    let id = doc.blocks()[0].id;
    doc.set_content(id, "  raw   text \nwith lines ").expect("set");

    doc.retype_block(id, BlockKind::Quote).expect("retype");

    assert_eq!(doc.blocks()[0].kind, BlockKind::Quote);
    assert_eq!(doc.blocks()[0].content, "  raw   text \nwith lines ");
}

#[test]
fn move_first_up_and_last_down_are_noops() {
    let mut doc = three_block_doc();
    let before = doc.clone();
    let first = doc.blocks()[0].id;
    let last = doc.blocks()[2].id;

    doc.move_block(first, Direction::Up).expect("move");
    doc.move_block(last, Direction::Down).expect("move");

    assert_eq!(doc, before);
}

#[test]
fn move_swaps_with_immediate_neighbor() {
    let mut doc = three_block_doc();
    let middle = doc.blocks()[1].id;

    doc.move_block(middle, Direction::Up).expect("move");
    let order: Vec<_> = doc.blocks().iter().map(|b| b.content.as_str()).collect();
    assert_eq!(order, vec!["Section", "intro", "x\ny"]);

    doc.move_block(middle, Direction::Down).expect("move");
    let order: Vec<_> = doc.blocks().iter().map(|b| b.content.as_str()).collect();
    assert_eq!(order, vec!["intro", "Section", "x\ny"]);
}

#[test]
fn render_drops_blank_list_lines() {
    let mut doc = Document::new();
    let id = doc.blocks()[0].id;
    doc.retype_block(id, BlockKind::BulletList).expect("retype");
    doc.set_content(id, "a\n\nb").expect("set");

    assert_eq!(
        doc.render(),
        vec![RenderNode::List {
            ordered: false,
            items: vec!["a".to_string(), "b".to_string()],
        }]
    );
}

#[test]
fn render_is_deterministic() {
    let doc = three_block_doc();
    assert_eq!(doc.render(), doc.render());
}

#[test]
fn numbered_list_renders_ordered() {
    let mut doc = Document::new();
    let id = doc.blocks()[0].id;
    doc.retype_block(id, BlockKind::NumberedList).expect("retype");
    doc.set_content(id, "one\ntwo").expect("set");

    assert_eq!(
        doc.render(),
        vec![RenderNode::List {
            ordered: true,
            items: vec!["one".to_string(), "two".to_string()],
        }]
    );
}

#[test]
fn serialize_and_render_end_to_end() {
    let doc = three_block_doc();

    let wire = doc.serialize();
    assert_eq!(wire.content, "intro\n\nSection\n\nx\ny");
    assert_eq!(
        wire.formatted_content,
        vec![
            FormattedBlock {
                kind: BlockKind::Paragraph,
                content: "intro".to_string(),
            },
            FormattedBlock {
                kind: BlockKind::Heading,
                content: "Section".to_string(),
            },
            FormattedBlock {
                kind: BlockKind::BulletList,
                content: "x\ny".to_string(),
            },
        ]
    );

    assert_eq!(
        doc.render(),
        vec![
            RenderNode::Paragraph("intro".to_string()),
            RenderNode::Heading("Section".to_string()),
            RenderNode::List {
                ordered: false,
                items: vec!["x".to_string(), "y".to_string()],
            },
        ]
    );
}

#[test]
fn formatted_block_wire_names_match_legacy_editor() {
    let block = FormattedBlock {
        kind: BlockKind::BulletList,
        content: "x".to_string(),
    };
    assert_eq!(
        serde_json::to_value(&block).expect("serialize"),
        json!({ "type": "list", "content": "x" })
    );

    let numbered: FormattedBlock =
        serde_json::from_value(json!({ "type": "numbered-list", "content": "1" }))
            .expect("deserialize");
    assert_eq!(numbered.kind, BlockKind::NumberedList);
}

#[test]
fn from_serialized_reassigns_ids_positionally() {
    let doc = three_block_doc();
    let reloaded = Document::from_serialized(&doc.serialize().formatted_content);

    let ids: Vec<_> = reloaded.blocks().iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    let kinds: Vec<_> = reloaded.blocks().iter().map(|b| b.kind).collect();
    let original_kinds: Vec<_> = doc.blocks().iter().map(|b| b.kind).collect();
    assert_eq!(kinds, original_kinds);
}

#[test]
fn from_serialized_empty_keeps_min_one_block() {
    let doc = Document::from_serialized(&[]);
    assert_eq!(doc.len(), 1);
    assert_eq!(doc.blocks()[0].kind, BlockKind::Paragraph);
}

#[test]
fn add_block_position_is_clamped() {
    let mut doc = Document::new();
    let id = doc.add_block(BlockKind::Heading, Some(42));
    assert_eq!(doc.blocks()[1].id, id);

    let front = doc.add_block(BlockKind::Quote, Some(0));
    assert_eq!(doc.blocks()[0].id, front);
    assert_eq!(doc.len(), 3);
}
