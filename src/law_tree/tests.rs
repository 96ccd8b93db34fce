use serde_json::{Value, json};

use super::*;
use crate::model::{ContentText, StructureNode};

fn content(structure: Value, text: Value) -> LawContent {
    LawContent {
        structure: serde_json::from_value::<Vec<StructureNode>>(structure).unwrap(),
        text: serde_json::from_value::<ContentText>(text).unwrap(),
    }
}

fn single_article(caption: &str, html: &str) -> LawContent {
    content(
        json!([{ "pId": 1, "caption": caption }]),
        json!({ "paragraphs": [{ "pId": 1, "text": html, "type": 1 }] }),
    )
}

fn process(content: &LawContent) -> ProcessedLaw {
    LawTreeProcessor::new().unwrap().process(content)
}

fn shape(nodes: &[LawNode]) -> Vec<(&str, NodeType, i64)> {
    nodes
        .iter()
        .map(|node| (node.path.as_str(), node.node_type, node.level))
        .collect()
}

fn text_of<'a>(nodes: &'a [LawNode], path: &str) -> &'a str {
    nodes
        .iter()
        .find(|node| node.path == path)
        .and_then(|node| node.text.as_deref())
        .unwrap_or_default()
}

#[test]
fn simple_article_gets_markdown_body() {
    let law = process(&content(
        json!([{ "pId": 1, "caption": "Чл. 1", "parentId": null }]),
        json!({ "paragraphs": [{
            "pId": 1,
            "text": "<p>This is <strong>bold</strong> text with <em>italic</em>.</p>",
            "type": 1,
            "fieldType": 1,
            "hasInLinks": false
        }] }),
    ));

    assert_eq!(law.nodes.len(), 1);
    let node = &law.nodes[0];
    assert_eq!(node.path, "ЧЛ1");
    assert_eq!(node.caption.as_deref(), Some("Чл. 1"));
    assert_eq!(node.text.as_deref(), Some("This is **bold** text with *italic*."));
    assert_eq!(node.node_type, NodeType::Article);
    assert_eq!(node.type_code, Some(1));
    assert_eq!(node.field_type, Some(1));
    assert!(!node.is_orphaned);
    assert_eq!(node.sort_order, 0);
}

#[test]
fn chapters_are_flattened_out_of_the_address_space() {
    let law = process(&content(
        json!([{
            "pId": 1,
            "caption": "Глава 1",
            "children": [{
                "pId": 2,
                "caption": "Чл. 1",
                "children": [{ "pId": 3, "caption": "Ал. 1" }]
            }]
        }]),
        json!({ "paragraphs": [
            { "pId": 1, "text": "<p>Chapter text</p>", "type": 1 },
            { "pId": 2, "text": "<p>Article text</p>", "type": 2 },
            { "pId": 3, "text": "<p>Paragraph text</p>", "type": 3 }
        ] }),
    ));

    assert_eq!(
        shape(&law.nodes),
        vec![
            ("ЧЛ1", NodeType::Article, 0),
            ("ЧЛ1/АЛ1", NodeType::Paragraph, 1),
        ]
    );
    assert_eq!(law.nodes[1].caption.as_deref(), Some("Ал. 1"));
    assert_eq!(law.stats.flattened_containers, 1);
    assert_eq!(law.stats.orphan_nodes, 0);
}

#[test]
fn chapter_wrapping_article_emits_exactly_one_node() {
    let law = process(&content(
        json!([{ "pId": 1, "caption": "Глава 1", "children": [{ "pId": 2, "caption": "Чл. 1" }] }]),
        json!({ "paragraphs": [] }),
    ));

    assert_eq!(shape(&law.nodes), vec![("ЧЛ1", NodeType::Article, 0)]);
    assert_eq!(law.nodes[0].text, None);
    assert!(!law.nodes[0].has_in_links);
}

#[test]
fn unreferenced_text_becomes_orphan_nodes() {
    let law = process(&content(
        json!([{ "pId": 1, "caption": "Чл. 1" }]),
        json!({ "paragraphs": [
            { "pId": 1, "text": "<p>In structure</p>", "type": 1, "fieldType": 1 },
            { "pId": 2, "text": "<p>Title</p>", "type": 0, "fieldType": 1 },
            { "pId": 3, "text": "<p>Publication info</p>", "type": 0, "fieldType": 2 },
            { "pId": 4, "text": "<p>Бележка</p>", "type": 0, "fieldType": 9 },
            { "pId": 5, "text": "<p>Друго</p>", "type": 6, "fieldType": 4 }
        ] }),
    ));

    let orphans: Vec<(&str, NodeType, bool, i64)> = law
        .nodes
        .iter()
        .map(|node| (node.path.as_str(), node.node_type, node.is_orphaned, node.level))
        .collect();
    assert_eq!(
        orphans,
        vec![
            ("ЧЛ1", NodeType::Article, false, 0),
            ("ЗАГЛАВИЕ", NodeType::Title, true, 0),
            ("ПУБЛ_ИНФО", NodeType::PublicationInfo, true, 0),
            ("ЗАБЕЛЕЖКА_4", NodeType::Note, true, 0),
            ("ORPHAN_6_5", NodeType::Metadata, true, 0),
        ]
    );
    assert_eq!(law.stats.orphan_nodes, 4);
    let orders: Vec<i64> = law.nodes.iter().map(|node| node.sort_order).collect();
    assert_eq!(orders, vec![0, 1, 2, 3, 4]);
}

#[test]
fn empty_content_yields_no_nodes() {
    let law = process(&content(json!([]), json!({ "paragraphs": [] })));
    assert!(law.nodes.is_empty());
    assert_eq!(law.stats, ProcessStats::default());
}

#[test]
fn structure_node_without_id_is_dropped_with_its_subtree() {
    let law = process(&content(
        json!([
            { "caption": "Invalid Node", "children": [{ "pId": 9, "caption": "Чл. 9" }] },
            { "pId": 1, "caption": "Чл. 1" }
        ]),
        json!({ "paragraphs": [{ "pId": 1, "text": "<p>Text</p>", "type": 1 }] }),
    ));

    assert_eq!(law.nodes.len(), 1);
    assert_eq!(law.nodes[0].source_paragraph_id, Some(1));
    assert_eq!(law.stats.missing_identifier, 1);
}

#[test]
fn inline_alineas_split_into_children() {
    let law = process(&single_article("Чл. 3", "<p>Intro (1) First. (2) Second.</p>"));

    assert_eq!(
        shape(&law.nodes),
        vec![
            ("ЧЛ3", NodeType::Article, 0),
            ("ЧЛ3/АЛ1", NodeType::Paragraph, 1),
            ("ЧЛ3/АЛ2", NodeType::Paragraph, 1),
        ]
    );
    assert_eq!(text_of(&law.nodes, "ЧЛ3"), "Intro");
    assert_eq!(text_of(&law.nodes, "ЧЛ3/АЛ1"), "First.");
    assert_eq!(text_of(&law.nodes, "ЧЛ3/АЛ2"), "Second.");
    assert_eq!(law.nodes[1].caption, None);
    assert_eq!(law.nodes[1].source_paragraph_id, Some(1));
    assert_eq!(law.stats.split_nodes, 2);
}

#[test]
fn block_alineas_keep_amendment_note_in_intro() {
    let law = process(&single_article(
        "Чл. 134",
        "<p>Чл. 134. (Нов - ДВ, бр. 95 от 2003 г.) (1) Актовете за установяване на административните нарушения се съставят от инспекторите.</p><p>(2) Наказателните постановления се издават от изпълнителния директор.</p><p>(3) Установяването на нарушенията се извършва по реда на закона.</p>",
    ));

    assert_eq!(law.nodes.len(), 4);
    assert!(text_of(&law.nodes, "ЧЛ134").contains("(Нов - ДВ"));
    assert!(text_of(&law.nodes, "ЧЛ134/АЛ1").starts_with("Актовете за установяване"));
    assert!(text_of(&law.nodes, "ЧЛ134/АЛ2").contains("Наказателните постановления"));
    assert!(text_of(&law.nodes, "ЧЛ134/АЛ3").contains("Установяването на нарушенията"));
}

#[test]
fn points_split_into_children() {
    let law = process(&single_article(
        "Чл. 130",
        "<p>Чл. 130. Инспекторите са длъжни:</p><p>1. да пазят в тайна поверителните сведения;</p><p>2. да пазят в тайна източника, от който е получен сигнал.</p>",
    ));

    assert_eq!(
        shape(&law.nodes),
        vec![
            ("ЧЛ130", NodeType::Article, 0),
            ("ЧЛ130/Т1", NodeType::Point, 1),
            ("ЧЛ130/Т2", NodeType::Point, 1),
        ]
    );
    assert_eq!(text_of(&law.nodes, "ЧЛ130"), "Чл. 130. Инспекторите са длъжни:");
    assert_eq!(
        text_of(&law.nodes, "ЧЛ130/Т1"),
        "да пазят в тайна поверителните сведения;"
    );
}

#[test]
fn letters_split_into_children() {
    let law = process(&single_article(
        "Чл. 5",
        "<p>Чл. 5. Документите могат да бъдат:</p><p>а) оригинали;</p><p>б) заверени копия;</p><p>в) електронни документи.</p>",
    ));

    assert_eq!(
        shape(&law.nodes),
        vec![
            ("ЧЛ5", NodeType::Article, 0),
            ("ЧЛ5/БУКВА_А", NodeType::Letter, 1),
            ("ЧЛ5/БУКВА_Б", NodeType::Letter, 1),
            ("ЧЛ5/БУКВА_В", NodeType::Letter, 1),
        ]
    );
    assert_eq!(text_of(&law.nodes, "ЧЛ5/БУКВА_В"), "електронни документи.");
}

#[test]
fn alinea_with_points_nests_one_level_deeper() {
    let law = process(&single_article(
        "Чл. 10",
        "<p>Чл. 10. Общи правила:</p><p>(1) За изпълнение на дейността се изискват:</p><p>1. регистрация в регистъра;</p><p>2. издаден лиценз;</p><p>3. договор за сътрудничество.</p><p>(2) Контролът се извършва от компетентния орган.</p>",
    ));

    assert_eq!(
        shape(&law.nodes),
        vec![
            ("ЧЛ10", NodeType::Article, 0),
            ("ЧЛ10/АЛ1", NodeType::Paragraph, 1),
            ("ЧЛ10/АЛ1/Т1", NodeType::Point, 2),
            ("ЧЛ10/АЛ1/Т2", NodeType::Point, 2),
            ("ЧЛ10/АЛ1/Т3", NodeType::Point, 2),
            ("ЧЛ10/АЛ2", NodeType::Paragraph, 1),
        ]
    );
    assert_eq!(
        text_of(&law.nodes, "ЧЛ10/АЛ1"),
        "За изпълнение на дейността се изискват:"
    );
    assert_eq!(
        text_of(&law.nodes, "ЧЛ10/АЛ2"),
        "Контролът се извършва от компетентния орган."
    );
}

#[test]
fn alinea_point_letter_chain_yields_seven_nodes() {
    let law = process(&single_article(
        "Чл. 15",
        "<p>Чл. 15. Документация:</p><p>(1) Необходими документи:</p><p>1. Лични документи включват:</p><p>а) лична карта;</p><p>б) паспорт;</p><p>в) свидетелство за раждане.</p><p>(2) Допълнителни изисквания.</p>",
    ));

    assert_eq!(
        shape(&law.nodes),
        vec![
            ("ЧЛ15", NodeType::Article, 0),
            ("ЧЛ15/АЛ1", NodeType::Paragraph, 1),
            ("ЧЛ15/АЛ1/Т1", NodeType::Point, 2),
            ("ЧЛ15/АЛ1/Т1/БУКВА_А", NodeType::Letter, 3),
            ("ЧЛ15/АЛ1/Т1/БУКВА_Б", NodeType::Letter, 3),
            ("ЧЛ15/АЛ1/Т1/БУКВА_В", NodeType::Letter, 3),
            ("ЧЛ15/АЛ2", NodeType::Paragraph, 1),
        ]
    );
    assert_eq!(text_of(&law.nodes, "ЧЛ15/АЛ1/Т1"), "Лични документи включват:");
    let orders: Vec<i64> = law.nodes.iter().map(|node| node.sort_order).collect();
    assert_eq!(orders, (0..7).collect::<Vec<i64>>());
}

#[test]
fn one_alinea_one_point_three_letters_is_six_nodes() {
    let law = process(&single_article(
        "Чл. 2",
        "<p>(1) Увод:</p><p>1. Видове:</p><p>а) първи;</p><p>б) втори;</p><p>в) трети.</p>",
    ));

    assert_eq!(law.nodes.len(), 6);
    assert_eq!(law.nodes[0].text, None);
    assert_eq!(law.nodes[1].path, "ЧЛ2/АЛ1");
    assert_eq!(law.nodes[5].path, "ЧЛ2/АЛ1/Т1/БУКВА_В");
    assert_eq!(law.nodes[5].level, 3);
}

#[test]
fn alinea_number_keeps_cyrillic_suffix() {
    let law = process(&single_article(
        "Чл. 7",
        "<p>Чл. 7. (1) Първа.</p><p>(5а) Нова алинея.</p>",
    ));

    let paths: Vec<&str> = law.nodes.iter().map(|node| node.path.as_str()).collect();
    assert_eq!(paths, vec!["ЧЛ7", "ЧЛ7/АЛ1", "ЧЛ7/АЛ5А"]);
    assert_eq!(text_of(&law.nodes, "ЧЛ7/АЛ5А"), "Нова алинея.");
}

#[test]
fn section_paragraphs_live_under_provision_section() {
    let law = process(&content(
        json!([{
            "pId": 1,
            "caption": "Преходни и заключителни разпоредби",
            "children": [
                { "pId": 2, "caption": "§ 1" },
                { "pId": 3, "caption": "§ 2а" }
            ]
        }]),
        json!({ "paragraphs": [
            { "pId": 2, "text": "<p>§ 1. (1) Първа. (2) Втора.</p>", "type": 1 },
            { "pId": 3, "text": "<p>§ 2а. Без деление.</p>", "type": 1 }
        ] }),
    ));

    assert_eq!(
        shape(&law.nodes),
        vec![
            ("ПЗР", NodeType::TransitionalSection, 0),
            ("ПЗР/§1", NodeType::TransitionalParagraph, 1),
            ("ПЗР/§1/АЛ1", NodeType::Paragraph, 2),
            ("ПЗР/§1/АЛ2", NodeType::Paragraph, 2),
            ("ПЗР/§2А", NodeType::TransitionalParagraph, 1),
        ]
    );
}

#[test]
fn repeated_processing_is_identical() {
    let input = single_article(
        "Чл. 15",
        "<p>Чл. 15. Документация:</p><p>(1) Необходими документи:</p><p>1. Лични:</p><p>а) карта;</p>",
    );
    let processor = LawTreeProcessor::new().unwrap();

    assert_eq!(processor.process(&input), processor.process(&input));
}

#[test]
fn duplicate_captions_get_distinct_paths() {
    let law = process(&content(
        json!([
            { "pId": 1, "caption": "Чл. 1" },
            { "pId": 2, "caption": "Чл. 1" }
        ]),
        json!({ "paragraphs": [] }),
    ));

    let paths: Vec<&str> = law.nodes.iter().map(|node| node.path.as_str()).collect();
    assert_eq!(paths, vec!["ЧЛ1", "ЧЛ1~2"]);
    assert_eq!(law.stats.path_collisions, 1);
}

#[test]
fn missing_caption_falls_back_to_node_id() {
    let law = process(&content(
        json!([{ "pId": 42 }]),
        json!({ "paragraphs": [] }),
    ));

    assert_eq!(law.nodes[0].path, "NODE_42");
    assert_eq!(law.nodes[0].caption, None);
    assert_eq!(law.nodes[0].node_type, NodeType::Unknown);
}
