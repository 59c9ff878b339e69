//! Integration tests for the jobsite-docs pipeline.
//!
//! These tests validate:
//! - Every document kind produces a valid PDF
//! - Totals, themes and templates flow through to the layout
//! - Logo failures never move anything
//! - Tables and rich text paginate correctly
//! - Layout JSON can be rendered separately

use std::cell::Cell;
use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use sha2::{Digest, Sha256};

use jobsite_docs::assets::{AssetLoader, DefaultAssetLoader};
use jobsite_docs::draw::{DrawCommand, TableCommand};
use jobsite_docs::richtext::rasterize_html;
use jobsite_docs::templates::{parse_hex, Rgb8};
use jobsite_docs::{
    compose_document, generate_with_loader, render_pdf, DocError, DocumentLayout, DocumentRecord,
    Generated, Profile, RenderConfig,
};

// =====================================================================
// Helpers
// =====================================================================

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

fn record(json: &str) -> DocumentRecord {
    DocumentRecord::from_json(json).unwrap()
}

fn layout_of(doc: &DocumentRecord) -> DocumentLayout {
    compose_document(doc, &Profile::default(), &RenderConfig::default(), &DefaultAssetLoader::default())
        .unwrap()
}

fn all_text(layout: &DocumentLayout) -> Vec<String> {
    (0..layout.pages.len())
        .flat_map(|p| layout.page_text(p))
        .map(str::to_string)
        .collect()
}

fn tables(layout: &DocumentLayout) -> Vec<(usize, TableCommand)> {
    layout
        .pages
        .iter()
        .flat_map(|p| {
            p.commands.iter().filter_map(move |c| match c {
                DrawCommand::Table(t) => Some((p.page_index, t.clone())),
                _ => None,
            })
        })
        .collect()
}

fn png_data_uri(w: u32, h: u32) -> String {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([20, 40, 200, 255])));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
    format!("data:image/png;base64,{}", BASE64_STD.encode(bytes))
}

/// Refuses every fetch and counts the attempts.
#[derive(Default)]
struct OfflineLoader {
    calls: Cell<usize>,
}

impl AssetLoader for OfflineLoader {
    fn fetch(&self, src: &str) -> jobsite_docs::Result<Vec<u8>> {
        self.calls.set(self.calls.get() + 1);
        Err(DocError::Asset {
            src: src.to_string(),
            reason: "offline".to_string(),
        })
    }
}

const KINDS: [&str; 12] = [
    r#"{"kind":"invoice","invoiceNumber":"INV-1","items":[{"description":"Framing","quantity":2,"rate":50}]}"#,
    r#"{"kind":"estimate","estimateNumber":"EST-1","items":[{"description":"Roof","quantity":1,"rate":9000}]}"#,
    r#"{"kind":"workOrder","workOrderNumber":"WO-1","description":"<p>Replace flashing</p>"}"#,
    r#"{"kind":"timeSheet","sheetNumber":"TS-1","entries":[{"date":"Mon","hours":8,"rate":40}]}"#,
    r#"{"kind":"materialLog","logNumber":"ML-1","entries":[{"material":"Nails","quantity":2,"unitCost":18}]}"#,
    r#"{"kind":"receipt","receiptNumber":"R-1","amountPaid":50,"items":[{"description":"Repair","quantity":1,"rate":80}]}"#,
    r#"{"kind":"warranty","warrantyNumber":"W-1","terms":"<p>Ten years</p>"}"#,
    r#"{"kind":"changeOrder","changeOrderNumber":"CO-1","scheduleImpactDays":3}"#,
    r#"{"kind":"purchaseOrder","poNumber":"PO-1","shipping":25}"#,
    r#"{"kind":"dailyReport","reportNumber":"DR-1","weather":"Sunny","workPerformed":"<ul><li>Tear-off</li></ul>"}"#,
    r#"{"kind":"expenseLog","logNumber":"EX-1","entries":[{"category":"Fuel","amount":40}]}"#,
    r#"{"kind":"note","noteNumber":"N-1","title":"Gate code","content":"<p>1234</p>"}"#,
];

// =====================================================================
// End-to-end generation
// =====================================================================

#[test]
fn every_kind_renders_a_pdf() {
    let loader = DefaultAssetLoader::default();
    for json in KINDS {
        let doc = record(json);
        let out = generate_with_loader(&doc, &Profile::default(), &RenderConfig::default(), &loader, false)
            .unwrap_or_else(|e| panic!("{} failed: {e}", doc.type_name()));
        let Generated::File { file_name, bytes } = out else {
            panic!("expected file output");
        };
        assert_eq!(file_name, format!("{}-{}.pdf", doc.type_name(), doc.primary_id()));
        assert_valid_pdf(&bytes);
    }
}

#[test]
fn every_kind_works_in_both_template_families() {
    for template in ["modern", "heritage"] {
        for json in KINDS {
            let mut value: serde_json::Value = serde_json::from_str(json).unwrap();
            value["templateId"] = serde_json::Value::String(template.to_string());
            let doc: DocumentRecord = serde_json::from_value(value).unwrap();
            let layout = layout_of(&doc);
            assert!(!layout.pages.is_empty());
            assert_valid_pdf(&render_pdf(&layout).unwrap());
        }
    }
}

#[test]
fn data_uri_carries_file_name() {
    let doc = record(KINDS[0]);
    let out = generate_with_loader(
        &doc,
        &Profile::default(),
        &RenderConfig::default(),
        &DefaultAssetLoader::default(),
        true,
    )
    .unwrap();
    let Generated::DataUri(uri) = out else {
        panic!("expected data uri");
    };
    let prefix = "data:application/pdf;filename=Invoice-INV-1.pdf;base64,";
    assert!(uri.starts_with(prefix));
    assert_valid_pdf(&BASE64_STD.decode(&uri[prefix.len()..]).unwrap());
}

// =====================================================================
// Totals and styling
// =====================================================================

#[test]
fn invoice_scenario_totals() {
    let doc = record(
        r#"{"kind":"invoice","invoiceNumber":"INV-42","discount":10,"taxRate":10,"shipping":5,
            "items":[{"description":"Framing","quantity":2,"rate":50},
                     {"description":"Haul-away","quantity":1,"rate":25}]}"#,
    );
    let text = all_text(&layout_of(&doc));
    for expected in ["Subtotal", "$125.00", "-$10.00", "Tax (10%)", "$11.50", "$5.00", "$131.50"] {
        assert!(text.iter().any(|t| t == expected), "missing {expected}");
    }
}

#[test]
fn progress_invoice_bills_percent_complete() {
    let doc = record(
        r#"{"kind":"invoice","progressBilling":true,
            "items":[{"description":"Roof","quantity":1,"rate":4000,"percentComplete":50},
                     {"description":"Gutters","quantity":1,"rate":1000}]}"#,
    );
    let layout = layout_of(&doc);
    let (_, table) = &tables(&layout)[0];
    assert_eq!(table.header.cells.len(), 5);
    let text = all_text(&layout);
    assert!(text.iter().any(|t| t == "$2,000.00"));
    // Missing percent-complete bills nothing.
    assert!(text.iter().any(|t| t == "$0.00"));
}

#[test]
fn theme_overrides_banner_colour() {
    let plain = record(r#"{"kind":"invoice","templateId":"standard"}"#);
    let themed = record(
        r##"{"kind":"invoice","templateId":"standard","theme":{"primary":"#0a7f3f","secondary":"#222222"}}"##,
    );
    let banner = |layout: &DocumentLayout| match &layout.pages[0].commands[0] {
        DrawCommand::FilledRect(r) => r.color,
        other => panic!("expected banner, got {other:?}"),
    };
    let themed_colour = banner(&layout_of(&themed));
    assert_eq!(themed_colour, parse_hex("#0a7f3f"));
    assert_ne!(banner(&layout_of(&plain)), themed_colour);
}

#[test]
fn unknown_template_falls_back_to_standard() {
    let standard = layout_of(&record(r#"{"kind":"note","templateId":"standard"}"#));
    let unknown = layout_of(&record(r#"{"kind":"note","templateId":"no-such-template"}"#));
    assert_eq!(standard.pages[0].commands, unknown.pages[0].commands);
}

#[test]
fn malformed_theme_colour_is_black() {
    assert_eq!(parse_hex("#12"), Rgb8(0, 0, 0));
    assert_eq!(parse_hex("zzzzzz"), Rgb8(0, 0, 0));
    assert_eq!(parse_hex("fff"), Rgb8(255, 255, 255));
}

// =====================================================================
// Assets
// =====================================================================

#[test]
fn unreachable_logo_lays_out_like_no_logo() {
    let without = record(r#"{"kind":"estimate","estimateNumber":"E-1"}"#);
    let with_broken = record(
        r#"{"kind":"estimate","estimateNumber":"E-1","company":{"logoUrl":"https://logo.invalid/logo.png"}}"#,
    );
    let loader = OfflineLoader::default();
    let config = RenderConfig::default();
    let a = compose_document(&without, &Profile::default(), &config, &loader).unwrap();
    let b = compose_document(&with_broken, &Profile::default(), &config, &loader).unwrap();
    assert_eq!(loader.calls.get(), 1);
    assert_eq!(a.pages.len(), b.pages.len());
    for (pa, pb) in a.pages.iter().zip(&b.pages) {
        assert_eq!(pa.commands, pb.commands);
    }
}

#[test]
fn profile_logo_is_used_when_company_has_none() {
    let doc = record(r#"{"kind":"invoice","invoiceNumber":"INV-3"}"#);
    let profile = Profile {
        logo_url: png_data_uri(120, 60),
        ..Profile::default()
    };
    let layout = compose_document(&doc, &profile, &RenderConfig::default(), &DefaultAssetLoader::default())
        .unwrap();
    assert_eq!(layout.images.len(), 1);
    assert_valid_pdf(&render_pdf(&layout).unwrap());
}

// =====================================================================
// Pagination
// =====================================================================

#[test]
fn long_tables_repeat_their_header() {
    let entries: Vec<String> = (0..90)
        .map(|i| format!(r#"{{"date":"Day {i}","material":"Lumber {i}","quantity":1,"unitCost":10}}"#))
        .collect();
    let doc = record(&format!(r#"{{"kind":"materialLog","entries":[{}]}}"#, entries.join(",")));
    let layout = layout_of(&doc);
    let fragments = tables(&layout);
    assert!(fragments.len() >= 2);
    let rows: usize = fragments.iter().map(|(_, t)| t.rows.len()).sum();
    assert_eq!(rows, 90);
    for (_, t) in &fragments {
        assert_eq!(t.header.cells[1].lines, vec!["Material"]);
    }
    assert!(all_text(&layout).iter().any(|t| t == "$900.00"));
}

#[test]
fn every_page_gets_a_numbered_footer() {
    let paragraphs = "<p>Installed ice and water shield along the eaves.</p>".repeat(80);
    let doc = DocumentRecord::from_json(
        &serde_json::json!({"kind": "dailyReport", "workPerformed": paragraphs}).to_string(),
    )
    .unwrap();
    let layout = layout_of(&doc);
    let n = layout.pages.len();
    assert!(n >= 2);
    for i in 0..n {
        let footer = format!("Page {} of {}", i + 1, n);
        assert!(layout.page_text(i).contains(&footer.as_str()), "page {i} lacks footer");
    }
}

#[test]
fn rich_text_slices_stay_inside_the_margins() {
    let html = "<h2>Scope</h2>".to_string() + &"<p>Strip, inspect and re-deck the north slope.</p>".repeat(90);
    let doc = DocumentRecord::from_json(
        &serde_json::json!({"kind": "workOrder", "workOrderNumber": "WO-9", "description": html}).to_string(),
    )
    .unwrap();
    let config = RenderConfig::default();
    let layout = layout_of(&doc);
    let bottom = config.page_height - config.margin_bottom;
    let mut slices = 0;
    for page in &layout.pages {
        for cmd in &page.commands {
            if let DrawCommand::Image(img) = cmd {
                slices += 1;
                assert!(img.y + img.height <= bottom + 1e-3, "slice overflows page {}", page.page_index);
                assert!((img.width - config.content_width()).abs() < 1e-3);
            }
        }
    }
    assert!(slices >= 2);
    assert_eq!(slices, layout.images.len());
}

// =====================================================================
// Rasteriser & layout JSON
// =====================================================================

#[test]
fn rasteriser_is_deterministic() {
    let html = r#"<h1>Warranty</h1><p style="color:#336699">Covered for <b>ten</b> years.</p>
                  <ol><li>Shingles</li><li>Flashing</li></ol>"#;
    let loader = DefaultAssetLoader::default();
    let hash = || {
        let img = rasterize_html(html, 400.0, 2.0, &loader).unwrap().unwrap();
        Sha256::digest(img.as_raw())
    };
    assert_eq!(hash(), hash());
}

#[test]
fn layout_json_renders_separately() {
    let layout = layout_of(&record(KINDS[9]));
    let json = layout.to_json();
    let parsed = DocumentLayout::from_json(&json).unwrap();
    assert_eq!(parsed.pages.len(), layout.pages.len());
    assert_eq!(parsed.images.len(), layout.images.len());
    assert_valid_pdf(&render_pdf(&parsed).unwrap());
}

#[test]
fn invalid_records_are_rejected() {
    let err = DocumentRecord::from_json(r#"{"kind":"invoice","items":"nope"}"#).unwrap_err();
    assert!(matches!(err, DocError::InvalidRecord(_)));
}
