//! Signature slots at the foot of agreements.

use crate::draw::Align;
use crate::fonts::line_height_mm;

use super::context::RenderContext;

const IMAGE_BOX: (f32, f32) = (60.0, 18.0);
const COLUMN_GAP: f32 = 20.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureSlot {
    pub label: String,
    pub name: String,
    /// Signature image source (data URI or URL).
    pub image: Option<String>,
    pub signed_at: Option<String>,
}

impl SignatureSlot {
    fn has_image(&self) -> bool {
        self.image.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

/// Draw the contractor slot and, when the other party has signed, theirs
/// next to it. Returns the cursor below the block.
pub fn compose_signatures(
    ctx: &mut RenderContext<'_>,
    y: f32,
    contractor: &SignatureSlot,
    counter_party: Option<&SignatureSlot>,
) -> f32 {
    let g = ctx.geometry;
    let needed = IMAGE_BOX.1 + 4.0 + 3.0 * line_height_mm(9.0) + 6.0;
    let top = ctx.ensure_space(y + 4.0, needed);
    let col_w = (g.content_width() - COLUMN_GAP) / 2.0;

    let mut bottom = draw_slot(ctx, g.left(), top, col_w, contractor);
    if let Some(slot) = counter_party.filter(|s| s.has_image()) {
        bottom = bottom.max(draw_slot(ctx, g.left() + col_w + COLUMN_GAP, top, col_w, slot));
    }
    bottom + 6.0
}

fn draw_slot(ctx: &mut RenderContext<'_>, x: f32, y: f32, width: f32, slot: &SignatureSlot) -> f32 {
    let line_y = y + IMAGE_BOX.1 + 2.0;
    if let Some(img) = slot.image.as_deref().and_then(|src| ctx.load_image(src)) {
        let (w, h) = img.fit_within(IMAGE_BOX.0.min(width), IMAGE_BOX.1);
        ctx.image(&img, x, line_y - 1.0 - h, w, h);
    }
    ctx.line(x, line_y, x + width, line_y, ctx.style.text, 0.5);

    let label_style = ctx.body(8.0).colored(ctx.style.secondary).bold();
    let mut cursor = ctx.text(x, line_y + 1.5, &slot.label.to_uppercase(), label_style, Align::Left);
    if !slot.name.trim().is_empty() {
        cursor = ctx.text(x, cursor, slot.name.trim(), ctx.body(9.0), Align::Left);
    }
    if let Some(date) = slot.signed_at.as_deref().filter(|d| !d.trim().is_empty()) {
        cursor = ctx.text(x, cursor, &format!("Signed: {}", date.trim()), ctx.body(8.0), Align::Left);
    }
    cursor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::tests::png_data_uri;
    use crate::assets::DefaultAssetLoader;
    use crate::config::RenderConfig;
    use crate::draw::DocumentLayout;
    use crate::templates::resolve_style;

    fn compose(contractor: &SignatureSlot, client: Option<&SignatureSlot>) -> DocumentLayout {
        let style = resolve_style("standard", None);
        let config = RenderConfig::default();
        let loader = DefaultAssetLoader::default();
        let mut ctx = RenderContext::new("t", &style, &config, &loader);
        compose_signatures(&mut ctx, 100.0, contractor, client);
        ctx.finish()
    }

    fn contractor() -> SignatureSlot {
        SignatureSlot {
            label: "Contractor".into(),
            name: "Acme Roofing".into(),
            image: None,
            signed_at: None,
        }
    }

    #[test]
    fn contractor_slot_is_always_drawn() {
        let layout = compose(&contractor(), None);
        let text = layout.page_text(0);
        assert!(text.contains(&"CONTRACTOR"));
        assert!(!text.contains(&"CLIENT"));
    }

    #[test]
    fn unsigned_client_slot_is_omitted() {
        let client = SignatureSlot {
            label: "Client".into(),
            image: Some(String::new()),
            signed_at: Some("2026-04-02".into()),
            ..SignatureSlot::default()
        };
        let layout = compose(&contractor(), Some(&client));
        assert!(!layout.page_text(0).contains(&"CLIENT"));
    }

    #[test]
    fn signed_client_slot_shows_date() {
        let client = SignatureSlot {
            label: "Client".into(),
            name: "Jane Doe".into(),
            image: Some(png_data_uri(60, 20, [0, 0, 0, 255])),
            signed_at: Some("2026-04-02".into()),
        };
        let layout = compose(&contractor(), Some(&client));
        let text = layout.page_text(0);
        assert!(text.contains(&"CLIENT"));
        assert!(text.contains(&"Signed: 2026-04-02"));
        assert_eq!(layout.images.len(), 1);
    }
}
