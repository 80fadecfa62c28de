use crate::geometry::{Rect, Vertex, to_ndc};
use egui::{Context, FontId, Pos2, RawInput, TextureId, Vec2, ViewportId, ViewportInfo};
use std::time::Instant;
pub use egui::TexturesDelta;

/// Text drawn straight into the HDR backbuffer
#[derive(Clone, Debug, PartialEq)]
pub struct HdrTextLabel {
    pub text: String,
    pub rect: Rect,      // Pixel rect; centered horizontally, top aligned
    pub color: [f32; 4], // scRGB
    pub size: f32,       // Font size in pixels
}

/// Rasterizes label glyphs through egui's font atlas.
pub struct TextRenderer {
    ctx: Context,
    start_time: Instant,
}

impl TextRenderer {
    pub fn new() -> Self {
        let ctx = Context::default();
        ctx.set_pixels_per_point(1.0);

        Self {
            ctx,
            start_time: Instant::now(),
        }
    }

    /// Runs an empty egui pass so the font atlas exists and collects its texture updates.
    /// Must run before `layout` every frame.
    pub fn begin_frame(&mut self, width: u32, height: u32) -> TexturesDelta {
        let mut input = RawInput::default();

        let mut viewport_info = ViewportInfo::default();
        viewport_info.native_pixels_per_point = Some(1.0);
        input.viewports.insert(ViewportId::ROOT, viewport_info);
        input.screen_rect = Some(egui::Rect::from_min_size(
            Pos2::ZERO,
            Vec2::new(width as f32, height as f32),
        ));
        input.time = Some(self.start_time.elapsed().as_secs_f64());
        input.focused = true;

        let output = self.ctx.run(input, |_| {});
        output.textures_delta
    }

    /// Lays out labels as font-textured triangles in NDC
    pub fn layout(&mut self, labels: &[HdrTextLabel], width: u32, height: u32) -> Vec<Vertex> {
        if labels.is_empty() || width == 0 || height == 0 {
            return Vec::new();
        }

        let mut vertices = Vec::new();

        for label in labels {
            let font_id = FontId::proportional(label.size);
            let galley = self.ctx.fonts_mut(|fonts| {
                fonts.layout_no_wrap(label.text.clone(), font_id, egui::Color32::WHITE)
            });

            let x = label.rect.center().x - galley.size().x / 2.0;
            let pos = Pos2::new(x, label.rect.min.y);

            let shape = egui::epaint::Shape::galley(pos, galley, egui::Color32::WHITE);
            let clipped = vec![egui::epaint::ClippedShape {
                clip_rect: egui::Rect::EVERYTHING,
                shape,
            }];

            for primitive in self.ctx.tessellate(clipped, 1.0) {
                let egui::epaint::Primitive::Mesh(mesh) = primitive.primitive else {
                    continue;
                };
                if mesh.texture_id != TextureId::Managed(0) {
                    continue;
                }

                for idx in mesh.indices.chunks_exact(3) {
                    for &i in idx {
                        let v = &mesh.vertices[i as usize];
                        let coverage = v.color.a() as f32 / 255.0;

                        vertices.push(Vertex {
                            position: to_ndc(glam::Vec2::new(v.pos.x, v.pos.y), width, height),
                            uv: [v.uv.x, v.uv.y],
                            color: [
                                label.color[0],
                                label.color[1],
                                label.color[2],
                                label.color[3] * coverage,
                            ],
                        });
                    }
                }
            }
        }

        vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readout(rect: Rect) -> HdrTextLabel {
        HdrTextLabel {
            text: "800 nits".to_string(),
            rect,
            color: [0.0, 0.0, 0.5, 1.0],
            size: 24.0,
        }
    }

    #[test]
    fn first_frame_uploads_font_atlas() {
        let mut text = TextRenderer::new();
        let delta = text.begin_frame(1920, 1080);
        assert!(delta.set.iter().any(|(id, _)| *id == TextureId::Managed(0)));
    }

    #[test]
    fn label_becomes_colored_triangles() {
        let mut text = TextRenderer::new();
        text.begin_frame(1920, 1080);

        let rect = Rect::from_min_size(glam::Vec2::new(870.0, 675.0), glam::Vec2::new(180.0, 40.0));
        let vertices = text.layout(&[readout(rect)], 1920, 1080);

        assert!(!vertices.is_empty());
        assert_eq!(vertices.len() % 3, 0);
        assert!(vertices.iter().all(|v| v.color[..3] == [0.0, 0.0, 0.5]));
    }

    #[test]
    fn label_is_centered_in_its_rect() {
        let mut text = TextRenderer::new();
        text.begin_frame(1920, 1080);

        let rect = Rect::from_min_size(glam::Vec2::new(870.0, 675.0), glam::Vec2::new(180.0, 40.0));
        let vertices = text.layout(&[readout(rect)], 1920, 1080);

        let min_x = vertices.iter().map(|v| v.position[0]).fold(f32::MAX, f32::min);
        let max_x = vertices.iter().map(|v| v.position[0]).fold(f32::MIN, f32::max);
        let center = (min_x + max_x) / 2.0;
        // rect center is x = 960, NDC 0.0; allow a few pixels of side bearing
        assert!(center.abs() < 0.01, "text center at {center}");

        let top = vertices.iter().map(|v| v.position[1]).fold(f32::MIN, f32::max);
        assert!(top <= to_ndc(rect.min, 1920, 1080)[1] + 0.005);
    }

    #[test]
    fn nothing_to_draw() {
        let mut text = TextRenderer::new();
        text.begin_frame(1920, 1080);
        assert!(text.layout(&[], 1920, 1080).is_empty());
    }
}
