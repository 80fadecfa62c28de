use crate::geometry::Rect;
use glam::Vec2;

/// Height reserved for a line of readout text
pub const TEXT_LINE_HEIGHT: f32 = 40.0;

/// Placement of the calibration squares and their text, in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SquareLayout {
    pub outer: Rect,
    pub inner: Rect,
    /// Below the outer square, one gap away
    pub readout: Rect,
    /// Above the outer square, mirroring `readout`
    pub caption: Rect,
}

impl SquareLayout {
    /// Returns `None` for a zero-sized surface.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let screen = Rect::from_min_size(Vec2::ZERO, Vec2::new(width as f32, height as f32));

        let side = height as f32 / 6.0;
        let outer = screen.centered(Vec2::splat(side));
        let inner = outer.centered(Vec2::splat(side / 2.0));
        let gap = (side - side / 2.0) / 2.0;

        let readout = Rect::from_min_size(
            Vec2::new(outer.min.x, outer.max.y + gap),
            Vec2::new(side, TEXT_LINE_HEIGHT),
        );
        // Short surfaces would push the caption off the top edge
        let caption = Rect {
            min: Vec2::new(outer.min.x, (outer.min.y - gap - TEXT_LINE_HEIGHT).max(0.0)),
            max: Vec2::new(outer.max.x, (outer.min.y - gap).max(0.0)),
        };

        Some(Self {
            outer,
            inner,
            readout,
            caption,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_hd_placement() {
        let layout = SquareLayout::new(1920, 1080).unwrap();

        assert_eq!(layout.outer.min, Vec2::new(870.0, 450.0));
        assert_eq!(layout.outer.size(), Vec2::splat(180.0));
        assert_eq!(layout.inner.min, Vec2::new(915.0, 495.0));
        assert_eq!(layout.inner.size(), Vec2::splat(90.0));
        // 45 px gap between the squares and to the text rects
        assert_eq!(layout.inner.min - layout.outer.min, Vec2::splat(45.0));
        assert_eq!(layout.readout.min, Vec2::new(870.0, 675.0));
        assert_eq!(layout.readout.max, Vec2::new(1050.0, 715.0));
        assert_eq!(layout.caption.max.y, 405.0);
        assert_eq!(layout.caption.min.y, 365.0);
    }

    #[test]
    fn caption_stays_on_short_surfaces() {
        let layout = SquareLayout::new(640, 100).unwrap();
        assert_eq!(layout.caption.min.y, 0.0);
        assert!(layout.caption.max.y <= layout.outer.min.y);
        assert_eq!(layout.caption.min.x, layout.outer.min.x);
    }

    #[test]
    fn square_scales_with_height_only() {
        let wide = SquareLayout::new(3840, 1080).unwrap();
        assert_eq!(wide.outer.size(), Vec2::splat(180.0));
        assert_eq!(wide.outer.center(), Vec2::new(1920.0, 540.0));
    }

    #[test]
    fn empty_surface_has_no_layout() {
        assert!(SquareLayout::new(0, 1080).is_none());
        assert!(SquareLayout::new(1920, 0).is_none());
    }
}
