use glam::Vec2;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

/// Axis-aligned rectangle in surface pixels, origin top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn from_min_size(min: Vec2, size: Vec2) -> Self {
        Self { min, max: min + size }
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// A rect of `size` centered inside this one
    pub fn centered(&self, size: Vec2) -> Self {
        Self::from_min_size(self.center() - size * 0.5, size)
    }
}

/// Converts a pixel position to normalized device coordinates
pub fn to_ndc(pos: Vec2, width: u32, height: u32) -> [f32; 2] {
    [
        (pos.x / width as f32) * 2.0 - 1.0,
        1.0 - (pos.y / height as f32) * 2.0,
    ]
}

/// Appends two triangles covering `rect` with a solid color
pub fn add_quad(vertices: &mut Vec<Vertex>, rect: Rect, width: u32, height: u32, color: [f32; 4]) {
    let uv = [1.0, 1.0];
    let [x0, y0] = to_ndc(rect.min, width, height);
    let [x1, y1] = to_ndc(rect.max, width, height);

    for position in [[x0, y0], [x0, y1], [x1, y1], [x0, y0], [x1, y1], [x1, y0]] {
        vertices.push(Vertex { position, uv, color });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_map_to_ndc() {
        assert_eq!(to_ndc(Vec2::ZERO, 1920, 1080), [-1.0, 1.0]);
        assert_eq!(to_ndc(Vec2::new(1920.0, 1080.0), 1920, 1080), [1.0, -1.0]);
        assert_eq!(to_ndc(Vec2::new(960.0, 540.0), 1920, 1080), [0.0, 0.0]);
    }

    #[test]
    fn quad_covers_rect() {
        let mut vertices = Vec::new();
        let rect = Rect::from_min_size(Vec2::new(480.0, 270.0), Vec2::new(960.0, 540.0));
        add_quad(&mut vertices, rect, 1920, 1080, [1.0, 0.0, 0.0, 1.0]);

        assert_eq!(vertices.len(), 6);
        assert_eq!(vertices[0].position, [-0.5, 0.5]);
        assert_eq!(vertices[2].position, [0.5, -0.5]);
        assert!(vertices.iter().all(|v| v.color == [1.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn centered_rect() {
        let outer = Rect::from_min_size(Vec2::new(10.0, 10.0), Vec2::splat(100.0));
        let inner = outer.centered(Vec2::splat(50.0));
        assert_eq!(inner.min, Vec2::new(35.0, 35.0));
        assert_eq!(inner.size(), Vec2::splat(50.0));
    }
}
