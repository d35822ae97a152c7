//! Mapping recognized token boxes onto PDF page space.
//!
//! Token boxes are in bitmap pixels with a top-left origin. Dividing by the
//! page's raster scale gives points in the page as displayed (rotation
//! applied, top-left origin). The displayed point is then mapped back through
//! `/Rotate` into unrotated user space and shifted by the MediaBox origin.

use crate::types::{PageResult, RecognitionToken};

/// Advance widths of Helvetica for printable ASCII (32..=126), per 1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const DEFAULT_WIDTH: u16 = 556;

/// Width of `text` set in Helvetica at size 1.
pub fn helvetica_text_width(text: &str) -> f64 {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if (32..=126).contains(&code) {
                HELVETICA_WIDTHS[(code - 32) as usize]
            } else {
                DEFAULT_WIDTH
            }
        })
        .map(|w| f64::from(w) / 1000.0)
        .sum()
}

/// Size and orientation of a PDF page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Visible region `[llx, lly, urx, ury]`: the CropBox clipped to the MediaBox.
    pub view_box: [f64; 4],
    /// Clockwise display rotation: 0, 90, 180 or 270.
    pub rotation: u16,
}

impl PageGeometry {
    /// Normalizes `rotate` to a multiple of 90 in `0..360` and the box to a positive extent.
    pub fn new(view_box: [f64; 4], rotate: i64) -> Self {
        let [x0, y0, x1, y1] = view_box;
        let quarter_turns = ((rotate as f64 / 90.0).round() as i64).rem_euclid(4);
        Self {
            view_box: [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)],
            rotation: (quarter_turns * 90) as u16,
        }
    }

    pub fn width(&self) -> f64 {
        self.view_box[2] - self.view_box[0]
    }

    pub fn height(&self) -> f64 {
        self.view_box[3] - self.view_box[1]
    }

    /// Page size as displayed, after rotation.
    pub fn display_size(&self) -> (f64, f64) {
        match self.rotation {
            90 | 270 => (self.height(), self.width()),
            _ => (self.width(), self.height()),
        }
    }

    /// Map a displayed point (top-left origin, points) into user space.
    pub fn to_user_space(&self, dx: f64, dy: f64) -> (f64, f64) {
        let (w, h) = (self.width(), self.height());
        let (x, y) = match self.rotation {
            90 => (dy, dx),
            180 => (w - dx, dy),
            270 => (w - dy, h - dx),
            _ => (dx, h - dy),
        };
        (x + self.view_box[0], y + self.view_box[1])
    }
}

/// Where and how one invisible token is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPlacement {
    pub text: String,
    /// Box in displayed page points, top-left origin.
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Baseline origin in user space.
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    /// Horizontal scaling percentage (`Tz`) that stretches the text to the box width.
    pub horizontal_scale: f64,
    /// Counter-clockwise angle of the text direction in user space, degrees.
    pub angle: u16,
}

/// Place one token on a page rendered at `scale` pixels per point.
pub fn place_token(token: &RecognitionToken, scale: f64, geometry: &PageGeometry) -> Option<TextPlacement> {
    let text = token.text.trim();
    if text.is_empty() || scale <= 0.0 || token.bbox.height == 0 {
        return None;
    }

    let left = f64::from(token.bbox.left) / scale;
    let top = f64::from(token.bbox.top) / scale;
    let width = f64::from(token.bbox.width) / scale;
    let height = f64::from(token.bbox.height) / scale;

    let (x, y) = geometry.to_user_space(left, top + height);
    let natural_width = helvetica_text_width(text) * height;
    let horizontal_scale = if natural_width > 0.0 && width > 0.0 {
        100.0 * width / natural_width
    } else {
        100.0
    };

    Some(TextPlacement {
        text: text.to_string(),
        left,
        top,
        width,
        height,
        x,
        y,
        font_size: height,
        horizontal_scale,
        angle: geometry.rotation,
    })
}

/// Placements for every layer token of a recognized page.
pub fn place_page(page: &PageResult, geometry: &PageGeometry) -> Vec<TextPlacement> {
    page.layer_tokens()
        .into_iter()
        .filter_map(|token| place_token(token, page.scale, geometry))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingBox, TokenLevel};

    fn token(text: &str, left: u32, top: u32, width: u32, height: u32) -> RecognitionToken {
        RecognitionToken {
            text: text.to_string(),
            confidence: 95.0,
            bbox: BoundingBox::new(left, top, width, height),
            level: TokenLevel::Word,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_unrotated_placement() {
        let geometry = PageGeometry::new([0.0, 0.0, 612.0, 792.0], 0);
        let placement = place_token(&token("HELLO", 100, 200, 300, 50), 4.0, &geometry).unwrap();

        assert!(close(placement.left, 25.0));
        assert!(close(placement.top, 50.0));
        assert!(close(placement.width, 75.0));
        assert!(close(placement.font_size, 12.5));
        assert!(close(placement.x, 25.0));
        assert!(close(placement.y, 792.0 - 62.5));
        assert_eq!(placement.angle, 0);
    }

    #[test]
    fn test_horizontal_scale_fits_box() {
        let geometry = PageGeometry::new([0.0, 0.0, 100.0, 100.0], 0);
        let placement = place_token(&token("ii", 0, 0, 40, 10), 1.0, &geometry).unwrap();
        let drawn = helvetica_text_width("ii") * placement.font_size * placement.horizontal_scale / 100.0;
        assert!(close(drawn, 40.0));
    }

    #[test]
    fn test_view_box_origin_offset() {
        let geometry = PageGeometry::new([10.0, 20.0, 110.0, 220.0], 0);
        let (x, y) = geometry.to_user_space(0.0, 0.0);
        assert!(close(x, 10.0));
        assert!(close(y, 220.0));
    }

    #[test]
    fn test_rotated_corners() {
        // Displayed top-left corner for each rotation.
        let cases = [(0, (0.0, 200.0)), (90, (0.0, 0.0)), (180, (100.0, 0.0)), (270, (100.0, 200.0))];
        for (rotate, expected) in cases {
            let geometry = PageGeometry::new([0.0, 0.0, 100.0, 200.0], rotate);
            let (x, y) = geometry.to_user_space(0.0, 0.0);
            assert!(close(x, expected.0) && close(y, expected.1), "rotation {}", rotate);
        }
    }

    #[test]
    fn test_rotated_display_size() {
        let geometry = PageGeometry::new([0.0, 0.0, 100.0, 200.0], -90);
        assert_eq!(geometry.rotation, 270);
        assert_eq!(geometry.display_size(), (200.0, 100.0));
        // The displayed bottom-right corner is the opposite user-space corner.
        let (x, y) = geometry.to_user_space(200.0, 100.0);
        assert!(close(x, 0.0) && close(y, 0.0));
    }

    #[test]
    fn test_blank_tokens_are_skipped() {
        let geometry = PageGeometry::new([0.0, 0.0, 100.0, 100.0], 0);
        assert!(place_token(&token("  ", 0, 0, 10, 10), 1.0, &geometry).is_none());
        assert!(place_token(&token("a", 0, 0, 10, 0), 1.0, &geometry).is_none());
    }
}
