//! Fit/alignment policies and the transform that maps artboard bounds onto a
//! surface.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Aabb {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Box anchored at the origin.
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// Scale policy applied when mapping content bounds into a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fit {
    Cover,
    #[default]
    Contain,
    Fill,
    FitWidth,
    FitHeight,
    ScaleDown,
    None,
}

/// Anchor within the frame, expressed on a [-1, 1] grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    #[default]
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl Alignment {
    /// Normalized (x, y) anchor; -1 is the left/top edge, 1 the right/bottom.
    pub fn anchor(self) -> (f32, f32) {
        match self {
            Alignment::TopLeft => (-1.0, -1.0),
            Alignment::TopCenter => (0.0, -1.0),
            Alignment::TopRight => (1.0, -1.0),
            Alignment::CenterLeft => (-1.0, 0.0),
            Alignment::Center => (0.0, 0.0),
            Alignment::CenterRight => (1.0, 0.0),
            Alignment::BottomLeft => (-1.0, 1.0),
            Alignment::BottomCenter => (0.0, 1.0),
            Alignment::BottomRight => (1.0, 1.0),
        }
    }
}

/// 2D affine transform `[xx, xy, yx, yy, tx, ty]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mat2D(pub [f32; 6]);

impl Mat2D {
    pub const IDENTITY: Mat2D = Mat2D([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn scale_x(&self) -> f32 {
        self.0[0]
    }

    pub fn scale_y(&self) -> f32 {
        self.0[3]
    }

    pub fn translation(&self) -> (f32, f32) {
        (self.0[4], self.0[5])
    }

    /// Map a point through the transform.
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        let m = &self.0;
        (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
    }
}

/// Compute the transform that places `content` inside `frame` according to
/// `fit` and `alignment`.
pub fn compute_alignment(fit: Fit, alignment: Alignment, frame: Aabb, content: Aabb) -> Mat2D {
    let content_w = content.width();
    let content_h = content.height();
    if content_w <= 0.0 || content_h <= 0.0 {
        return Mat2D::IDENTITY;
    }
    let (ax, ay) = alignment.anchor();

    // Move the content's anchor point to the origin.
    let x = -content.min_x - content_w / 2.0 - ax * content_w / 2.0;
    let y = -content.min_y - content_h / 2.0 - ay * content_h / 2.0;

    let fw = frame.width() / content_w;
    let fh = frame.height() / content_h;
    let (sx, sy) = match fit {
        Fit::Fill => (fw, fh),
        Fit::Contain => {
            let s = fw.min(fh);
            (s, s)
        }
        Fit::Cover => {
            let s = fw.max(fh);
            (s, s)
        }
        Fit::FitWidth => (fw, fw),
        Fit::FitHeight => (fh, fh),
        Fit::None => (1.0, 1.0),
        Fit::ScaleDown => {
            let s = fw.min(fh).min(1.0);
            (s, s)
        }
    };

    // Anchor point in frame space.
    let tx = frame.min_x + frame.width() / 2.0 + ax * frame.width() / 2.0;
    let ty = frame.min_y + frame.height() / 2.0 + ay * frame.height() / 2.0;

    Mat2D([sx, 0.0, 0.0, sy, tx + sx * x, ty + sy * y])
}
