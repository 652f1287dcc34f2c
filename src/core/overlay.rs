// Landmark overlay
// Turns a frame's landmarks into drawable layers (connections + points) and
// renders them with imageproc. Faces are drawn as the closed outline of the
// 468-point mesh, not the full mesh tessellation.

use crate::models::landmarks::{HolisticLandmarks, Keypoint3D, LandmarkGroup};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

// ==============================================================================
// Connection Topologies
// ==============================================================================

/// Body pose skeleton
pub const POSE_CONNECTIONS: [(usize, usize); 35] = [
    (0, 1), (1, 2), (2, 3), (3, 7), (0, 4), (4, 5), (5, 6), (6, 8), (9, 10),
    (11, 12), (11, 13), (13, 15), (15, 17), (15, 19), (15, 21), (17, 19),
    (12, 14), (14, 16), (16, 18), (16, 20), (16, 22), (18, 20),
    (11, 23), (12, 24), (23, 24), (23, 25), (24, 26), (25, 27), (26, 28),
    (27, 29), (28, 30), (29, 31), (30, 32), (27, 31), (28, 32),
];

/// Hand skeleton, wrist at 0
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

/// Closed face outline on the 468-point mesh
pub const FACE_OVAL: [(usize, usize); 36] = [
    (10, 338), (338, 297), (297, 332), (332, 284), (284, 251), (251, 389),
    (389, 356), (356, 454), (454, 323), (323, 361), (361, 288), (288, 397),
    (397, 365), (365, 379), (379, 378), (378, 400), (400, 377), (377, 152),
    (152, 148), (148, 176), (176, 149), (149, 150), (150, 136), (136, 172),
    (172, 58), (58, 132), (132, 93), (93, 234), (234, 127), (127, 162),
    (162, 21), (21, 54), (54, 103), (103, 67), (67, 109), (109, 10),
];

// ==============================================================================
// Styles and Layers
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayStyle {
    pub color: [u8; 3],
    pub line_width: u32,
}

impl OverlayStyle {
    pub const fn new(color: [u8; 3], line_width: u32) -> Self {
        Self { color, line_width }
    }

    /// CSS-style `#RRGGBB`
    pub fn hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.color[0], self.color[1], self.color[2])
    }
}

/// Drawable landmarks of one group
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayer {
    pub group: LandmarkGroup,
    pub points: Vec<Keypoint3D>,
    pub connections: &'static [(usize, usize)],
    pub connection_style: OverlayStyle,
    /// None when individual points are not drawn
    pub landmark_style: Option<OverlayStyle>,
}

impl OverlayLayer {
    /// Connection endpoints in pixel space. Edges that reference missing points are skipped.
    pub fn segments(&self, width: u32, height: u32) -> Vec<((f32, f32), (f32, f32))> {
        self.connections
            .iter()
            .filter_map(|&(a, b)| {
                let start = self.points.get(a)?;
                let end = self.points.get(b)?;
                Some((to_pixel(start, width, height), to_pixel(end, width, height)))
            })
            .collect()
    }
}

/// All layers for one frame, in draw order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayFrame {
    pub frame_id: u64,
    pub layers: Vec<OverlayLayer>,
}

impl OverlayFrame {
    pub fn layer(&self, group: LandmarkGroup) -> Option<&OverlayLayer> {
        self.layers.iter().find(|layer| layer.group == group)
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

fn styles_for(group: LandmarkGroup) -> (&'static [(usize, usize)], OverlayStyle, Option<OverlayStyle>) {
    match group {
        LandmarkGroup::Face => (&FACE_OVAL, OverlayStyle::new([0xC0, 0xC0, 0xC0], 1), None),
        LandmarkGroup::Pose => (
            &POSE_CONNECTIONS,
            OverlayStyle::new([0xFF, 0x00, 0x00], 2),
            Some(OverlayStyle::new([0x00, 0x00, 0xFF], 1)),
        ),
        LandmarkGroup::LeftHand => (
            &HAND_CONNECTIONS,
            OverlayStyle::new([0xCC, 0x00, 0x00], 2),
            Some(OverlayStyle::new([0x00, 0xFF, 0x00], 1)),
        ),
        LandmarkGroup::RightHand => (
            &HAND_CONNECTIONS,
            OverlayStyle::new([0x00, 0xCC, 0x00], 2),
            Some(OverlayStyle::new([0xFF, 0x00, 0x00], 1)),
        ),
    }
}

/// Build overlay layers for the groups present in a frame. Points are passed through untouched.
pub fn build_overlay(frame_id: u64, landmarks: &HolisticLandmarks) -> OverlayFrame {
    let layers = LandmarkGroup::ALL
        .into_iter()
        .filter_map(|group| {
            let points = landmarks.group(group)?;
            let (connections, connection_style, landmark_style) = styles_for(group);
            Some(OverlayLayer {
                group,
                points: points.to_vec(),
                connections,
                connection_style,
                landmark_style,
            })
        })
        .collect();

    OverlayFrame { frame_id, layers }
}

fn to_pixel(point: &Keypoint3D, width: u32, height: u32) -> (f32, f32) {
    (point.x * width as f32, point.y * height as f32)
}

// ==============================================================================
// Rendering
// ==============================================================================

/// Draw the overlay onto an image whose size defines the pixel space
pub fn draw_overlay(image: &mut RgbImage, overlay: &OverlayFrame) {
    let (width, height) = image.dimensions();

    for layer in &overlay.layers {
        let color = Rgb(layer.connection_style.color);
        let spread = layer.connection_style.line_width.saturating_sub(1) as f32;
        for (start, end) in layer.segments(width, height) {
            // Thick lines as a bundle of offset segments
            let mut offset = -spread / 2.0;
            while offset <= spread / 2.0 {
                draw_line_segment_mut(
                    image,
                    (start.0 + offset, start.1 + offset),
                    (end.0 + offset, end.1 + offset),
                    color,
                );
                offset += 1.0;
            }
        }

        if let Some(style) = layer.landmark_style {
            let radius = style.line_width.max(1) as i32 + 1;
            for point in &layer.points {
                let (x, y) = to_pixel(point, width, height);
                draw_filled_circle_mut(image, (x as i32, y as i32), radius, Rgb(style.color));
            }
        }
    }
}

/// Render the overlay on a black canvas
pub fn render_overlay(overlay: &OverlayFrame, width: u32, height: u32) -> RgbImage {
    let mut image = RgbImage::new(width, height);
    draw_overlay(&mut image, overlay);
    image
}
