use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::annotation::font::LabelFont;
use crate::models::PixelBox;

/// Preferred distance of the label above the box's top edge
pub const LABEL_OFFSET_ABOVE: i32 = 15;
/// Distance of the label below the box when it cannot go above
pub const LABEL_OFFSET_BELOW: i32 = 5;
/// Labels whose top would land at or within this many pixels of the image
/// top are moved below the box
pub const LABEL_TOP_MARGIN: i32 = 5;

/// Draw a rectangle outline `line_width` pixels thick, growing inwards from
/// the box edge
pub fn draw_box_outline(canvas: &mut RgbImage, bbox: &PixelBox, color: Rgb<u8>, line_width: u32) {
    let (width, height) = (bbox.width(), bbox.height());

    for inset in 0..line_width {
        if width <= 2 * inset || height <= 2 * inset {
            break;
        }
        let rect = Rect::at((bbox.min_x + inset) as i32, (bbox.min_y + inset) as i32)
            .of_size(width - 2 * inset, height - 2 * inset);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

/// Top-left corner of the label for a box
pub fn label_origin(bbox: &PixelBox) -> (i32, i32) {
    let x = bbox.min_x as i32;
    let above = bbox.min_y as i32 - LABEL_OFFSET_ABOVE;
    let y = if above <= LABEL_TOP_MARGIN {
        bbox.max_y as i32 + LABEL_OFFSET_BELOW
    } else {
        above
    };
    (x, y)
}

pub fn draw_label(canvas: &mut RgbImage, bbox: &PixelBox, text: &str, color: Rgb<u8>, font: &LabelFont) {
    let (x, y) = label_origin(bbox);
    font.draw(canvas, color, x, y, text);
}
