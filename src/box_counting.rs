// src/box_counting.rs - Occupied-box counting over a binary image

use crate::image_utils::{is_foreground, BinaryImage};

/// Count the boxes of a `box_size` grid (anchored at the origin) that contain
/// at least one foreground pixel.
///
/// Boxes on the right and bottom edges may be truncated by the image border.
/// A box size larger than the image yields a single box. A box size of 0 is
/// treated as 1.
pub fn count_occupied_boxes(image: &BinaryImage, box_size: u32) -> usize {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return 0;
    }

    let box_size = box_size.max(1);
    let boxes_x = width.div_ceil(box_size) as usize;
    let boxes_y = height.div_ceil(box_size) as usize;

    let mut occupied = vec![false; boxes_x * boxes_y];
    for (x, y, pixel) in image.enumerate_pixels() {
        if is_foreground(pixel) {
            let bx = (x / box_size) as usize;
            let by = (y / box_size) as usize;
            occupied[by * boxes_x + bx] = true;
        }
    }

    occupied.into_iter().filter(|&o| o).count()
}

/// Box sizes from `max_size` halved down to `min_size` (inclusive),
/// sorted ascending without duplicates.
pub fn generate_box_sizes(min_size: u32, max_size: u32) -> Vec<u32> {
    // Halving has to stop above zero
    let min_size = min_size.max(1);

    let mut sizes = Vec::new();
    let mut size = max_size;
    while size >= min_size {
        sizes.push(size);
        size /= 2;
    }

    sizes.sort_unstable();
    sizes.dedup();
    sizes
}
