use image::{GrayImage, Luma};

/// Binary image: any non-zero pixel is foreground ("on")
pub type BinaryImage = GrayImage;

/// Check if a pixel is foreground
#[inline]
pub fn is_foreground(pixel: &Luma<u8>) -> bool {
    pixel[0] > 0
}

/// Count the foreground pixels of a binary image
pub fn count_foreground(image: &BinaryImage) -> u64 {
    image.pixels().filter(|p| is_foreground(p)).count() as u64
}

/// Copy out a rectangular region of the image.
/// The rectangle is clipped to the image bounds.
pub fn crop_region(image: &BinaryImage, x: u32, y: u32, width: u32, height: u32) -> BinaryImage {
    image::imageops::crop_imm(image, x, y, width, height).to_image()
}

/// Bounds of the `row`, `col` cell of an `regions` x `regions` grid laid over
/// the image. Cells have size floor(H/regions) x floor(W/regions); leftover
/// rows and columns at the bottom/right edge belong to no cell.
/// Returns (x, y, width, height).
pub fn region_bounds(width: u32, height: u32, regions: u32, row: u32, col: u32) -> (u32, u32, u32, u32) {
    if regions == 0 {
        return (0, 0, 0, 0);
    }
    let region_w = width / regions;
    let region_h = height / regions;
    (col * region_w, row * region_h, region_w, region_h)
}

/// Build a binary image from a predicate over pixel coordinates
pub fn binary_from_fn<F>(width: u32, height: u32, mut on: F) -> BinaryImage
where
    F: FnMut(u32, u32) -> bool,
{
    GrayImage::from_fn(width, height, |x, y| {
        if on(x, y) { Luma([255u8]) } else { Luma([0u8]) }
    })
}
