//! Resize decoded frames down to the block grid resolution.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb as PixelRgb};
use tui_video_types::{GridGeometry, SourceFrame};

use crate::error::{VideoError, VideoResult};
use crate::grid::BlockGrid;

/// Bilinear resize of `frame` to `geometry`, reshaped into a [`BlockGrid`].
///
/// Frames already at the target size skip the resampling pass.
pub fn resize_to_grid(frame: &SourceFrame, geometry: GridGeometry) -> VideoResult<BlockGrid> {
    let (w, h) = (u32::from(geometry.width), u32::from(geometry.height));
    if frame.width == w && frame.height == h {
        return BlockGrid::from_rgb(&frame.data, geometry);
    }

    let src: ImageBuffer<PixelRgb<u8>, &[u8]> =
        ImageBuffer::from_raw(frame.width, frame.height, frame.data.as_slice()).ok_or_else(
            || {
                VideoError::bounds(format!(
                    "frame buffer of {} bytes does not hold {}x{} RGB pixels",
                    frame.data.len(),
                    frame.width,
                    frame.height
                ))
            },
        )?;

    let resized = imageops::resize(&src, w, h, FilterType::Triangle);
    BlockGrid::from_rgb(resized.as_raw(), geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tui_video_types::{Half, Rgb};

    #[test]
    fn same_size_frames_are_copied_verbatim() {
        let mut frame = SourceFrame::solid(2, 4, Rgb::BLACK);
        frame.set_pixel(1, 3, Rgb::WHITE);
        let grid = resize_to_grid(&frame, GridGeometry::new(2, 4).unwrap()).unwrap();
        assert_eq!(grid.color(1, Half::Lower, 1), Some(Rgb::WHITE));
        assert_eq!(grid.color(1, Half::Upper, 1), Some(Rgb::BLACK));
    }

    #[test]
    fn downscale_preserves_solid_color() {
        let frame = SourceFrame::solid(64, 48, Rgb::new(10, 200, 30));
        let geometry = GridGeometry::from_source(64, 48, 8).unwrap();
        let grid = resize_to_grid(&frame, geometry).unwrap();
        assert_eq!(grid.rows(), 4);
        assert_eq!(grid.cols(), 11);
        for row in 0..grid.rows() {
            for col in 0..grid.cols() {
                assert_eq!(grid.color(row, Half::Upper, col), Some(Rgb::new(10, 200, 30)));
            }
        }
    }

    #[test]
    fn truncated_frames_are_rejected() {
        let frame = SourceFrame {
            width: 8,
            height: 8,
            data: vec![0; 10],
        };
        let err = resize_to_grid(&frame, GridGeometry::new(4, 4).unwrap()).unwrap_err();
        assert!(matches!(err, VideoError::BoundsViolation(_)));
    }
}
