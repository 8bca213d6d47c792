use anyhow::Result;
use opencv::{
    self as cv,
    core::{Mat, Point, Rect, Scalar, VecN, Vector},
};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

const BOX_COLOR: Scalar = VecN([0.0, 255.0, 0.0, 0.0]);
const BOX_THICKNESS: i32 = 2;

/// A connected region of the foreground mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Blob {
    pub rect: Rect,
    pub area: f64,
}

pub fn measure_contour(points: &[Point]) -> Result<Option<Blob>> {
    if points.is_empty() {
        return Ok(None);
    }
    let contour: Vector<Point> = points.iter().copied().collect();
    let area = cv::imgproc::contour_area(&contour, false)?;
    let rect = cv::imgproc::bounding_rect(&contour)?;
    Ok(Some(Blob { rect, area }))
}

/// Keeps the contours covering at least `min_area`, in contour order.
pub fn measure_contours(contours: &[Vec<Point>], min_area: f64) -> Result<Vec<Blob>> {
    contours
        .par_iter()
        .try_fold(Vec::new, |mut acc, contour| -> Result<Vec<Blob>> {
            if let Some(blob) = measure_contour(contour)? {
                if blob.area >= min_area {
                    acc.push(blob);
                }
            }
            Ok(acc)
        })
        .try_reduce(Vec::new, |mut a, mut b| {
            a.append(&mut b);
            Ok(a)
        })
}

/// Opposite corners of the drawn box. The far corner sits one pixel past the
/// blob, the same way `(x, y)`-`(x + w, y + h)` boxes are usually drawn.
pub fn box_corners(rect: Rect) -> (Point, Point) {
    (rect.tl(), rect.br())
}

pub fn draw_blobs(frame: &mut Mat, blobs: &[Blob]) -> Result<()> {
    for blob in blobs {
        let (tl, br) = box_corners(blob.rect);
        cv::imgproc::rectangle_points(
            frame,
            tl,
            br,
            BOX_COLOR,
            BOX_THICKNESS,
            cv::imgproc::LINE_8,
            0,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{black_frame, pixel_bgr};

    fn square(x: i32, y: i32, side: i32) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x, y + side - 1),
            Point::new(x + side - 1, y + side - 1),
            Point::new(x + side - 1, y),
        ]
    }

    #[test]
    fn test_measure_square() -> Result<()> {
        let blob = measure_contour(&square(10, 10, 20))?.unwrap();
        assert_eq!(blob.rect, Rect::new(10, 10, 20, 20));
        assert_eq!(blob.area, 361.0);
        Ok(())
    }

    #[test]
    fn test_area_ignores_orientation() -> Result<()> {
        let mut points = square(0, 0, 11);
        let cw = measure_contour(&points)?.unwrap();
        points.reverse();
        let ccw = measure_contour(&points)?.unwrap();
        assert_eq!(cw.area, 100.0);
        assert_eq!(cw, ccw);
        Ok(())
    }

    #[test]
    fn test_measure_triangle() -> Result<()> {
        let points = [Point::new(0, 0), Point::new(10, 0), Point::new(0, 6)];
        let blob = measure_contour(&points)?.unwrap();
        assert_eq!(blob.area, 30.0);
        assert_eq!(blob.rect, Rect::new(0, 0, 11, 7));
        Ok(())
    }

    #[test]
    fn test_degenerate_contours() -> Result<()> {
        assert!(measure_contour(&[])?.is_none());

        let dot = measure_contour(&[Point::new(4, 7)])?.unwrap();
        assert_eq!(dot.rect, Rect::new(4, 7, 1, 1));
        assert_eq!(dot.area, 0.0);
        Ok(())
    }

    #[test]
    fn test_min_area_filter() -> Result<()> {
        let contours = vec![
            square(0, 0, 10),   // 81
            square(20, 20, 30), // 841
            vec![],
            square(60, 0, 23), // 484
            square(90, 0, 24), // 529
        ];
        let blobs = measure_contours(&contours, 500.0)?;
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].rect, Rect::new(20, 20, 30, 30));
        assert_eq!(blobs[1].rect, Rect::new(90, 0, 24, 24));

        let exact = measure_contours(&contours, 529.0)?;
        assert_eq!(exact.len(), 2);
        Ok(())
    }

    #[test]
    fn test_box_reaches_past_blob() {
        let (tl, br) = box_corners(Rect::new(20, 20, 30, 30));
        assert_eq!(tl, Point::new(20, 20));
        assert_eq!(br, Point::new(50, 50));
    }

    #[test]
    fn test_draw_blobs() -> Result<()> {
        let mut frame = black_frame()?;
        let blob = Blob {
            rect: Rect::new(20, 20, 30, 30),
            area: 841.0,
        };
        draw_blobs(&mut frame, &[blob])?;
        assert_eq!(pixel_bgr(&frame, 20, 35)?, [0, 255, 0]);
        assert_eq!(pixel_bgr(&frame, 50, 35)?, [0, 255, 0]);
        assert_eq!(pixel_bgr(&frame, 35, 50)?, [0, 255, 0]);
        assert_eq!(pixel_bgr(&frame, 35, 35)?, [0, 0, 0]);
        Ok(())
    }
}
