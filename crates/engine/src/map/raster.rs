use std::io::Cursor;

use image::ImageReader;

use super::MapError;

/// Decoded map image: one RGB triple per tile, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbRaster {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 3]>,
}

impl RgbRaster {
    pub fn new(width: u32, height: u32, pixels: Vec<[u8; 3]>) -> Result<Self, MapError> {
        if width == 0 || height == 0 {
            return Err(MapError::EmptyRaster { width, height });
        }
        let expected = width as usize * height as usize;
        if pixels.len() != expected {
            return Err(MapError::PixelCountMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn from_png_bytes(bytes: &[u8]) -> Result<Self, MapError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|source| MapError::Io { source })?;
        let decoded = reader
            .decode()
            .map_err(|error| MapError::Decode(error.to_string()))?;
        Self::from_rgb_image(decoded.to_rgb8())
    }

    fn from_rgb_image(image: image::RgbImage) -> Result<Self, MapError> {
        let width = image.width();
        let height = image.height();
        let pixels = image.pixels().map(|pixel| pixel.0).collect::<Vec<_>>();
        Self::new(width, height, pixels)
    }

    /// Renders text art into a raster, one glyph per tile.
    pub fn from_text_art(rows: &[&str], palette: &[(char, [u8; 3])]) -> Result<Self, MapError> {
        let height = rows.len() as u32;
        let width = rows.first().map(|row| row.chars().count()).unwrap_or(0) as u32;
        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        for (y, row) in rows.iter().enumerate() {
            let row_width = row.chars().count() as u32;
            if row_width != width {
                return Err(MapError::RaggedRow {
                    row: y,
                    expected: width,
                    actual: row_width,
                });
            }
            for (x, glyph) in row.chars().enumerate() {
                let rgb = palette
                    .iter()
                    .find(|(candidate, _)| *candidate == glyph)
                    .map(|(_, rgb)| *rgb)
                    .ok_or(MapError::UnknownGlyph { glyph, x, y })?;
                pixels.push(rgb);
            }
        }
        Self::new(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

pub fn rgb_to_hex([r, g, b]: [u8; 3]) -> String {
    format!("{r:02x}{g:02x}{b:02x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_raster_is_rejected() {
        let err = RgbRaster::new(0, 4, Vec::new()).expect_err("empty");
        assert!(matches!(err, MapError::EmptyRaster { width: 0, height: 4 }));
    }

    #[test]
    fn png_bytes_decode_to_rgb_pixels() {
        let mut image = image::RgbImage::new(2, 1);
        image.put_pixel(0, 0, image::Rgb([255, 0, 0]));
        image.put_pixel(1, 0, image::Rgb([0, 16, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode png");

        let raster = RgbRaster::from_png_bytes(&bytes).expect("decode");
        assert_eq!(raster.width(), 2);
        assert_eq!(raster.pixel(1, 0), Some([0, 16, 255]));
        assert_eq!(rgb_to_hex(raster.pixel(1, 0).expect("pixel")), "0010ff");
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(RgbRaster::from_png_bytes(b"not an image").is_err());
    }

    #[test]
    fn text_art_reports_unknown_glyph_and_ragged_rows() {
        let palette = [('.', [0, 0, 0]), ('#', [255, 255, 255])];
        let raster = RgbRaster::from_text_art(&["#.", ".#"], &palette).expect("art");
        assert_eq!(raster.pixel(1, 1), Some([255, 255, 255]));

        let err = RgbRaster::from_text_art(&["#?"], &palette).expect_err("glyph");
        assert!(matches!(err, MapError::UnknownGlyph { glyph: '?', x: 1, y: 0 }));

        let err = RgbRaster::from_text_art(&["##", "#"], &palette).expect_err("ragged");
        assert!(matches!(err, MapError::RaggedRow { row: 1, .. }));
    }
}
