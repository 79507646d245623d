//! PNG encoding for raw PDF image samples.

use crate::error::{DocgateError, Result};

/// Decoded samples of an image XObject, rows byte-aligned as in PDF.
#[derive(Debug, Clone, Copy)]
pub struct Raster<'a> {
    pub width: u32,
    pub height: u32,
    /// Color components per pixel: 1 gray, 3 RGB, 4 CMYK.
    pub components: u8,
    pub bits_per_component: u8,
    pub samples: &'a [u8],
}

impl Raster<'_> {
    fn row_bytes(&self) -> usize {
        (self.width as usize * self.components as usize * self.bits_per_component as usize).div_ceil(8)
    }
}

fn unsupported(raster: &Raster<'_>) -> DocgateError {
    DocgateError::Extraction(format!(
        "unsupported image layout: {} components at {} bits",
        raster.components, raster.bits_per_component
    ))
}

/// Naive CMYK to RGB for 8-bit samples.
fn cmyk_to_rgb(samples: &[u8]) -> Vec<u8> {
    samples
        .chunks_exact(4)
        .flat_map(|p| {
            let k = 255 - u16::from(p[3]);
            [0, 1, 2].map(|c| ((255 - u16::from(p[c])) * k / 255) as u8)
        })
        .collect()
}

/// Encode raw samples as a PNG file.
pub fn encode_png(raster: &Raster<'_>) -> Result<Vec<u8>> {
    if raster.width == 0 || raster.height == 0 {
        return Err(DocgateError::Extraction("image has no pixels".to_string()));
    }

    let expected = raster.row_bytes() * raster.height as usize;
    if raster.samples.len() < expected {
        return Err(DocgateError::Extraction(format!(
            "image data too short: {} bytes, expected {}",
            raster.samples.len(),
            expected
        )));
    }
    let samples = &raster.samples[..expected];

    let depth = match raster.bits_per_component {
        1 => png::BitDepth::One,
        2 => png::BitDepth::Two,
        4 => png::BitDepth::Four,
        8 => png::BitDepth::Eight,
        16 => png::BitDepth::Sixteen,
        _ => return Err(unsupported(raster)),
    };

    let (color, data) = match (raster.components, depth) {
        (1, _) => (png::ColorType::Grayscale, samples.to_vec()),
        (3, png::BitDepth::Eight | png::BitDepth::Sixteen) => (png::ColorType::Rgb, samples.to_vec()),
        (4, png::BitDepth::Eight) => (png::ColorType::Rgb, cmyk_to_rgb(samples)),
        _ => return Err(unsupported(raster)),
    };

    let encode_err = |e: png::EncodingError| DocgateError::Extraction(format!("PNG encoding failed: {}", e));
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, raster.width, raster.height);
        encoder.set_color(color);
        encoder.set_depth(depth);
        let mut writer = encoder.write_header().map_err(encode_err)?;
        writer.write_image_data(&data).map_err(encode_err)?;
        writer.finish().map_err(encode_err)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> (png::OutputInfo, Vec<u8>) {
        let mut reader = png::Decoder::new(bytes).read_info().unwrap();
        let mut buf = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        buf.truncate(info.buffer_size());
        (info, buf)
    }

    #[test]
    fn test_rgb_round_trips_pixels() {
        let samples: Vec<u8> = (0..2 * 2 * 3).map(|i| i as u8 * 10).collect();
        let png = encode_png(&Raster {
            width: 2,
            height: 2,
            components: 3,
            bits_per_component: 8,
            samples: &samples,
        })
        .unwrap();

        let (info, pixels) = decode(&png);
        assert_eq!((info.width, info.height), (2, 2));
        assert_eq!(info.color_type, png::ColorType::Rgb);
        assert_eq!(pixels, samples);
    }

    #[test]
    fn test_one_bit_gray() {
        // 3 pixels per row pad to one byte per row.
        let png = encode_png(&Raster {
            width: 3,
            height: 2,
            components: 1,
            bits_per_component: 1,
            samples: &[0b1010_0000, 0b0100_0000],
        })
        .unwrap();

        let reader = png::Decoder::new(png.as_slice()).read_info().unwrap();
        assert_eq!(reader.info().color_type, png::ColorType::Grayscale);
        assert_eq!(reader.info().bit_depth, png::BitDepth::One);
    }

    #[test]
    fn test_cmyk_becomes_rgb() {
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 0, 255, 0, 0, 0]), vec![255, 255, 255, 0, 255, 255]);

        let png = encode_png(&Raster {
            width: 1,
            height: 1,
            components: 4,
            bits_per_component: 8,
            samples: &[0, 255, 255, 0],
        })
        .unwrap();
        let (info, pixels) = decode(&png);
        assert_eq!(info.color_type, png::ColorType::Rgb);
        assert_eq!(pixels, vec![255, 0, 0]);
    }

    #[test]
    fn test_rejects_short_or_odd_layouts() {
        let short = Raster {
            width: 4,
            height: 4,
            components: 3,
            bits_per_component: 8,
            samples: &[0; 10],
        };
        assert!(matches!(encode_png(&short), Err(DocgateError::Extraction(_))));

        let rgb_four_bit = Raster {
            width: 1,
            height: 1,
            components: 3,
            bits_per_component: 4,
            samples: &[0; 2],
        };
        assert!(encode_png(&rgb_four_bit).is_err());
    }
}
