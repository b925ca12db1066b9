mod common;

use grabber_engine::{JpegNormalizer, NormalizeError, NormalizeSettings, Normalizer};
use image::{ColorType, DynamicImage, GrayImage, ImageFormat, Luma};
use pretty_assertions::assert_eq;

fn assert_canonical(bytes: &[u8], width: u32, height: u32) {
    assert_eq!(image::guess_format(bytes).unwrap(), ImageFormat::Jpeg);
    let decoded = image::load_from_memory(bytes).unwrap();
    assert_eq!(decoded.color(), ColorType::Rgb8);
    assert_eq!((decoded.width(), decoded.height()), (width, height));
}

#[test]
fn rgba_png_becomes_rgb_jpeg() {
    let out = JpegNormalizer::default().normalize(&common::png_bytes()).unwrap();
    assert_canonical(&out, 8, 6);
}

#[test]
fn jpeg_input_is_reencoded() {
    let out = JpegNormalizer::default().normalize(&common::jpeg_bytes()).unwrap();
    assert_canonical(&out, 8, 6);
}

#[test]
fn grayscale_input_gets_three_channels() {
    let gray = GrayImage::from_fn(5, 4, |x, _| Luma([(x * 50) as u8]));
    let png = common::encode(&DynamicImage::ImageLuma8(gray), ImageFormat::Png);
    let out = JpegNormalizer::default().normalize(&png).unwrap();
    assert_canonical(&out, 5, 4);
}

#[test]
fn gif_and_bmp_inputs_are_supported() {
    let rgba = common::rgba_image(4, 4);
    for format in [ImageFormat::Gif, ImageFormat::Bmp] {
        let bytes = common::encode(&rgba, format);
        let out = JpegNormalizer::default().normalize(&bytes).unwrap();
        assert_canonical(&out, 4, 4);
    }
}

#[test]
fn garbage_fails_to_decode() {
    let err = JpegNormalizer::default()
        .normalize(b"<html>not found</html>")
        .unwrap_err();
    assert!(matches!(err, NormalizeError::DecodeFailed(_)));
}

#[test]
fn lower_quality_gives_smaller_output() {
    let png = common::encode(&common::rgba_image(64, 64), ImageFormat::Png);
    let high = JpegNormalizer::new(NormalizeSettings {
        quality: 100,
        ..NormalizeSettings::default()
    })
    .normalize(&png)
    .unwrap();
    let low = JpegNormalizer::new(NormalizeSettings {
        quality: 10,
        ..NormalizeSettings::default()
    })
    .normalize(&png)
    .unwrap();
    assert!(low.len() < high.len());
}
