#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use grabber_engine::{EngineEvent, ProgressSink};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

#[derive(Default, Clone)]
pub struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Small RGBA image with partial transparency.
pub fn rgba_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 20) as u8, (y * 20) as u8, 128, if x % 2 == 0 { 255 } else { 64 }])
    });
    DynamicImage::ImageRgba8(img)
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, format).unwrap();
    out.into_inner()
}

pub fn png_bytes() -> Vec<u8> {
    encode(&rgba_image(8, 6), ImageFormat::Png)
}

pub fn jpeg_bytes() -> Vec<u8> {
    encode(&DynamicImage::ImageRgb8(rgba_image(8, 6).to_rgb8()), ImageFormat::Jpeg)
}
