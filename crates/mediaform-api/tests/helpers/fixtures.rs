//! Media fixtures generated in memory.

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

/// A colourful PNG so filters have something to change
pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode(gradient(width, height), ImageFormat::Png)
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(gradient(width, height), ImageFormat::Jpeg)
}

/// Bytes with an `.mp4` name that no decoder can read
pub fn corrupt_mp4() -> Vec<u8> {
    b"this is definitely not an mp4 container".to_vec()
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x * 3 + y) % 256) as u8])
    })
}

fn encode(img: RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).expect("encode fixture");
    buf.into_inner()
}
