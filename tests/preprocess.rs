use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use imgclass::preprocess::{INPUT_SIZE, MEAN};
use imgclass::{Error, Preprocessor, TractEngine};

fn encode(image: impl Into<DynamicImage>, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Cursor::new(vec![]);
    image.into().write_to(&mut bytes, format).unwrap();
    bytes.into_inner()
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7) as u8, (y * 5) as u8, ((x + y) * 3) as u8])
    })
}

fn preprocessor() -> Preprocessor<TractEngine> {
    Preprocessor::new(TractEngine::new()).unwrap()
}

fn assert_all(values: &[f32], pixel: [f32; 3]) {
    for chunk in values.chunks(3) {
        assert_eq!(chunk, &pixel);
    }
}

#[test]
fn normalize_is_deterministic() {
    let jpeg = encode(gradient(37, 23), ImageFormat::Jpeg);
    let preprocessor = preprocessor();
    let first = preprocessor.normalize(&jpeg).unwrap();
    let second = preprocessor.normalize(&jpeg).unwrap();
    assert_eq!(first, second);
    let other = Preprocessor::new(TractEngine::new()).unwrap().normalize(&jpeg).unwrap();
    assert_eq!(first, other);
}

#[test]
fn small_image_is_stretched() {
    let jpeg = encode(gradient(10, 10), ImageFormat::Jpeg);
    let tensor = preprocessor().normalize(&jpeg).unwrap();
    assert_eq!(tensor.shape(), &[1, INPUT_SIZE, INPUT_SIZE, 3]);
}

#[test]
fn large_image_is_shrunk() {
    let png = encode(RgbImage::from_pixel(4000, 3000, Rgb([200, 100, 50])), ImageFormat::Png);
    let tensor = preprocessor().normalize(&png).unwrap();
    assert_eq!(tensor.shape(), &[1, INPUT_SIZE, INPUT_SIZE, 3]);
    assert_all(tensor.as_slice::<f32>().unwrap(), [200.0 - MEAN, 100.0 - MEAN, 50.0 - MEAN]);
}

#[test]
fn non_square_image_is_not_letterboxed() {
    let png = encode(RgbImage::from_pixel(300, 20, Rgb([255, 255, 255])), ImageFormat::Png);
    let tensor = preprocessor().normalize(&png).unwrap();
    assert_eq!(tensor.shape(), &[1, INPUT_SIZE, INPUT_SIZE, 3]);
    assert_all(tensor.as_slice::<f32>().unwrap(), [255.0 - MEAN; 3]);
}

#[test]
fn grayscale_is_expanded_to_rgb() {
    let png = encode(GrayImage::from_pixel(8, 6, Luma([150])), ImageFormat::Png);
    let tensor = preprocessor().normalize(&png).unwrap();
    assert_eq!(tensor.shape(), &[1, INPUT_SIZE, INPUT_SIZE, 3]);
    assert_all(tensor.as_slice::<f32>().unwrap(), [150.0 - MEAN; 3]);
}

#[test]
fn alpha_is_dropped() {
    let png = encode(RgbaImage::from_pixel(5, 5, Rgba([10, 20, 30, 0])), ImageFormat::Png);
    let tensor = preprocessor().normalize(&png).unwrap();
    assert_eq!(tensor.shape(), &[1, INPUT_SIZE, INPUT_SIZE, 3]);
    assert_all(tensor.as_slice::<f32>().unwrap(), [10.0 - MEAN, 20.0 - MEAN, 30.0 - MEAN]);
}

#[test]
fn garbage_bytes_are_a_decode_error() {
    let err = preprocessor().normalize(b"this is a text file, not a picture").unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "{err:?}");
    let err = preprocessor().normalize(&[]).unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "{err:?}");
}
