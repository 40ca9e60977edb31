//! Integration tests for file loading and image decoding.

use std::path::PathBuf;

use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
use vkframe_resources::{ResourceError, decode, read_bytes, read_shader_bytes};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("vkframe-resources-{}-{}", std::process::id(), name))
}

#[test]
fn test_read_bytes_returns_file_contents() {
    let path = temp_path("bytes.bin");
    std::fs::write(&path, [1u8, 2, 3, 4]).unwrap();

    assert_eq!(read_bytes(&path).unwrap(), vec![1, 2, 3, 4]);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_missing_file_is_not_found() {
    let path = temp_path("does-not-exist.spv");

    match read_bytes(&path) {
        Err(ResourceError::FileNotFound(p)) => assert_eq!(p, path),
        other => panic!("expected FileNotFound, got {:?}", other),
    }
    assert!(matches!(
        read_shader_bytes(&path),
        Err(ResourceError::FileNotFound(_))
    ));
}

#[test]
fn test_directory_is_io_error() {
    let dir = std::env::temp_dir();
    assert!(matches!(read_bytes(&dir), Err(ResourceError::Io { .. })));
}

#[test]
fn test_empty_shader_is_rejected() {
    let path = temp_path("empty.spv");
    std::fs::write(&path, []).unwrap();

    // Plain reads accept empty files, shader reads do not.
    assert!(read_bytes(&path).unwrap().is_empty());
    assert!(matches!(
        read_shader_bytes(&path),
        Err(ResourceError::EmptyFile(_))
    ));

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_decode_rgba_png() {
    let path = temp_path("rgba.png");
    let mut img = RgbaImage::new(2, 1);
    img.put_pixel(0, 0, Rgba([255, 0, 0, 128]));
    img.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
    img.save(&path).unwrap();

    let decoded = decode(&path).unwrap();
    assert_eq!((decoded.width, decoded.height), (2, 1));
    assert_eq!(decoded.channels, 4);
    assert_eq!(decoded.pixels, vec![255, 0, 0, 128, 0, 0, 255, 255]);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_decode_expands_rgb_to_rgba() {
    let path = temp_path("rgb.png");
    let img = RgbImage::from_pixel(3, 2, Rgb([10, 20, 30]));
    img.save(&path).unwrap();

    let decoded = decode(&path).unwrap();
    assert_eq!(decoded.channels, 3);
    assert_eq!(decoded.byte_len(), 3 * 2 * 4);
    for pixel in decoded.pixels.chunks_exact(4) {
        assert_eq!(pixel, &[10, 20, 30, 255]);
    }

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_decode_expands_grayscale() {
    let path = temp_path("gray.png");
    GrayImage::from_pixel(1, 1, Luma([7])).save(&path).unwrap();

    let decoded = decode(&path).unwrap();
    assert_eq!(decoded.channels, 1);
    assert_eq!(decoded.pixels, vec![7, 7, 7, 255]);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_decode_garbage_is_image_error() {
    let path = temp_path("garbage.png");
    std::fs::write(&path, b"definitely not an image").unwrap();

    assert!(matches!(decode(&path), Err(ResourceError::Image(_))));

    std::fs::remove_file(&path).unwrap();
}
