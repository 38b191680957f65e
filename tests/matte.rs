use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use spritecut::matte::{Background, Matte, Reference, channel_distance};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// White sheet with a grey square and a few near-white / half-transparent pixels.
fn sample_sheet() -> RgbaImage {
    let mut img = RgbaImage::from_pixel(16, 16, WHITE);
    for y in 4..12 {
        for x in 4..12 {
            img.put_pixel(x, y, Rgba([200, 200, 200, 255]));
        }
    }
    img.put_pixel(1, 1, Rgba([250, 250, 250, 255]));
    img.put_pixel(2, 1, Rgba([240, 10, 10, 128]));
    img.put_pixel(3, 1, Rgba([251, 252, 253, 77]));
    img
}

// ── Distance mode ─────────────────────────────────────────────────────────────

#[test]
fn distance_example_white_reference_threshold_30() {
    let mut img = RgbaImage::new(2, 1);
    img.put_pixel(0, 0, Rgba([250, 250, 250, 255]));
    img.put_pixel(1, 0, Rgba([200, 200, 200, 255]));

    let matte = Matte::distance(30).with_reference(Reference::Fixed(Rgb([255, 255, 255])));
    let keyed = matte.apply(&mut img).unwrap();

    assert_eq!(keyed, 1);
    assert_eq!(img.get_pixel(0, 0)[3], 0);
    assert_eq!(*img.get_pixel(1, 0), Rgba([200, 200, 200, 255]));
}

#[test]
fn distance_samples_top_left_by_default() {
    let mut img = sample_sheet();
    Matte::distance(30).apply(&mut img).unwrap();
    assert_eq!(*img.get_pixel(0, 0), Rgba([255, 255, 255, 0]));
    assert_eq!(*img.get_pixel(1, 1), Rgba([255, 255, 255, 0]));
    assert_eq!(*img.get_pixel(8, 8), Rgba([200, 200, 200, 255]));
}

#[test]
fn distance_sample_point_is_configurable() {
    let mut img = sample_sheet();
    // Key on the grey square instead of the white border.
    let matte = Matte::distance(30).with_reference(Reference::Sample { x: 8, y: 8 });
    matte.apply(&mut img).unwrap();
    assert_eq!(img.get_pixel(8, 8)[3], 0);
    assert_eq!(*img.get_pixel(0, 0), WHITE);
}

#[test]
fn keep_rgb_only_clears_alpha() {
    let mut img = RgbaImage::from_pixel(1, 1, Rgba([250, 251, 252, 255]));
    let mut matte = Matte::distance(30).with_reference(Reference::Fixed(Rgb([255, 255, 255])));
    matte.clear_rgb = false;
    matte.apply(&mut img).unwrap();
    assert_eq!(*img.get_pixel(0, 0), Rgba([250, 251, 252, 0]));
}

#[test]
fn foreground_pixels_are_untouched_including_alpha() {
    let original = sample_sheet();
    let mut img = original.clone();
    let key = [255u8, 255, 255];
    Matte::distance(30).apply(&mut img).unwrap();

    for (x, y, px) in original.enumerate_pixels() {
        let d = channel_distance([px[0], px[1], px[2]], key);
        if d >= 30 {
            assert_eq!(img.get_pixel(x, y), px, "foreground pixel ({x}, {y}) changed");
        }
    }
    // The half-transparent red pixel keeps its alpha.
    assert_eq!(*img.get_pixel(2, 1), Rgba([240, 10, 10, 128]));
}

#[test]
fn resolved_matte_is_idempotent() {
    let mut img = sample_sheet();
    let matte = Matte::distance(30).resolve(&img).unwrap();
    let first = matte.apply(&mut img).unwrap();
    let after_first = img.clone();
    let second = matte.apply(&mut img).unwrap();

    assert!(first > 0);
    assert_eq!(second, 0);
    assert_eq!(img, after_first);
}

#[test]
fn transparent_pixels_are_skipped() {
    let mut img = RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 0]));
    img.put_pixel(1, 1, Rgba([12, 34, 56, 0]));
    let matte = Matte::distance(1000).with_reference(Reference::Fixed(Rgb([0, 0, 0])));
    assert_eq!(matte.apply(&mut img).unwrap(), 0);
    assert_eq!(*img.get_pixel(1, 1), Rgba([12, 34, 56, 0]));
}

#[test]
fn rgb_input_is_promoted_to_rgba() {
    let rgb = RgbImage::from_fn(4, 1, |x, _| if x == 0 { Rgb([0, 0, 0]) } else { Rgb([90, 0, 200]) });
    let out = Matte::distance(30).apply_to_dynamic(DynamicImage::ImageRgb8(rgb)).unwrap();
    assert_eq!(out.dimensions(), (4, 1));
    assert_eq!(out.get_pixel(0, 0)[3], 0);
    assert_eq!(*out.get_pixel(3, 0), Rgba([90, 0, 200, 255]));
}

// ── Neutral mode ──────────────────────────────────────────────────────────────

#[test]
fn neutral_white_keeps_bright_saturated_pixels() {
    let mut img = RgbaImage::new(3, 1);
    img.put_pixel(0, 0, Rgba([250, 249, 247, 255])); // neutral white
    img.put_pixel(1, 0, Rgba([255, 250, 200, 255])); // pale yellow, spread 55
    img.put_pixel(2, 0, Rgba([120, 120, 120, 255])); // grey but dark

    let keyed = Matte::neutral(Background::White, 245, 10).apply(&mut img).unwrap();
    assert_eq!(keyed, 1);
    // Neutral mode keeps the RGB of removed pixels.
    assert_eq!(*img.get_pixel(0, 0), Rgba([250, 249, 247, 0]));
    assert_eq!(img.get_pixel(1, 0)[3], 255);
    assert_eq!(img.get_pixel(2, 0)[3], 255);
}

#[test]
fn neutral_black_removes_dark_neutrals_only() {
    let mut img = RgbaImage::new(3, 1);
    img.put_pixel(0, 0, Rgba([3, 4, 5, 255]));
    img.put_pixel(1, 0, Rgba([12, 0, 0, 255]));
    img.put_pixel(2, 0, Rgba([30, 30, 30, 255]));

    Matte::neutral(Background::Black, 12, 10).apply(&mut img).unwrap();
    assert_eq!(img.get_pixel(0, 0)[3], 0);
    // Spread 12 exceeds the chroma bound.
    assert_eq!(img.get_pixel(1, 0)[3], 255);
    assert_eq!(img.get_pixel(2, 0)[3], 255);
}

#[test]
fn neutral_matte_is_idempotent() {
    let mut img = sample_sheet();
    let matte = Matte::neutral(Background::White, 245, 10);
    matte.apply(&mut img).unwrap();
    let once = img.clone();
    assert_eq!(matte.apply(&mut img).unwrap(), 0);
    assert_eq!(img, once);
}
