//! End-to-end export tests over mixed-kind documents.

use cardstock_core::{Color, Document, Element, ElementKind, QrPayloadKind, ShapeKind};
use cardstock_render::{
    ExportConfig, ExportImageFormat, FontStore, HeadlessRenderer, LocalAssets, RenderError,
};

fn image_data_uri() -> String {
    use base64::Engine;
    let img = image::RgbaImage::from_fn(8, 4, |x, _| {
        if x % 2 == 0 {
            image::Rgba([255, 0, 0, 255])
        } else {
            image::Rgba([0, 0, 255, 255])
        }
    });
    let mut buffer = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut buffer, image::ImageFormat::Png)
        .expect("encode");
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(buffer.into_inner())
    )
}

fn mixed_document() -> Document {
    let mut doc = Document::new(350.0, 200.0);
    doc.background_color = Color::rgb(250, 250, 245);

    doc.push(
        Element::new(ElementKind::Shape(ShapeKind::Rect {
            width: 330.0,
            height: 180.0,
            fill: None,
            stroke: Some(Color::rgb(30, 30, 30)),
            stroke_width: 2.0,
        }))
        .at(10.0, 10.0),
    );
    doc.push(
        Element::new(ElementKind::Image {
            source: image_data_uri(),
            source_width: 8,
            source_height: 4,
            scale_x: 10.0,
            scale_y: 10.0,
        })
        .at(20.0, 20.0),
    );
    doc.push(
        Element::new(ElementKind::Qr {
            payload: "https://example.com/card".into(),
            payload_kind: QrPayloadKind::Url,
            dark: Color::BLACK,
            light: Color::WHITE,
            size: 70.0,
        })
        .at(260.0, 110.0),
    );
    doc
}

#[tokio::test]
async fn export_mixed_document_to_png() {
    let fonts = FontStore::new();
    let renderer = HeadlessRenderer::new(&LocalAssets, &fonts);
    let result = renderer
        .render(&mixed_document(), &ExportConfig::default(), None)
        .await
        .expect("export");

    assert_eq!(result.format, ExportImageFormat::Png);
    assert_eq!((result.width, result.height), (350, 200));
    assert_eq!(&result.bytes[0..4], &[137, 80, 78, 71]);
}

#[tokio::test]
async fn export_at_double_width_doubles_height() {
    let fonts = FontStore::new();
    let renderer = HeadlessRenderer::new(&LocalAssets, &fonts);
    let config = ExportConfig {
        target_width: Some(700),
        ..ExportConfig::default()
    };
    let result = renderer
        .render(&mixed_document(), &config, None)
        .await
        .expect("export");
    assert_eq!((result.width, result.height), (700, 400));
}

#[tokio::test]
async fn oversized_export_fails_without_rendering() {
    let fonts = FontStore::new();
    let renderer = HeadlessRenderer::new(&LocalAssets, &fonts);
    let config = ExportConfig {
        target_width: Some(10_001),
        ..ExportConfig::default()
    };
    let err = renderer
        .render(&mixed_document(), &config, None)
        .await
        .expect_err("must fail");
    assert!(matches!(err, RenderError::DimensionLimitExceeded { .. }));
}

#[tokio::test]
async fn broken_image_source_still_exports() {
    let mut doc = mixed_document();
    doc.push(
        Element::new(ElementKind::Image {
            source: "/definitely/not/here.png".into(),
            source_width: 40,
            source_height: 40,
            scale_x: 1.0,
            scale_y: 1.0,
        })
        .at(150.0, 80.0),
    );

    let fonts = FontStore::new();
    let renderer = HeadlessRenderer::new(&LocalAssets, &fonts);
    let result = renderer
        .render(&doc, &ExportConfig::default(), None)
        .await
        .expect("export with placeholder");
    assert!(!result.bytes.is_empty());
}

#[tokio::test]
async fn jpeg_honors_quality_ordering() {
    let fonts = FontStore::new();
    let renderer = HeadlessRenderer::new(&LocalAssets, &fonts);
    let doc = mixed_document();

    let low = ExportConfig {
        format: ExportImageFormat::Jpg,
        quality: 0.1,
        ..ExportConfig::default()
    };
    let high = ExportConfig {
        format: ExportImageFormat::Jpg,
        quality: 0.95,
        ..ExportConfig::default()
    };
    let small = renderer.render(&doc, &low, None).await.expect("low");
    let large = renderer.render(&doc, &high, None).await.expect("high");
    assert!(
        small.size_bytes < large.size_bytes,
        "expected q=0.1 ({}) smaller than q=0.95 ({})",
        small.size_bytes,
        large.size_bytes
    );
}
