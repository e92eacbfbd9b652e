//! Writes a laid-out [`Page`] as a single-page PDF.
//!
//! Streams are left uncompressed and the document carries no creation
//! date or file identifier, so equal pages produce equal bytes.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

use super::layout::{Color, Element, Font, Page};
use super::RenderError;

const PRODUCER: &str = "Fatoora";

/// Encodes `text` for a WinAnsiEncoding font. Characters without a
/// WinAnsi code point become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' | '\u{a0}'..='\u{ff}' => c as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

fn font_resource(font: Font) -> &'static str {
    match font {
        Font::Regular => "F1",
        Font::Bold => "F2",
    }
}

fn real(value: f32) -> Object {
    Object::from((value * 100.0).round() / 100.0)
}

fn color_operands(color: Color) -> Vec<Object> {
    [color.0, color.1, color.2]
        .into_iter()
        .map(|c| Object::from((f32::from(c) / 255.0 * 1000.0).round() / 1000.0))
        .collect()
}

fn type1_font(base_font: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Serializes `page` to PDF bytes.
pub fn write_page(page: &Page, title: &str) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(type1_font("Helvetica"));
    let bold_id = doc.add_object(type1_font("Helvetica-Bold"));

    let mut xobjects = Dictionary::new();
    let mut ops = Vec::new();

    for element in &page.elements {
        match element {
            Element::Rect {
                x,
                y,
                width,
                height,
                fill,
            } => {
                ops.push(Operation::new("rg", color_operands(*fill)));
                ops.push(Operation::new(
                    "re",
                    vec![
                        real(*x),
                        real(page.height - y - height),
                        real(*width),
                        real(*height),
                    ],
                ));
                ops.push(Operation::new("f", vec![]));
            }
            Element::Text {
                x,
                y,
                size,
                font,
                color,
                text,
            } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![font_resource(*font).into(), real(*size)],
                ));
                ops.push(Operation::new("rg", color_operands(*color)));
                ops.push(Operation::new("Td", vec![real(*x), real(page.height - y)]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::string_literal(encode_win_ansi(text))],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
            Element::Image {
                x,
                y,
                width,
                height,
                image,
            } => {
                let name = format!("Im{}", xobjects.len() + 1);
                let stream = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => i64::from(image.width),
                        "Height" => i64::from(image.height),
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                    },
                    image.rgb.clone(),
                );
                let image_id = doc.add_object(stream);
                xobjects.set(name.as_bytes().to_vec(), image_id);

                ops.push(Operation::new("q", vec![]));
                ops.push(Operation::new(
                    "cm",
                    vec![
                        real(*width),
                        0.into(),
                        0.into(),
                        real(*height),
                        real(*x),
                        real(page.height - y - height),
                    ],
                ));
                ops.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                ops.push(Operation::new("Q", vec![]));
            }
        }
    }

    let content = Content { operations: ops }
        .encode()
        .map_err(|e| RenderError::Pdf(format!("failed to encode page content: {}", e)))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, content));

    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
        "XObject" => xobjects,
    });

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), real(page.width), real(page.height)],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(encode_win_ansi(title)),
        "Producer" => Object::string_literal(PRODUCER),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| RenderError::Pdf(format!("failed to write document: {}", e)))?;
    Ok(bytes)
}
