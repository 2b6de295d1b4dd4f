//! Synthetic documents for this crate's unit, integration and e2e tests.

use lopdf::{dictionary, Document as PdfDocument, Object, Stream};
use std::io;

/// PDF with one page per entry in `pages`, each line drawn in 12pt Helvetica.
pub fn pdf_with_lines(pages: &[&[&str]]) -> io::Result<Vec<u8>> {
    pdf_with_lines_sized(pages, 12)
}

/// Same as [`pdf_with_lines`] at `font_size` points, with 1.5x leading.
pub fn pdf_with_lines_sized(pages: &[&[&str]], font_size: i64) -> io::Result<Vec<u8>> {
    let mut doc = PdfDocument::with_version("1.4");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let leading = font_size * 3 / 2;
    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut content = format!("BT /F1 {font_size} Tf 72 720 Td");
        for line in lines.iter() {
            content.push_str(&format!(" ({line}) Tj 0 -{leading} Td"));
        }
        content.push_str(" ET");

        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| io::Error::other(e.to_string()))?;
    Ok(buf)
}
