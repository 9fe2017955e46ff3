/*!
 * PDF fixtures for the paysplit test suite.
 *
 * Builds small batch documents with lopdf so extraction, splitting and
 * workflow tests run against real files. Page text stays ASCII so it
 * round-trips through the default StandardEncoding of the embedded font.
 */

use anyhow::Result;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};

/// Paystub-style page text for one recipient, long enough to count as a
/// usable native text layer
pub fn paystub_text(name: &str) -> String {
    format!(
        "PAYROLL STATEMENT\nEmployee: {}\nDepartment: Operations\nGross pay 5.830,00 Net pay 4.102,55\nBank deposit reference 0031-77812",
        name
    )
}

/// Builds a batch PDF with one page per text entry
///
/// An empty entry produces a page without any text operation, which is what
/// a scanned page looks like to the extractor.
pub fn build_batch_pdf(dir: &Path, filename: &str, page_texts: &[&str]) -> Result<PathBuf> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in page_texts {
        let mut operations = Vec::new();
        for (line_index, line) in text.lines().enumerate() {
            let baseline: i64 = 780 - 20 * line_index as i64;
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![50.into(), baseline.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(line)]));
            operations.push(Operation::new("ET", vec![]));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let path = dir.join(filename);
    doc.save(&path)?;
    Ok(path)
}
