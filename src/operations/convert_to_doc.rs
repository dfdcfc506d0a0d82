/*!
 * `convert_to_doc`: export the document as a Word file.
 *
 * The tree is rendered to HTML and embedded in a minimal WordprocessingML
 * package as an `altChunk`; Word converts the HTML part when the file is
 * opened. The tree itself is not modified.
 */

use std::io::{Cursor, Write};

use log::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::document::{Node, NodeKind, render_html};
use crate::errors::OperationError;
use crate::row_markers::strip_row_markers;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/afchunk.html" ContentType="text/html"/>
</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <w:body>
    <w:altChunk r:id="htmlChunk"/>
    <w:sectPr>
      <w:pgSz w:w="12240" w:h="15840" w:orient="portrait"/>
      <w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/>
    </w:sectPr>
  </w:body>
</w:document>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="htmlChunk" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/aFChunk" Target="afchunk.html"/>
</Relationships>"#;

/// Render the document (without row markers) to DOCX bytes
pub fn convert_to_doc(tree: &Node, request_id: &str) -> Result<Vec<u8>, OperationError> {
    let mut clean = tree.clone();
    strip_row_markers(&mut clean);

    let html = html_document(&clean);
    debug!("[{}] Rendered {} bytes of HTML for DOCX export", request_id, html.len());

    let bytes = package_docx(&html).map_err(|e| OperationError::Export(e.to_string()))?;
    debug!("[{}] Packaged DOCX ({} bytes)", request_id, bytes.len());
    Ok(bytes)
}

/// Wrap the rendered tree in a standalone HTML document
pub fn html_document(tree: &Node) -> String {
    let title = tree
        .children
        .iter()
        .find(|node| matches!(node.kind, NodeKind::Heading { depth: 1 }))
        .map(|heading| heading.plain_text())
        .unwrap_or_else(|| "Document".to_string());

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title.trim()),
        render_html(tree)
    )
}

fn package_docx(html: &str) -> zip::result::ZipResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts: [(&str, &[u8]); 5] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        ("word/document.xml", DOCUMENT_XML.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes()),
        ("word/afchunk.html", html.as_bytes()),
    ];

    for (name, content) in parts {
        writer.start_file(name, options)?;
        writer.write_all(content)?;
    }

    Ok(writer.finish()?.into_inner())
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
