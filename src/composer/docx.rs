//! Minimal WordprocessingML writer for contract amendments.
//!
//! Emits only the parts Word needs to open the file: content types,
//! package relationships, the main document and its relationships, and an
//! optional letterhead image.

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::clauses::Clause;
use super::letterhead::Letterhead;
use super::ComposeError;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const IMAGE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
const LOGO_REL_ID: &str = "rIdLogo";

// Letterhead box, in EMU (914400 per inch)
const LOGO_CX: u64 = 1_828_800;
const LOGO_CY: u64 = 914_400;

#[derive(Debug, Clone)]
pub struct SignatureParty {
    pub heading: String,
    pub rut: String,
    pub name: String,
}

/// Layout-independent description of an amendment.
#[derive(Debug, Clone)]
pub struct LegalDocument {
    pub title: String,
    pub recital: String,
    pub clauses: Vec<Clause>,
    pub employer: SignatureParty,
    pub worker: SignatureParty,
}

pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn run(text: &str, bold: bool) -> String {
    let props = if bold { "<w:rPr><w:b/></w:rPr>" } else { "" };
    format!(
        "<w:r>{}<w:t xml:space=\"preserve\">{}</w:t></w:r>",
        props,
        xml_escape(text)
    )
}

fn paragraph(runs: &[String], centered: bool) -> String {
    let props = if centered {
        "<w:pPr><w:jc w:val=\"center\"/><w:spacing w:after=\"240\"/></w:pPr>"
    } else {
        "<w:pPr><w:jc w:val=\"both\"/><w:spacing w:after=\"200\"/></w:pPr>"
    };
    format!("<w:p>{}{}</w:p>", props, runs.concat())
}

fn logo_paragraph() -> String {
    format!(
        "<w:p><w:pPr><w:jc w:val=\"center\"/></w:pPr><w:r><w:drawing>\
         <wp:inline distT=\"0\" distB=\"0\" distL=\"0\" distR=\"0\">\
         <wp:extent cx=\"{cx}\" cy=\"{cy}\"/><wp:docPr id=\"1\" name=\"Logo\"/>\
         <a:graphic><a:graphicData uri=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
         <pic:pic><pic:nvPicPr><pic:cNvPr id=\"0\" name=\"logo\"/><pic:cNvPicPr/></pic:nvPicPr>\
         <pic:blipFill><a:blip r:embed=\"{rel}\"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>\
         <pic:spPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
         <a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom></pic:spPr></pic:pic>\
         </a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>",
        cx = LOGO_CX,
        cy = LOGO_CY,
        rel = LOGO_REL_ID
    )
}

fn signature_cell(party: &SignatureParty) -> String {
    let lines = [
        "_____________________________".to_string(),
        party.heading.clone(),
        format!("RUT: {}", party.rut),
        party.name.clone(),
    ];
    let body: String = lines
        .iter()
        .enumerate()
        .map(|(i, line)| paragraph(&[run(line, i == 1)], true))
        .collect();
    format!("<w:tc><w:tcPr><w:tcW w:w=\"4500\" w:type=\"dxa\"/></w:tcPr>{}</w:tc>", body)
}

fn signature_table(employer: &SignatureParty, worker: &SignatureParty) -> String {
    let none = ["top", "left", "bottom", "right", "insideH", "insideV"]
        .iter()
        .map(|side| format!("<w:{} w:val=\"nil\"/>", side))
        .collect::<String>();
    format!(
        "<w:tbl><w:tblPr><w:tblW w:w=\"9000\" w:type=\"dxa\"/><w:tblBorders>{}</w:tblBorders></w:tblPr>\
         <w:tblGrid><w:gridCol w:w=\"4500\"/><w:gridCol w:w=\"4500\"/></w:tblGrid>\
         <w:tr>{}{}</w:tr></w:tbl>",
        none,
        signature_cell(employer),
        signature_cell(worker)
    )
}

/// Serialize `doc` to `word/document.xml`.
pub fn document_xml(doc: &LegalDocument, with_logo: bool) -> String {
    let mut body = String::new();
    if with_logo {
        body.push_str(&logo_paragraph());
    }
    body.push_str(&paragraph(&[run(&doc.title, true)], true));
    body.push_str(&paragraph(&[run(&doc.recital, false)], false));
    for clause in &doc.clauses {
        body.push_str(&paragraph(
            &[run(&clause.label, true), run(" ", false), run(&clause.text, false)],
            false,
        ));
    }
    // spacer before signatures
    body.push_str("<w:p/><w:p/>");
    body.push_str(&signature_table(&doc.employer, &doc.worker));
    body.push_str(
        "<w:sectPr><w:pgSz w:w=\"12240\" w:h=\"15840\"/>\
         <w:pgMar w:top=\"1440\" w:right=\"1440\" w:bottom=\"1440\" w:left=\"1440\" w:header=\"708\" w:footer=\"708\" w:gutter=\"0\"/></w:sectPr>",
    );

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"{W_NS}\" xmlns:r=\"{R_NS}\" \
         xmlns:wp=\"http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing\" \
         xmlns:a=\"http://schemas.openxmlformats.org/drawingml/2006/main\" \
         xmlns:pic=\"http://schemas.openxmlformats.org/drawingml/2006/picture\">\
         <w:body>{body}</w:body></w:document>"
    )
}

fn content_types_xml() -> String {
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
     <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
     <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
     <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
     <Default Extension=\"png\" ContentType=\"image/png\"/>\
     <Default Extension=\"jpeg\" ContentType=\"image/jpeg\"/>\
     <Override PartName=\"/word/document.xml\" \
     ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
     </Types>"
        .to_string()
}

fn package_rels_xml() -> String {
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
     <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
     <Relationship Id=\"rId1\" \
     Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" \
     Target=\"word/document.xml\"/></Relationships>"
        .to_string()
}

fn document_rels_xml(logo: Option<&Letterhead>) -> String {
    let image = logo
        .map(|lh| {
            format!(
                "<Relationship Id=\"{}\" Type=\"{}\" Target=\"media/logo.{}\"/>",
                LOGO_REL_ID,
                IMAGE_REL,
                lh.extension()
            )
        })
        .unwrap_or_default();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">{}</Relationships>",
        image
    )
}

/// Package `doc` as a `.docx` archive.
pub fn render(doc: &LegalDocument, letterhead: Option<&Letterhead>) -> Result<Vec<u8>, ComposeError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut parts: Vec<(String, Vec<u8>)> = vec![
        ("[Content_Types].xml".to_string(), content_types_xml().into_bytes()),
        ("_rels/.rels".to_string(), package_rels_xml().into_bytes()),
        (
            "word/document.xml".to_string(),
            document_xml(doc, letterhead.is_some()).into_bytes(),
        ),
        (
            "word/_rels/document.xml.rels".to_string(),
            document_rels_xml(letterhead).into_bytes(),
        ),
    ];
    if let Some(lh) = letterhead {
        parts.push((format!("word/media/logo.{}", lh.extension()), lh.bytes.clone()));
    }

    for (name, bytes) in parts {
        zip.start_file(name, options)?;
        zip.write_all(&bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}
