//! Turns a submitted response into a downloadable document.
//!
//! Responses to forms in the "Anexos" section become a contract amendment
//! (`.docx`); everything else becomes a plain-text transcript.

pub mod answers;
pub mod clauses;
pub mod dates;
pub mod docx;
pub mod letterhead;
pub mod transcript;

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};
use thiserror::Error;

pub use answers::{AnswerMap, NOT_SPECIFIED};
pub use clauses::{assemble_clauses, ordinal_label, AmendmentFields, Clause};
pub use docx::{LegalDocument, SignatureParty};
pub use letterhead::{find_letterhead, match_company, Letterhead};

use crate::models::form::ANEXOS_SECTION;
use crate::models::{DocumentKind, Submitter};

pub const AMENDMENT_TITLE: &str = "ANEXO DE CONTRATO DE TRABAJO";

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("Failed to write document archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error while composing document: {0}")]
    Io(#[from] std::io::Error),
}

pub struct ComposeRequest<'a> {
    pub response_id: &'a str,
    pub form_title: &'a str,
    pub section: Option<&'a str>,
    pub submitter: &'a Submitter,
    pub answers: &'a Map<String, Value>,
    pub letterhead: Option<Letterhead>,
    /// Local wall-clock time; drives ids and default dates.
    pub now: DateTime<FixedOffset>,
}

#[derive(Debug, Clone)]
pub struct ComposedDocument {
    pub generated_id: String,
    pub kind: DocumentKind,
    pub content: Vec<u8>,
    /// Structured form of the amendment, absent for transcripts.
    pub legal: Option<LegalDocument>,
}

pub struct DocumentComposer;

impl DocumentComposer {
    /// Closed two-way branch on the form section.
    pub fn kind_for_section(section: Option<&str>) -> DocumentKind {
        match section {
            Some(s) if s == ANEXOS_SECTION => DocumentKind::Docx,
            _ => DocumentKind::Txt,
        }
    }

    pub fn compose(request: ComposeRequest<'_>) -> Result<ComposedDocument, ComposeError> {
        let millis = request.now.timestamp_millis();
        let today = dates::spanish_date(request.now.date_naive());
        let answers = AnswerMap::new(request.answers);

        match Self::kind_for_section(request.section) {
            DocumentKind::Docx => {
                let fields = AmendmentFields::from_answers(answers, request.submitter, &today);
                let legal = Self::amendment(&fields);
                let content = docx::render(&legal, request.letterhead.as_ref())?;
                Ok(ComposedDocument {
                    generated_id: amendment_id(&fields.worker_name, millis),
                    kind: DocumentKind::Docx,
                    content,
                    legal: Some(legal),
                })
            }
            DocumentKind::Txt => {
                let text = transcript::render(
                    request.form_title,
                    request.response_id,
                    request.submitter,
                    &today,
                    answers,
                );
                Ok(ComposedDocument {
                    generated_id: format!("FORMULARIO_{}_{}", request.response_id, millis),
                    kind: DocumentKind::Txt,
                    content: text.into_bytes(),
                    legal: None,
                })
            }
        }
    }

    pub fn amendment(fields: &AmendmentFields) -> LegalDocument {
        let recital = format!(
            "En {}, a {}, entre {}, RUT {}, representada legalmente por {}, RUT {}, \
             en adelante el \"Empleador\", y {}, RUT {}, en adelante el \"Trabajador\", \
             se acuerda el siguiente anexo al contrato de trabajo suscrito con fecha {}:",
            fields.city,
            fields.effective_date,
            fields.company_name,
            fields.company_rut,
            fields.representative_name,
            fields.representative_rut,
            fields.worker_name,
            fields.worker_rut,
            fields.contract_date,
        );

        LegalDocument {
            title: AMENDMENT_TITLE.to_string(),
            recital,
            clauses: assemble_clauses(fields),
            employer: SignatureParty {
                heading: "EMPLEADOR".to_string(),
                rut: fields.company_rut.clone(),
                name: fields.company_name.clone(),
            },
            worker: SignatureParty {
                heading: "TRABAJADOR".to_string(),
                rut: fields.worker_rut.clone(),
                name: fields.worker_name.clone(),
            },
        }
    }
}

/// `ANEXO_<WORKER_NAME_UPPER_SNAKE>_<millis>`
pub fn amendment_id(worker_name: &str, millis: i64) -> String {
    let words: Vec<String> = worker_name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_uppercase())
        .collect();
    let name = if words.is_empty() || worker_name == NOT_SPECIFIED {
        "SIN_NOMBRE".to_string()
    } else {
        words.join("_")
    };
    format!("ANEXO_{}_{}", name, millis)
}
