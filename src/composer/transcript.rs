use serde_json::Value;

use super::answers::{scalar_text, AnswerMap, NOT_SPECIFIED};
use crate::models::Submitter;

const RULE: &str = "----------------------------------------";

/// Plain-text transcript of a response for forms outside the amendment
/// category. Answers keep their submission order.
pub fn render(
    form_title: &str,
    response_id: &str,
    submitter: &Submitter,
    submitted_on: &str,
    answers: AnswerMap<'_>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("FORMULARIO: {}\n", form_title));
    out.push_str(&format!("ID de respuesta: {}\n", response_id));
    out.push_str(&format!("Enviado por: {}\n", or_placeholder(&submitter.name)));
    out.push_str(&format!("Empresa: {}\n", or_placeholder(&submitter.company)));
    out.push_str(&format!("Fecha de envío: {}\n", submitted_on));
    out.push_str(RULE);
    out.push_str("\n\n");

    if answers.is_empty() {
        out.push_str("(sin respuestas)\n");
        return out;
    }

    for (question, value) in answers.entries() {
        write_answer(&mut out, question, value, 0);
    }
    out
}

fn or_placeholder(s: &str) -> &str {
    if s.trim().is_empty() {
        NOT_SPECIFIED
    } else {
        s
    }
}

fn write_answer(out: &mut String, question: &str, value: &Value, depth: usize) {
    let indent = "  ".repeat(depth);
    match value {
        Value::Object(map) => {
            out.push_str(&format!("{}{}:\n", indent, question));
            for (q, v) in map {
                write_answer(out, q, v, depth + 1);
            }
        }
        Value::Array(items) if items.iter().any(Value::is_object) => {
            out.push_str(&format!("{}{}:\n", indent, question));
            for (i, item) in items.iter().enumerate() {
                write_answer(out, &format!("#{}", i + 1), item, depth + 1);
            }
        }
        other => {
            let text = scalar_text(other).unwrap_or_else(|| NOT_SPECIFIED.to_string());
            out.push_str(&format!("{}{}: {}\n", indent, question, text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    #[test]
    fn renders_header_and_answers_in_order() {
        let raw: Map<String, Value> = json!({
            "Motivo": "Vacaciones",
            "Días": ["Lunes", "Martes"],
            "Comentario": "",
            "Contacto": {"Teléfono": "555"}
        })
        .as_object()
        .cloned()
        .unwrap();
        let submitter = Submitter {
            user_id: "u".into(),
            name: "Ana".into(),
            company: "".into(),
        };
        let text = render("Solicitud", "r1", &submitter, "3 de marzo de 2025", AnswerMap::new(&raw));

        assert!(text.starts_with("FORMULARIO: Solicitud\nID de respuesta: r1\n"));
        assert!(text.contains("Empresa: [NO ESPECIFICADO]"));
        assert!(text.contains("Días: Lunes, Martes\n"));
        assert!(text.contains("Comentario: [NO ESPECIFICADO]\n"));
        assert!(text.contains("Contacto:\n  Teléfono: 555\n"));
        assert!(text.find("Motivo").unwrap() < text.find("Contacto").unwrap());
    }

    #[test]
    fn empty_answers() {
        let raw = Map::new();
        let submitter = Submitter {
            user_id: "u".into(),
            name: "Ana".into(),
            company: "X".into(),
        };
        let text = render("F", "r", &submitter, "hoy", AnswerMap::new(&raw));
        assert!(text.ends_with("(sin respuestas)\n"));
    }
}
