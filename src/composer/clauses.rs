use serde::Serialize;

use super::answers::{AnswerMap, NOT_SPECIFIED};
use super::dates::format_date;
use crate::models::Submitter;

/// Question texts used by amendment forms. Existing forms depend on these
/// exact strings.
pub mod questions {
    pub const WORKER_NAME: &str = "Nombre del trabajador";
    pub const WORKER_RUT: &str = "RUT del trabajador";
    pub const COMPANY_NAME: &str = "Nombre de la empresa";
    pub const COMPANY_RUT: &str = "RUT de la empresa";
    pub const REPRESENTATIVE_NAME: &str = "Nombre del representante legal";
    pub const REPRESENTATIVE_RUT: &str = "RUT del representante legal";
    pub const CITY: &str = "Ciudad";
    pub const CONTRACT_DATE: &str = "Fecha del contrato de trabajo";
    pub const EFFECTIVE_DATE: &str = "Fecha de inicio de vigencia del anexo";
    pub const NEW_POSITION: &str = "Nuevo cargo";
    pub const NEW_DUTIES: &str = "Funciones del nuevo cargo";
    pub const NEW_SALARY: &str = "Nuevo sueldo base";
    pub const WORKPLACE: &str = "Lugar de prestación de servicios";
    pub const SHIFT_KIND: &str = "Tipo de jornada";
    pub const START_TIME: &str = "Hora de entrada";
    pub const END_TIME: &str = "Hora de salida";
    pub const FIRST_SHIFT: &str = "Horario primer turno";
    pub const SECOND_SHIFT: &str = "Horario segundo turno";
    pub const WEEKLY_HOURS: &str = "Horas semanales";
    pub const BONUSES: &str = "Bonos";
    pub const BONUS_NAME: &str = "Nombre del bono";
    pub const BONUS_AMOUNT: &str = "Monto del bono";
    pub const MOBILITY_ALLOWANCE: &str = "Asignación de movilización";
    pub const MEAL_ALLOWANCE: &str = "Asignación de colación";
    pub const CONTRACT_TERM: &str = "Duración del contrato";
    pub const CONTRACT_END: &str = "Fecha de término del contrato";
    pub const ADDITIONAL_CLAUSE: &str = "Cláusula adicional";
}

const ORDINALS: [&str; 20] = [
    "PRIMERO",
    "SEGUNDO",
    "TERCERO",
    "CUARTO",
    "QUINTO",
    "SEXTO",
    "SÉPTIMO",
    "OCTAVO",
    "NOVENO",
    "DÉCIMO",
    "UNDÉCIMO",
    "DUODÉCIMO",
    "DECIMOTERCERO",
    "DECIMOCUARTO",
    "DECIMOQUINTO",
    "DECIMOSEXTO",
    "DECIMOSÉPTIMO",
    "DECIMOCTAVO",
    "DECIMONOVENO",
    "VIGÉSIMO",
];

/// Label for the 1-based clause `number`: ordinal words up to the
/// twentieth, `N°:` afterwards.
pub fn ordinal_label(number: usize) -> String {
    match number.checked_sub(1).and_then(|i| ORDINALS.get(i)) {
        Some(word) => format!("{}:", word),
        None => format!("{}°:", number),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftKind {
    Single,
    Dual,
}

impl ShiftKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "turno único" | "turno unico" => Some(ShiftKind::Single),
            "doble turno" => Some(ShiftKind::Dual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractTerm {
    Indefinite,
    FixedUntil(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bonus {
    pub name: String,
    pub amount: Option<String>,
}

/// Normalized field set for a contract amendment. Required names always
/// hold text (a placeholder when missing); optional terms drive clauses.
#[derive(Debug, Clone)]
pub struct AmendmentFields {
    pub worker_name: String,
    pub worker_rut: String,
    pub company_name: String,
    pub company_rut: String,
    pub representative_name: String,
    pub representative_rut: String,
    pub city: String,
    pub contract_date: String,
    pub effective_date: String,
    pub new_position: Option<String>,
    pub new_duties: Option<String>,
    pub new_salary: Option<String>,
    pub workplace: Option<String>,
    pub shift: Option<ShiftKind>,
    pub start_time: String,
    pub end_time: String,
    pub first_shift: String,
    pub second_shift: String,
    pub weekly_hours: Option<String>,
    pub bonuses: Vec<Bonus>,
    pub mobility_allowance: Option<String>,
    pub meal_allowance: Option<String>,
    pub contract_term: Option<ContractTerm>,
    pub additional_clause: Option<String>,
}

impl AmendmentFields {
    /// Employer named in the amendment: the company answer, else the
    /// submitter's company.
    pub fn employer_name(answers: AnswerMap<'_>, submitter: &Submitter) -> Option<String> {
        answers
            .text(questions::COMPANY_NAME)
            .or_else(|| non_empty(&submitter.company))
    }

    /// Map raw answers plus submitter identity onto the amendment fields.
    /// `fallback_date` stands in for a missing effective date.
    pub fn from_answers(answers: AnswerMap<'_>, submitter: &Submitter, fallback_date: &str) -> Self {
        use questions::*;

        let worker_name = answers
            .text(WORKER_NAME)
            .or_else(|| non_empty(&submitter.name))
            .unwrap_or_else(|| NOT_SPECIFIED.to_string());
        let company_name = Self::employer_name(answers, submitter).unwrap_or_else(|| NOT_SPECIFIED.to_string());

        let bonuses = {
            let contexts = answers.contexts(BONUSES);
            if contexts.is_empty() {
                answers
                    .list(BONUSES)
                    .into_iter()
                    .map(|name| Bonus { name, amount: None })
                    .collect()
            } else {
                contexts
                    .into_iter()
                    .filter_map(|ctx| {
                        ctx.text(BONUS_NAME).map(|name| Bonus {
                            name,
                            amount: ctx.text(BONUS_AMOUNT),
                        })
                    })
                    .collect()
            }
        };

        let contract_term = answers.text(CONTRACT_TERM).and_then(|term| {
            match term.to_lowercase().as_str() {
                "indefinido" => Some(ContractTerm::Indefinite),
                "plazo fijo" => Some(ContractTerm::FixedUntil(
                    answers
                        .text(CONTRACT_END)
                        .map(|d| format_date(&d))
                        .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
                )),
                _ => None,
            }
        });

        Self {
            worker_name,
            worker_rut: answers.text_or(WORKER_RUT, NOT_SPECIFIED),
            company_name,
            company_rut: answers.text_or(COMPANY_RUT, NOT_SPECIFIED),
            representative_name: answers.text_or(REPRESENTATIVE_NAME, NOT_SPECIFIED),
            representative_rut: answers.text_or(REPRESENTATIVE_RUT, NOT_SPECIFIED),
            city: answers.text_or(CITY, NOT_SPECIFIED),
            contract_date: answers
                .text(CONTRACT_DATE)
                .map(|d| format_date(&d))
                .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
            effective_date: answers
                .text(EFFECTIVE_DATE)
                .map(|d| format_date(&d))
                .unwrap_or_else(|| fallback_date.to_string()),
            new_position: answers.text(NEW_POSITION),
            new_duties: answers.text(NEW_DUTIES),
            new_salary: answers.text(NEW_SALARY),
            workplace: answers.text(WORKPLACE),
            shift: answers.text(SHIFT_KIND).and_then(|s| ShiftKind::parse(&s)),
            start_time: answers.text_or(START_TIME, NOT_SPECIFIED),
            end_time: answers.text_or(END_TIME, NOT_SPECIFIED),
            first_shift: answers.text_or(FIRST_SHIFT, NOT_SPECIFIED),
            second_shift: answers.text_or(SECOND_SHIFT, NOT_SPECIFIED),
            weekly_hours: answers.text(WEEKLY_HOURS),
            bonuses,
            mobility_allowance: answers.text(MOBILITY_ALLOWANCE),
            meal_allowance: answers.text(MEAL_ALLOWANCE),
            contract_term,
            additional_clause: answers.text(ADDITIONAL_CLAUSE),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

fn money(amount: &str) -> String {
    if amount.starts_with('$') {
        amount.to_string()
    } else {
        format!("${}", amount)
    }
}

fn weekly_suffix(fields: &AmendmentFields) -> String {
    fields
        .weekly_hours
        .as_ref()
        .map(|h| format!(", con un total de {} horas semanales", h))
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clause {
    pub number: usize,
    pub label: String,
    pub text: String,
}

/// One conditional clause: appended when `applies` holds.
pub struct ClauseRule {
    pub name: &'static str,
    pub applies: fn(&AmendmentFields) -> bool,
    pub render: fn(&AmendmentFields) -> String,
}

/// Evaluated top to bottom; each rule is independent.
pub const RULES: &[ClauseRule] = &[
    ClauseRule {
        name: "cargo",
        applies: |f| f.new_position.is_some(),
        render: |f| {
            let mut text = format!(
                "Las partes acuerdan modificar el cargo del Trabajador, quien a contar del {} se desempeñará como {}.",
                f.effective_date,
                f.new_position.as_deref().unwrap_or(NOT_SPECIFIED)
            );
            if let Some(duties) = &f.new_duties {
                text.push_str(&format!(" Sus funciones principales serán: {}.", duties.trim_end_matches('.')));
            }
            text
        },
    },
    ClauseRule {
        name: "remuneracion",
        applies: |f| f.new_salary.is_some(),
        render: |f| {
            format!(
                "Las partes acuerdan que, a contar del {}, el Trabajador percibirá un sueldo base mensual de {} brutos.",
                f.effective_date,
                money(f.new_salary.as_deref().unwrap_or(NOT_SPECIFIED))
            )
        },
    },
    ClauseRule {
        name: "lugar_de_trabajo",
        applies: |f| f.workplace.is_some(),
        render: |f| {
            format!(
                "A contar del {}, el Trabajador prestará sus servicios en {}.",
                f.effective_date,
                f.workplace.as_deref().unwrap_or(NOT_SPECIFIED)
            )
        },
    },
    ClauseRule {
        name: "turno_unico",
        applies: |f| f.shift == Some(ShiftKind::Single),
        render: |f| {
            format!(
                "La jornada ordinaria de trabajo se distribuirá en un turno único, de {} a {} horas{}.",
                f.start_time,
                f.end_time,
                weekly_suffix(f)
            )
        },
    },
    ClauseRule {
        name: "doble_turno",
        applies: |f| f.shift == Some(ShiftKind::Dual),
        render: |f| {
            format!(
                "La jornada ordinaria de trabajo se distribuirá en dos turnos: el primero de {} y el segundo de {}{}.",
                f.first_shift,
                f.second_shift,
                weekly_suffix(f)
            )
        },
    },
    ClauseRule {
        name: "bonos",
        applies: |f| !f.bonuses.is_empty(),
        render: |f| {
            let items: Vec<String> = f
                .bonuses
                .iter()
                .map(|b| match &b.amount {
                    Some(amount) => format!("{} por un monto de {}", b.name, money(amount)),
                    None => b.name.clone(),
                })
                .collect();
            format!("El Trabajador tendrá derecho a los siguientes bonos: {}.", items.join("; "))
        },
    },
    ClauseRule {
        name: "movilizacion",
        applies: |f| f.mobility_allowance.is_some(),
        render: |f| {
            format!(
                "El Empleador pagará al Trabajador una asignación de movilización mensual de {}, de carácter no imponible.",
                money(f.mobility_allowance.as_deref().unwrap_or(NOT_SPECIFIED))
            )
        },
    },
    ClauseRule {
        name: "colacion",
        applies: |f| f.meal_allowance.is_some(),
        render: |f| {
            format!(
                "El Empleador pagará al Trabajador una asignación de colación mensual de {}, de carácter no imponible.",
                money(f.meal_allowance.as_deref().unwrap_or(NOT_SPECIFIED))
            )
        },
    },
    ClauseRule {
        name: "contrato_indefinido",
        applies: |f| f.contract_term == Some(ContractTerm::Indefinite),
        render: |f| {
            format!(
                "Las partes acuerdan que, a contar del {}, el contrato de trabajo tendrá duración indefinida.",
                f.effective_date
            )
        },
    },
    ClauseRule {
        name: "prorroga_plazo_fijo",
        applies: |f| matches!(f.contract_term, Some(ContractTerm::FixedUntil(_))),
        render: |f| {
            let until = match &f.contract_term {
                Some(ContractTerm::FixedUntil(date)) => date.as_str(),
                _ => NOT_SPECIFIED,
            };
            format!("Las partes acuerdan prorrogar la vigencia del contrato de trabajo hasta el {}.", until)
        },
    },
    ClauseRule {
        name: "clausula_adicional",
        applies: |f| f.additional_clause.is_some(),
        render: |f| f.additional_clause.clone().unwrap_or_default(),
    },
];

fn prior_clauses_in_force(f: &AmendmentFields) -> String {
    format!(
        "En todo lo no modificado por el presente anexo, se mantienen plenamente vigentes las cláusulas del contrato de trabajo de fecha {}.",
        f.contract_date
    )
}

fn signed_in_duplicate(_: &AmendmentFields) -> String {
    "El presente anexo se firma en dos ejemplares de idéntico tenor y fecha, quedando uno en poder de cada una de las partes."
        .to_string()
}

/// Evaluate `rules` in order, then append the two closing clauses.
pub fn assemble_with(rules: &[ClauseRule], fields: &AmendmentFields) -> Vec<Clause> {
    let closing: [fn(&AmendmentFields) -> String; 2] = [prior_clauses_in_force, signed_in_duplicate];

    rules
        .iter()
        .filter(|rule| (rule.applies)(fields))
        .map(|rule| (rule.render)(fields))
        .chain(closing.iter().map(|render| render(fields)))
        .enumerate()
        .map(|(i, text)| Clause {
            number: i + 1,
            label: ordinal_label(i + 1),
            text,
        })
        .collect()
}

pub fn assemble_clauses(fields: &AmendmentFields) -> Vec<Clause> {
    assemble_with(RULES, fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn submitter() -> Submitter {
        Submitter {
            user_id: "u1".into(),
            name: "Ana Rojas".into(),
            company: "ACME SpA".into(),
        }
    }

    fn fields(v: Value) -> AmendmentFields {
        let raw: Map<String, Value> = v.as_object().cloned().unwrap();
        AmendmentFields::from_answers(AnswerMap::new(&raw), &submitter(), "1 de enero de 2025")
    }

    #[test]
    fn ordinal_table_bounds() {
        assert_eq!(ordinal_label(1), "PRIMERO:");
        assert_eq!(ordinal_label(7), "SÉPTIMO:");
        assert_eq!(ordinal_label(20), "VIGÉSIMO:");
        assert_eq!(ordinal_label(21), "21°:");
        assert_eq!(ordinal_label(0), "0°:");
    }

    #[test]
    fn closing_clauses_always_present() {
        let clauses = assemble_clauses(&fields(json!({})));
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].label, "PRIMERO:");
        assert!(clauses[0].text.contains("se mantienen plenamente vigentes"));
        assert_eq!(clauses[1].label, "SEGUNDO:");
        assert!(clauses[1].text.contains("dos ejemplares"));
    }

    #[test]
    fn rules_apply_in_order() {
        let f = fields(json!({
            "Nuevo cargo": "Jefe de bodega",
            "Nuevo sueldo base": "950.000",
            "Tipo de jornada": "Turno único",
            "Hora de entrada": "08:00",
            "Hora de salida": "17:00",
            "Fecha del contrato de trabajo": "2020-02-10"
        }));
        let clauses = assemble_clauses(&f);
        assert_eq!(clauses.len(), 5);
        assert!(clauses[0].text.contains("Jefe de bodega"));
        assert!(clauses[1].text.contains("$950.000"));
        assert!(clauses[2].text.contains("turno único, de 08:00 a 17:00"));
        assert_eq!(clauses[3].label, "CUARTO:");
        assert!(clauses[3].text.contains("10 de febrero de 2020"));
    }

    #[test]
    fn shift_blocks_are_exclusive() {
        let single = fields(json!({"Tipo de jornada": "Turno único"}));
        let dual = fields(json!({"Tipo de jornada": "Doble turno"}));
        let names = |f: &AmendmentFields| -> Vec<&str> {
            RULES.iter().filter(|r| (r.applies)(f)).map(|r| r.name).collect()
        };
        assert_eq!(names(&single), ["turno_unico"]);
        assert_eq!(names(&dual), ["doble_turno"]);
        assert!(assemble_clauses(&dual)[0].text.contains(NOT_SPECIFIED));
    }

    #[test]
    fn bonuses_from_contexts_or_list() {
        let ctx = fields(json!({"Bonos": [
            {"Nombre del bono": "Producción", "Monto del bono": "50.000"},
            {"Nombre del bono": "Asistencia"}
        ]}));
        assert_eq!(ctx.bonuses.len(), 2);
        assert_eq!(ctx.bonuses[0].amount.as_deref(), Some("50.000"));
        let text = &assemble_clauses(&ctx)[0].text;
        assert!(text.contains("Producción por un monto de $50.000; Asistencia"));

        let plain = fields(json!({"Bonos": ["Turno noche"]}));
        assert_eq!(plain.bonuses, vec![Bonus { name: "Turno noche".into(), amount: None }]);
    }

    #[test]
    fn identity_falls_back_to_submitter_and_placeholders() {
        let f = fields(json!({"Plazo": "x"}));
        assert_eq!(f.worker_name, "Ana Rojas");
        assert_eq!(f.company_name, "ACME SpA");
        assert_eq!(f.worker_rut, NOT_SPECIFIED);
        assert_eq!(f.effective_date, "1 de enero de 2025");

        let f = fields(json!({"Duración del contrato": "Plazo fijo", "Fecha de término del contrato": "2025-06-30"}));
        assert_eq!(f.contract_term, Some(ContractTerm::FixedUntil("30 de junio de 2025".into())));
    }

    #[test]
    fn falls_back_to_numeric_labels_past_twenty() {
        let many: Vec<ClauseRule> = (0..25)
            .map(|_| ClauseRule {
                name: "x",
                applies: |_| true,
                render: |_| "texto".to_string(),
            })
            .collect();
        let clauses = assemble_with(&many, &fields(json!({})));
        assert_eq!(clauses.len(), 27);
        assert_eq!(clauses[19].label, "VIGÉSIMO:");
        assert_eq!(clauses[20].label, "21°:");
        assert_eq!(clauses[26].label, "27°:");
    }
}
