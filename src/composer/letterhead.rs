use crate::models::Company;

/// Logo image placed above the title of a generated amendment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Letterhead {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl Letterhead {
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpeg",
            _ => "png",
        }
    }
}

/// Best-effort company lookup: exact case-insensitive name first, then the
/// first company whose name contains any query word longer than 3 chars.
/// Ambiguous names resolve to whichever company comes first.
pub fn match_company<'a>(companies: &'a [Company], name: &str) -> Option<&'a Company> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    if let Some(exact) = companies.iter().find(|c| c.name.trim().to_lowercase() == wanted) {
        return Some(exact);
    }

    let tokens: Vec<&str> = wanted
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 3)
        .collect();

    tokens.iter().find_map(|token| {
        companies
            .iter()
            .find(|c| c.name.to_lowercase().contains(token))
    })
}

/// Letterhead for `name`, if the matched company has a logo.
pub fn find_letterhead(companies: &[Company], name: &str) -> Option<Letterhead> {
    let company = match_company(companies, name)?;
    company.logo.as_ref().map(|logo| Letterhead {
        bytes: logo.data.clone(),
        mime_type: logo.mime_type.clone(),
    })
}
