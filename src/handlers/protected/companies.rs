// handlers/protected/companies.rs - Companies and their letterhead logos

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::handlers::multipart::read_upload;
use crate::middleware::{ApiResponse, ApiResult};
use crate::models::Company;

#[derive(Debug, Deserialize)]
pub struct CreateCompany {
    pub name: String,
    #[serde(default)]
    pub rut: Option<String>,
}

/// Company without logo bytes.
#[derive(Debug, Serialize)]
pub struct CompanyView {
    pub id: String,
    pub name: String,
    pub rut: Option<String>,
    pub has_logo: bool,
    pub logo_mime_type: Option<String>,
}

impl From<Company> for CompanyView {
    fn from(company: Company) -> Self {
        Self {
            has_logo: company.logo.is_some(),
            logo_mime_type: company.logo.map(|l| l.mime_type),
            id: company.id,
            name: company.name,
            rut: company.rut,
        }
    }
}

/// POST /api/companies
pub async fn create(State(state): State<AppState>, Json(payload): Json<CreateCompany>) -> ApiResult<CompanyView> {
    let company = state.companies.create(&payload.name, payload.rut).await?;
    Ok(ApiResponse::created(company.into()))
}

/// GET /api/companies
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<CompanyView>> {
    let companies = state.companies.list().await?;
    Ok(ApiResponse::success(companies.into_iter().map(CompanyView::from).collect()))
}

/// POST /api/companies/:id/logo - Upload a PNG or JPEG letterhead logo (multipart `file`)
pub async fn upload_logo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<CompanyView> {
    let upload = read_upload(multipart).await?;
    let company = state.companies.upload_logo(&id, upload).await?;
    Ok(ApiResponse::success(company.into()))
}
