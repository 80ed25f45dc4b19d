use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::uploads::{Upload, UploadPolicy};
use super::{not_found_as, ServiceError, ServiceResult};
use crate::composer::{find_letterhead, Letterhead};
use crate::database::{patch, Filter, Repository};
use crate::models::Company;

#[derive(Clone)]
pub struct CompanyService {
    companies: Repository<Company>,
    logo_policy: UploadPolicy,
}

impl CompanyService {
    pub fn new(companies: Repository<Company>, logo_policy: UploadPolicy) -> Self {
        Self {
            companies,
            logo_policy,
        }
    }

    pub async fn create(&self, name: &str, rut: Option<String>) -> ServiceResult<Company> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::validation("Company name is required"));
        }
        let company = Company {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            rut,
            logo: None,
            created_at: Utc::now(),
        };
        self.companies.insert(&company).await?;
        Ok(company)
    }

    pub async fn list(&self) -> ServiceResult<Vec<Company>> {
        Ok(self.companies.select_any(Filter::all()).await?)
    }

    /// Replace the company logo. The upload is checked before anything is written.
    pub async fn upload_logo(&self, company_id: &str, upload: Upload) -> ServiceResult<Company> {
        self.logo_policy.check(&upload)?;
        let mut company = self
            .companies
            .select_404(Filter::by_id(company_id))
            .await
            .map_err(not_found_as("Company not found"))?;

        let logo = upload.into_blob();
        self.companies
            .update(Filter::by_id(company_id), patch(json!({ "logo": logo })))
            .await?;
        info!("Stored {} byte logo for company {}", logo.size, company_id);

        company.logo = Some(logo);
        Ok(company)
    }

    /// Best-effort letterhead for a company name typed by a user.
    pub async fn letterhead_for(&self, company_name: &str) -> ServiceResult<Option<Letterhead>> {
        let companies = self.companies.select_any(Filter::all()).await?;
        Ok(find_letterhead(&companies, company_name))
    }
}
