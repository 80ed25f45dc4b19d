mod common;

use std::io::Cursor;

use anyhow::Result;
use axum::http::{header, Method, StatusCode};
use serde_json::json;

use common::{json_request, multipart_request, Auth, TestApp, PDF_BYTES, PNG_BYTES};
use hr_docflow::database::{Collection, Filter};
use hr_docflow::models::collections;

#[tokio::test]
async fn letterhead_follows_the_named_employer() -> Result<()> {
    let app = TestApp::new()?;
    let submitter = Auth::Bearer(
        app.login_as("Juan Perez", "juan@acme.cl", "user", Some("ACME Servicios"))
            .await?,
    );

    // the submitter's own company has no logo, the named employer does
    app.post("/api/companies", &Auth::Internal, json!({ "name": "ACME Servicios" }))
        .await?;
    let (_, andes) = app
        .post("/api/companies", &Auth::Internal, json!({ "name": "Constructora Andes" }))
        .await?;
    let andes_id = andes["data"]["id"].as_str().unwrap_or_default().to_string();
    let (status, _) = app
        .upload(
            &format!("/api/companies/{}/logo", andes_id),
            &Auth::Internal,
            "logo.png",
            "image/png",
            PNG_BYTES,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let form_id = app.form("Anexo de contrato", Some("Anexos")).await?;
    let (status, submitted) = app
        .post(
            "/api/responses",
            &submitter,
            json!({
                "form_id": form_id,
                "answers": {
                    "Nombre del trabajador": "Pedro Soto",
                    "Nombre de la empresa": "Constructora Andes"
                }
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let generated_id = submitted["data"]["document"]["generated_id"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    let download = app
        .send_raw(json_request(
            Method::GET,
            &format!("/api/documents/{}/download", generated_id),
            &Auth::Internal,
            None,
        )?)
        .await?;
    assert_eq!(download.status, StatusCode::OK);
    let archive = zip::ZipArchive::new(Cursor::new(download.body))?;
    assert!(archive.file_names().any(|n| n.starts_with("word/media/logo")));
    Ok(())
}

#[tokio::test]
async fn amendment_from_submission_to_signature() -> Result<()> {
    let app = TestApp::new()?;
    let submitter = Auth::Bearer(
        app.login_as("Juan Perez", "juan@acme.cl", "user", Some("ACME Servicios"))
            .await?,
    );
    let reviewer = Auth::Bearer(app.login_as("Ana Rojas", "ana@rrhh.cl", "admin", None).await?);

    // company letterhead
    let (status, company) = app
        .post("/api/companies", &reviewer, json!({ "name": "ACME Servicios", "rut": "76.123.456-7" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let company_id = company["data"]["id"].as_str().unwrap_or_default().to_string();
    let (status, logo) = app
        .upload(
            &format!("/api/companies/{}/logo", company_id),
            &reviewer,
            "logo.png",
            "image/png",
            PNG_BYTES,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(logo["data"]["has_logo"], true);

    let form_id = app.form("Anexo de contrato", Some("Anexos")).await?;

    // submit
    let (status, submitted) = app
        .post(
            "/api/responses",
            &submitter,
            json!({
                "form_id": form_id,
                "answers": {
                    "Nombre del trabajador": "Pedro Soto",
                    "Cargo": "Jefe de bodega",
                    "Remuneración": "1.200.000"
                }
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let response_id = submitted["data"]["response"]["_id"].as_str().unwrap_or_default().to_string();
    assert_eq!(submitted["data"]["response"]["status"], "pendiente");
    assert_eq!(submitted["data"]["response"]["submitter"]["company"], "ACME Servicios");
    assert_eq!(submitted["data"]["document"]["kind"], "docx");
    let generated_id = submitted["data"]["document"]["generated_id"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    assert!(generated_id.starts_with("ANEXO_PEDRO_SOTO_"), "{}", generated_id);

    // first download moves the response into review
    let download = app
        .send_raw(json_request(
            Method::GET,
            &format!("/api/documents/{}/download", generated_id),
            &reviewer,
            None,
        )?)
        .await?;
    assert_eq!(download.status, StatusCode::OK);
    assert_eq!(
        download.headers[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    assert_eq!(&download.body[..2], b"PK");
    let archive = zip::ZipArchive::new(Cursor::new(download.body))?;
    assert!(archive.file_names().any(|n| n.starts_with("word/media/logo")));

    let (_, response) = app.get(&format!("/api/responses/{}", response_id), &reviewer).await?;
    assert_eq!(response["data"]["status"], "en_revision");
    assert!(!response["data"]["reviewed_at"].is_null());

    // approval needs a correction
    let approve_uri = format!("/api/responses/{}/approve", response_id);
    let (status, body) = app
        .send(json_request(Method::POST, &approve_uri, &reviewer, None)?)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "PRECONDITION_FAILED");

    let (status, _) = app
        .upload(
            &format!("/api/responses/{}/correction", response_id),
            &reviewer,
            "anexo corregido.pdf",
            "application/pdf",
            PDF_BYTES,
        )
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, approved) = app
        .send(json_request(Method::POST, &approve_uri, &reviewer, None)?)
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(approved["data"]["approved_by"], "Ana Rojas");
    assert_eq!(approved["data"]["response_id"], response_id.as_str());

    let (status, _) = app
        .send(json_request(Method::POST, &approve_uri, &reviewer, None)?)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    let snapshots = app
        .state
        .backend
        .collection(collections::APPROVED_DOCUMENTS)?
        .count(&Filter::all().eq("response_id", response_id.as_str()))
        .await?;
    assert_eq!(snapshots, 1);

    let corrected = app
        .send_raw(json_request(
            Method::GET,
            &format!("/api/responses/{}/approved", response_id),
            &submitter,
            None,
        )?)
        .await?;
    assert_eq!(corrected.status, StatusCode::OK);
    assert_eq!(corrected.body, PDF_BYTES);
    let disposition = corrected.headers[header::CONTENT_DISPOSITION].to_str()?;
    assert!(disposition.contains("filename*=UTF-8''anexo%20corregido.pdf"));

    // client signature, exactly once
    let sign_uri = format!("/api/responses/{}/signature", response_id);
    let (status, _) = app
        .upload(&sign_uri, &submitter, "firmado.pdf", "application/pdf", PDF_BYTES)
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app
        .upload(&sign_uri, &submitter, "firmado.pdf", "application/pdf", PDF_BYTES)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "PRECONDITION_FAILED");

    let signature = app
        .send_raw(json_request(Method::GET, &sign_uri, &reviewer, None)?)
        .await?;
    assert_eq!(signature.status, StatusCode::OK);
    assert_eq!(signature.body, PDF_BYTES);

    // publish is terminal
    let (status, published) = app
        .send(json_request(
            Method::POST,
            &format!("/api/responses/{}/publish", response_id),
            &reviewer,
            None,
        )?)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["data"]["status"], "publicado");

    let (status, _) = app
        .upload(
            &format!("/api/responses/{}/correction", response_id),
            &reviewer,
            "otra.pdf",
            "application/pdf",
            PDF_BYTES,
        )
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn approve_with_inline_upload_and_revert() -> Result<()> {
    let app = TestApp::new()?;
    let form_id = app.form("Anexo de contrato", Some("Anexos")).await?;
    let (_, submitted) = app
        .post("/api/responses", &Auth::Internal, json!({ "form_id": form_id, "answers": {} }))
        .await?;
    let response_id = submitted["data"]["response"]["_id"].as_str().unwrap_or_default().to_string();

    let (status, _) = app
        .send(multipart_request(
            Method::POST,
            &format!("/api/responses/{}/approve", response_id),
            &Auth::Internal,
            "correccion.pdf",
            "application/pdf",
            PDF_BYTES,
        )?)
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    let correction_uri = format!("/api/responses/{}/correction", response_id);
    for _ in 0..2 {
        let (status, body) = app
            .send(json_request(Method::DELETE, &correction_uri, &Auth::Internal, None)?)
            .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "en_revision");
        assert!(body["data"]["correction"].is_null());
    }

    let (status, _) = app
        .get(&format!("/api/responses/{}/approved", response_id), &Auth::Internal)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn other_sections_produce_text_transcripts() -> Result<()> {
    let app = TestApp::new()?;
    let form_id = app.form("Solicitud de vacaciones", Some("Solicitudes")).await?;

    let (status, submitted) = app
        .post(
            "/api/responses",
            &Auth::Internal,
            json!({
                "form_id": form_id,
                "answers": { "Desde": "2025-02-01", "Hasta": "2025-02-14" },
                "submitter": { "user_id": "u9", "name": "Carla Díaz", "company": "ACME" }
            }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(submitted["data"]["document"]["kind"], "txt");
    assert_eq!(submitted["data"]["response"]["submitter"]["name"], "Carla Díaz");
    let response_id = submitted["data"]["response"]["_id"].as_str().unwrap_or_default().to_string();
    let generated_id = submitted["data"]["document"]["generated_id"]
        .as_str()
        .unwrap_or_default()
        .to_string();
    assert!(generated_id.starts_with(&format!("FORMULARIO_{}_", response_id)));

    let (status, meta) = app
        .get(&format!("/api/responses/{}/document", response_id), &Auth::Internal)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(meta["data"]["generated_id"], generated_id.as_str());

    let download = app
        .send_raw(json_request(
            Method::GET,
            &format!("/api/documents/{}/download", generated_id),
            &Auth::Internal,
            None,
        )?)
        .await?;
    assert_eq!(download.headers[header::CONTENT_TYPE], "text/plain");
    let text = String::from_utf8(download.body)?;
    assert!(text.starts_with("FORMULARIO: Solicitud de vacaciones\n"));
    assert!(text.contains("Desde: 2025-02-01"));

    // a section that only looks similar is still a transcript
    let near = app.form("Anexo", Some("anexos")).await?;
    let (_, submitted) = app
        .post("/api/responses", &Auth::Internal, json!({ "form_id": near }))
        .await?;
    assert_eq!(submitted["data"]["document"]["kind"], "txt");
    Ok(())
}

#[tokio::test]
async fn chat_messages_and_read_all() -> Result<()> {
    let app = TestApp::new()?;
    let token = app.login_as("Ana Rojas", "ana@rrhh.cl", "admin", None).await?;
    let auth = Auth::Bearer(token);
    let form_id = app.form("Solicitud", None).await?;

    let mut ids = Vec::new();
    for _ in 0..2 {
        let (_, submitted) = app
            .post("/api/responses", &auth, json!({ "form_id": form_id }))
            .await?;
        ids.push(submitted["data"]["response"]["_id"].as_str().unwrap_or_default().to_string());
    }

    for id in &ids {
        let (status, message) = app
            .post(
                &format!("/api/responses/{}/messages", id),
                &auth,
                json!({ "text": "Falta adjuntar el certificado" }),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(message["data"]["author"], "Ana Rojas");
        assert_eq!(message["data"]["read"], false);
    }

    let (status, body) = app
        .post(&format!("/api/responses/{}/messages", ids[0]), &auth, json!({ "text": "  " }))
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = app
        .send(json_request(Method::PUT, "/api/messages/read-all", &auth, None)?)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["responses_updated"], 2);

    for id in &ids {
        let (_, messages) = app.get(&format!("/api/responses/{}/messages", id), &auth).await?;
        assert_eq!(messages["data"][0]["read"], true);
    }

    let unread = app
        .state
        .submissions
        .list(None)
        .await?
        .iter()
        .flat_map(|r| r.messages.iter())
        .filter(|m| !m.read)
        .count();
    assert_eq!(unread, 0);
    Ok(())
}
