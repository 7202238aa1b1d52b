use crate::{
    api::parse_enum,
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::document::{Document, DocumentType},
    utils::db_utils::{Filters, Page, SqlValue, bind_as, bind_scalar},
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDocument {
    #[schema(example = 1)]
    pub employee_id: u64,
    pub doc_type: DocumentType,
    #[schema(example = "atestado-2025-06-02.pdf")]
    pub file_name: String,
    /// Where the file was uploaded; only metadata is stored here.
    #[schema(example = "https://storage.example.com/docs/42.pdf")]
    pub storage_url: String,
    #[schema(example = "application/pdf", nullable = true)]
    pub content_type: Option<String>,
    #[schema(nullable = true)]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct DocumentQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub employee_id: Option<u64>,
    pub doc_type: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct DocumentListResponse {
    pub data: Vec<Document>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

fn validate_document(payload: &CreateDocument) -> ApiResult<()> {
    let name = payload.file_name.trim();
    if name.is_empty() || name.contains('/') || name.contains('\\') {
        return Err(ApiError::bad_request("file_name must be a plain file name"));
    }
    let url = payload.storage_url.trim();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ApiError::bad_request("storage_url must be an http(s) URL"));
    }
    Ok(())
}

pub async fn fetch_document(pool: &MySqlPool, document_id: u64) -> ApiResult<Document> {
    sqlx::query_as::<_, Document>("SELECT * FROM documents WHERE id = ?")
        .bind(document_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found"))
}

#[utoipa::path(
    post,
    path = "/api/documents",
    request_body = CreateDocument,
    responses(
        (status = 201, description = "Document registered", body = Object, example = json!({
            "message": "Document registered", "id": 1
        })),
        (status = 400, description = "Invalid file name or URL"),
        (status = 403, description = "Employees may only register their own documents")
    ),
    tag = "Document",
    security(("bearer_auth" = []))
)]
pub async fn create_document(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateDocument>,
) -> ApiResult<HttpResponse> {
    auth.require_self_or_hr(payload.employee_id)?;
    validate_document(&payload)?;

    let done = sqlx::query(
        r#"
        INSERT INTO documents (employee_id, doc_type, file_name, storage_url, content_type, size_bytes)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(payload.employee_id)
    .bind(payload.doc_type.as_ref())
    .bind(payload.file_name.trim())
    .bind(payload.storage_url.trim())
    .bind(&payload.content_type)
    .bind(payload.size_bytes)
    .execute(pool.get_ref())
    .await?;

    info!(document_id = done.last_insert_id(), employee_id = payload.employee_id, "Document registered");
    Ok(HttpResponse::Created().json(json!({
        "message": "Document registered",
        "id": done.last_insert_id()
    })))
}

#[utoipa::path(
    get,
    path = "/api/documents",
    params(DocumentQuery),
    responses((status = 200, description = "Document list", body = DocumentListResponse)),
    tag = "Document",
    security(("bearer_auth" = []))
)]
pub async fn list_documents(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<DocumentQuery>,
) -> ApiResult<HttpResponse> {
    let page = Page::new(query.page, query.per_page);

    let mut filters = Filters::new();
    if let Some(employee_id) = auth.scope_employee_filter(query.employee_id)? {
        filters.push("employee_id = ?", SqlValue::U64(employee_id));
    }
    if let Some(doc_type) = &query.doc_type {
        let doc_type: DocumentType = parse_enum(doc_type, "doc_type")?;
        filters.push("doc_type = ?", SqlValue::String(doc_type.as_ref().to_string()));
    }
    let where_clause = filters.where_clause();

    let total = bind_scalar(
        sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM documents{where_clause}")),
        filters.args(),
    )
    .fetch_one(pool.get_ref())
    .await?;

    let data_sql = format!("SELECT * FROM documents{where_clause} ORDER BY uploaded_at DESC LIMIT ? OFFSET ?");
    let documents = bind_as(sqlx::query_as::<_, Document>(&data_sql), filters.args())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(DocumentListResponse {
        data: documents,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/documents/{document_id}",
    params(("document_id", Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document metadata", body = Document),
        (status = 404, description = "Document not found")
    ),
    tag = "Document",
    security(("bearer_auth" = []))
)]
pub async fn get_document(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    let document = fetch_document(pool.get_ref(), path.into_inner()).await?;
    auth.require_self_or_hr(document.employee_id)?;
    Ok(HttpResponse::Ok().json(document))
}

#[utoipa::path(
    delete,
    path = "/api/documents/{document_id}",
    params(("document_id", Path, description = "Document ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Document not found")
    ),
    tag = "Document",
    security(("bearer_auth" = []))
)]
pub async fn delete_document(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> ApiResult<HttpResponse> {
    auth.require_hr_or_admin()?;
    let document_id = path.into_inner();

    let res = sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(document_id)
        .execute(pool.get_ref())
        .await?;
    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("Document not found"));
    }

    info!(document_id, "Document deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}
