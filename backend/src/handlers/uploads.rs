//! Document intake handlers.
//!
//! **Endpoint**: `POST /api/v1/cases/{case_id}/upload`
//!
//! Accepts multipart/form-data with one or more file fields. ZIP archives
//! are flattened: nested directories disappear, junk entries (.DS_Store,
//! __MACOSX, VCS metadata) are dropped, and every surviving entry becomes
//! an independent document. Duplicates are detected by SHA-256 within the
//! case and silently skipped. Every accepted file gets a Document row plus
//! one queued processing job, and the case moves to `processing`.

use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use log::{info, warn};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::io::Read;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};
use crate::handlers::cases::fetch_scoped_case;
use crate::handlers::operator_id;
use crate::models::DocumentRow;
use crate::services::processor::refresh_case_completeness;
use crate::storage::storage_key;
use crate::AppState;

/// Junk filenames dropped during archive extraction.
const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];
/// Folder names whose entire subtree is dropped.
const IGNORED_FOLDERS: &[&str] = &["__MACOSX", ".git", ".svn"];

fn extension_of(filename: &str) -> String {
    filename
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_lowercase()
}

fn guess_mime_type(filename: &str) -> &'static str {
    match extension_of(filename).as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "csv" => "text/csv",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

struct IncomingFile {
    filename: String,
    bytes: Vec<u8>,
}

/// Flatten a ZIP archive into individual files, applying the ignore list,
/// the per-file budget and the extension allowlist. Nested archives are
/// skipped.
fn extract_zip_entries(
    zip_bytes: &[u8],
    max_file_bytes: u64,
    allowed_extensions: &HashSet<String>,
) -> ServiceResult<Vec<IncomingFile>> {
    let cursor = std::io::Cursor::new(zip_bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|_| ServiceError::Validation("Invalid ZIP file".to_string()))?;

    let mut extracted = Vec::new();

    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read ZIP entry {}: {}", index, e);
                continue;
            }
        };

        if entry.is_dir() {
            continue;
        }

        let full_path = entry.name().to_string();
        let parts: Vec<&str> = full_path.split('/').collect();
        let filename = parts.last().copied().unwrap_or("").to_string();

        if filename.is_empty() || IGNORED_FILES.contains(&filename.as_str()) {
            continue;
        }
        if parts
            .iter()
            .any(|segment| IGNORED_FOLDERS.contains(segment))
        {
            continue;
        }

        let extension = extension_of(&filename);
        if !allowed_extensions.contains(&extension) || extension == "zip" {
            warn!("Skipping unsupported file in ZIP: {}", filename);
            continue;
        }

        if entry.size() > max_file_bytes {
            warn!("File {} in ZIP exceeds size limit, skipping", filename);
            continue;
        }

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        if let Err(e) = entry.read_to_end(&mut bytes) {
            warn!("Failed to extract {} from ZIP: {}", filename, e);
            continue;
        }

        extracted.push(IncomingFile { filename, bytes });
    }

    Ok(extracted)
}

/// Upload one or more documents to a case.
pub async fn upload_documents(
    req: HttpRequest,
    case_id: web::Path<String>,
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> ServiceResult<HttpResponse> {
    let user_id = operator_id(&req)?;
    info!("POST /api/v1/cases/{}/upload - receiving files", case_id);

    let case = fetch_scoped_case(&data.db_pool, &case_id, &user_id).await?;

    let max_file_bytes = data.settings.uploads.max_file_size_bytes();
    let max_upload_bytes = data.settings.uploads.max_case_upload_bytes();
    let allowed_extensions: HashSet<String> = data
        .settings
        .uploads
        .allowed_extensions
        .iter()
        .map(|ext| ext.to_lowercase())
        .collect();

    // Drain the multipart stream, enforcing the aggregate budget as we go.
    let mut incoming: Vec<IncomingFile> = Vec::new();
    let mut total_bytes: u64 = 0;

    while let Some(item) = payload.next().await {
        let mut field = item
            .map_err(|e| ServiceError::Validation(format!("Invalid multipart data: {}", e)))?;

        let Some(filename) = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string)
        else {
            continue;
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|e| ServiceError::Validation(format!("Error reading upload: {}", e)))?;
            total_bytes += chunk.len() as u64;
            if total_bytes > max_upload_bytes {
                return Err(ServiceError::Validation(format!(
                    "Total upload size exceeds the {}MB limit",
                    data.settings.uploads.max_case_upload_mb
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        incoming.push(IncomingFile { filename, bytes });
    }

    if incoming.is_empty() {
        return Err(ServiceError::Validation("No files provided".to_string()));
    }

    // Validate, expand archives, and collect the final file set.
    let mut accepted: Vec<IncomingFile> = Vec::new();
    for file in incoming {
        if file.bytes.len() as u64 > max_file_bytes {
            warn!("File {} exceeds size limit, skipping", file.filename);
            continue;
        }

        let extension = extension_of(&file.filename);
        if !allowed_extensions.contains(&extension) {
            warn!("File {} has unsupported extension, skipping", file.filename);
            continue;
        }

        if extension == "zip" {
            accepted.extend(extract_zip_entries(
                &file.bytes,
                max_file_bytes,
                &allowed_extensions,
            )?);
        } else {
            accepted.push(file);
        }
    }

    // Persist each file, skipping duplicates by content hash.
    let mut documents = Vec::new();
    for file in accepted {
        let file_hash = sha256_hex(&file.bytes);

        let duplicate = sqlx::query("SELECT id FROM documents WHERE case_id = ? AND file_hash = ?")
            .bind(case.id.to_string())
            .bind(&file_hash)
            .fetch_optional(&data.db_pool)
            .await?;
        if duplicate.is_some() {
            info!(
                "Duplicate file detected in case {}: {} (hash {})",
                case.case_id,
                file.filename,
                &file_hash[..16]
            );
            continue;
        }

        let key = storage_key(&case.case_id, &file.filename);
        data.storage.put(&key, &file.bytes).await?;

        let document_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO documents (id, case_id, original_filename, storage_key,
                                    file_size_bytes, mime_type, file_hash, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, 'uploaded')",
        )
        .bind(document_id.to_string())
        .bind(case.id.to_string())
        .bind(&file.filename)
        .bind(&key)
        .bind(file.bytes.len() as i64)
        .bind(guess_mime_type(&file.filename))
        .bind(&file_hash)
        .execute(&data.db_pool)
        .await?;

        sqlx::query(
            "INSERT INTO document_processing_jobs (id, case_id, document_id, status, attempts, max_attempts)
             VALUES (?, ?, ?, 'queued', 0, 2)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(case.id.to_string())
        .bind(document_id.to_string())
        .execute(&data.db_pool)
        .await?;

        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(document_id.to_string())
            .fetch_one(&data.db_pool)
            .await?;
        documents.push(DocumentRow::from_row(&row)?.to_response());
    }

    sqlx::query("UPDATE cases SET status = 'processing' WHERE id = ?")
        .bind(case.id.to_string())
        .execute(&data.db_pool)
        .await?;

    if case.program_type.is_some() {
        let _ = refresh_case_completeness(&data.db_pool, &case.id).await;
    }

    info!(
        "Uploaded {} documents to case {}",
        documents.len(),
        case.case_id
    );
    Ok(HttpResponse::Ok().json(documents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn allowed() -> HashSet<String> {
        ["pdf", "png", "jpg", "jpeg", "csv"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            for (name, bytes) in entries {
                writer
                    .start_file(*name, SimpleFileOptions::default())
                    .unwrap();
                writer.write_all(bytes).unwrap();
            }
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn zip_extraction_flattens_and_drops_junk() {
        let archive = build_zip(&[
            ("docs/statement.pdf", b"pdf-bytes"),
            ("docs/.DS_Store", b"junk"),
            ("__MACOSX/._statement.pdf", b"junk"),
            ("notes/readme.txt", b"unsupported extension"),
        ]);

        let files = extract_zip_entries(&archive, 1024 * 1024, &allowed()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "statement.pdf");
        assert_eq!(files[0].bytes, b"pdf-bytes");
    }

    #[test]
    fn zip_extraction_rejects_oversized_entries() {
        let big = vec![0u8; 2048];
        let archive = build_zip(&[("big.pdf", big.as_slice()), ("small.pdf", b"ok")]);
        let files = extract_zip_entries(&archive, 1024, &allowed()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "small.pdf");
    }

    #[test]
    fn nested_zips_are_not_expanded() {
        let inner = build_zip(&[("inner.pdf", b"pdf")]);
        let archive = build_zip(&[("bundle.zip", inner.as_slice())]);
        let mut allowed_with_zip = allowed();
        allowed_with_zip.insert("zip".to_string());
        let files = extract_zip_entries(&archive, 1024 * 1024, &allowed_with_zip).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn invalid_zip_is_a_validation_error() {
        let result = extract_zip_entries(b"definitely not a zip", 1024, &allowed());
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[test]
    fn identical_bytes_share_a_hash_regardless_of_name() {
        // Duplicate detection keys on content, not filename.
        assert_eq!(sha256_hex(b"same-bytes"), sha256_hex(b"same-bytes"));
        assert_ne!(sha256_hex(b"same-bytes"), sha256_hex(b"other-bytes"));
    }

    #[test]
    fn extensions_are_case_insensitive() {
        assert_eq!(extension_of("SCAN.PDF"), "pdf");
        assert_eq!(extension_of("archive.ZIP"), "zip");
        assert_eq!(extension_of("no_extension"), "no_extension");
    }
}
