//! Asynchronous blueprint client implementation.

use crate::models::{
    Attachment, CookbookVersion, CreateAttachmentRequest, CreateCookbookVersionRequest,
    CreateScriptRequest, Script, UpdateScriptRequest,
};
use crate::saga::compensate;
use crate::Result;
use concerto_core::ids::{AttachmentId, CookbookVersionId, ScriptId};
use concerto_core::{AuthMode, Downloaded, Error, FileName, ServiceClient, SessionConfig};
use serde_json::json;
use std::path::Path;
use tracing::info;

const USER_AGENT: &str = concat!("concerto-blueprint/", env!("CARGO_PKG_VERSION"));

/// Asynchronous client for the blueprint endpoints.
#[derive(Debug, Clone)]
pub struct BlueprintClient {
    inner: ServiceClient,
}

impl BlueprintClient {
    /// Wrap an existing session.
    #[must_use]
    pub fn new(inner: ServiceClient) -> Self {
        Self { inner }
    }

    /// Build a certificate-authenticated session for `config`.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let inner = ServiceClient::builder(config.clone(), AuthMode::Certificate)
            .with_user_agent(USER_AGENT)
            .build()?;
        Ok(Self { inner })
    }

    /// Underlying session.
    #[must_use]
    pub fn session(&self) -> &ServiceClient {
        &self.inner
    }

    /// List scripts.
    pub async fn list_scripts(&self) -> Result<Vec<Script>> {
        Ok(self.inner.get_json("/blueprint/scripts").await?.into_inner())
    }

    /// Fetch a single script.
    pub async fn get_script(&self, id: &ScriptId) -> Result<Script> {
        let path = format!("/blueprint/scripts/{id}");
        Ok(self.inner.get_json(&path).await?.into_inner())
    }

    /// Create a script.
    pub async fn create_script(&self, request: &CreateScriptRequest) -> Result<Script> {
        Ok(self
            .inner
            .post_json("/blueprint/scripts", request)
            .await?
            .into_inner())
    }

    /// Update a script.
    pub async fn update_script(
        &self,
        id: &ScriptId,
        request: &UpdateScriptRequest,
    ) -> Result<Script> {
        let path = format!("/blueprint/scripts/{id}");
        Ok(self.inner.put_json(&path, request).await?.into_inner())
    }

    /// Delete a script.
    pub async fn delete_script(&self, id: &ScriptId) -> Result<()> {
        let path = format!("/blueprint/scripts/{id}");
        self.inner.delete_checked(&path).await.map(|_| ())
    }

    /// List the attachments of a script.
    pub async fn list_attachments(&self, script: &ScriptId) -> Result<Vec<Attachment>> {
        let path = format!("/blueprint/scripts/{script}/attachments");
        Ok(self.inner.get_json(&path).await?.into_inner())
    }

    /// Fetch a single attachment.
    pub async fn get_attachment(&self, id: &AttachmentId) -> Result<Attachment> {
        let path = format!("/blueprint/attachments/{id}");
        Ok(self.inner.get_json(&path).await?.into_inner())
    }

    /// Delete an attachment.
    pub async fn delete_attachment(&self, id: &AttachmentId) -> Result<()> {
        let path = format!("/blueprint/attachments/{id}");
        self.inner.delete_checked(&path).await.map(|_| ())
    }

    /// Download an attachment into `directory`, named as the server says.
    pub async fn download_attachment(
        &self,
        id: &AttachmentId,
        directory: impl AsRef<Path>,
    ) -> Result<Downloaded> {
        let path = format!("/blueprint/attachments/{id}/download");
        self.inner
            .get_file(&path, directory, FileName::Discover)
            .await
    }

    /// Create an attachment placeholder. The response carries the upload URL.
    pub async fn create_attachment(&self, script: &ScriptId, name: &str) -> Result<Attachment> {
        let path = format!("/blueprint/scripts/{script}/attachments");
        let request = CreateAttachmentRequest {
            name: name.to_string(),
        };
        Ok(self.inner.post_json(&path, &request).await?.into_inner())
    }

    /// Mark an attachment's content as uploaded.
    pub async fn mark_attachment_uploaded(&self, id: &AttachmentId) -> Result<Attachment> {
        let path = format!("/blueprint/attachments/{id}/uploaded");
        Ok(self.inner.put_json(&path, &json!({})).await?.into_inner())
    }

    /// Attach the file at `source` to a script.
    ///
    /// Creates the placeholder, uploads the content and marks it uploaded. If
    /// either later step fails the placeholder is deleted before the error is
    /// returned.
    pub async fn upload_attachment(
        &self,
        script: &ScriptId,
        source: impl AsRef<Path>,
    ) -> Result<Attachment> {
        let source = source.as_ref();
        let name = file_name(source)?;

        let attachment = self.create_attachment(script, &name).await?;
        match self.finish_attachment(&attachment, source).await {
            Ok(done) => {
                info!(attachment = %done.id, script = %script, "Attachment uploaded");
                Ok(done)
            }
            Err(err) => {
                let path = format!("/blueprint/attachments/{}", attachment.id);
                Err(compensate(&self.inner, &path, err).await)
            }
        }
    }

    async fn finish_attachment(&self, attachment: &Attachment, source: &Path) -> Result<Attachment> {
        let upload_url = attachment.upload_url.as_deref().ok_or_else(|| {
            Error::InvalidResponse(format!("attachment {} has no upload_url", attachment.id))
        })?;
        self.inner.put_file(source, upload_url).await?;
        self.mark_attachment_uploaded(&attachment.id).await
    }

    /// List cookbook versions.
    pub async fn list_cookbook_versions(&self) -> Result<Vec<CookbookVersion>> {
        Ok(self
            .inner
            .get_json("/blueprint/cookbook_versions")
            .await?
            .into_inner())
    }

    /// Fetch a single cookbook version.
    pub async fn get_cookbook_version(&self, id: &CookbookVersionId) -> Result<CookbookVersion> {
        let path = format!("/blueprint/cookbook_versions/{id}");
        Ok(self.inner.get_json(&path).await?.into_inner())
    }

    /// Delete a cookbook version.
    pub async fn delete_cookbook_version(&self, id: &CookbookVersionId) -> Result<()> {
        let path = format!("/blueprint/cookbook_versions/{id}");
        self.inner.delete_checked(&path).await.map(|_| ())
    }

    /// Create a cookbook version placeholder. The response carries the upload URL.
    pub async fn create_cookbook_version(
        &self,
        request: &CreateCookbookVersionRequest,
    ) -> Result<CookbookVersion> {
        Ok(self
            .inner
            .post_json("/blueprint/cookbook_versions", request)
            .await?
            .into_inner())
    }

    /// Ask the server to process an uploaded cookbook tarball.
    pub async fn process_cookbook_version(
        &self,
        id: &CookbookVersionId,
    ) -> Result<CookbookVersion> {
        let path = format!("/blueprint/cookbook_versions/{id}/process");
        Ok(self.inner.put_json(&path, &json!({})).await?.into_inner())
    }

    /// Upload the cookbook tarball at `source`.
    ///
    /// Creates the placeholder, uploads the tarball and starts processing.
    /// If either later step fails the placeholder is deleted before the error
    /// is returned.
    pub async fn upload_cookbook_version(
        &self,
        source: impl AsRef<Path>,
        request: &CreateCookbookVersionRequest,
    ) -> Result<CookbookVersion> {
        let source = source.as_ref();
        let version = self.create_cookbook_version(request).await?;

        match self.finish_cookbook_version(&version, source).await {
            Ok(done) => {
                info!(cookbook_version = %done.id, "Cookbook version uploaded");
                Ok(done)
            }
            Err(err) => {
                let path = format!("/blueprint/cookbook_versions/{}", version.id);
                Err(compensate(&self.inner, &path, err).await)
            }
        }
    }

    async fn finish_cookbook_version(
        &self,
        version: &CookbookVersion,
        source: &Path,
    ) -> Result<CookbookVersion> {
        let upload_url = version.upload_url.as_deref().ok_or_else(|| {
            Error::InvalidResponse(format!("cookbook version {} has no upload_url", version.id))
        })?;
        self.inner.put_file(source, upload_url).await?;
        self.process_cookbook_version(&version.id).await
    }
}

fn file_name(source: &Path) -> Result<String> {
    source
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_owned)
        .ok_or_else(|| Error::Io {
            path: source.to_path_buf(),
            message: "not a file path".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> BlueprintClient {
        let config = SessionConfig::new(server.uri()).with_brownfield_token("bf");
        BlueprintClient::new(ServiceClient::new(&config, AuthMode::Brownfield).unwrap())
    }

    fn script_id() -> ScriptId {
        ScriptId::parse("5aabb7521de0240abb000007").unwrap()
    }

    #[tokio::test]
    async fn list_scripts_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blueprint/scripts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "s1", "name": "bootstrap", "parameters": ["HOST"]},
                {"id": "s2", "name": "cleanup"}
            ])))
            .mount(&server)
            .await;

        let scripts = test_client(&server).list_scripts().await.unwrap();
        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[0].parameters, vec!["HOST".to_string()]);
    }

    #[tokio::test]
    async fn create_script_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/blueprint/scripts"))
            .and(body_json(json!({"name": "bootstrap", "code": "echo hi"})))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(json!({"errors": {"name": ["is already taken"]}})),
            )
            .mount(&server)
            .await;

        let request = CreateScriptRequest {
            name: "bootstrap".into(),
            code: "echo hi".into(),
            ..CreateScriptRequest::default()
        };
        let err = test_client(&server)
            .create_script(&request)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(409));
        assert!(err.to_string().contains("is already taken"));
    }

    #[tokio::test]
    async fn update_script_sends_only_changes() {
        let server = MockServer::start().await;
        let id = script_id();
        Mock::given(method("PUT"))
            .and(path(format!("/blueprint/scripts/{id}").as_str()))
            .and(body_json(json!({"description": "new"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": id, "name": "bootstrap", "description": "new"
            })))
            .mount(&server)
            .await;

        let request = UpdateScriptRequest {
            description: Some("new".into()),
            ..UpdateScriptRequest::default()
        };
        let script = test_client(&server)
            .update_script(&id, &request)
            .await
            .unwrap();
        assert_eq!(script.description.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn upload_attachment_runs_all_steps() {
        let server = MockServer::start().await;
        let id = script_id();
        Mock::given(method("POST"))
            .and(path(format!("/blueprint/scripts/{id}/attachments").as_str()))
            .and(body_json(json!({"name": "config.yml"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "a1",
                "name": "config.yml",
                "upload_url": format!("{}/storage/a1", server.uri())
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/storage/a1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/blueprint/attachments/a1/uploaded"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "a1", "name": "config.yml", "uploaded": true
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let source = dir.path().join("config.yml");
        fs::write(&source, "key: value\n").unwrap();

        let attachment = test_client(&server)
            .upload_attachment(&id, &source)
            .await
            .unwrap();
        assert!(attachment.uploaded);
    }

    #[tokio::test]
    async fn failed_attachment_upload_deletes_placeholder() {
        let server = MockServer::start().await;
        let id = script_id();
        Mock::given(method("POST"))
            .and(path(format!("/blueprint/scripts/{id}/attachments").as_str()))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "a1",
                "name": "config.yml",
                "upload_url": format!("{}/storage/a1", server.uri())
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/storage/a1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("storage offline"))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/blueprint/attachments/a1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let source = dir.path().join("config.yml");
        fs::write(&source, "key: value\n").unwrap();

        let err = test_client(&server)
            .upload_attachment(&id, &source)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::HttpFailure {
                status: 500,
                message: "storage offline".into()
            }
        );
    }

    #[tokio::test]
    async fn failed_compensation_reports_both_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/blueprint/cookbook_versions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "cb1",
                "state": "pending",
                "upload_url": format!("{}/storage/cb1", server.uri())
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/storage/cb1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/blueprint/cookbook_versions/cb1/process"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({"error": "invalid tarball"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/blueprint/cookbook_versions/cb1"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "locked"})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let source = dir.path().join("cookbook.tgz");
        fs::write(&source, "tarball").unwrap();

        let err = test_client(&server)
            .upload_cookbook_version(&source, &CreateCookbookVersionRequest::default())
            .await
            .unwrap_err();

        match &err {
            Error::Compensation {
                original,
                compensation,
            } => {
                assert_eq!(original.status(), Some(422));
                assert_eq!(compensation.status(), Some(500));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.status(), Some(422));
    }

    #[tokio::test]
    async fn missing_upload_url_deletes_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/blueprint/cookbook_versions"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "cb2", "state": "pending"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/blueprint/cookbook_versions/cb2"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let source = dir.path().join("cookbook.tgz");
        fs::write(&source, "tarball").unwrap();

        let err = test_client(&server)
            .upload_cookbook_version(&source, &CreateCookbookVersionRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn download_attachment_uses_server_file_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blueprint/attachments/a1/download"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", r#"attachment; filename="config.yml""#)
                    .set_body_string("key: value\n"),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let id = AttachmentId::parse("a1").unwrap();
        let downloaded = test_client(&server)
            .download_attachment(&id, dir.path())
            .await
            .unwrap();
        assert_eq!(downloaded.path, dir.path().join("config.yml"));
    }
}
