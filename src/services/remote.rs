//! Blocking client for the three classification endpoints.
//!
//! Every file goes up as its own `files` multipart part named by its bare filename, never
//! its path. Grouping calls add the `document_structure` field. No request timeout is set:
//! the backend may take arbitrarily long on large batches.

use crate::config::Settings;
use crate::error::{ClassifierError, Result, Stage};
use crate::models::{
    CategorizeResponse, ClassificationStructure, CreditCardGroupResponse, DocumentGroupResponse,
};
use crate::services::cancel::CancelToken;
use crate::services::retry::RetryPolicy;
use crate::types::UploadedFile;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;

/// The remote operations the pipeline depends on.
pub trait ClassifierApi {
    fn categorize(&self, files: &[&UploadedFile]) -> Result<CategorizeResponse>;

    fn group_credit_cards(
        &self,
        files: &[&UploadedFile],
        structure: &ClassificationStructure,
    ) -> Result<CreditCardGroupResponse>;

    fn group_documents(
        &self,
        files: &[&UploadedFile],
        structure: &ClassificationStructure,
    ) -> Result<DocumentGroupResponse>;
}

pub struct RemoteClassifier {
    http: Client,
    base_url: String,
    retry: RetryPolicy,
    cancel: CancelToken,
}

impl RemoteClassifier {
    pub fn new(base_url: &str, retry: RetryPolicy, cancel: CancelToken) -> Result<Self> {
        let http = Client::builder()
            .user_agent(format!("document-classifier/{}", env!("CARGO_PKG_VERSION")))
            .timeout(None::<std::time::Duration>)
            .build()
            .map_err(|e| ClassifierError::Config(format!("could not build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
            cancel,
        })
    }

    pub fn from_settings(settings: &Settings, cancel: CancelToken) -> Result<Self> {
        Self::new(&settings.base_url(), settings.retry.clone().into(), cancel)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_form(files: &[&UploadedFile], structure: Option<&str>) -> Form {
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.content.clone()).file_name(file.name.clone());
            form = form.part("files", part);
        }
        if let Some(structure) = structure {
            form = form.text("document_structure", structure.to_string());
        }
        form
    }

    fn post<T: DeserializeOwned>(
        &self,
        stage: Stage,
        files: &[&UploadedFile],
        structure: Option<&ClassificationStructure>,
    ) -> Result<T> {
        let endpoint = stage.endpoint();
        let url = format!("{}{}", self.base_url, endpoint);
        let structure = structure
            .map(|s| s.to_form_value())
            .transpose()
            .map_err(|e| ClassifierError::InvalidResponse {
                endpoint,
                message: format!("could not encode document_structure: {}", e),
            })?;

        tracing::info!("POST {} - {} file(s)", endpoint, files.len());
        if let Some(ref s) = structure {
            tracing::debug!("{} document_structure: {}", endpoint, s);
        }

        let response = self.retry.run(endpoint, &self.cancel, || {
            // Form is consumed by send, so every attempt builds its own.
            let form = Self::build_form(files, structure.as_deref());
            self.http
                .post(&url)
                .multipart(form)
                .send()
                .map_err(|e| ClassifierError::Transport {
                    endpoint,
                    message: e.to_string(),
                })
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!("{} error: {} {}", endpoint, status.as_u16(), body);
            return Err(ClassifierError::Remote {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response
            .json::<T>()
            .map_err(|e| ClassifierError::InvalidResponse {
                endpoint,
                message: e.to_string(),
            })?;
        tracing::info!("{} completed", endpoint);
        Ok(parsed)
    }
}

impl ClassifierApi for RemoteClassifier {
    fn categorize(&self, files: &[&UploadedFile]) -> Result<CategorizeResponse> {
        self.post(Stage::Categorize, files, None)
    }

    fn group_credit_cards(
        &self,
        files: &[&UploadedFile],
        structure: &ClassificationStructure,
    ) -> Result<CreditCardGroupResponse> {
        self.post(Stage::CreditCardGrouping, files, Some(structure))
    }

    fn group_documents(
        &self,
        files: &[&UploadedFile],
        structure: &ClassificationStructure,
    ) -> Result<DocumentGroupResponse> {
        self.post(Stage::DocumentGrouping, files, Some(structure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn base_url_loses_trailing_slash() {
        let client = RemoteClassifier::new(
            "http://127.0.0.1:8000/",
            RetryPolicy::default(),
            CancelToken::new(),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8000");
    }

    #[test]
    fn refused_connection_surfaces_as_transport_after_retries() {
        // Bind then drop to get a port nothing listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = RemoteClassifier::new(
            &format!("http://127.0.0.1:{}", port),
            RetryPolicy::new(2, Duration::from_millis(1)),
            CancelToken::new(),
        )
        .unwrap();
        let file = UploadedFile::new("a.jpg", None, b"img".to_vec());
        let err = client.categorize(&[&file]).unwrap_err();
        assert!(err.is_transport(), "unexpected error: {}", err);
    }
}
