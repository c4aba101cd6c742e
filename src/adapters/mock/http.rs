//! Mock HTTP client for testing.
//!
//! Responses are queued per URL and handed out in order, so a test can
//! script a whole polling session.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::traits::{Headers, HttpClient, HttpError, Response};

/// A recorded HTTP request for verification in tests.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Headers,
}

/// Configuration for a mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Success(Response),
    Error(HttpError),
    /// The request never completes.
    Hang,
}

/// Mock HTTP client for testing.
///
/// # Example
///
/// ```ignore
/// use feedwire::adapters::mock::{MockHttpClient, MockResponse};
/// use feedwire::traits::{Headers, HttpClient, Response};
///
/// let client = MockHttpClient::new();
/// client.push_response(
///     "http://localhost:3000/poll",
///     MockResponse::Success(Response::new(204, "")),
/// );
///
/// let response = client.get("http://localhost:3000/poll", &Headers::new()).await?;
/// assert_eq!(response.status, 204);
/// assert_eq!(client.get_requests().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockHttpClient {
    /// Queued responses by exact URL
    responses: Arc<Mutex<HashMap<String, VecDeque<MockResponse>>>>,
    /// Used once a URL's queue is empty
    default_response: Arc<Mutex<Option<MockResponse>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for `url`.
    pub fn push_response(&self, url: &str, response: MockResponse) {
        let mut responses = self.responses.lock().unwrap();
        responses
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    /// Response for any URL whose queue is empty.
    pub fn set_default_response(&self, response: MockResponse) {
        *self.default_response.lock().unwrap() = Some(response);
    }

    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    fn next_response(&self, url: &str) -> Option<MockResponse> {
        let queued = self
            .responses
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front);
        queued.or_else(|| self.default_response.lock().unwrap().clone())
    }
}

#[async_trait]
impl HttpClient for MockHttpClient {
    async fn get(&self, url: &str, headers: &Headers) -> Result<Response, HttpError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            headers: headers.clone(),
        });

        match self.next_response(url) {
            Some(MockResponse::Success(response)) => Ok(response),
            Some(MockResponse::Error(err)) => Err(err),
            Some(MockResponse::Hang) => std::future::pending().await,
            None => Err(HttpError::Other(format!("No mock response for URL: {}", url))),
        }
    }
}
