//! Typed convenience wrappers over `ApiClient::send`.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::executor::ApiClient;
use crate::error::TransportError;
use crate::http::{Body, Method, RequestConfig, RequestOptions};

fn json_body<B: Serialize + ?Sized>(body: Option<&B>) -> Result<Option<Body>, TransportError> {
    body.map(|body| {
        serde_json::to_value(body)
            .map(Body::Json)
            .map_err(|e| TransportError::invalid_request(format!("Failed to encode JSON body: {}", e)))
    })
    .transpose()
}

impl ApiClient {
    async fn call<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        options: RequestOptions,
    ) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut request = RequestConfig::path(method, path).with_options(options);
        request.body = json_body(body)?;
        self.send_as(request).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, options: RequestOptions) -> Result<T, TransportError> {
        self.call::<T, ()>(Method::Get, path, None, options).await
    }

    pub async fn post<T, B>(&self, path: &str, body: Option<&B>, options: RequestOptions) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(Method::Post, path, body, options).await
    }

    pub async fn put<T, B>(&self, path: &str, body: Option<&B>, options: RequestOptions) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(Method::Put, path, body, options).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: Option<&B>, options: RequestOptions) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(Method::Patch, path, body, options).await
    }

    /// DELETE, optionally with a JSON body (bulk deletes).
    pub async fn delete<T, B>(&self, path: &str, body: Option<&B>, options: RequestOptions) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.call(Method::Delete, path, body, options).await
    }

    /// HEAD has no payload; success means the resource exists.
    pub async fn head(&self, path: &str, options: RequestOptions) -> Result<(), TransportError> {
        self.send(RequestConfig::path(Method::Head, path).with_options(options))
            .await
            .map(|_| ())
    }
}
