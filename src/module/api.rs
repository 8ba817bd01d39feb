//! Encoding API modules.
//!
//! An `ApiModule` is the thin half of the module catalog: it decodes request
//! bodies and encodes responses in one wire format and otherwise stays out of
//! the way. Handlers receive a clone of the module as axum state.

use std::marker::PhantomData;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::BoxError;
use crate::module::codec::{Codec, DecodingError, EncodingError, Json, Xml};
use crate::module::{Module, ModuleBase, ModuleLogging, ModuleRouter};
use crate::observability::SharedLogger;

/// Route declarations for an `ApiModule`, run during `initialize`.
pub type ApiRoutes<C> =
    Arc<dyn Fn(&ApiModule<C>, &mut ModuleRouter) -> Result<(), BoxError> + Send + Sync>;

pub type JsonApiModule = ApiModule<Json>;
pub type XmlApiModule = ApiModule<Xml>;

pub struct ApiModule<C: Codec> {
    base: ModuleBase,
    routes: ApiRoutes<C>,
    _codec: PhantomData<fn() -> C>,
}

impl<C: Codec> ApiModule<C> {
    /// Create a module whose routes are declared by `routes`.
    ///
    /// The closure receives the module after the server has injected its
    /// context path and logger, so clones taken there carry both.
    pub fn new<F>(routes: F) -> Self
    where
        F: Fn(&ApiModule<C>, &mut ModuleRouter) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self {
            base: ModuleBase::default(),
            routes: Arc::new(routes),
            _codec: PhantomData,
        }
    }

    pub fn base(&self) -> &ModuleBase {
        &self.base
    }

    /// Deserialize a request body into `T`.
    pub fn decode_request<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T, DecodingError> {
        C::decode(body)
    }

    /// Build a response with the module's content type, `status`, and `data`
    /// serialized as the body when present.
    ///
    /// Nothing is committed to the connection until the response is returned,
    /// so a serialization failure leaves the caller free to answer differently.
    pub fn encode_response<T: Serialize + ?Sized>(
        &self,
        status: StatusCode,
        data: Option<&T>,
    ) -> Result<Response, EncodingError> {
        let body = match data {
            Some(value) => Body::from(C::encode(value)?),
            None => Body::empty(),
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(C::CONTENT_TYPE));
        Ok(response)
    }

    /// Encode `data`, falling back to a logged 500 when it cannot be serialized.
    pub fn respond<T: Serialize + ?Sized>(&self, status: StatusCode, data: &T) -> Response {
        match self.encode_response(status, Some(data)) {
            Ok(response) => response,
            Err(e) => {
                if let Some(logger) = self.base.logger() {
                    logger.error(&e);
                }
                e.into_response()
            }
        }
    }

    /// A body-less response carrying only the status and content type.
    pub fn status(&self, status: StatusCode) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = status;
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(C::CONTENT_TYPE));
        response
    }
}

impl<C: Codec> Clone for ApiModule<C> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            routes: Arc::clone(&self.routes),
            _codec: PhantomData,
        }
    }
}

impl<C: Codec> std::fmt::Debug for ApiModule<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiModule")
            .field("format", &C::FORMAT)
            .field("base", &self.base)
            .finish()
    }
}

impl<C: Codec> Module for ApiModule<C> {
    fn set_context_path(&mut self, context_path: &str) {
        self.base.set_context_path(context_path);
    }

    fn context_path(&self) -> &str {
        self.base.context_path()
    }

    fn initialize(&mut self, router: &mut ModuleRouter) -> Result<(), BoxError> {
        let routes = Arc::clone(&self.routes);
        routes(self, router)
    }

    fn logging(&mut self) -> Option<&mut dyn ModuleLogging> {
        Some(self)
    }
}

impl<C: Codec> ModuleLogging for ApiModule<C> {
    fn set_logger(&mut self, logger: SharedLogger) {
        self.base.set_logger(logger);
    }

    fn logger(&self) -> Option<&SharedLogger> {
        self.base.logger()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Pet {
        name: String,
        age: u32,
    }

    fn no_routes<C: Codec>() -> ApiModule<C> {
        ApiModule::new(|_, _| Ok(()))
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let api: JsonApiModule = no_routes();
        let pet = Pet { name: "Rex".into(), age: 3 };

        let response = api.encode_response(StatusCode::CREATED, Some(&pet)).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json; charset=utf-8"
        );

        let decoded: Pet = api.decode_request(&body_bytes(response).await).unwrap();
        assert_eq!(decoded, pet);
    }

    #[tokio::test]
    async fn test_xml_round_trip() {
        let api: XmlApiModule = no_routes();
        let pet = Pet { name: "Tom".into(), age: 7 };

        let response = api.encode_response(StatusCode::OK, Some(&pet)).unwrap();
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/xml");

        let decoded: Pet = api.decode_request(&body_bytes(response).await).unwrap();
        assert_eq!(decoded, pet);
    }

    #[tokio::test]
    async fn test_no_data_means_empty_body() {
        let api: JsonApiModule = no_routes();
        let response = api.encode_response::<Pet>(StatusCode::NO_CONTENT, None).unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_bytes(response).await.is_empty());
    }

    #[test]
    fn test_decoding_error_is_bad_request() {
        let api: JsonApiModule = no_routes();
        let err = api.decode_request::<Pet>(b"not json").unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_respond_falls_back_to_500() {
        let api: JsonApiModule = no_routes();
        let mut map = std::collections::HashMap::new();
        map.insert((1, 2), 3);
        let response = api.respond(StatusCode::OK, &map);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_exposes_logging_capability() {
        let mut api: XmlApiModule = no_routes();
        assert!(api.logging().is_some());
        assert!(ModuleLogging::logger(&api).is_none());
    }
}
