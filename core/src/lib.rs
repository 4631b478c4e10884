//! Client-side data layer for the API catalog service.
//!
//! # Overview
//! Manages groups of API definitions and their nested request/response
//! parameters through the backend's JSON HTTP interface. Every operation
//! resolves to the uniform `ApiResult` envelope instead of failing outward.
//!
//! # Design
//! - `CatalogClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`, so the I/O boundary is explicit.
//! - `Catalog` runs those halves through a `Transport` (`UreqTransport` in
//!   production, scripted fakes in tests).
//! - `tree` turns the flat parameter list of an API into request and
//!   response forests, reporting rather than hiding records it cannot place.
//! - `i18n` resolves the UI language into an explicit `LocaleContext`.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod i18n;
pub mod result;
pub mod transport;
pub mod tree;
pub mod types;

pub use catalog::Catalog;
pub use client::CatalogClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, CreateApiError, ParameterStage, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use i18n::{LocaleContext, Translations};
pub use result::ApiResult;
pub use transport::{Transport, UreqTransport};
pub use tree::{build_parameter_trees, ParameterForest, ParameterTrees};
pub use types::{
    Api, ApiDetail, CreateApi, CreatedApiSummary, DetachReason, DetachedParameter, Group,
    GroupSummary, GroupWithApis, JsonImportSummary, NewApiWithParameters, OrderEntry,
    ParamCategory, Parameter, ParameterCount, ParameterNode, ParameterSpec, ParametersFromJson,
    UpdateApi, ValueType,
};
