// this_file: src/submit.rs
//! Postcard order submission to the fulfillment HTTP API.
//!
//! An order is one multipart POST carrying the recipient and sender
//! addresses as bracketed form fields, the card size label, and the two
//! composed panels as binary PNG parts. Authentication is HTTP Basic
//! with the API key as the user name and an empty password. The raw
//! response is handed back untouched; an HTTP error status is still a
//! completed submission, and only transport failures surface as errors.

use log::{debug, info};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use crate::decode::EncodedImage;
use crate::error::{Error, Result};
use crate::geometry::PhysicalSize;

/// Production fulfillment endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.lob.com/v1/postcards";

/// A postal address as the fulfillment API expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    pub address_city: String,
    pub address_state: String,
    pub address_zip: String,
    pub address_country: String,
}

impl Address {
    /// Check the fields the API requires; the second line may be empty
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("name", &self.name),
            ("address_line1", &self.address_line1),
            ("address_city", &self.address_city),
            ("address_state", &self.address_state),
            ("address_zip", &self.address_zip),
            ("address_country", &self.address_country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::InvalidParameter(format!(
                    "address field '{}' must not be empty",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// A fully composed order ready for submission
#[derive(Debug, Clone)]
pub struct PostcardOrder {
    pub to: Address,
    pub from: Address,
    pub size: PhysicalSize,
    pub front: EncodedImage,
    pub back: EncodedImage,
}

impl PostcardOrder {
    /// Check addresses and panel payloads before hitting the wire
    pub fn validate(&self) -> Result<()> {
        self.to.validate()?;
        self.from.validate()?;
        if self.front.is_empty() || self.back.is_empty() {
            return Err(Error::InvalidParameter(
                "order panels must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// The raw fulfillment response
///
/// The body is never interpreted here; callers read the status and pull
/// the body themselves if they want it.
#[derive(Debug)]
pub struct SubmissionResult {
    response: reqwest::Response,
}

impl SubmissionResult {
    /// HTTP status returned by the fulfillment API
    pub fn status(&self) -> reqwest::StatusCode {
        self.response.status()
    }

    /// Whether the API accepted the order (2xx status)
    pub fn is_accepted(&self) -> bool {
        self.response.status().is_success()
    }

    /// Read the response body as text
    pub async fn into_body(self) -> Result<String> {
        Ok(self.response.text().await?)
    }

    /// Unwrap the raw response
    pub fn into_inner(self) -> reqwest::Response {
        self.response
    }
}

/// HTTP client for the fulfillment API
#[derive(Debug, Clone)]
pub struct FulfillmentClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl FulfillmentClient {
    /// Client against the production endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key)
    }

    /// Client against a custom endpoint (tests, staging)
    pub fn with_endpoint(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// Endpoint this client posts to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Submit one order as a multipart POST
    ///
    /// Resolves with the raw response for any HTTP status; only
    /// transport failures return an error.
    pub async fn submit(&self, order: PostcardOrder) -> Result<SubmissionResult> {
        order.validate()?;
        debug!(
            "submitting {} postcard to {} for '{}'",
            order.size.label(),
            self.endpoint,
            order.to.name
        );

        let mut form = Form::new();
        form = address_fields(form, "to", &order.to);
        form = address_fields(form, "from", &order.from);
        form = form.text("size", order.size.label());

        let front = Part::bytes(order.front.bytes)
            .file_name("front.png")
            .mime_str(&order.front.media_type)?;
        let back = Part::bytes(order.back.bytes)
            .file_name("back.png")
            .mime_str(&order.back.media_type)?;
        form = form.part("front", front).part("back", back);

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.api_key, Some(""))
            .multipart(form)
            .send()
            .await?;
        info!("fulfillment responded with {}", response.status());
        Ok(SubmissionResult { response })
    }
}

/// Append one address as bracketed form fields under a prefix
fn address_fields(form: Form, prefix: &str, address: &Address) -> Form {
    form.text(format!("{}[name]", prefix), address.name.clone())
        .text(
            format!("{}[address_line1]", prefix),
            address.address_line1.clone(),
        )
        .text(
            format!("{}[address_line2]", prefix),
            address.address_line2.clone(),
        )
        .text(
            format!("{}[address_country]", prefix),
            address.address_country.clone(),
        )
        .text(
            format!("{}[address_city]", prefix),
            address.address_city.clone(),
        )
        .text(
            format!("{}[address_state]", prefix),
            address.address_state.clone(),
        )
        .text(
            format!("{}[address_zip]", prefix),
            address.address_zip.clone(),
        )
}
