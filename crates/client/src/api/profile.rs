//! Customer and admin profile endpoints.
//!
//! Form-level validation runs before any request is made. Admin profile
//! calls report their own outcome (success and status-specific failure
//! toasts) instead of the pipeline's generic failure toast.

use std::time::Duration;

use chrono::NaiveDate;
use medico_core::{AddressId, AddressTypeId, Email, FamilyMemberId, Gender, PhoneNumber, UserId};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::ApiClient;
use crate::error::{ClientError, Result};
use crate::http::FilePart;

const ADDRESS_TYPES_KEY: &str = "address-types";

/// Blood groups the profile form accepts.
pub const BLOOD_GROUPS: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

/// Oldest age accepted for a family member.
pub const MAX_AGE: u8 = 120;

// =============================================================================
// Customer profile
// =============================================================================

/// Customer profile as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub user_id: UserId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address_id: Option<AddressId>,
    #[serde(default)]
    pub profile_pic: Option<String>,
    #[serde(default)]
    pub blood_group: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Fields a customer may change. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomerProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_id: Option<AddressId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
}

impl CustomerProfileUpdate {
    /// Check the form before sending it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require_text("Name", name)?;
        }
        if let Some(group) = &self.blood_group
            && !BLOOD_GROUPS.contains(&group.as_str())
        {
            return Err(ClientError::Validation(format!(
                "Unknown blood group: {group}"
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Addresses
// =============================================================================

/// A saved address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    #[serde(default)]
    pub address_id: Option<AddressId>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub house_no: Option<String>,
    #[serde(default)]
    pub street_name: Option<String>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub pincode: Option<String>,
    #[serde(default)]
    pub type_id: Option<AddressTypeId>,
    #[serde(default)]
    pub is_deleted: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Address category ("Home", "Work", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressType {
    pub type_id: AddressTypeId,
    pub name: String,
    #[serde(default)]
    pub is_deleted: Option<bool>,
}

/// Reverse-geocoded parts of a new address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AddressDetails {
    pub formatted: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

/// Body of `/profile/add-address`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AddAddressResponse {
    pub message: String,
    pub address_id: AddressId,
    pub details: AddressDetails,
}

// =============================================================================
// Family members
// =============================================================================

/// A new family member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyMemberCreate {
    pub name: String,
    pub relation: String,
    pub phone_number: Option<PhoneNumber>,
    pub email: Option<Email>,
    pub age: Option<u8>,
    pub gender: Gender,
    pub dob: Option<NaiveDate>,
}

impl FamilyMemberCreate {
    /// Check the form before sending it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        require_text("Name", &self.name)?;
        require_text("Relation", &self.relation)?;
        check_age(self.age)
    }
}

/// Changes to a family member. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FamilyMemberUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<PhoneNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<Email>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,
}

impl FamilyMemberUpdate {
    /// Check the form before sending it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require_text("Name", name)?;
        }
        if let Some(relation) = &self.relation {
            require_text("Relation", relation)?;
        }
        check_age(self.age)
    }
}

/// A family member as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub member_id: FamilyMemberId,
    pub name: String,
    pub relation: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub age: Option<u32>,
    pub gender: Gender,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

// =============================================================================
// Admin profile
// =============================================================================

/// Administrator profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminProfile {
    pub user_id: UserId,
    pub name: String,
    pub phone_number: String,
    /// ID of the uploaded picture.
    #[serde(default)]
    pub profile_pic: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Fields an administrator may change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdminProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<i64>,
}

/// Body of `/profile/upload-profile-pic/`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadProfilePicResponse {
    pub file_url: String,
    pub profile_id: String,
}

impl ApiClient {
    /// Fetch the signed-in customer's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn customer_profile(&self) -> Result<CustomerProfile> {
        self.get("/profile/get-customer-profile/").await
    }

    /// Update the signed-in customer's profile.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` without a request for a bad form, or
    /// an error if the request fails.
    #[instrument(skip_all)]
    pub async fn update_customer_profile(
        &self,
        update: &CustomerProfileUpdate,
    ) -> Result<CustomerProfile> {
        update.validate()?;
        self.send_json(Method::POST, "/profile/update_customer_profile", update)
            .await
    }

    /// List the signed-in customer's saved addresses.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn customer_addresses(&self) -> Result<Vec<Address>> {
        self.get("/profile/get-customer-addresses/").await
    }

    /// Save the address at a map position; the backend reverse-geocodes it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for out-of-range coordinates, or an
    /// error if the request fails.
    #[instrument(skip(self))]
    pub async fn add_address(
        &self,
        latitude: f64,
        longitude: f64,
        type_id: Option<AddressTypeId>,
    ) -> Result<AddAddressResponse> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ClientError::Validation(format!(
                "Latitude out of range: {latitude}"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ClientError::Validation(format!(
                "Longitude out of range: {longitude}"
            )));
        }

        let mut url = url::Url::parse(&self.config().endpoint("/profile/add-address"))
            .map_err(|e| ClientError::Validation(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("latitude", &latitude.to_string())
                .append_pair("longitude", &longitude.to_string());
            if let Some(type_id) = type_id {
                query.append_pair("type_id", &type_id.to_string());
            }
        }

        let request = crate::http::ApiRequest::new(Method::POST, url.as_str())
            .json(serde_json::json!({}));
        self.send(request).await?.json()
    }

    /// Active address types. Cached for 5 minutes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn address_types(&self) -> Result<Vec<AddressType>> {
        if let Some(types) = self.inner.address_types.get(ADDRESS_TYPES_KEY).await {
            tracing::debug!("Cache hit for address types");
            return Ok(types);
        }

        let types: Vec<AddressType> = self.get("/profile/address-types").await?;

        self.inner
            .address_types
            .insert(ADDRESS_TYPES_KEY.to_string(), types.clone())
            .await;

        Ok(types)
    }

    /// Add a family member.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` without a request for a bad form, or
    /// an error if the request fails.
    #[instrument(skip_all)]
    pub async fn add_family_member(&self, member: &FamilyMemberCreate) -> Result<FamilyMember> {
        member.validate()?;
        self.send_json(Method::POST, "/profile/add-family-member", member)
            .await
    }

    /// List the signed-in customer's family members.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn family_members(&self) -> Result<Vec<FamilyMember>> {
        // Path spelling is the backend's.
        self.get("/profile/get-family-memebers").await
    }

    /// Update a family member.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` without a request for a bad form, or
    /// an error if the request fails.
    #[instrument(skip(self, update))]
    pub async fn update_family_member(
        &self,
        member_id: FamilyMemberId,
        update: &FamilyMemberUpdate,
    ) -> Result<FamilyMember> {
        update.validate()?;
        let path = format!("/profile/members/{member_id}");
        self.send_json(Method::PUT, &path, update).await
    }

    /// Fetch the signed-in administrator's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; a failure toast has been shown.
    #[instrument(skip(self))]
    pub async fn admin_profile(&self) -> Result<AdminProfile> {
        let request = self
            .request(Method::GET, "/profile/get-admin-profile/")
            .quiet();
        match self.send(request).await.and_then(|r| r.json()) {
            Ok(profile) => Ok(profile),
            Err(e) => Err(self.report_admin_failure("Failed to load profile", e)),
        }
    }

    /// Update the signed-in administrator's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails; a failure toast has been shown.
    #[instrument(skip_all)]
    pub async fn update_admin_profile(&self, update: &AdminProfileUpdate) -> Result<AdminProfile> {
        if let Some(name) = &update.name {
            require_text("Name", name)?;
        }

        let request = self
            .request(Method::POST, "/profile/update-admin-profile/")
            .json(serde_json::to_value(update)?)
            .quiet();
        match self.send(request).await.and_then(|r| r.json()) {
            Ok(profile) => {
                self.toasts()
                    .success("Profile updated successfully", Duration::from_secs(3));
                Ok(profile)
            }
            Err(e) => Err(self.report_admin_failure("Failed to update profile", e)),
        }
    }

    /// Upload (or replace) the administrator's profile picture.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for an empty file, or an error if
    /// the upload fails; a failure toast has been shown.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn upload_profile_picture(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadProfilePicResponse> {
        if bytes.is_empty() {
            return Err(ClientError::Validation("File is empty".to_string()));
        }

        let part = FilePart {
            field: "file".to_string(),
            file_name: file_name.to_string(),
            mime: image_mime(file_name).map(String::from),
            bytes,
        };
        let request = self
            .request(Method::POST, "/profile/upload-profile-pic/")
            .multipart(part)
            .quiet();
        match self.send(request).await.and_then(|r| r.json()) {
            Ok(uploaded) => {
                self.toasts().success(
                    "Profile picture uploaded successfully",
                    Duration::from_secs(3),
                );
                Ok(uploaded)
            }
            Err(e) => Err(self.report_admin_failure("Failed to upload profile picture", e)),
        }
    }

    /// Upload a new picture, then point the profile at it.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error.
    #[instrument(skip(self, bytes, update))]
    pub async fn upload_and_update_admin_profile(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        update: AdminProfileUpdate,
    ) -> Result<AdminProfile> {
        let uploaded = self.upload_profile_picture(file_name, bytes).await?;
        let picture_id: i64 = uploaded.profile_id.trim().parse().map_err(|_| {
            ClientError::Validation(format!(
                "Upload returned a non-numeric picture id: {}",
                uploaded.profile_id
            ))
        })?;

        let update = AdminProfileUpdate {
            profile_pic: Some(picture_id),
            ..update
        };
        self.update_admin_profile(&update).await
    }

    fn report_admin_failure(&self, fallback: &str, error: ClientError) -> ClientError {
        tracing::error!(error = %error, "{fallback}");
        let (message, secs) = admin_failure_message(fallback, &error);
        self.toasts().error(message, Duration::from_secs(secs));
        error
    }
}

/// Toast text and duration (seconds) for a failed admin profile call.
fn admin_failure_message(fallback: &str, error: &ClientError) -> (String, u64) {
    match error {
        ClientError::Api { status: 403, .. } => {
            ("Access forbidden: Insufficient permissions".to_string(), 4)
        }
        ClientError::Api { status: 404, .. } => ("Profile not found".to_string(), 3),
        ClientError::Api { status: 429, .. } => {
            ("Too many requests. Please try again later".to_string(), 4)
        }
        ClientError::Api { status: 500, .. } => {
            ("Server error. Please try again later".to_string(), 4)
        }
        ClientError::Api { message, .. } if message != "Unexpected error" => (message.clone(), 4),
        _ => (fallback.to_string(), 3),
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClientError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn check_age(age: Option<u8>) -> Result<()> {
    match age {
        Some(age) if age > MAX_AGE => Err(ClientError::Validation(format!(
            "Age must be at most {MAX_AGE}"
        ))),
        _ => Ok(()),
    }
}

fn image_mime(file_name: &str) -> Option<&'static str> {
    let extension = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}
