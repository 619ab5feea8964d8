//! The fixed, versioned attribute dictionary for batch field binding.
//!
//! Text elements declare a `field_id` resolved against these ids. The
//! dictionary is owned by the data-formatting collaborator; this module
//! mirrors its standardized ids so bindings can be validated offline.

/// Dictionary version. Bump only in lockstep with the collaborator.
pub const FIELD_DICTIONARY_VERSION: u32 = 1;

/// Standardized attribute ids, as produced by batch record normalization.
pub const FIELD_IDS: &[&str] = &[
    // Core
    "first_name",
    "last_name",
    "full_name",
    "email",
    "work_phone",
    "work_phone_ext",
    "mobile_phone",
    // Address
    "address_street",
    "address_city",
    "address_state",
    "address_postal",
    "address_country",
    // Socials
    "social_instagram",
    "social_twitter",
    "social_facebook",
    // Business
    "business_name",
    "business_title",
    "business_department",
    "business_url",
    "business_hours",
    "business_address_street",
    "business_address_city",
    "business_address_state",
    "business_address_postal",
    "business_address_country",
    "business_linkedin",
    "business_twitter",
    // Personal
    "personal_url",
    "personal_bio",
    "personal_birthday",
];

/// Check whether a field id exists in the dictionary.
#[must_use]
pub fn is_known_field(id: &str) -> bool {
    FIELD_IDS.contains(&id)
}
