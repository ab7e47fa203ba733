use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Business,
    Ecommerce,
    Booking,
    Spa,
    Tattoo,
    Portfolio,
    Landing,
    Other,
}

impl ServiceType {
    pub const ALL: [ServiceType; 8] = [
        ServiceType::Business,
        ServiceType::Ecommerce,
        ServiceType::Booking,
        ServiceType::Spa,
        ServiceType::Tattoo,
        ServiceType::Portfolio,
        ServiceType::Landing,
        ServiceType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Business => "business",
            ServiceType::Ecommerce => "ecommerce",
            ServiceType::Booking => "booking",
            ServiceType::Spa => "spa",
            ServiceType::Tattoo => "tattoo",
            ServiceType::Portfolio => "portfolio",
            ServiceType::Landing => "landing",
            ServiceType::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServiceType::Business => "Business Website",
            ServiceType::Ecommerce => "E-commerce Site",
            ServiceType::Booking => "Booking/Scheduling Site",
            ServiceType::Spa => "Spa/Wellness Center",
            ServiceType::Tattoo => "Tattoo Shop",
            ServiceType::Portfolio => "Portfolio Site",
            ServiceType::Landing => "Landing Page",
            ServiceType::Other => "Other/Not Sure",
        }
    }
}

impl FromStr for ServiceType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ServiceType::ALL
            .into_iter()
            .find(|service| service.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Budget {
    #[serde(rename = "under1k")]
    Under1k,
    #[serde(rename = "1k-2k")]
    From1kTo2k,
    #[serde(rename = "2k-3k")]
    From2kTo3k,
    #[serde(rename = "over3k")]
    Over3k,
    #[serde(rename = "notsure")]
    NotSure,
}

impl Budget {
    pub const ALL: [Budget; 5] = [
        Budget::Under1k,
        Budget::From1kTo2k,
        Budget::From2kTo3k,
        Budget::Over3k,
        Budget::NotSure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Budget::Under1k => "under1k",
            Budget::From1kTo2k => "1k-2k",
            Budget::From2kTo3k => "2k-3k",
            Budget::Over3k => "over3k",
            Budget::NotSure => "notsure",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Budget::Under1k => "Under $1,000",
            Budget::From1kTo2k => "$1,000 - $2,000",
            Budget::From2kTo3k => "$2,000 - $3,000",
            Budget::Over3k => "Over $3,000",
            Budget::NotSure => "Not Sure Yet",
        }
    }
}

impl FromStr for Budget {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Budget::ALL
            .into_iter()
            .find(|budget| budget.as_str() == s)
            .ok_or_else(|| UnknownVariant(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

/// Browsers and our own listings send `null` for untouched optional inputs.
fn null_as_blank<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Raw form input exactly as the browser sent it: untrimmed, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct QuoteForm {
    #[serde(deserialize_with = "null_as_blank")]
    pub name: String,
    #[serde(deserialize_with = "null_as_blank")]
    pub email: String,
    #[serde(deserialize_with = "null_as_blank")]
    pub phone: String,
    #[serde(alias = "business", deserialize_with = "null_as_blank")]
    pub business_name: String,
    #[serde(alias = "service", deserialize_with = "null_as_blank")]
    pub service_type: String,
    #[serde(deserialize_with = "null_as_blank")]
    pub budget: String,
    #[serde(alias = "message", deserialize_with = "null_as_blank")]
    pub project_details: String,
    #[serde(deserialize_with = "null_as_blank")]
    pub timeline: String,
}

/// A validated, normalized quote request. Optional fields are `None`, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct QuoteDetails {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub business_name: String,
    pub service_type: ServiceType,
    pub budget: Option<Budget>,
    pub project_details: String,
    pub timeline: Option<String>,
}

/// Serialized with the display labels of its service type and budget
/// alongside the stored values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
pub struct QuoteRequest {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub details: QuoteDetails,
}

#[derive(Serialize)]
struct LabeledQuote<'a> {
    id: Uuid,
    created_at: DateTime<Utc>,
    user_id: Uuid,
    #[serde(flatten)]
    details: &'a QuoteDetails,
    service_type_label: &'static str,
    budget_label: Option<&'static str>,
}

impl Serialize for QuoteRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        LabeledQuote {
            id: self.id,
            created_at: self.created_at,
            user_id: self.user_id,
            details: &self.details,
            service_type_label: self.details.service_type.label(),
            budget_label: self.details.budget.map(|budget| budget.label()),
        }
        .serialize(serializer)
    }
}

/// Which slice of the quote collection a listing asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QuoteScope {
    All,
    Owned,
}

/// Database row shape; enums are stored as text.
#[derive(Debug, Clone, FromRow)]
pub struct QuoteRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub business_name: String,
    pub service_type: String,
    pub budget: Option<String>,
    pub project_details: String,
    pub timeline: Option<String>,
}

impl TryFrom<QuoteRecord> for QuoteRequest {
    type Error = UnknownVariant;

    fn try_from(record: QuoteRecord) -> Result<Self, Self::Error> {
        let budget = record.budget.as_deref().map(Budget::from_str).transpose()?;

        Ok(QuoteRequest {
            id: record.id,
            created_at: record.created_at,
            user_id: record.user_id,
            details: QuoteDetails {
                name: record.name,
                email: record.email,
                phone: record.phone,
                business_name: record.business_name,
                service_type: record.service_type.parse()?,
                budget,
                project_details: record.project_details,
                timeline: record.timeline,
            },
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitQuoteResponse {
    pub quote: QuoteRequest,
    pub notice: crate::models::Notice,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_type_round_trips_through_str() {
        for service in ServiceType::ALL {
            assert_eq!(service.as_str().parse::<ServiceType>().unwrap(), service);
        }
        assert!("website".parse::<ServiceType>().is_err());
    }

    #[test]
    fn test_budget_labels() {
        assert_eq!("1k-2k".parse::<Budget>().unwrap().label(), "$1,000 - $2,000");
        assert_eq!(Budget::NotSure.as_str(), "notsure");
        assert!("5k".parse::<Budget>().is_err());
    }

    #[test]
    fn test_form_treats_null_as_blank() {
        let form: QuoteForm = serde_json::from_value(serde_json::json!({
            "name": "Jane Doe",
            "email": "jane@x.com",
            "phone": null,
            "business_name": "Jane's Cafe",
            "service_type": "business",
            "budget": null,
            "project_details": "Need a 5-page site",
            "timeline": null
        }))
        .unwrap();

        assert!(form.phone.is_empty());
        assert!(form.budget.is_empty());
        assert!(form.timeline.is_empty());
        assert_eq!(form.name, "Jane Doe");
    }

    #[test]
    fn test_serialized_quote_carries_labels() {
        let quote = QuoteRequest {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            user_id: Uuid::new_v4(),
            details: QuoteDetails {
                name: "Jane".into(),
                email: "jane@x.com".into(),
                phone: None,
                business_name: "Cafe".into(),
                service_type: ServiceType::Ecommerce,
                budget: Some(Budget::From1kTo2k),
                project_details: "Site".into(),
                timeline: None,
            },
        };

        let value = serde_json::to_value(&quote).unwrap();
        assert_eq!(value["service_type"], "ecommerce");
        assert_eq!(value["service_type_label"], "E-commerce Site");
        assert_eq!(value["budget"], "1k-2k");
        assert_eq!(value["budget_label"], "$1,000 - $2,000");
        assert!(value["phone"].is_null());

        let back: QuoteRequest = serde_json::from_value(value).unwrap();
        assert_eq!(back, quote);
    }

    #[test]
    fn test_form_accepts_short_field_names() {
        let form: QuoteForm = serde_json::from_value(serde_json::json!({
            "name": "Jane Doe",
            "email": "jane@x.com",
            "business": "Jane's Cafe",
            "service": "business",
            "message": "Need a 5-page site"
        }))
        .unwrap();

        assert_eq!(form.business_name, "Jane's Cafe");
        assert_eq!(form.service_type, "business");
        assert_eq!(form.project_details, "Need a 5-page site");
        assert!(form.phone.is_empty());
    }

    #[test]
    fn test_record_with_unknown_budget_is_rejected() {
        let record = QuoteRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            user_id: Uuid::new_v4(),
            name: "Jane".into(),
            email: "jane@x.com".into(),
            phone: None,
            business_name: "Cafe".into(),
            service_type: "business".into(),
            budget: Some("lots".into()),
            project_details: "Site".into(),
            timeline: None,
        };

        assert!(QuoteRequest::try_from(record).is_err());
    }
}
