//! Fixed catalog of the requests a customer can make from a table.
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::api::RequestTypeInfo;
use crate::errors::Error;

/// Category of customer ask
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum RequestType {
    TableClean,
    ToiletClean,
    ReadyToOrder,
    AdditionalOrder,
    ReplaceCutlery,
    RequestSauces,
}

/// How quickly staff should react to a request
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl RequestType {
    /// Every request type, in the order they are offered to customers
    pub const ALL: [RequestType; 6] = [
        RequestType::TableClean,
        RequestType::ToiletClean,
        RequestType::ReadyToOrder,
        RequestType::AdditionalOrder,
        RequestType::ReplaceCutlery,
        RequestType::RequestSauces,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::TableClean => "table_clean",
            RequestType::ToiletClean => "toilet_clean",
            RequestType::ReadyToOrder => "ready_to_order",
            RequestType::AdditionalOrder => "additional_order",
            RequestType::ReplaceCutlery => "replace_cutlery",
            RequestType::RequestSauces => "request_sauces",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RequestType::TableClean => "Clean Table",
            RequestType::ToiletClean => "Toilet Issue",
            RequestType::ReadyToOrder => "Ready to Order",
            RequestType::AdditionalOrder => "Order More",
            RequestType::ReplaceCutlery => "New Cutlery",
            RequestType::RequestSauces => "Sauces & Condiments",
        }
    }

    /// Minimum number of minutes between two requests of this type from one table
    pub fn cooldown_minutes(&self) -> i64 {
        match self {
            RequestType::ToiletClean => 15,
            RequestType::ReadyToOrder | RequestType::TableClean => 10,
            RequestType::AdditionalOrder | RequestType::ReplaceCutlery => 5,
            RequestType::RequestSauces => 3,
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            RequestType::ToiletClean | RequestType::ReadyToOrder => Priority::High,
            RequestType::TableClean | RequestType::AdditionalOrder => Priority::Medium,
            RequestType::ReplaceCutlery | RequestType::RequestSauces => Priority::Low,
        }
    }

    pub fn is_high_priority(&self) -> bool {
        self.priority() == Priority::High
    }

    /// Whether the request must come with a photo of the issue
    pub fn requires_photo(&self) -> bool {
        matches!(self, RequestType::ToiletClean)
    }

    pub fn info(&self) -> RequestTypeInfo {
        RequestTypeInfo {
            request_type: *self,
            label: self.label().to_string(),
            cooldown_minutes: self.cooldown_minutes(),
            priority: self.priority(),
            requires_photo: self.requires_photo(),
        }
    }
}

impl std::str::FromStr for RequestType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::BadRequest(format!("Unknown request type '{}'", s)))
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_cooldowns() {
        let minutes: Vec<_> = RequestType::ALL
            .iter()
            .map(|t| (t.as_str(), t.cooldown_minutes()))
            .collect();
        assert_eq!(
            minutes,
            vec![
                ("table_clean", 10),
                ("toilet_clean", 15),
                ("ready_to_order", 10),
                ("additional_order", 5),
                ("replace_cutlery", 5),
                ("request_sauces", 3),
            ]
        );
    }

    #[test]
    fn test_high_priority_types() {
        let high: Vec<_> = RequestType::ALL
            .into_iter()
            .filter(RequestType::is_high_priority)
            .collect();
        assert_eq!(high, vec![RequestType::ToiletClean, RequestType::ReadyToOrder]);
    }

    #[test]
    fn test_parse_and_serialize() {
        for t in RequestType::ALL {
            assert_eq!(t.as_str().parse::<RequestType>().unwrap(), t);
            assert_eq!(serde_json::to_string(&t).unwrap(), format!("\"{}\"", t));
        }
        assert!("free_dessert".parse::<RequestType>().is_err());
    }

    #[test]
    fn test_only_toilet_requires_photo() {
        for t in RequestType::ALL {
            assert_eq!(t.requires_photo(), t == RequestType::ToiletClean);
        }
    }
}
