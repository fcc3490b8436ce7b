//! Response models used by the lookup helpers.
//!
//! # Design
//! Only the fields the lookups read are modelled; everything else in the
//! API payloads is ignored by serde. Fields default when absent so a single
//! sparse entry does not hide the rest of the page.

use serde::{Deserialize, Serialize};

/// One entry of `GET lists`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListSummary {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Page returned by `GET lists`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lists {
    #[serde(default)]
    pub lists: Vec<ListSummary>,
    #[serde(default)]
    pub total_items: u64,
}

/// One entry of `GET lists/{list_id}/interest-categories`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterestCategory {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub list_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InterestCategories {
    #[serde(default)]
    pub categories: Vec<InterestCategory>,
    #[serde(default)]
    pub total_items: u64,
}

/// One entry of `GET lists/{list_id}/interest-categories/{category_id}/interests`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub category_id: String,
    #[serde(default)]
    pub list_id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interests {
    #[serde(default)]
    pub interests: Vec<Interest>,
    #[serde(default)]
    pub total_items: u64,
}
