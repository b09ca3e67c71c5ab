//! Section catalog: the eight hardcoded defaults plus the
//! admin-configurable order and per-section type/category config.

use serde::{Deserialize, Serialize};

use crate::types::ResourceKind;

/// A topical collection of resources. Configuration, not user data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
    #[serde(default)]
    pub intro: String,
}

/// One tab within a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionType {
    pub id: ResourceKind,
    pub name: String,
    pub icon: String,
}

/// Admin-customizable per-section configuration, persisted under
/// `section-config:<sectionId>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionConfig {
    pub types: Vec<SectionType>,
    pub categories: Vec<String>,
}

impl Default for SectionConfig {
    fn default() -> Self {
        SectionConfig {
            types: default_types(),
            categories: default_categories(),
        }
    }
}

/// Entry in the persisted `section-order` list, which defines which
/// sections exist and how they are displayed. Absence of the list falls
/// back to [`default_sections`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionOrderEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub color: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl From<&Section> for SectionOrderEntry {
    fn from(s: &Section) -> Self {
        SectionOrderEntry {
            id: s.id.clone(),
            name: s.name.clone(),
            icon: s.icon.clone(),
            color: s.color.clone(),
            visible: true,
        }
    }
}

pub fn default_types() -> Vec<SectionType> {
    vec![
        SectionType {
            id: ResourceKind::Playbooks,
            name: "Playbooks".to_string(),
            icon: "fas fa-book".to_string(),
        },
        SectionType {
            id: ResourceKind::BoxLinks,
            name: "Box Links".to_string(),
            icon: "fas fa-link".to_string(),
        },
        SectionType {
            id: ResourceKind::Dashboards,
            name: "Dashboards".to_string(),
            icon: "fas fa-chart-bar".to_string(),
        },
    ]
}

pub fn default_categories() -> Vec<String> {
    ["process", "procedure", "guide", "template", "checklist"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub fn default_sections() -> Vec<Section> {
    let defs: &[(&str, &str, &str, &str, &str)] = &[
        (
            "costing",
            "Costing",
            "fas fa-calculator",
            "#4CAF50",
            "Guides and tools for cost analysis, budgeting, and ROI planning.",
        ),
        (
            "supply-planning",
            "Supply Planning",
            "fas fa-truck",
            "#2196F3",
            "Demand forecasting, inventory optimization, and supplier planning resources.",
        ),
        (
            "operations",
            "Operations",
            "fas fa-cogs",
            "#FF9800",
            "Process improvement, SOPs, production metrics, and maintenance guidance.",
        ),
        (
            "quality",
            "Quality Management",
            "fas fa-check-circle",
            "#9C27B0",
            "Quality management practices, control procedures, and compliance standards.",
        ),
        (
            "hr",
            "Human Resources",
            "fas fa-users",
            "#E91E63",
            "People operations policies, templates, onboarding, and workforce resources.",
        ),
        (
            "it",
            "IT & Technology",
            "fas fa-laptop-code",
            "#607D8B",
            "IT systems, tooling, security, and operational best practices.",
        ),
        (
            "sales",
            "Sales & Marketing",
            "fas fa-chart-line",
            "#795548",
            "Sales playbooks, marketing assets, and performance dashboards.",
        ),
        (
            "compliance",
            "Compliance & Legal",
            "fas fa-gavel",
            "#F44336",
            "Policies, legal, and regulatory guidance with reusable templates.",
        ),
    ];
    defs.iter()
        .map(|(id, name, icon, color, intro)| Section {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
            intro: intro.to_string(),
        })
        .collect()
}

pub fn default_section_ids() -> Vec<String> {
    default_sections().iter().map(|s| s.id.clone()).collect()
}
