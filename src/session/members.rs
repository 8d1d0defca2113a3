//! Demo member directory.
//!
//! A fixed table of demo accounts matched against one shared password.
//! This is demo data, not an authentication system.

use serde::{Deserialize, Serialize};

/// The password every demo account accepts.
pub const DEMO_PASSWORD: &str = "password123";

/// Most recent explanation-of-benefits summary for a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSummary {
    pub provider: String,
    pub date: String,
    pub total_cost: String,
    pub responsibility: String,
    pub description: String,
}

/// A signed-in member's profile. Read-only from the assistant's perspective.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub initials: String,
    pub claim: ClaimSummary,
}

/// Look up a demo member by email.
pub fn find_member(email: &str) -> Option<MemberProfile> {
    demo_members().into_iter().find(|m| m.email == email)
}

pub fn demo_members() -> Vec<MemberProfile> {
    vec![
        MemberProfile {
            id: "1".to_string(),
            name: "John Smith".to_string(),
            email: "patient@healthpartners.com".to_string(),
            initials: "JS".to_string(),
            claim: ClaimSummary {
                provider: "Associated Skin Care Specialists".to_string(),
                date: "9/9/2024".to_string(),
                total_cost: "$358.00".to_string(),
                responsibility: "$0.00".to_string(),
                description: "Dermatology consultation and treatment".to_string(),
            },
        },
        MemberProfile {
            id: "2".to_string(),
            name: "Sara Mitchell".to_string(),
            email: "sara.mitchell@healthpartners.com".to_string(),
            initials: "SM".to_string(),
            claim: ClaimSummary {
                provider: "Urgent Care Center".to_string(),
                date: "12/15/2024".to_string(),
                total_cost: "$185.00".to_string(),
                responsibility: "$25.00".to_string(),
                description: "UTI diagnosis and treatment".to_string(),
            },
        },
        MemberProfile {
            id: "3".to_string(),
            name: "John Doe".to_string(),
            email: "john.doe@healthpartners.com".to_string(),
            initials: "JD".to_string(),
            claim: ClaimSummary {
                provider: "Family Medicine Clinic".to_string(),
                date: "11/22/2024".to_string(),
                total_cost: "$420.00".to_string(),
                responsibility: "$50.00".to_string(),
                description: "Annual physical exam and lab work".to_string(),
            },
        },
    ]
}
