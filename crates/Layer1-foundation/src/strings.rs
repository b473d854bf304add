//! Static String Constants
//!
//! 리소스 타입 등 자주 쓰이는 고정 문자열입니다.
//!
//! # Usage
//!
//! ```ignore
//! use adaudit_foundation::strings::{resource, canonical_resource_type};
//!
//! let meta = OperationMeta::new(OperationType::Create, resource::CAMPAIGN, "create_campaign");
//! assert_eq!(canonical_resource_type("ad_group"), Some(resource::AD_GROUP));
//! ```

// ============================================================================
// Resource Type Constants
// ============================================================================

pub mod resource {
    /// Campaign
    pub const CAMPAIGN: &str = "CAMPAIGN";
    /// Ad group
    pub const AD_GROUP: &str = "AD_GROUP";
    /// Ad
    pub const AD: &str = "AD";
    /// Keyword (ad group criterion)
    pub const KEYWORD: &str = "KEYWORD";
    /// Campaign budget
    pub const BUDGET: &str = "BUDGET";
    /// Asset / extension
    pub const EXTENSION: &str = "EXTENSION";
    /// Bidding strategy
    pub const BIDDING_STRATEGY: &str = "BIDDING_STRATEGY";
    /// Conversion action
    pub const CONVERSION_ACTION: &str = "CONVERSION_ACTION";
    /// Generic API call (search, reports)
    pub const GOOGLE_ADS_API: &str = "GOOGLE_ADS_API";

    pub const ALL: [&str; 9] = [
        CAMPAIGN,
        AD_GROUP,
        AD,
        KEYWORD,
        BUDGET,
        EXTENSION,
        BIDDING_STRATEGY,
        CONVERSION_ACTION,
        GOOGLE_ADS_API,
    ];
}

/// 알려진 리소스 타입으로 정규화 (대소문자, `-`/`_` 무시)
///
/// 알 수 없는 값이면 `None`; 리소스 타입은 자유 문자열이므로 호출자가 원문을 그대로 쓸 수 있습니다.
pub fn canonical_resource_type(s: &str) -> Option<&'static str> {
    let normalized = s.trim().replace('-', "_").to_ascii_uppercase();
    resource::ALL.iter().copied().find(|r| *r == normalized)
}

// ============================================================================
// Tests
// ============================================================================
