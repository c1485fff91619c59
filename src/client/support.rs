use serde::{Deserialize, Serialize};

use crate::types::Platform;

/// First iOS release with Web Push for home screen apps.
pub const MIN_IOS_VERSION: (u32, u32) = (16, 4);

/// What the browser exposes, as seen from the page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Capabilities {
    pub service_worker: bool,
    pub push_manager: bool,
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    #[default]
    Default,
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportState {
    pub is_supported: bool,
    pub is_subscribed: bool,
    pub permission_state: PermissionState,
    pub platform: Platform,
    pub error: Option<String>,
}

/// Reads `major_minor` from the `OS 17_2` token of an iOS user agent.
pub fn ios_version(user_agent: &str) -> Option<(u32, u32)> {
    let start = user_agent.find(" OS ")? + " OS ".len();
    let token = user_agent[start..].split_whitespace().next()?;

    let mut parts = token.split('_');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().and_then(|m| m.parse().ok()).unwrap_or(0);

    Some((major, minor))
}

pub fn check_support(
    capabilities: &Capabilities,
    permission: PermissionState,
    is_subscribed: bool,
) -> SupportState {
    let platform = Platform::detect(&capabilities.user_agent);
    let mut is_supported =
        capabilities.service_worker && capabilities.push_manager;

    // Unparseable versions fall through to the capability flags.
    if platform == Platform::Ios {
        if let Some(version) = ios_version(&capabilities.user_agent) {
            if version < MIN_IOS_VERSION {
                is_supported = false;
            }
        }
    }

    let error = if is_supported {
        None
    } else if platform == Platform::Ios {
        Some(format!(
            "This browser does not support push notifications. iOS {}.{} or later is required.",
            MIN_IOS_VERSION.0, MIN_IOS_VERSION.1
        ))
    } else {
        Some(String::from(
            "This browser does not support push notifications.",
        ))
    };

    SupportState {
        is_supported,
        is_subscribed: is_supported && is_subscribed,
        permission_state: permission,
        platform,
        error,
    }
}
