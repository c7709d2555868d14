pub mod endpoints {
    pub const API_BASE_URL: &str = "https://api.withampersand.com";
    pub const PROXY_BASE_URL: &str = "https://proxy.withampersand.com";
    pub const WRITE_BASE_URL: &str = "https://write.withampersand.com";
    pub const OAUTH_CONNECT_PATH: &str = "v1/oauth-connect";

    pub const API_URL_ENV: &str = "AMPERSAND_API_URL";
    pub const PROXY_URL_ENV: &str = "AMPERSAND_PROXY_URL";
    pub const WRITE_URL_ENV: &str = "AMPERSAND_WRITE_URL";
}

pub mod headers {
    pub const API_KEY: &str = "x-api-key";
    pub const PROJECT_ID: &str = "x-amp-project-id";
    pub const PROXY_VERSION: &str = "x-amp-proxy-version";
    pub const INSTALLATION_ID: &str = "x-amp-installation-id";
    pub const PROXY_VERSION_VALUE: &str = "1";
    pub const CONTENT_TYPE_JSON: &str = "application/json";
    pub const USER_AGENT: &str = "ampersand-tools/0.3.0";
}

pub mod env {
    pub const API_KEY: &str = "AMPERSAND_API_KEY";
    pub const PROJECT_ID: &str = "AMPERSAND_PROJECT_ID";
    pub const INTEGRATION_NAME: &str = "AMPERSAND_INTEGRATION_NAME";
    /// Older releases read the integration from these names.
    pub const INTEGRATION_NAME_FALLBACKS: &[&str] =
        &["AMPERSAND_INTEGRATION_ID", "AMPERSAND_INTEGRATION_ID_OR_NAME"];
    pub const GROUP_REF: &str = "AMPERSAND_GROUP_REF";
    pub const LOG_LEVEL: &str = "AMPERSAND_LOG_LEVEL";
}

pub mod tools {
    pub const CREATE_RECORD: &str = "create-record";
    pub const UPDATE_RECORD: &str = "update-record";
    pub const CHECK_CONNECTION: &str = "check-connection";
    pub const CREATE_INSTALLATION: &str = "create-installation";
    pub const CHECK_INSTALLATION: &str = "check-installation";
    pub const START_OAUTH: &str = "start-oauth";
    pub const SEND_REQUEST: &str = "send-request";
    pub const SEND_READ_REQUEST: &str = "send-read-request";
}

pub mod operations {
    pub const CREATE_INSTALLATION: &str = "create-installation";
    pub const ENSURE_INSTALLATION: &str = "ensure-installation";
}
